//! A small blog: users and the posts they write.
//!
//! Runs against the in-memory store by default. Build with `--features mongodb` and set
//! `ODM_URL` (plus the optional `ODM_*` settings) to run it against MongoDB instead.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example blog
//! ```

use odmlayer::{bson::doc, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

odmlayer::client! {
    /// The blog database.
    pub struct Blog {
        UserModel,
        PostModel,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
    age: i32,
}

fn registry() -> DocumentStoreResult<ModelRegistry> {
    let user = Model::builder()
        .field("name", FieldDefinition::string().embeddable())
        .field("age", FieldDefinition::int())
        .build()?;

    let post = Model::from_json(json!({
        "title": { "type": "STRING" },
        "user": { "type": "UserModel" },
    }))?;

    ModelRegistry::builder()
        .model("UserModel", user)
        .model("PostModel", post)
        .build()
}

async fn run<B: StoreBackend + 'static>(blog: Blog<B>) -> DocumentStoreResult<()> {
    blog.connect().await?;

    info!(models = ?blog.models().keys().collect::<Vec<_>>(), "connected");

    let john = blog
        .users
        .create_from(&User {
            name: "John".to_string(),
            age: 30,
        })
        .await?;
    info!(user = %john, "created user");

    let post = blog
        .posts
        .create(doc! { "title": "Hello world", "user": { "name": "John" } })
        .await?;
    info!(post = %post, "created post");

    let found = blog
        .posts
        .find_one(
            FindOneArgs::new(Filter::eq("user.name", "John")).select(
                Projection::new()
                    .include("title")
                    .nested("user", Projection::new().include("name")),
            ),
        )
        .await?;
    info!(post = ?found, "found post by author");

    if let Some(id) = john.get("_id").cloned() {
        let user: Option<User> = blog.users.find_one_as(Filter::id(id)).await?;
        info!(user = ?user, "found user by id");
    }

    let missing = blog.users.find_one(Filter::eq("name", "Jane")).await?;
    info!(found = missing.is_some(), "looked for Jane");

    blog.close().await
}

#[tokio::main]
async fn main() -> DocumentStoreResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = registry()?;

    #[cfg(feature = "mongodb")]
    if let Ok(connection) = ConnectionConfig::from_env("ODM") {
        let builder = odmlayer::mongodb::MongoDbStore::builder(connection);
        return run(Blog::new(ClientConfig::new(builder, registry))?).await;
    }

    let builder = odmlayer::memory::InMemoryStore::builder();
    run(Blog::new(ClientConfig::new(builder, registry))?).await
}
