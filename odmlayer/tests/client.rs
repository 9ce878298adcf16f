use futures::future::join_all;
use odmlayer::{
    bson::{Bson, doc, oid::ObjectId},
    memory::{InMemoryStore, InMemoryStoreBuilder},
    prelude::*,
};
use serde_json::json;

odmlayer::client! {
    pub struct Blog {
        UserModel,
        PostModel,
    }
}

fn registry() -> ModelRegistry {
    let user = Model::builder()
        .field("name", FieldDefinition::string().embeddable())
        .field("age", FieldDefinition::int())
        .build()
        .unwrap();
    let post = Model::builder()
        .field("title", FieldDefinition::string())
        .field("user", FieldDefinition::model(&user))
        .build()
        .unwrap();

    ModelRegistry::builder()
        .model("UserModel", user)
        .model("PostModel", post)
        .build()
        .unwrap()
}

async fn connected_blog() -> (Blog<InMemoryStore>, InMemoryStore) {
    let store = InMemoryStore::new();
    let blog = Blog::new(ClientConfig::new(
        InMemoryStoreBuilder::with_store(store.clone()),
        registry(),
    ))
    .unwrap();

    blog.connect().await.unwrap();

    (blog, store)
}

#[tokio::test]
async fn test_blog_scenario() {
    let (blog, _) = connected_blog().await;

    let user = blog.users.create(doc! { "name": "John", "age": 30 }).await.unwrap();
    assert_eq!(user.get_str("name").unwrap(), "John");
    assert_eq!(user.get_i32("age").unwrap(), 30);
    assert!(matches!(user.get("_id"), Some(Bson::ObjectId(_))));

    let post = blog
        .posts
        .create(doc! { "title": "Hello world", "user": { "name": "John" } })
        .await
        .unwrap();
    assert_eq!(post.get_str("title").unwrap(), "Hello world");
    assert_eq!(post.get_document("user").unwrap(), &doc! { "name": "John" });
    assert!(post.get("_id").is_some());

    let with_age = blog
        .posts
        .create(doc! { "title": "Hello again", "user": { "name": "John", "age": 30 } })
        .await;
    assert!(matches!(with_age, Err(DocumentStoreError::InvalidDocument(_))));

    let user_shape = blog.posts.shape().get("user").unwrap();
    match user_shape {
        FieldShape::Embedded(embedded) => {
            assert_eq!(embedded.keys().collect::<Vec<_>>(), ["name"]);
        }
        other => panic!("unexpected shape {other:?}"),
    }
}

#[tokio::test]
async fn test_create_then_find_by_identity() {
    let (blog, _) = connected_blog().await;

    let data = doc! { "name": "Ada", "age": 36 };
    let created = blog.users.create(data.clone()).await.unwrap();

    let mut expected = data;
    expected.insert("_id", created.get("_id").cloned().unwrap());
    assert_eq!(created, expected);

    let found = blog
        .users
        .find_one(Filter::id(created.get("_id").cloned().unwrap()))
        .await
        .unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn test_naming_law() {
    let (blog, _) = connected_blog().await;

    assert_eq!(blog.users.name(), "users");
    assert_eq!(blog.users.model_key(), "UserModel");
    assert_eq!(blog.posts.collection(), "posts");

    assert!(blog.client().delegate("users").is_some());
    assert!(blog.client().delegate("user").is_none());
    assert!(blog.client().delegate("UserModel").is_none());

    assert_eq!(blog.models().keys().copied().collect::<Vec<_>>(), ["Post", "User"]);
}

#[tokio::test]
async fn test_documents_land_in_named_collections() {
    let (blog, store) = connected_blog().await;

    blog.users.create(doc! { "name": "John", "age": 30 }).await.unwrap();
    blog.posts
        .create(doc! { "title": "Hello world", "user": { "name": "John" } })
        .await
        .unwrap();

    assert_eq!(store.count("users").await, 1);
    assert_eq!(store.count("posts").await, 1);
}

#[tokio::test]
async fn test_projection_law() {
    let (blog, _) = connected_blog().await;
    blog.posts
        .create(doc! { "title": "Hello world", "user": { "name": "John" } })
        .await
        .unwrap();

    let selections = [
        Projection::new().include("title"),
        Projection::new().include("user").include("_id"),
        Projection::new().nested("user", Projection::new().include("name")).include("title"),
        Projection::new().nested("user", Projection::new()),
    ];

    for select in selections {
        let found = blog
            .posts
            .find_one(FindOneArgs::new(Filter::all()).select(select.clone()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            found.keys().map(String::as_str).collect::<Vec<_>>(),
            select.keys().collect::<Vec<_>>()
        );
    }

    let nested_empty = blog
        .posts
        .find_one(FindOneArgs::new(Filter::all()).select(Projection::new().nested("user", Projection::new())))
        .await
        .unwrap();
    assert_eq!(nested_empty, Some(doc! { "user": {} }));
}

#[tokio::test]
async fn test_missing_is_distinct_from_empty() {
    let (blog, _) = connected_blog().await;
    blog.users.create(doc! { "name": "John", "age": 30 }).await.unwrap();

    let empty = blog
        .users
        .find_one(FindOneArgs::new(doc! { "name": "John" }).select(Projection::new()))
        .await
        .unwrap();
    assert_eq!(empty, Some(doc! {}));

    let missing = blog
        .users
        .find_one(FindOneArgs::new(doc! { "name": "Jane" }).select(Projection::new()))
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn test_duplicate_identity_is_a_store_error() {
    let (blog, _) = connected_blog().await;
    let id = ObjectId::new();

    blog.users
        .create(doc! { "_id": id, "name": "John", "age": 30 })
        .await
        .unwrap();
    let duplicate = blog
        .users
        .create(doc! { "_id": id, "name": "Johnny", "age": 31 })
        .await;

    assert!(matches!(duplicate, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let blog = Blog::new(ClientConfig::new(InMemoryStore::builder(), registry())).unwrap();

    assert!(matches!(
        blog.users.create(doc! { "name": "John", "age": 30 }).await,
        Err(DocumentStoreError::NotConnected)
    ));

    let results = join_all((0..4).map(|_| blog.connect())).await;
    assert!(results.into_iter().all(|result| result.is_ok()));

    let created = blog.users.create(doc! { "name": "John", "age": 30 }).await.unwrap();
    let found = blog.users.find_one(Filter::id(created.get("_id").cloned().unwrap())).await.unwrap();
    assert_eq!(found, Some(created));

    blog.close().await.unwrap();

    assert!(matches!(
        blog.posts.find_one(Filter::all()).await,
        Err(DocumentStoreError::Closed)
    ));
}

#[tokio::test]
async fn test_missing_model_fails_construction() {
    let registry = ModelRegistry::builder()
        .model(
            "UserModel",
            Model::builder().field("name", FieldDefinition::string()).build().unwrap(),
        )
        .build()
        .unwrap();

    let result = Blog::new(ClientConfig::new(InMemoryStore::builder(), registry));

    assert!(matches!(result, Err(DocumentStoreError::Schema(_))));
}

#[tokio::test]
async fn test_json_declared_cyclic_models() {
    let author = Model::from_json(json!({
        "name": { "type": "STRING", "embeddable": true },
        "latest": { "type": "PostModel", "embeddable": true },
    }))
    .unwrap();
    let post = Model::from_json(json!({
        "title": { "type": "STRING", "embeddable": true },
        "author": { "type": "UserModel" },
    }))
    .unwrap();

    let registry = ModelRegistry::builder()
        .model("UserModel", author.clone())
        .model("PostModel", post.clone())
        .build()
        .unwrap();
    let client = Client::new(ClientConfig::new(InMemoryStore::builder(), registry));
    client.connect().await.unwrap();

    let posts = client.delegate("posts").unwrap();
    let created = posts
        .create(doc! {
            "title": "Cycles",
            "author": { "name": "Ada", "latest": { "title": "Cycles", "author": "opaque" } },
        })
        .await
        .unwrap();
    assert!(created.get("_id").is_some());

    let rejecting = ModelRegistry::builder()
        .model("UserModel", author)
        .model("PostModel", post)
        .cycle_policy(CyclePolicy::Reject)
        .build();
    assert!(matches!(rejecting, Err(DocumentStoreError::Schema(_))));
}
