//! Main odmlayer crate: a typed object-document mapping layer over JSON document stores.
//!
//! This crate is the primary entry point for users of the odmlayer framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! convenient access to the storage backends.
//!
//! # Features
//!
//! - **Declarative models** - Describe documents with field definitions, in code or as JSON
//! - **Derived document shapes** - Writes are checked against the shape derived from each model
//! - **Projections** - Narrow reads to exactly the fields you select, including nested ones
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use odmlayer::{prelude::*, memory::InMemoryStore, bson::doc};
//!
//! odmlayer::client! {
//!     pub struct Blog {
//!         UserModel,
//!         PostModel,
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let user = Model::builder()
//!         .field("name", FieldDefinition::string().embeddable())
//!         .field("age", FieldDefinition::int())
//!         .build()?;
//!     let post = Model::builder()
//!         .field("title", FieldDefinition::string())
//!         .field("user", FieldDefinition::model(&user))
//!         .build()?;
//!
//!     let registry = ModelRegistry::builder()
//!         .model("UserModel", user)
//!         .model("PostModel", post)
//!         .build()?;
//!
//!     let blog = Blog::new(ClientConfig::new(InMemoryStore::builder(), registry))?;
//!     blog.connect().await?;
//!
//!     blog.posts
//!         .create(doc! { "title": "Hello world", "user": { "name": "John" } })
//!         .await?;
//!
//!     let post = blog.posts
//!         .find_one(
//!             FindOneArgs::new(doc! { "title": "Hello world" })
//!                 .select(Projection::new().include("title").nested("user", Projection::new().include("name"))),
//!         )
//!         .await?;
//!
//!     println!("{post:?}");
//!
//!     blog.close().await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use odmlayer_core::{
    backend, client, config, connection, delegate, error, projection, query, registry, schema, shape,
};
pub use odmlayer_macros::client;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use odmlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use odmlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder, store::DEFAULT_DATABASE};
}
