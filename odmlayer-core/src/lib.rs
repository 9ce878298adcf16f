//! A typed object-document mapping layer over JSON document stores.
//!
//! This crate is the core of the odmlayer project and provides:
//!
//! - **Schema model** ([`schema`]) - Models, field definitions and primitive field types
//! - **Model registry** ([`registry`]) - The `<Name>Model` naming convention and validated model sets
//! - **Document shapes** ([`shape`]) - The document structure derived from a model, used to validate writes
//! - **Projections** ([`projection`]) - Field selections and how they narrow read results
//! - **Query and filtering API** ([`query`]) - Filter expressions for the `where` clause of reads
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Connections** ([`connection`]) - The lazily opened connection shared by all delegates
//! - **Delegates** ([`delegate`]) - Per-model `create` and `find_one` operations
//! - **Client** ([`client`]) - One delegate per registered model over a single connection
//! - **Configuration** ([`config`]) - Connection settings from code, JSON or the environment
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use odmlayer::{client::Client, config::ClientConfig, registry::ModelRegistry, schema::{FieldDefinition, Model}};
//! use bson::doc;
//!
//! let user = Model::builder()
//!     .field("name", FieldDefinition::string().embeddable())
//!     .field("age", FieldDefinition::int())
//!     .build()?;
//!
//! let registry = ModelRegistry::builder().model("UserModel", user).build()?;
//! let client = Client::new(ClientConfig::new(builder, registry));
//!
//! client.connect().await?;
//! client.delegate("users").unwrap().create(doc! { "name": "John", "age": 30 }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_core;

pub mod backend;
pub mod client;
pub mod config;
pub mod connection;
pub mod delegate;
pub mod error;
pub mod projection;
pub mod query;
pub mod registry;
pub mod schema;
pub mod shape;

#[cfg(test)]
mod testing;
