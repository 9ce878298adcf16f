//! MongoDB backend implementation for odmlayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters are translated to MongoDB queries and projections are pushed down to the server.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! odmlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The backend is opened from a [`ConnectionConfig`](odmlayer_core::config::ConnectionConfig),
//! built in code or read from the environment.
//!
//! # Example
//!
//! ```ignore
//! use odmlayer::{client::Client, config::{ClientConfig, ConnectionConfig}, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = ConnectionConfig::from_env("ODM")?;
//!     let client = Client::new(ClientConfig::new(MongoDbStore::builder(connection), registry));
//!
//!     client.connect().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
