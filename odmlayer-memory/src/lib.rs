//! In-memory document storage backend for odmlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Generated identities** - Documents without `_id` get a fresh `ObjectId`
//! - **Full filter support** - Every filter operator, with dotted paths into embedded documents
//!
//! # Quick Start
//!
//! ```ignore
//! use odmlayer::{client::Client, config::ClientConfig, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::new(InMemoryStore::builder(), registry));
//!     client.connect().await?;
//!
//!     let users = client.delegate("users").unwrap();
//!     users.create(doc! { "name": "Alice", "age": 30 }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
