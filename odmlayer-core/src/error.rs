//! Error types and result types for schema, query and store operations.
//!
//! Configuration errors ([`DocumentStoreError::Schema`], [`DocumentStoreError::InvalidQuery`],
//! [`DocumentStoreError::InvalidDocument`]) are raised before any I/O is attempted. Everything a
//! backend reports is surfaced unchanged to the awaiting caller.
//!
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when declaring models or
/// interacting with a document store through a delegate.
///
/// Note that a missing document is not an error: `find_one` returns `Ok(None)`.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A model or registry declaration is malformed (unknown field type, bad field name,
    /// bad registry key, unresolvable or rejected model reference).
    #[error("Schema error: {0}")]
    Schema(String),
    /// A projection or filter does not fit the derived document shape.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// A payload does not conform to the derived document shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given identity already exists in the collection.
    /// The first argument is the identity, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A delegate was used before the client connected.
    #[error("Client is not connected; call connect() first")]
    NotConnected,
    /// The client connection has been closed.
    #[error("Client connection is closed")]
    Closed,
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
