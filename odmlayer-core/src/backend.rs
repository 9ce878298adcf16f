//! Storage backend abstraction.
//!
//! This module defines the boundary between delegates and the document store they forward to.
//! A backend only needs two operations: insert one document and find at most one document.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//! - [`DynStoreBackendBuilder`]: Object-safe, reusable form of a builder, held by a connection
//!
//! # Examples
//!
//! ```ignore
//! use odmlayer::backend::StoreBackend;
//! use odmlayer::query::Filter;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = backend.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
//! let found = backend.find_one("users", &Filter::id(id), None).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, projection::Projection, query::Expr};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. A single backend instance is shared by every delegate of a client.
///
/// # Error Handling
///
/// Backends report their own failures as [`DocumentStoreError`](crate::error::DocumentStoreError);
/// delegates return them unchanged and never retry.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts a document into a collection and returns its identity.
    ///
    /// If the document carries an `_id`, that value is used; otherwise the backend generates
    /// one. The collection is created on first use.
    ///
    /// # Returns
    ///
    /// The inserted identity, or [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// when the identity is taken.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson>;

    /// Finds at most one document matching `filter`.
    ///
    /// Backends may use `projection` to narrow what they return; callers re-apply it, so
    /// returning the whole document is also correct.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when nothing matches.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
        projection: Option<&Projection>,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op, but backends with external connections
    /// should override this.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        (*self)
            .insert_one(collection, document)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
        projection: Option<&Projection>,
    ) -> DocumentStoreResult<Option<Document>> {
        (*self)
            .find_one(collection, filter, projection)
            .await
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        (*self).shutdown().await
    }
}

/// Creates a backend, typically by opening a connection described by configuration.
#[async_trait]
pub trait StoreBackendBuilder: Send {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}

/// A builder that can be invoked through a shared reference, any number of times.
///
/// Implemented for every cloneable [`StoreBackendBuilder`], so a failed connection attempt can
/// be retried with the same configuration.
#[async_trait]
pub trait DynStoreBackendBuilder<B>: Send + Sync + Debug {
    async fn build_boxed(&self) -> DocumentStoreResult<B>;
}

#[async_trait]
impl<T> DynStoreBackendBuilder<T::Backend> for T
where
    T: StoreBackendBuilder + Clone + Sync + Debug + 'static,
{
    async fn build_boxed(&self) -> DocumentStoreResult<T::Backend> {
        self.clone().build().await
    }
}
