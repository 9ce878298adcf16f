//! In-memory storage implementation for document stores.
//!
//! Documents are kept per collection in insertion order behind an async-aware read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

use odmlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    projection::Projection,
    query::Expr,
    schema::IDENTITY_FIELD,
};

use crate::evaluator::DocumentEvaluator;

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Lookups scan the whole collection (no indexing). This is meant for development and tests;
/// use a persistent backend like MongoDB for real data.
///
/// # Example
///
/// ```ignore
/// use odmlayer_memory::InMemoryStore;
/// use odmlayer::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
///
/// let id = store.insert_one("users", doc! { "name": "Alice", "age": 30 }).await?;
/// let found = store.find_one("users", &Filter::id(id), None).await?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder; the builder is what a client config takes.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> DocumentStoreResult<Bson> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let id = match document.get(IDENTITY_FIELD) {
            Some(id) => id.clone(),
            None => Bson::ObjectId(ObjectId::new()),
        };

        if documents.iter().any(|existing| existing.get(IDENTITY_FIELD) == Some(&id)) {
            return Err(DocumentStoreError::DocumentAlreadyExists(
                id.to_string(),
                collection.to_string(),
            ));
        }

        document.insert(IDENTITY_FIELD, id.clone());
        documents.push(document);

        trace!(collection, %id, "document stored");

        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
        projection: Option<&Projection>,
    ) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(None);
        };

        for document in documents {
            if DocumentEvaluator::matches(document, filter)? {
                return Ok(Some(match projection {
                    Some(projection) => projection.apply(document),
                    None => document.clone(),
                }));
            }
        }

        Ok(None)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// Every build returns a fresh, empty store. Use [`InMemoryStoreBuilder::with_store`] to have
/// the built backend share data with an existing store.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStoreBuilder {
    store: Option<InMemoryStore>,
}

impl InMemoryStoreBuilder {
    /// Builds backends that share `store`'s data.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { store: Some(store) }
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(self.store.unwrap_or_default())
    }
}
