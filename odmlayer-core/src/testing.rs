//! In-crate test backend that records what delegates send it.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    projection::Projection,
    query::{Expr, FieldOp},
    schema::IDENTITY_FIELD,
};

#[derive(Debug, Default)]
pub(crate) struct RecordingStore {
    pub collections: Mutex<HashMap<String, Vec<Document>>>,
    pub calls: AtomicUsize,
    pub projections: Mutex<Vec<Option<Projection>>>,
    pub fail_inserts: AtomicBool,
    pub shut_down: AtomicBool,
}

impl RecordingStore {
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

// Equality and conjunction only; enough for the delegate tests.
fn matches(expr: &Expr, document: &Document) -> bool {
    match expr {
        Expr::And(exprs) => exprs.iter().all(|expr| matches(expr, document)),
        Expr::Field {
            field,
            op: FieldOp::Eq,
            value,
        } => document.get(field) == Some(value),
        _ => false,
    }
}

#[async_trait]
impl StoreBackend for RecordingStore {
    async fn insert_one(&self, collection: &str, mut document: Document) -> DocumentStoreResult<Bson> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend("insert rejected".to_string()));
        }

        let id = document
            .get(IDENTITY_FIELD)
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
        document.insert(IDENTITY_FIELD, id.clone());

        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
        projection: Option<&Projection>,
    ) -> DocumentStoreResult<Option<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.projections.lock().unwrap().push(projection.cloned());

        Ok(self
            .documents(collection)
            .into_iter()
            .find(|document| matches(filter, document)))
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingBuilder {
    pub builds: Arc<AtomicUsize>,
    pub fail_next: Arc<AtomicBool>,
}

#[async_trait]
impl StoreBackendBuilder for RecordingBuilder {
    type Backend = RecordingStore;

    async fn build(self) -> DocumentStoreResult<RecordingStore> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(DocumentStoreError::Initialization("store unreachable".to_string()));
        }

        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingStore::default())
    }
}
