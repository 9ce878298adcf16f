use async_trait::async_trait;
use bson::{Bson, Document};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOneOptions},
};
use std::time::Duration;
use tracing::trace;

use odmlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::ConnectionConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    projection::Projection,
    query::Expr,
    schema::IDENTITY_FIELD,
};

use crate::query::MongoQueryTranslator;

/// Database used when neither the options nor the URL name one.
pub const DEFAULT_DATABASE: &str = "test";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(config: ConnectionConfig) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(config)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn find_one_options(projection: Option<&Projection>) -> FindOneOptions {
    FindOneOptions::builder()
        .projection(projection.map(Projection::to_store_projection))
        .build()
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let supplied_id = document.get(IDENTITY_FIELD).cloned();

        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| match supplied_id {
                Some(id) if is_duplicate_key(&e) => {
                    DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string())
                }
                _ => DocumentStoreError::Backend(e.to_string()),
            })?;

        trace!(collection, id = %result.inserted_id, "document stored");

        Ok(result.inserted_id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Expr,
        projection: Option<&Projection>,
    ) -> DocumentStoreResult<Option<Document>> {
        let collection = self.get_collection(collection);

        collection
            .find_one(MongoQueryTranslator::translate(filter)?)
            .with_options(find_one_options(projection))
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Opens a [`MongoDbStore`] from a [`ConnectionConfig`].
///
/// The database is taken from `options.database`, then from the URL path, then
/// [`DEFAULT_DATABASE`]. The driver connects lazily, so building does not contact the server
/// unless the URL needs a DNS lookup (`mongodb+srv://`).
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    config: ConnectionConfig,
}

impl MongoDbStoreBuilder {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let ConnectionConfig { url, options } = self.config;

        let mut client_options = ClientOptions::parse(&url)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = options.app_name {
            client_options.app_name = Some(app_name);
        }
        if let Some(timeout) = options.connect_timeout_ms {
            client_options.connect_timeout = Some(Duration::from_millis(timeout));
        }
        if let Some(max_pool_size) = options.max_pool_size {
            client_options.max_pool_size = Some(max_pool_size);
        }

        let database = options
            .database
            .or_else(|| client_options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(MongoDbStore::new(
            Client::with_options(client_options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            database,
        ))
    }
}
