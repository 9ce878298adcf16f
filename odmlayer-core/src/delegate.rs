//! Per-model operation handles.
//!
//! A [`Delegate`] is bound to one registered model and the client's shared connection. Every
//! operation validates its input against the model's document shape first and only then
//! touches the store, so malformed calls never cause I/O.

use bson::{Document, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    connection::Connection,
    error::DocumentStoreResult,
    projection::Projection,
    query::Expr,
    registry::RegisteredModel,
    schema::{IDENTITY_FIELD, Model},
    shape::DocumentShape,
};

/// Arguments of [`Delegate::find_one`]: a filter and an optional field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FindOneArgs {
    pub filter: Expr,
    pub select: Option<Projection>,
}

impl FindOneArgs {
    pub fn new(filter: impl Into<Expr>) -> Self {
        Self {
            filter: filter.into(),
            select: None,
        }
    }

    /// Narrows the returned document to `projection`.
    pub fn select(mut self, projection: Projection) -> Self {
        self.select = Some(projection);
        self
    }
}

impl From<Expr> for FindOneArgs {
    fn from(filter: Expr) -> Self {
        Self::new(filter)
    }
}

impl From<Document> for FindOneArgs {
    fn from(filter: Document) -> Self {
        Self::new(filter)
    }
}

/// Create and find operations for a single model.
///
/// Delegates are cheap to clone; clones share the model shape and the connection.
pub struct Delegate<B: StoreBackend> {
    model_key: String,
    name: String,
    collection: String,
    model: Model,
    shape: Arc<DocumentShape>,
    connection: Arc<Connection<B>>,
}

impl<B: StoreBackend> Delegate<B> {
    pub fn new(entry: &RegisteredModel, connection: Arc<Connection<B>>) -> Self {
        Self {
            model_key: entry.key().to_string(),
            name: entry.delegate_name().to_string(),
            collection: entry.collection().to_string(),
            model: entry.model().clone(),
            shape: Arc::clone(entry.shape()),
            connection,
        }
    }

    /// The delegate name, e.g. `"users"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry key of the model, e.g. `"UserModel"`.
    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn shape(&self) -> &DocumentShape {
        &self.shape
    }

    /// Inserts `data` and returns it with the identity the store assigned.
    ///
    /// `data` must have exactly the fields of the model's document shape; an `_id` may be
    /// supplied and is kept. A `null` `_id` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`](crate::error::DocumentStoreError::InvalidDocument)
    /// without touching the store when `data` does not conform, the connection state errors
    /// when not connected, and backend errors unchanged.
    pub async fn create(&self, mut data: Document) -> DocumentStoreResult<Document> {
        if matches!(data.get(IDENTITY_FIELD), Some(bson::Bson::Null)) {
            data.remove(IDENTITY_FIELD);
        }

        self.shape.conform(&data)?;

        let backend = self.connection.backend().await?;

        debug!(delegate = %self.name, collection = %self.collection, "creating document");

        let id = backend
            .insert_one(&self.collection, data.clone())
            .await?;

        data.insert(IDENTITY_FIELD, id);

        Ok(data)
    }

    /// Serializes `data` and inserts it with [`Delegate::create`].
    pub async fn create_from<T: Serialize>(&self, data: &T) -> DocumentStoreResult<Document> {
        self.create(serialize_to_document(data)?).await
    }

    /// Finds at most one document matching the filter.
    ///
    /// Without a selection the whole stored document is returned. With one, the result has
    /// exactly the selected keys. No match is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`](crate::error::DocumentStoreError::InvalidQuery)
    /// without touching the store when the filter or the selection names fields outside the
    /// model's shape.
    pub async fn find_one(&self, args: impl Into<FindOneArgs>) -> DocumentStoreResult<Option<Document>> {
        let args = args.into();

        args.filter.validate(&self.shape)?;
        if let Some(select) = &args.select {
            select.validate(&self.shape)?;
        }

        let backend = self.connection.backend().await?;

        debug!(delegate = %self.name, collection = %self.collection, "finding document");

        let found = backend
            .find_one(&self.collection, &args.filter, args.select.as_ref())
            .await?;

        Ok(found.map(|document| match &args.select {
            Some(select) => select.apply(&document),
            None => document,
        }))
    }

    /// Same as [`Delegate::find_one`], deserializing the result into `T`.
    pub async fn find_one_as<T: DeserializeOwned>(
        &self,
        args: impl Into<FindOneArgs>,
    ) -> DocumentStoreResult<Option<T>> {
        Ok(self
            .find_one(args)
            .await?
            .map(deserialize_from_document)
            .transpose()?)
    }
}

impl<B: StoreBackend> Clone for Delegate<B> {
    fn clone(&self) -> Self {
        Self {
            model_key: self.model_key.clone(),
            name: self.name.clone(),
            collection: self.collection.clone(),
            model: self.model.clone(),
            shape: Arc::clone(&self.shape),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<B: StoreBackend> fmt::Debug for Delegate<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("name", &self.name)
            .field("model_key", &self.model_key)
            .field("collection", &self.collection)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DocumentStoreError,
        query::Filter,
        registry::ModelRegistry,
        schema::FieldDefinition,
        testing::{RecordingBuilder, RecordingStore},
    };
    use bson::{Bson, doc, oid::ObjectId};
    use serde::Deserialize;
    use std::sync::atomic::Ordering;

    struct Fixture {
        connection: Arc<Connection<RecordingStore>>,
        users: Delegate<RecordingStore>,
        posts: Delegate<RecordingStore>,
    }

    impl Fixture {
        async fn store(&self) -> Arc<RecordingStore> {
            self.connection.backend().await.unwrap()
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

    async fn fixture() -> Fixture {
        let registry = registry();
        let connection = Arc::new(Connection::<RecordingStore>::new(RecordingBuilder::default()));
        connection.connect().await.unwrap();

        let delegate = |key: &str| Delegate::new(registry.get(key).unwrap(), Arc::clone(&connection));

        Fixture {
            users: delegate("UserModel"),
            posts: delegate("PostModel"),
            connection,
        }
    }

    #[tokio::test]
    async fn test_create_appends_identity() {
        let fixture = fixture().await;

        let created = fixture
            .users
            .create(doc! { "name": "John", "age": 30 })
            .await
            .unwrap();

        assert_eq!(created.keys().collect::<Vec<_>>(), ["name", "age", "_id"]);
        assert!(matches!(created.get("_id"), Some(Bson::ObjectId(_))));
        assert_eq!(fixture.store().await.documents("users"), vec![created]);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_identity() {
        let fixture = fixture().await;
        let id = ObjectId::new();

        let created = fixture
            .users
            .create(doc! { "_id": id, "name": "John", "age": 30 })
            .await
            .unwrap();

        assert_eq!(created, doc! { "_id": id, "name": "John", "age": 30 });
    }

    #[tokio::test]
    async fn test_create_rejects_without_io() {
        let fixture = fixture().await;

        let invalid = [
            doc! { "name": "John" },
            doc! { "name": "John", "age": "thirty" },
            doc! { "name": "John", "age": 30, "email": "john@example.com" },
        ];

        for data in invalid {
            assert!(matches!(
                fixture.users.create(data).await,
                Err(DocumentStoreError::InvalidDocument(_))
            ));
        }

        let invalid_post = doc! { "title": "Hi", "user": { "name": "John", "age": 30 } };
        assert!(matches!(
            fixture.posts.create(invalid_post).await,
            Err(DocumentStoreError::InvalidDocument(_))
        ));

        assert_eq!(fixture.store().await.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let fixture = fixture().await;
        fixture.store().await.fail_inserts.store(true, Ordering::SeqCst);

        assert!(matches!(
            fixture.users.create(doc! { "name": "John", "age": 30 }).await,
            Err(DocumentStoreError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_find_one_with_selection() {
        let fixture = fixture().await;
        fixture
            .posts
            .create(doc! { "title": "Hello world", "user": { "name": "John" } })
            .await
            .unwrap();

        let select = Projection::new()
            .include("title")
            .nested("user", Projection::new().include("name"));
        let found = fixture
            .posts
            .find_one(FindOneArgs::new(Filter::eq("title", "Hello world")).select(select.clone()))
            .await
            .unwrap();

        assert_eq!(found, Some(doc! { "title": "Hello world", "user": { "name": "John" } }));
        assert_eq!(
            *fixture.store().await.projections.lock().unwrap(),
            vec![Some(select)]
        );
    }

    #[tokio::test]
    async fn test_find_one_without_selection_returns_whole_document() {
        let fixture = fixture().await;
        let created = fixture
            .users
            .create(doc! { "name": "John", "age": 30 })
            .await
            .unwrap();

        let found = fixture.users.find_one(doc! { "name": "John" }).await.unwrap();

        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_find_one_without_match_is_none() {
        let fixture = fixture().await;

        let found = fixture
            .users
            .find_one(FindOneArgs::new(Filter::eq("name", "Nobody")).select(Projection::new()))
            .await
            .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_one_rejects_unknown_fields_without_io() {
        let fixture = fixture().await;

        assert!(matches!(
            fixture.users.find_one(Filter::eq("email", "john@example.com")).await,
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(matches!(
            fixture
                .users
                .find_one(FindOneArgs::new(Filter::all()).select(Projection::new().include("email")))
                .await,
            Err(DocumentStoreError::InvalidQuery(_))
        ));

        assert_eq!(fixture.store().await.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            name: String,
            age: i32,
        }

        let fixture = fixture().await;
        let john = User {
            name: "John".to_string(),
            age: 30,
        };

        fixture.users.create_from(&john).await.unwrap();

        let found: Option<User> = fixture.users.find_one_as(Filter::eq("age", 30)).await.unwrap();
        assert_eq!(found, Some(john));
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let registry = registry();
        let connection = Arc::new(Connection::<RecordingStore>::new(RecordingBuilder::default()));
        let users = Delegate::new(registry.get("UserModel").unwrap(), Arc::clone(&connection));

        assert!(matches!(
            users.create(doc! { "name": "John", "age": 30 }).await,
            Err(DocumentStoreError::NotConnected)
        ));

        connection.connect().await.unwrap();
        connection.close().await.unwrap();

        assert!(matches!(
            users.find_one(Filter::all()).await,
            Err(DocumentStoreError::Closed)
        ));
    }
}
