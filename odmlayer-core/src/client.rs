//! The client: one delegate per registered model over one shared connection.
//!
//! ```ignore
//! use odmlayer::{client::Client, config::ClientConfig};
//!
//! let client = Client::new(ClientConfig::new(builder, registry));
//! client.connect().await?;
//!
//! let users = client.delegate("users").unwrap();
//! let created = users.create(doc! { "name": "John", "age": 30 }).await?;
//! ```
//!
//! For field-style access (`db.users.create(..)`) see the `client!` macro of the facade crate.

use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::ClientConfig,
    connection::Connection,
    delegate::Delegate,
    error::{DocumentStoreError, DocumentStoreResult},
    registry::ModelRegistry,
    schema::Model,
};

/// Entry point holding the model registry, the connection and the delegates built over them.
pub struct Client<B: StoreBackend> {
    registry: ModelRegistry,
    connection: Arc<Connection<B>>,
    delegates: Vec<Delegate<B>>,
}

impl<B: StoreBackend + 'static> Client<B> {
    /// Builds a disconnected client. No I/O happens until [`Client::connect`].
    pub fn new<C>(config: ClientConfig<C>) -> Self
    where
        C: StoreBackendBuilder<Backend = B> + Clone + Sync + Debug + 'static,
    {
        let ClientConfig { connection, models } = config;
        let connection = Arc::new(Connection::new(connection));

        let delegates = models
            .entries()
            .map(|entry| Delegate::new(entry, Arc::clone(&connection)))
            .collect();

        Self {
            registry: models,
            connection,
            delegates,
        }
    }

    /// Opens the store connection. Calling it again, or concurrently, is a no-op.
    pub async fn connect(&self) -> DocumentStoreResult<()> {
        self.connection.connect().await
    }

    /// Closes the store connection; later delegate calls fail with
    /// [`DocumentStoreError::Closed`].
    pub async fn close(&self) -> DocumentStoreResult<()> {
        self.connection.close().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Registered models keyed by model name (`"User"` for `"UserModel"`).
    pub fn models(&self) -> BTreeMap<&str, &Model> {
        self.registry
            .entries()
            .map(|entry| (entry.name(), entry.model()))
            .collect()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Looks a delegate up by name (`"users"`).
    pub fn delegate(&self, name: &str) -> Option<&Delegate<B>> {
        self.delegates.iter().find(|delegate| delegate.name() == name)
    }

    /// Looks a delegate up by registry key (`"UserModel"`).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Schema`] when no model is registered under `key`.
    pub fn delegate_for(&self, key: &str) -> DocumentStoreResult<&Delegate<B>> {
        self.delegates
            .iter()
            .find(|delegate| delegate.model_key() == key)
            .ok_or_else(|| DocumentStoreError::Schema(format!("no model registered under `{key}`")))
    }

    /// All delegates in registration order.
    pub fn delegates(&self) -> impl Iterator<Item = &Delegate<B>> {
        self.delegates.iter()
    }
}

impl<B: StoreBackend> std::fmt::Debug for Client<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("registry", &self.registry)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
