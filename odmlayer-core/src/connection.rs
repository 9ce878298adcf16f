//! The single store connection shared by a client and all of its delegates.
//!
//! A connection moves through `Disconnected -> Connected -> Closed`. Only [`Connection::connect`]
//! opens the backend; it is idempotent, and concurrent callers are serialized on the state lock
//! so they all observe the same backend. Delegate calls made before `connect` are rejected with
//! [`DocumentStoreError::NotConnected`] rather than queued.

use mea::rwlock::RwLock;
use std::{fmt, sync::Arc};
use tracing::{debug, info};

use crate::{
    backend::{DynStoreBackendBuilder, StoreBackend},
    error::{DocumentStoreError, DocumentStoreResult},
};

enum ConnectionState<B> {
    Disconnected,
    Connected(Arc<B>),
    Closed,
}

/// Lazily opened, shared handle to a store backend.
pub struct Connection<B: StoreBackend> {
    builder: Box<dyn DynStoreBackendBuilder<B>>,
    state: RwLock<ConnectionState<B>>,
}

impl<B: StoreBackend> Connection<B> {
    /// Creates a disconnected connection that will be opened with `builder`.
    pub fn new(builder: impl DynStoreBackendBuilder<B> + 'static) -> Self {
        Self {
            builder: Box::new(builder),
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Opens the backend if it is not open yet.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Closed`] after [`Connection::close`], or whatever the
    /// builder reports. A failed attempt leaves the connection disconnected, so it can be retried.
    pub async fn connect(&self) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;

        match &*state {
            ConnectionState::Connected(_) => {
                debug!("connection already established");
                return Ok(());
            }
            ConnectionState::Closed => return Err(DocumentStoreError::Closed),
            ConnectionState::Disconnected => {}
        }

        let backend = self.builder.build_boxed().await?;
        *state = ConnectionState::Connected(Arc::new(backend));

        info!("connected to document store");

        Ok(())
    }

    /// Returns the open backend.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NotConnected`] before [`Connection::connect`] and
    /// [`DocumentStoreError::Closed`] after [`Connection::close`].
    pub async fn backend(&self) -> DocumentStoreResult<Arc<B>> {
        match &*self.state.read().await {
            ConnectionState::Connected(backend) => Ok(Arc::clone(backend)),
            ConnectionState::Disconnected => Err(DocumentStoreError::NotConnected),
            ConnectionState::Closed => Err(DocumentStoreError::Closed),
        }
    }

    pub async fn is_connected(&self) -> bool {
        matches!(&*self.state.read().await, ConnectionState::Connected(_))
    }

    /// Shuts the backend down and moves to the closed state. Closing twice is a no-op.
    ///
    /// Calls already holding the backend finish normally; new calls fail with
    /// [`DocumentStoreError::Closed`].
    pub async fn close(&self) -> DocumentStoreResult<()> {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut *state, ConnectionState::Closed);

        if let ConnectionState::Connected(backend) = previous {
            backend.shutdown().await?;
            info!("document store connection closed");
        }

        Ok(())
    }
}

impl<B: StoreBackend> fmt::Debug for Connection<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}
