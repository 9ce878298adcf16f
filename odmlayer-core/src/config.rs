//! Client and connection configuration.
//!
//! [`ConnectionConfig`] describes where the store lives (`url` plus optional
//! [`ConnectionOptions`]). It can be built in code, deserialized with serde, or read from
//! environment variables:
//!
//! | Variable                        | Field                        |
//! |---------------------------------|------------------------------|
//! | `<PREFIX>_URL`                  | `url` (required)             |
//! | `<PREFIX>_DATABASE`             | `options.database`           |
//! | `<PREFIX>_APP_NAME`             | `options.app_name`           |
//! | `<PREFIX>_CONNECT_TIMEOUT_MS`   | `options.connect_timeout_ms` |
//! | `<PREFIX>_MAX_POOL_SIZE`        | `options.max_pool_size`      |
//!
//! Backend builders take a [`ConnectionConfig`]; a [`ClientConfig`] pairs a builder with the
//! model registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    registry::ModelRegistry,
};

/// Optional connection settings. Backends ignore settings they have no use for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Database name; overrides the one in the URL path.
    #[serde(default)]
    pub database: Option<String>,
    /// Application name reported to the server.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Timeout for establishing a connection, in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Upper bound on pooled connections.
    #[serde(default)]
    pub max_pool_size: Option<u32>,
}

/// Where and how to connect to the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    #[serde(default)]
    pub options: ConnectionOptions,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ConnectionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads `{ "url": ..., "options": { ... } }`.
    pub fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Reads the configuration from `<PREFIX>_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if `<PREFIX>_URL` is unset or a numeric
    /// option does not parse.
    pub fn from_env(prefix: &str) -> DocumentStoreResult<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`ConnectionConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DocumentStoreResult<Self> {
        let var = |name: &str| lookup(&format!("{prefix}_{name}"));

        let url = var("URL").ok_or_else(|| {
            DocumentStoreError::Initialization(format!("{prefix}_URL is not set"))
        })?;

        Ok(Self {
            url,
            options: ConnectionOptions {
                database: var("DATABASE"),
                app_name: var("APP_NAME"),
                connect_timeout_ms: parse_var(prefix, "CONNECT_TIMEOUT_MS", var("CONNECT_TIMEOUT_MS"))?,
                max_pool_size: parse_var(prefix, "MAX_POOL_SIZE", var("MAX_POOL_SIZE"))?,
            },
        })
    }
}

fn parse_var<T: FromStr>(prefix: &str, name: &str, value: Option<String>) -> DocumentStoreResult<Option<T>> {
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                DocumentStoreError::Initialization(format!("{prefix}_{name} has invalid value `{raw}`"))
            })
        })
        .transpose()
}

/// Everything a client is built from: a backend builder and the model registry.
#[derive(Debug)]
pub struct ClientConfig<C> {
    pub connection: C,
    pub models: ModelRegistry,
}

impl<C> ClientConfig<C> {
    pub fn new(connection: C, models: ModelRegistry) -> Self {
        Self { connection, models }
    }
}
