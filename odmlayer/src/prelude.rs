//! Convenient re-exports of commonly used types from odmlayer.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use odmlayer::prelude::*;
//! ```

pub use odmlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    client::Client,
    config::{ClientConfig, ConnectionConfig, ConnectionOptions},
    delegate::{Delegate, FindOneArgs},
    error::{DocumentStoreError, DocumentStoreResult},
    projection::{Projection, Selection},
    query::{Expr, FieldOp, Filter, QueryVisitor},
    registry::{CyclePolicy, ModelRegistry},
    schema::{FieldDefinition, FieldType, Model, PrimitiveType},
    shape::{DocumentShape, FieldShape},
};
