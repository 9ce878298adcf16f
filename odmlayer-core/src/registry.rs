//! The validated set of models a client is built from.
//!
//! Models are registered under keys following the `"<Name>Model"` convention. Each key maps to
//! a delegate named `lowercase(Name) + "s"` and, unless overridden, to a collection of the same
//! name. Building the registry resolves named references and derives every document shape, so
//! a malformed schema fails here, before any I/O.

use std::{collections::HashMap, sync::Arc};
use tracing::warn;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::Model,
    shape::{DocumentShape, ModelResolver},
};

/// Suffix every registry key must carry.
pub const MODEL_SUFFIX: &str = "Model";

/// Returns the model name of a registry key (`"UserModel"` -> `"User"`).
///
/// # Errors
///
/// Returns [`DocumentStoreError::Schema`] unless the key is `"<Name>Model"` with a non-empty
/// `Name` that starts with an ASCII letter and otherwise contains only ASCII letters, digits
/// and underscores.
pub fn model_name(key: &str) -> DocumentStoreResult<&str> {
    let invalid = || {
        DocumentStoreError::Schema(format!(
            "model key `{key}` does not follow the `<Name>{MODEL_SUFFIX}` convention"
        ))
    };

    let name = key.strip_suffix(MODEL_SUFFIX).ok_or_else(invalid)?;
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Err(invalid()),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }

    Ok(name)
}

/// Returns the delegate accessor name of a registry key (`"UserModel"` -> `"users"`).
pub fn delegate_name(key: &str) -> DocumentStoreResult<String> {
    Ok(format!("{}s", model_name(key)?.to_lowercase()))
}

/// What to do when a reference cycle is found while deriving shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Replace the revisited field with an opaque placeholder and log a warning.
    #[default]
    Truncate,
    /// Fail registry construction with a schema error.
    Reject,
}

/// A model together with the names and shape derived from its registry key.
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    key: String,
    delegate_name: String,
    collection: String,
    model: Model,
    shape: Arc<DocumentShape>,
}

impl RegisteredModel {
    /// The registry key, e.g. `"UserModel"`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The model name, e.g. `"User"`.
    pub fn name(&self) -> &str {
        &self.key[..self.key.len() - MODEL_SUFFIX.len()]
    }

    /// The delegate accessor name, e.g. `"users"`.
    pub fn delegate_name(&self) -> &str {
        &self.delegate_name
    }

    /// The backing collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn shape(&self) -> &Arc<DocumentShape> {
        &self.shape
    }
}

/// An immutable, validated set of registered models.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<RegisteredModel>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Looks a model up by registry key.
    pub fn get(&self, key: &str) -> Option<&RegisteredModel> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Looks a model up by model name (key without the `Model` suffix).
    pub fn by_name(&self, name: &str) -> Option<&RegisteredModel> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Returns the registered models in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct KeyResolver<'a> {
    models: HashMap<&'a str, &'a Model>,
}

impl ModelResolver for KeyResolver<'_> {
    fn resolve(&self, key: &str) -> Option<&Model> {
        self.models.get(key).copied()
    }
}

/// Builder for [`ModelRegistry`].
#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    models: Vec<(String, Model, Option<String>)>,
    cycle_policy: CyclePolicy,
}

impl ModelRegistryBuilder {
    /// Registers a model under `key`, stored in the collection named after its delegate.
    pub fn model(mut self, key: impl Into<String>, model: Model) -> Self {
        self.models.push((key.into(), model, None));
        self
    }

    /// Registers a model under `key`, stored in `collection`.
    pub fn model_in(
        mut self,
        key: impl Into<String>,
        model: Model,
        collection: impl Into<String>,
    ) -> Self {
        self.models.push((key.into(), model, Some(collection.into())));
        self
    }

    /// Sets how reference cycles are handled. Defaults to [`CyclePolicy::Truncate`].
    pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Validates keys and names, resolves references and derives every shape.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Schema`] for malformed or duplicate keys, colliding
    /// delegate names, invalid collection names, unresolvable references, or any reference
    /// cycle under [`CyclePolicy::Reject`].
    pub fn build(self) -> DocumentStoreResult<ModelRegistry> {
        let mut names: Vec<(&str, String)> = Vec::with_capacity(self.models.len());

        for (key, _, collection) in &self.models {
            let delegate = delegate_name(key)?;

            if names.iter().any(|(other, _)| *other == key.as_str()) {
                return Err(DocumentStoreError::Schema(format!(
                    "model key `{key}` is registered more than once"
                )));
            }
            if let Some((other, _)) = names.iter().find(|(_, name)| *name == delegate) {
                return Err(DocumentStoreError::Schema(format!(
                    "model keys `{other}` and `{key}` both map to delegate `{delegate}`"
                )));
            }
            if let Some(collection) = collection {
                if collection.is_empty() || collection.starts_with('$') || collection.contains('\0') {
                    return Err(DocumentStoreError::Schema(format!(
                        "invalid collection name `{collection}` for model `{key}`"
                    )));
                }
            }

            names.push((key.as_str(), delegate));
        }

        let resolver = KeyResolver {
            models: self
                .models
                .iter()
                .map(|(key, model, _)| (key.as_str(), model))
                .collect(),
        };

        let mut entries = Vec::with_capacity(self.models.len());

        for ((key, model, collection), (_, delegate)) in self.models.iter().zip(names) {
            let derivation = DocumentShape::derive(model, &resolver)?;

            for path in &derivation.cycles {
                match self.cycle_policy {
                    CyclePolicy::Truncate => {
                        warn!(model = %key, field = %path, "reference cycle truncated to an opaque field");
                    }
                    CyclePolicy::Reject => {
                        return Err(DocumentStoreError::Schema(format!(
                            "model `{key}` has a reference cycle at `{path}`"
                        )));
                    }
                }
            }

            entries.push(RegisteredModel {
                key: key.clone(),
                collection: collection.clone().unwrap_or_else(|| delegate.clone()),
                delegate_name: delegate,
                model: model.clone(),
                shape: Arc::new(derivation.shape),
            });
        }

        Ok(ModelRegistry { entries })
    }
}
