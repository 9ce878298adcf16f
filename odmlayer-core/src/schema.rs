//! Model declarations.
//!
//! A [`Model`] is an immutable, ordered set of named [`FieldDefinition`]s. It is the single
//! source of truth for the shape of the documents a delegate writes and reads; see
//! [`crate::shape`] for how that shape is derived.
//!
//! Models can be declared in code:
//!
//! ```ignore
//! use odmlayer::schema::{Model, FieldDefinition};
//!
//! let user = Model::builder()
//!     .field("name", FieldDefinition::string().embeddable())
//!     .field("age", FieldDefinition::int())
//!     .build()?;
//!
//! let post = Model::builder()
//!     .field("title", FieldDefinition::string())
//!     .field("user", FieldDefinition::model(&user))
//!     .build()?;
//! ```
//!
//! or from a JSON description, where a `type` that is not a primitive tag names another
//! registered model:
//!
//! ```ignore
//! let post = Model::from_json(serde_json::json!({
//!     "title": { "type": "STRING" },
//!     "user": { "type": "UserModel" },
//! }))?;
//! ```

use bson::Bson;
use serde::Deserialize;
use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    registry::model_name,
};

/// Name of the store-generated identity field carried by every top-level document.
pub const IDENTITY_FIELD: &str = "_id";

/// Scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// UTF-8 string.
    String,
    /// 32 or 64 bit signed integer.
    Int,
    /// Double precision float. Integers are accepted as well.
    Float,
    /// Boolean.
    Bool,
}

impl PrimitiveType {
    /// Returns the tag used for this type in JSON model declarations.
    pub fn tag(&self) -> &'static str {
        match self {
            PrimitiveType::String => "STRING",
            PrimitiveType::Int => "INT",
            PrimitiveType::Float => "FLOAT",
            PrimitiveType::Bool => "BOOL",
        }
    }

    /// Parses a declaration tag, returning `None` for anything that is not a primitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "STRING" => Some(PrimitiveType::String),
            "INT" => Some(PrimitiveType::Int),
            "FLOAT" => Some(PrimitiveType::Float),
            "BOOL" => Some(PrimitiveType::Bool),
            _ => None,
        }
    }

    /// Returns `true` if the BSON value is a native value of this type.
    pub fn matches(&self, value: &Bson) -> bool {
        match (self, value) {
            (PrimitiveType::String, Bson::String(_)) => true,
            (PrimitiveType::Int, Bson::Int32(_) | Bson::Int64(_)) => true,
            (PrimitiveType::Float, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)) => true,
            (PrimitiveType::Bool, Bson::Boolean(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A reference from a field to another model.
#[derive(Debug, Clone)]
pub enum ModelRef {
    /// A model instance declared earlier.
    Direct(Model),
    /// A registry key (`"<Name>Model"`) resolved when the registry is built.
    ///
    /// Named references are the only way to express self references and cycles.
    Named(String),
}

/// The type of a field: a scalar or another model.
#[derive(Debug, Clone)]
pub enum FieldType {
    Primitive(PrimitiveType),
    Model(ModelRef),
}

/// One entry of a model declaration.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// The field's type.
    pub ty: FieldType,
    /// Whether the field is kept when the owning model is embedded in another model.
    pub embeddable: bool,
}

impl FieldDefinition {
    pub fn new(ty: FieldType) -> Self {
        Self { ty, embeddable: false }
    }

    pub fn primitive(ty: PrimitiveType) -> Self {
        Self::new(FieldType::Primitive(ty))
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveType::Int)
    }

    pub fn float() -> Self {
        Self::primitive(PrimitiveType::Float)
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveType::Bool)
    }

    /// A field holding an embedded sub-document of `model`.
    pub fn model(model: &Model) -> Self {
        Self::new(FieldType::Model(ModelRef::Direct(model.clone())))
    }

    /// A field holding an embedded sub-document of the model registered under `key`.
    pub fn reference(key: impl Into<String>) -> Self {
        Self::new(FieldType::Model(ModelRef::Named(key.into())))
    }

    /// Marks this field as kept when its owning model is embedded elsewhere.
    pub fn embeddable(mut self) -> Self {
        self.embeddable = true;
        self
    }
}

/// Stable identity of a [`Model`] instance, used to detect reference cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

#[derive(Debug)]
struct ModelInner {
    fields: Vec<(String, FieldDefinition)>,
}

/// An immutable, ordered mapping from field name to [`FieldDefinition`].
///
/// Cloning a model is cheap and yields the same model (same [`ModelId`]).
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Creates a builder for declaring a model field by field.
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Declares a model from a JSON object of `{ "<field>": { "type": <tag>, "embeddable": <bool> } }`.
    ///
    /// `type` is either a primitive tag (`STRING`, `INT`, `FLOAT`, `BOOL`) or a registry key
    /// following the `"<Name>Model"` convention.
    /// Fields keep the order of the JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Schema`] for a non-object declaration, an unknown type tag,
    /// or a malformed field name.
    pub fn from_json(value: Value) -> DocumentStoreResult<Self> {
        let Value::Object(entries) = value else {
            return Err(DocumentStoreError::Schema(
                "model declaration must be a JSON object".to_string(),
            ));
        };

        let mut builder = Model::builder();

        for (name, raw) in entries {
            let raw: RawField = serde_json::from_value(raw)
                .map_err(|e| DocumentStoreError::Schema(format!("field `{name}`: {e}")))?;

            let ty = match PrimitiveType::from_tag(&raw.ty) {
                Some(primitive) => FieldType::Primitive(primitive),
                None if model_name(&raw.ty).is_ok() => FieldType::Model(ModelRef::Named(raw.ty)),
                None => {
                    return Err(DocumentStoreError::Schema(format!(
                        "field `{name}` has unknown type `{}`",
                        raw.ty
                    )));
                }
            };

            builder = builder.field(
                name,
                FieldDefinition {
                    ty,
                    embeddable: raw.embeddable,
                },
            );
        }

        builder.build()
    }

    /// Returns this model's identity.
    pub fn id(&self) -> ModelId {
        ModelId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Returns the declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.inner
            .fields
            .iter()
            .map(|(name, field)| (name.as_str(), field))
    }

    /// Looks up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.inner
            .fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, definition)| definition)
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.fields.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[derive(Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, alias = "embedeable")]
    embeddable: bool,
}

/// Builder for [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    fields: Vec<(String, FieldDefinition)>,
}

impl ModelBuilder {
    /// Appends a field. Order is preserved in derived document shapes.
    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.push((name.into(), definition));
        self
    }

    /// Validates the field names and builds the model.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Schema`] if a field name is empty, starts with `$`,
    /// contains `.` or a NUL byte, is the reserved identity field, or is declared twice.
    pub fn build(self) -> DocumentStoreResult<Model> {
        for (index, (name, _)) in self.fields.iter().enumerate() {
            validate_field_name(name)?;

            if self.fields[..index].iter().any(|(other, _)| other == name) {
                return Err(DocumentStoreError::Schema(format!(
                    "field `{name}` is declared more than once"
                )));
            }
        }

        Ok(Model {
            inner: Arc::new(ModelInner { fields: self.fields }),
        })
    }
}

fn validate_field_name(name: &str) -> DocumentStoreResult<()> {
    if name.is_empty() {
        return Err(DocumentStoreError::Schema("field name must not be empty".to_string()));
    }
    if name == IDENTITY_FIELD {
        return Err(DocumentStoreError::Schema(format!(
            "`{IDENTITY_FIELD}` is reserved for the store-generated identity"
        )));
    }
    if name.starts_with('$') || name.contains('.') || name.contains('\0') {
        return Err(DocumentStoreError::Schema(format!(
            "field name `{name}` must not start with `$` or contain `.` or NUL"
        )));
    }

    Ok(())
}
