//! Derivation of document shapes from model declarations.
//!
//! A [`DocumentShape`] is the runtime description of the documents a model stores and returns.
//! Primitive fields become scalars. A field whose type is another model becomes an embedded
//! sub-document restricted to that model's `embeddable` fields, without an identity field.
//!
//! Derivation walks model references depth first and keeps the models on the current path. A
//! model met again on its own path is not expanded: the field becomes [`FieldShape::Opaque`] and
//! the field path is reported in [`Derivation::cycles`], so derivation always terminates.

use bson::{Bson, Document};
use std::collections::HashMap;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{FieldType, IDENTITY_FIELD, Model, ModelId, ModelRef, PrimitiveType},
};

/// Resolves named model references (`"<Name>Model"` keys) to model instances.
pub trait ModelResolver {
    fn resolve(&self, key: &str) -> Option<&Model>;
}

impl ModelResolver for HashMap<String, Model> {
    fn resolve(&self, key: &str) -> Option<&Model> {
        self.get(key)
    }
}

/// The derived shape of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// A native scalar value.
    Scalar(PrimitiveType),
    /// An embedded sub-document.
    Embedded(DocumentShape),
    /// A truncated reference cycle; any value is accepted.
    Opaque,
}

/// The derived shape of a document: an ordered list of field shapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentShape {
    fields: Vec<(String, FieldShape)>,
}

/// Result of deriving a model's shape.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub shape: DocumentShape,
    /// Dotted field paths at which a reference cycle was truncated.
    pub cycles: Vec<String>,
}

/// Result of looking a dotted path up in a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathTarget<'a> {
    Identity,
    Field(&'a FieldShape),
    /// The path continues below an opaque field and cannot be checked.
    Unchecked,
}

struct DeriveContext<'r> {
    resolver: &'r dyn ModelResolver,
    path: Vec<ModelId>,
    cycles: Vec<String>,
}

impl DocumentShape {
    /// Derives the top-level shape of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Schema`] if a named reference cannot be resolved.
    pub fn derive(model: &Model, resolver: &dyn ModelResolver) -> DocumentStoreResult<Derivation> {
        let mut ctx = DeriveContext {
            resolver,
            path: Vec::new(),
            cycles: Vec::new(),
        };
        let shape = Self::derive_model(model, false, "", &mut ctx)?;

        Ok(Derivation {
            shape,
            cycles: ctx.cycles,
        })
    }

    fn derive_model(
        model: &Model,
        embedded: bool,
        prefix: &str,
        ctx: &mut DeriveContext<'_>,
    ) -> DocumentStoreResult<DocumentShape> {
        ctx.path.push(model.id());

        let mut fields = Vec::with_capacity(model.len());

        for (name, definition) in model.fields() {
            if embedded && !definition.embeddable {
                continue;
            }
            if name == IDENTITY_FIELD {
                continue;
            }

            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            };

            let shape = match &definition.ty {
                FieldType::Primitive(primitive) => FieldShape::Scalar(*primitive),
                FieldType::Model(reference) => {
                    let resolver = ctx.resolver;
                    let target = match reference {
                        ModelRef::Direct(target) => target.clone(),
                        ModelRef::Named(key) => resolver.resolve(key).cloned().ok_or_else(|| {
                            DocumentStoreError::Schema(format!(
                                "field `{path}` references unknown model `{key}`"
                            ))
                        })?,
                    };

                    if ctx.path.contains(&target.id()) {
                        ctx.cycles.push(path);
                        FieldShape::Opaque
                    } else {
                        FieldShape::Embedded(Self::derive_model(&target, true, &path, ctx)?)
                    }
                }
            };

            fields.push((name.to_string(), shape));
        }

        ctx.path.pop();

        Ok(DocumentShape { fields })
    }

    /// Returns the field shapes in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldShape)> {
        self.fields
            .iter()
            .map(|(name, shape)| (name.as_str(), shape))
    }

    /// Returns the field names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldShape> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, shape)| shape)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a dotted path (`"user.name"`) in a top-level shape.
    ///
    /// Returns `None` when a segment is absent or when the path continues below a scalar.
    pub fn lookup(&self, path: &str) -> Option<PathTarget<'_>> {
        if path == IDENTITY_FIELD {
            return Some(PathTarget::Identity);
        }

        let mut shape = self;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let field = shape.get(segment)?;

            if segments.peek().is_none() {
                return Some(PathTarget::Field(field));
            }

            match field {
                FieldShape::Embedded(inner) => shape = inner,
                FieldShape::Opaque => return Some(PathTarget::Unchecked),
                FieldShape::Scalar(_) => return None,
            }
        }

        None
    }

    /// Checks that a top-level write payload has exactly the derived shape.
    ///
    /// Every shape field must be present with a value of the derived kind and no other keys
    /// are allowed, except an optional caller-supplied identity field.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] naming the first offending field path.
    pub fn conform(&self, document: &Document) -> DocumentStoreResult<()> {
        self.conform_at(document, "", true)
    }

    fn conform_at(&self, document: &Document, prefix: &str, top_level: bool) -> DocumentStoreResult<()> {
        let path_of = |name: &str| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            }
        };

        for key in document.keys() {
            if top_level && key == IDENTITY_FIELD {
                continue;
            }
            if self.get(key).is_none() {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "unknown field `{}`",
                    path_of(key)
                )));
            }
        }

        for (name, shape) in self.fields() {
            let path = path_of(name);
            let value = document.get(name).ok_or_else(|| {
                DocumentStoreError::InvalidDocument(format!("missing field `{path}`"))
            })?;

            match (shape, value) {
                (FieldShape::Opaque, _) => {}
                (FieldShape::Scalar(primitive), value) if primitive.matches(value) => {}
                (FieldShape::Scalar(primitive), value) => {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "field `{path}` expects {primitive}, got {:?}",
                        value.element_type()
                    )));
                }
                (FieldShape::Embedded(inner), Bson::Document(sub)) => {
                    inner.conform_at(sub, &path, false)?;
                }
                (FieldShape::Embedded(_), value) => {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "field `{path}` expects an embedded document, got {:?}",
                        value.element_type()
                    )));
                }
            }
        }

        Ok(())
    }
}
