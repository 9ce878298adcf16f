//! Field selection for delegate reads.
//!
//! A [`Projection`] names the fields a read should return. Each selected field is either
//! included whole or, when it holds an embedded document, narrowed by a nested projection.
//!
//! ```ignore
//! use odmlayer::projection::Projection;
//!
//! let select = Projection::new()
//!     .include("title")
//!     .nested("user", Projection::new().include("name"));
//! ```
//!
//! The result of [`Projection::apply`] has exactly the projection's keys, no matter which keys
//! the stored document has. An empty projection yields an empty document.

use bson::{Bson, Document};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::IDENTITY_FIELD,
    shape::{DocumentShape, FieldShape},
};

/// What to return for one selected field.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The whole field value.
    Include,
    /// The embedded document narrowed by a nested projection.
    Nested(Projection),
}

/// An ordered field selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    fields: Vec<(String, Selection)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the whole value of `field`.
    pub fn include(self, field: impl Into<String>) -> Self {
        self.select(field, Selection::Include)
    }

    /// Selects `field` narrowed by `projection`.
    pub fn nested(self, field: impl Into<String>, projection: Projection) -> Self {
        self.select(field, Selection::Nested(projection))
    }

    /// Selects `field`, replacing any earlier selection of the same field.
    pub fn select(mut self, field: impl Into<String>, selection: Selection) -> Self {
        let field = field.into();

        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = selection,
            None => self.fields.push((field, selection)),
        }

        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Selection)> {
        self.fields
            .iter()
            .map(|(name, selection)| (name.as_str(), selection))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks this projection against a top-level document shape.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] when a key is not part of the shape, or when
    /// a nested projection targets a field that is not an embedded document.
    pub fn validate(&self, shape: &DocumentShape) -> DocumentStoreResult<()> {
        self.validate_at(shape, "", true)
    }

    fn validate_at(&self, shape: &DocumentShape, prefix: &str, top_level: bool) -> DocumentStoreResult<()> {
        for (name, selection) in self.fields() {
            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            };

            if top_level && name == IDENTITY_FIELD {
                if let Selection::Nested(_) = selection {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "cannot nest a projection into `{IDENTITY_FIELD}`"
                    )));
                }
                continue;
            }

            let field = shape.get(name).ok_or_else(|| {
                DocumentStoreError::InvalidQuery(format!(
                    "projected field `{path}` is not part of the document shape"
                ))
            })?;

            match (selection, field) {
                (Selection::Include, _) => {}
                (Selection::Nested(inner), FieldShape::Embedded(embedded)) => {
                    inner.validate_at(embedded, &path, false)?;
                }
                (Selection::Nested(_), FieldShape::Opaque) => {}
                (Selection::Nested(_), FieldShape::Scalar(primitive)) => {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "cannot nest a projection into `{path}` of type {primitive}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Narrows `document` to the selected fields.
    ///
    /// Selected fields missing from `document` come back as `null` so the result keys always
    /// equal the projection keys. A nested selection over a non-document value copies the value.
    pub fn apply(&self, document: &Document) -> Document {
        self.fields
            .iter()
            .map(|(name, selection)| {
                let value = match (selection, document.get(name)) {
                    (_, None) => Bson::Null,
                    (Selection::Include, Some(value)) => value.clone(),
                    (Selection::Nested(inner), Some(Bson::Document(sub))) => {
                        Bson::Document(inner.apply(sub))
                    }
                    (Selection::Nested(_), Some(value)) => value.clone(),
                };

                (name.clone(), value)
            })
            .collect()
    }

    /// Renders this projection as a MongoDB-style projection document with dotted paths.
    ///
    /// The identity field is excluded unless selected, since stores return it by default.
    pub fn to_store_projection(&self) -> Document {
        let mut projection = Document::new();
        self.flatten_into("", &mut projection);

        if !self.fields.iter().any(|(name, _)| name == IDENTITY_FIELD) {
            projection.insert(IDENTITY_FIELD, 0);
        }

        projection
    }

    fn flatten_into(&self, prefix: &str, projection: &mut Document) {
        for (name, selection) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };

            match selection {
                Selection::Nested(inner) if !inner.is_empty() => inner.flatten_into(&path, projection),
                _ => {
                    projection.insert(path, 1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, Model};
    use bson::{doc, oid::ObjectId};
    use std::collections::HashMap;

    fn post_shape() -> DocumentShape {
        let user = Model::builder()
            .field("name", FieldDefinition::string().embeddable())
            .field("age", FieldDefinition::int())
            .build()
            .unwrap();
        let post = Model::builder()
            .field("title", FieldDefinition::string())
            .field("views", FieldDefinition::int())
            .field("user", FieldDefinition::model(&user))
            .build()
            .unwrap();

        DocumentShape::derive(&post, &HashMap::new()).unwrap().shape
    }

    fn stored_post() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "title": "Hello world",
            "views": 12,
            "user": { "name": "John" },
        }
    }

    #[test]
    fn test_result_keys_equal_projection_keys() {
        let projection = Projection::new().include("views").include("title");
        let projected = projection.apply(&stored_post());

        assert_eq!(projected, doc! { "views": 12, "title": "Hello world" });
        assert_eq!(
            projected.keys().map(String::as_str).collect::<Vec<_>>(),
            projection.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_nested_projection_narrows_sub_document() {
        let projection = Projection::new().nested("user", Projection::new().include("name"));

        assert_eq!(
            projection.apply(&stored_post()),
            doc! { "user": { "name": "John" } }
        );
    }

    #[test]
    fn test_empty_projection_yields_empty_document() {
        let projected = Projection::new().apply(&stored_post());
        assert!(projected.is_empty());
    }

    #[test]
    fn test_missing_selected_field_is_null() {
        let projection = Projection::new().include("title").include("views");
        let projected = projection.apply(&doc! { "title": "Draft" });

        assert_eq!(projected, doc! { "title": "Draft", "views": Bson::Null });
    }

    #[test]
    fn test_reselecting_a_field_replaces_it() {
        let projection = Projection::new()
            .include("user")
            .nested("user", Projection::new().include("name"));

        assert_eq!(projection.len(), 1);
        assert!(matches!(projection.fields().next(), Some(("user", Selection::Nested(_)))));
    }

    #[test]
    fn test_validate() {
        let shape = post_shape();

        Projection::new()
            .include("_id")
            .include("title")
            .nested("user", Projection::new().include("name"))
            .validate(&shape)
            .unwrap();

        let invalid = [
            Projection::new().include("body"),
            Projection::new().nested("title", Projection::new().include("length")),
            Projection::new().nested("user", Projection::new().include("age")),
            Projection::new().nested("_id", Projection::new()),
        ];

        for projection in invalid {
            assert!(
                matches!(projection.validate(&shape), Err(DocumentStoreError::InvalidQuery(_))),
                "{projection:?}"
            );
        }
    }

    #[test]
    fn test_store_projection() {
        let projection = Projection::new()
            .include("title")
            .nested("user", Projection::new().include("name"));

        assert_eq!(
            projection.to_store_projection(),
            doc! { "title": 1, "user.name": 1, "_id": 0 }
        );
        assert_eq!(
            Projection::new().include("_id").to_store_projection(),
            doc! { "_id": 1 }
        );
        assert_eq!(Projection::new().to_store_projection(), doc! { "_id": 0 });
    }
}
