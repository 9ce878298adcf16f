//! Filter evaluation for in-memory documents.
//!
//! Matching follows MongoDB's query semantics so both backends agree on `find_one`:
//!
//! - Field names are dotted paths into embedded documents.
//! - A missing field satisfies only the negative operators (`Ne`, `NotContains`, `NoneOf`)
//!   and `Exists(_, false)`.
//! - An operator applied to an array field matches when the whole array or any element
//!   matches; the negative operators require that no element matches.
//! - Integers compare exactly; mixed integer and float comparisons go through `f64`.
//! - Sub-document equality is key-order sensitive.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::cmp::Ordering;

use odmlayer_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Integer(a), Comparable::Integer(b)) => a == b,
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64) == *b,
            (Comparable::Number(a), Comparable::Integer(b)) => *a == (*b as f64),
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Integer(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path (`"user.name"`) inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Applies `predicate` to the value itself and, for arrays, to each element.
fn any_value<'a>(value: &Comparable<'a>, predicate: impl Fn(&Comparable<'a>) -> bool) -> bool {
    predicate(value)
        || matches!(value, Comparable::Array(items) if items.iter().any(|item| predicate(item)))
}

fn in_values<'a>(value: &Comparable<'a>, candidates: &Comparable<'a>) -> bool {
    match candidates {
        Comparable::Array(values) => values.iter().any(|candidate| any_value(value, |v| v == candidate)),
        single => any_value(value, |v| v == single),
    }
}

fn string_test<'a>(value: &Comparable<'a>, operand: &Comparable<'a>, test: impl Fn(&str, &str) -> bool) -> bool {
    match operand {
        Comparable::String(needle) => {
            any_value(value, |v| matches!(v, Comparable::String(hay) if test(*hay, *needle)))
        }
        _ => false,
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<bool, DocumentStoreError> {
        self.visit_expr(expr)
    }

    /// Returns `true` if `document` satisfies `expr`.
    pub fn matches(document: &'a Document, expr: &Expr) -> Result<bool, DocumentStoreError> {
        DocumentEvaluator::new(document).evaluate(expr)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = lookup(self.document, field) else {
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        let ordered = |accept: fn(Ordering) -> bool| {
            any_value(&left, |v| v.partial_cmp(&right).is_some_and(accept))
        };

        Ok(match op {
            FieldOp::Eq => any_value(&left, |v| *v == right),
            FieldOp::Ne => !any_value(&left, |v| *v == right),
            FieldOp::Gt => ordered(Ordering::is_gt),
            FieldOp::Gte => ordered(Ordering::is_ge),
            FieldOp::Lt => ordered(Ordering::is_lt),
            FieldOp::Lte => ordered(Ordering::is_le),
            FieldOp::Contains => match &right {
                Comparable::String(_) => string_test(&left, &right, |hay, needle| hay.contains(needle)),
                item => matches!(&left, Comparable::Array(items) if items.contains(item)),
            },
            FieldOp::NotContains => match &right {
                Comparable::String(_) => !string_test(&left, &right, |hay, needle| hay.contains(needle)),
                item => !matches!(&left, Comparable::Array(items) if items.contains(item)),
            },
            FieldOp::StartsWith => string_test(&left, &right, |hay, needle| hay.starts_with(needle)),
            FieldOp::EndsWith => string_test(&left, &right, |hay, needle| hay.ends_with(needle)),
            FieldOp::AnyOf => in_values(&left, &right),
            FieldOp::NoneOf => !in_values(&left, &right),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use odmlayer_core::query::Filter;

    fn post() -> Document {
        doc! {
            "_id": ObjectId::parse_str("65f1c0ffee0000000000beef").unwrap(),
            "title": "Hello world",
            "views": 12,
            "tags": ["rust", "odm"],
            "user": { "name": "John" },
        }
    }

    fn check(expr: Expr) -> bool {
        DocumentEvaluator::matches(&post(), &expr).unwrap()
    }

    #[test]
    fn test_dotted_paths() {
        assert!(check(Filter::eq("user.name", "John")));
        assert!(!check(Filter::eq("user.name", "Jane")));
        assert!(!check(Filter::eq("title.length", 11)));
        assert!(check(Filter::exists("user.name")));
        assert!(check(Filter::not_exists("user.email")));
    }

    #[test]
    fn test_identity_and_numbers() {
        let id = ObjectId::parse_str("65f1c0ffee0000000000beef").unwrap();

        assert!(check(Filter::id(id)));
        assert!(!check(Filter::id(ObjectId::new())));
        assert!(check(Filter::eq("views", 12.0)));
        assert!(check(Filter::gte("views", 12)));
        assert!(!check(Filter::gt("views", 12)));
    }

    #[test]
    fn test_strings_and_arrays() {
        assert!(check(Filter::starts_with("title", "Hello")));
        assert!(check(Filter::contains("tags", "rust")));
        assert!(check(Filter::any_of("tags", vec!["go", "odm"])));
        assert!(check(Filter::none_of("tags", vec!["go", "java"])));
    }

    #[test]
    fn test_logical_identities() {
        assert!(check(Filter::all()));
        assert!(!check(Filter::or(Vec::new())));
        assert!(check(Filter::eq("views", 1).or(Filter::eq("title", "Hello world"))));
        assert!(check(Filter::eq("views", 1).not()));
    }

    #[test]
    fn test_missing_paths_satisfy_only_negative_operators() {
        assert!(check(Filter::ne("user.email", "john@example.com")));
        assert!(check(Filter::not_contains("user.email", "@")));
        assert!(check(Filter::none_of("user.email", vec!["john@example.com"])));

        assert!(!check(Filter::eq("user.email", "john@example.com")));
        assert!(!check(Filter::lt("user.age", 100)));
        assert!(!check(Filter::contains("user.email", "@")));
        assert!(!check(Filter::any_of("user.email", vec!["john@example.com"])));
    }

    #[test]
    fn test_empty_sub_document_matches_ne() {
        let node = doc! { "label": "root", "parent": {} };

        assert!(DocumentEvaluator::matches(&node, &Filter::ne("parent.label", "x")).unwrap());
        assert!(!DocumentEvaluator::matches(&node, &Filter::eq("parent.label", "x")).unwrap());
    }

    #[test]
    fn test_array_fields_match_any_element() {
        assert!(check(Filter::eq("tags", "odm")));
        assert!(!check(Filter::ne("tags", "odm")));
        assert!(check(Filter::contains("tags", "us")));
        assert!(!check(Filter::not_contains("tags", "us")));
        assert!(check(Filter::starts_with("tags", "od")));
        assert!(check(Filter::none_of("tags", "go")));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let document = doc! { "counter": 9_007_199_254_740_993_i64 };

        assert!(!DocumentEvaluator::matches(&document, &Filter::eq("counter", 9_007_199_254_740_992_i64)).unwrap());
        assert!(DocumentEvaluator::matches(&document, &Filter::gt("counter", 9_007_199_254_740_992_i64)).unwrap());
    }

    #[test]
    fn test_sub_document_equality_is_order_sensitive() {
        let document = doc! { "user": { "name": "John", "age": 30 } };

        assert!(DocumentEvaluator::matches(&document, &Filter::eq("user", doc! { "name": "John", "age": 30 })).unwrap());
        assert!(!DocumentEvaluator::matches(&document, &Filter::eq("user", doc! { "age": 30, "name": "John" })).unwrap());
    }
}
