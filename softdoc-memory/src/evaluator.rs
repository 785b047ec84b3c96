//! Query expression evaluation for in-memory document filtering.
//!
//! Missing fields follow the usual document-store rules: `Ne`, `NotContains` and `NoneOf`
//! match them, `Eq` matches them only against `null`, and every other operator fails.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime};

use softdoc_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable representation of BSON values.
///
/// Numeric types are normalised to `f64`. Values without an ordering (object ids,
/// binaries, ...) are kept as-is and only compared for equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Null, _) => Some(Ordering::Less),
            (_, Comparable::Null) => Some(Ordering::Greater),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted field path inside a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates a filter against one stored document.
pub(crate) struct DocumentEvaluator<'a> {
    key: &'a str,
    document: Option<&'a Document>,
}

impl<'a> DocumentEvaluator<'a> {
    /// `key` is the identifier the document is stored under.
    pub fn new(key: &'a str, document: &'a Bson) -> Self {
        Self { key, document: document.as_document() }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Evaluates an optional filter; `None` matches.
    pub fn matches(key: &'a str, document: &'a Bson, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(key, document).evaluate(expr),
            None => Ok(true),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Bson> {
        self.document.and_then(|document| lookup(document, field))
    }
}

fn contains(haystack: &Comparable<'_>, needle: &Comparable<'_>) -> bool {
    match (haystack, needle) {
        (Comparable::Array(array), needle) => array.iter().any(|item| item == needle),
        (Comparable::String(left), Comparable::String(right)) => left.contains(right),
        _ => false,
    }
}

fn any_of(field: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match (field, values) {
        (Comparable::Array(array), Comparable::Array(values)) => values
            .iter()
            .any(|value| array.iter().any(|item| item == value)),
        (Comparable::Array(array), single) => array.iter().any(|item| item == single),
        (single, Comparable::Array(values)) => values.iter().any(|value| value == single),
        _ => false,
    }
}

fn equals(field: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    match (field, value) {
        (Comparable::Array(array), value) if !matches!(value, Comparable::Array(_)) => {
            array.iter().any(|item| item == value)
        }
        (field, value) => field == value,
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
        Ok(self.get(field).is_some() == should_exist)
    }

    fn visit_ids(&mut self, ids: &[bson::Uuid]) -> Result<Self::Output, Self::Error> {
        Ok(ids.iter().any(|id| id.to_string() == self.key))
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        let Some(field_value) = self.get(field) else {
            return Ok(match op {
                FieldOp::Eq => expected == Comparable::Null,
                FieldOp::Ne => expected != Comparable::Null,
                FieldOp::NotContains | FieldOp::NoneOf => true,
                _ => false,
            });
        };
        let actual = Comparable::from(field_value);

        Ok(match op {
            FieldOp::Eq => equals(&actual, &expected),
            FieldOp::Ne => !equals(&actual, &expected),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match (&actual, &expected) {
                    // null only orders against null
                    (Comparable::Null, other) | (other, Comparable::Null)
                        if !matches!(other, Comparable::Null) => false,
                    _ => match actual.partial_cmp(&expected) {
                        Some(ordering) => match op {
                            FieldOp::Gt => ordering == Ordering::Greater,
                            FieldOp::Gte => ordering != Ordering::Less,
                            FieldOp::Lt => ordering == Ordering::Less,
                            _ => ordering != Ordering::Greater,
                        },
                        None => false,
                    },
                }
            }
            FieldOp::Contains => contains(&actual, &expected),
            FieldOp::NotContains => !contains(&actual, &expected),
            FieldOp::StartsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_of(&actual, &expected),
            FieldOp::NoneOf => !any_of(&actual, &expected),
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use softdoc_core::query::Filter;

    use super::*;

    fn eval(document: Bson, expr: Expr) -> bool {
        DocumentEvaluator::new("key", &document).evaluate(&expr).unwrap()
    }

    #[test]
    fn ne_matches_missing_fields() {
        let legacy = Bson::Document(doc! { "name": "Han" });

        assert!(eval(legacy.clone(), Filter::ne("deleted", true)));
        assert!(!eval(legacy.clone(), Filter::eq("deleted", false)));
        assert!(eval(legacy.clone(), Filter::eq("deleted", Bson::Null)));
        assert!(!eval(legacy, Filter::ne("deleted", Bson::Null)));
    }

    #[test]
    fn dotted_paths_reach_nested_documents() {
        let document = Bson::Document(doc! { "ship": { "name": "Falcon", "crew": 4 } });

        assert!(eval(document.clone(), Filter::eq("ship.name", "Falcon")));
        assert!(eval(document.clone(), Filter::gt("ship.crew", 3)));
        assert!(!eval(document, Filter::exists("ship.hull")));
    }

    #[test]
    fn object_ids_compare_by_value() {
        let actor = ObjectId::new();
        let document = Bson::Document(doc! { "deletedBy": actor });

        assert!(eval(document.clone(), Filter::eq("deletedBy", actor)));
        assert!(!eval(document, Filter::eq("deletedBy", ObjectId::new())));
    }

    #[test]
    fn ids_match_the_storage_key() {
        let id = bson::Uuid::new();
        let document = Bson::Document(doc! {});

        assert!(DocumentEvaluator::new(&id.to_string(), &document).evaluate(&Filter::id(id)).unwrap());
        assert!(!DocumentEvaluator::new("other", &document).evaluate(&Filter::id(id)).unwrap());
    }

    #[test]
    fn scalar_equality_matches_array_members() {
        let document = Bson::Document(doc! { "tags": ["jedi", "pilot"] });

        assert!(eval(document.clone(), Filter::eq("tags", "jedi")));
        assert!(eval(document.clone(), Filter::any_of("tags", vec!["sith", "pilot"])));
        assert!(eval(document, Filter::none_of("tags", vec!["sith"])));
    }

    #[test]
    fn empty_conjunction_matches_and_empty_disjunction_does_not() {
        let document = Bson::Document(doc! { "name": "Han" });

        assert!(eval(document.clone(), Expr::And(vec![])));
        assert!(!eval(document, Expr::Or(vec![])));
    }
}
