//! Normalisation of the "conditions" argument.
//!
//! Every soft-delete operation takes its conditions as `impl Into<Conditions>`, so callers
//! can pass nothing, a typed [`Expr`], or a query object written as a BSON document:
//!
//! ```ignore
//! pilots.delete(()).await?;
//! pilots.delete(Filter::eq("side", 0)).await?;
//! pilots.delete(doc! { "age": { "$gte": 50 } }).await?;
//! ```

use bson::{Bson, Document};
use tracing::warn;

use crate::query::{Expr, FieldOp, Filter};

/// The normalised conditions of an operation. `None` matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions(Option<Expr>);

impl Conditions {
    /// Conditions that match every document.
    pub fn all() -> Self {
        Conditions(None)
    }

    /// Returns the filter expression, if any.
    pub fn expr(&self) -> Option<&Expr> {
        self.0.as_ref()
    }

    /// Consumes the conditions, returning the filter expression.
    pub fn into_expr(self) -> Option<Expr> {
        self.0
    }
}

impl From<()> for Conditions {
    fn from(_: ()) -> Self {
        Conditions(None)
    }
}

impl From<Expr> for Conditions {
    fn from(expr: Expr) -> Self {
        Conditions(Some(expr))
    }
}

impl From<Option<Expr>> for Conditions {
    fn from(expr: Option<Expr>) -> Self {
        Conditions(expr)
    }
}

impl From<Document> for Conditions {
    fn from(document: Document) -> Self {
        Conditions(parse_document(&document))
    }
}

impl From<&Document> for Conditions {
    fn from(document: &Document) -> Self {
        Conditions(parse_document(document))
    }
}

fn parse_document(document: &Document) -> Option<Expr> {
    let mut exprs = document
        .iter()
        .flat_map(|(key, value)| parse_entry(key, value))
        .collect::<Vec<_>>();

    match exprs.len() {
        0 => None,
        1 => exprs.pop(),
        _ => Some(Expr::And(exprs)),
    }
}

/// An empty `$and` matches every document and an empty `$or` matches none, on every backend.
fn parse_entry(key: &str, value: &Bson) -> Vec<Expr> {
    match (key, value) {
        ("$and", Bson::Array(items)) => vec![Filter::and(parse_clauses(key, items))],
        ("$or", Bson::Array(items)) => vec![Filter::or(parse_clauses(key, items))],
        (field, Bson::Document(ops)) if is_operator_document(ops) => ops
            .iter()
            .map(|(op, operand)| parse_operator(field, op, operand))
            .collect(),
        (field, value) => vec![Filter::eq(field, value.clone())],
    }
}

fn parse_clauses(operator: &str, items: &[Bson]) -> Vec<Expr> {
    if items.is_empty() {
        warn!(operator, "empty logical operator in conditions");
    }

    items
        .iter()
        .filter_map(|item| match item {
            Bson::Document(clause) => Some(parse_document(clause).unwrap_or_else(|| Filter::and(Vec::new()))),
            other => {
                warn!(operator, clause = %other, "ignoring non-document clause in conditions");
                None
            }
        })
        .collect()
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty()
        && document
            .keys()
            .all(|key| operator(key).is_some() || key == "$exists")
}

fn operator(key: &str) -> Option<FieldOp> {
    Some(match key {
        "$eq" => FieldOp::Eq,
        "$ne" => FieldOp::Ne,
        "$gt" => FieldOp::Gt,
        "$gte" => FieldOp::Gte,
        "$lt" => FieldOp::Lt,
        "$lte" => FieldOp::Lte,
        "$in" => FieldOp::AnyOf,
        "$nin" => FieldOp::NoneOf,
        _ => return None,
    })
}

fn parse_operator(field: &str, key: &str, operand: &Bson) -> Expr {
    match (key, operator(key)) {
        ("$exists", _) => Expr::Exists(field.to_string(), truthy(operand)),
        (_, Some(op)) => Expr::field(field.to_string(), op, operand.clone()),
        // is_operator_document admits only known keys
        (_, None) => Filter::eq(field, operand.clone()),
    }
}

pub(crate) fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}
