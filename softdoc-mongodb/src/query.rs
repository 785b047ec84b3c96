//! Translation of filter expressions and pipelines into MongoDB syntax.

use bson::{Document, Bson, doc};

use softdoc_core::{
    error::DocumentStoreError,
    pipeline::{Pipeline, Stage},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

/// Translates filter expressions into MongoDB query documents.
///
/// Identifiers are stored in `_id`, so [`Expr::Ids`] becomes an `_id` lookup.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` becomes the empty (match-all) document.
    pub(crate) fn filter(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    pub(crate) fn sort(sort: &Sort) -> Document {
        doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        }
    }

    /// Translates pipeline stages into aggregation stage documents.
    pub(crate) fn pipeline(pipeline: &Pipeline) -> Result<Vec<Document>, DocumentStoreError> {
        pipeline
            .stages()
            .iter()
            .map(|stage| {
                Ok(match stage {
                    Stage::Match(expr) => doc! { "$match": MongoQueryTranslator.visit_expr(expr)? },
                    Stage::Sort(sort) => doc! { "$sort": MongoQueryTranslator::sort(sort) },
                    Stage::Skip(n) => doc! { "$skip": *n as i64 },
                    Stage::Limit(n) => doc! { "$limit": *n as i64 },
                    Stage::Project(fields) => {
                        let mut projection = doc! { "_id": 0 };
                        for field in fields {
                            projection.insert(field.clone(), 1);
                        }
                        doc! { "$project": projection }
                    }
                    Stage::Count(field) => doc! { "$count": field.clone() },
                })
            })
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty $and
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$in": [] } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // $not is field-level only
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_ids(&mut self, ids: &[bson::Uuid]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "_id": { "$in": ids.iter().copied().map(Bson::from).collect::<Vec<_>>() },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": regex_escape(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$elemMatch": { "$eq": other } },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": regex_escape(s) } },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    other => doc! { "$ne": other },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", regex_escape(s)) },
                    _ => return Err(DocumentStoreError::InvalidArgument("StartsWith requires a string value".to_string())),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", regex_escape(s)) },
                    _ => return Err(DocumentStoreError::InvalidArgument("EndsWith requires a string value".to_string())),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    other => doc! { "$in": [other] },
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(_) => doc! { "$nin": value },
                    other => doc! { "$nin": [other] },
                },
            }
        })
    }
}

fn regex_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use softdoc_core::query::Filter;

    use super::*;

    #[test]
    fn soft_delete_filters_translate_to_native_operators() {
        let expr = Filter::and(vec![Filter::eq("side", 0), Filter::ne("deleted", true)]);

        assert_eq!(
            MongoQueryTranslator.visit_expr(&expr).unwrap(),
            doc! { "$and": [ { "side": { "$eq": 0 } }, { "deleted": { "$ne": true } } ] },
        );
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
    }

    #[test]
    fn ids_target_the_primary_key() {
        let id = bson::Uuid::new();

        assert_eq!(
            MongoQueryTranslator.visit_expr(&Filter::id(id)).unwrap(),
            doc! { "_id": { "$in": [id] } },
        );
    }

    #[test]
    fn empty_logical_operators_stay_valid() {
        assert_eq!(MongoQueryTranslator.visit_expr(&Expr::And(vec![])).unwrap(), doc! {});
        assert_eq!(
            MongoQueryTranslator.visit_expr(&Expr::Or(vec![])).unwrap(),
            doc! { "_id": { "$in": [] } },
        );
    }

    #[test]
    fn negation_uses_nor() {
        let expr = Filter::eq("deleted", true).not();

        assert_eq!(
            MongoQueryTranslator.visit_expr(&expr).unwrap(),
            doc! { "$nor": [ { "deleted": { "$eq": true } } ] },
        );
    }

    #[test]
    fn pipelines_translate_stage_by_stage() {
        let pipeline = Pipeline::new()
            .filter(Filter::gte("age", 50))
            .sort("name", SortDirection::Asc)
            .limit(2)
            .project(["name"])
            .prepend_match(Filter::eq("deleted", true));

        assert_eq!(
            MongoQueryTranslator::pipeline(&pipeline).unwrap(),
            vec![
                doc! { "$match": { "deleted": { "$eq": true } } },
                doc! { "$match": { "age": { "$gte": 50 } } },
                doc! { "$sort": { "name": 1 } },
                doc! { "$limit": 2_i64 },
                doc! { "$project": { "_id": 0, "name": 1 } },
            ],
        );
    }

    #[test]
    fn string_patterns_are_escaped() {
        assert_eq!(
            MongoQueryTranslator.visit_expr(&Filter::starts_with("email", "a.b")).unwrap(),
            doc! { "email": { "$regex": "^a\\.b" } },
        );
    }
}
