//! Aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s run by the backend. The soft-delete
//! layer scopes an aggregation by putting a match stage in front of the caller's stages.

use crate::query::{Expr, Sort, SortDirection};

/// A single aggregation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keeps documents matching the expression.
    Match(Expr),
    /// Orders documents.
    Sort(Sort),
    /// Drops the first `n` documents.
    Skip(usize),
    /// Keeps at most `n` documents.
    Limit(usize),
    /// Keeps only the listed fields.
    Project(Vec<String>),
    /// Replaces the stream with a single document `{ <field>: <count> }`.
    Count(String),
}

/// An ordered list of aggregation stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Returns the stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Appends a stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a match stage.
    pub fn filter(self, expr: Expr) -> Self {
        self.stage(Stage::Match(expr))
    }

    /// Appends a sort stage.
    pub fn sort(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.stage(Stage::Sort(Sort { field: field.into(), direction }))
    }

    /// Appends a skip stage.
    pub fn skip(self, n: usize) -> Self {
        self.stage(Stage::Skip(n))
    }

    /// Appends a limit stage.
    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }

    /// Appends a projection stage.
    pub fn project<S: Into<String>>(self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stage(Stage::Project(fields.into_iter().map(Into::into).collect()))
    }

    /// Appends a count stage.
    pub fn count(self, field: impl Into<String>) -> Self {
        self.stage(Stage::Count(field.into()))
    }

    /// Puts a match stage in front of every other stage.
    pub fn prepend_match(mut self, expr: Expr) -> Self {
        self.stages.insert(0, Stage::Match(expr));
        self
    }
}

impl From<Vec<Stage>> for Pipeline {
    fn from(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }
}
