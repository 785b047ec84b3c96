//! Convenient re-exports of commonly used types.
//!
//! ```ignore
//! use softdoc::prelude::*;
//! ```

pub use softdoc_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::{Collection, TypedCollection},
    conditions::Conditions,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Pipeline, Stage},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    soft::{
        DeletedByType, DeletionState, FindOptions, IndexField, Method, SoftDeletable,
        SoftDeleteCollection, SoftDeleteOptions, SoftUpdateOptions, TypedSoftDeleteCollection,
    },
    store::{DocumentStore, DynDocumentStore},
    update::{FindOneAndUpdateOptions, ReturnDocument, Update, UpdateOptions, UpdateResult},
};
pub use softdoc_macros::{Document, SoftDeletable};
