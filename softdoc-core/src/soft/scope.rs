//! Which records an operation observes.
//!
//! Every read or update issued through a soft-delete collection is resolved to a
//! [`Scope`] from three inputs: the configured overrides, the method variant the caller
//! picked, and the caller's `with_deleted` flag. The scope's filter is then AND-ed with
//! the caller's own conditions.

use tracing::debug;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter, conjoin},
    soft::{options::{Method, SoftDeleteOptions}, state::DELETED},
};

/// The subset of records an invocation observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Records that are not deleted.
    Active,
    /// Deleted records only.
    Deleted,
    /// Every record.
    All,
}

/// The form of a method the caller invoked: `find`, `find_deleted` or `find_with_deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Deleted,
    WithDeleted,
}

impl Variant {
    fn suffix(self) -> &'static str {
        match self {
            Variant::Default => "",
            Variant::Deleted => "Deleted",
            Variant::WithDeleted => "WithDeleted",
        }
    }
}

/// Decides the scope of one invocation.
///
/// # Errors
///
/// Returns [`DocumentStoreError::MethodNotAvailable`] for the `Deleted` and `WithDeleted`
/// variants of a method that is not overridden.
pub fn resolve(
    options: &SoftDeleteOptions,
    method: Method,
    variant: Variant,
    with_deleted: bool,
) -> DocumentStoreResult<Scope> {
    let overridden = options.overrides(method);

    let scope = match (overridden, variant) {
        (true, Variant::Default) if with_deleted => Scope::All,
        (true, Variant::Default) => Scope::Active,
        (true, Variant::Deleted) => Scope::Deleted,
        (true, Variant::WithDeleted) => Scope::All,
        (false, Variant::Default) => Scope::All,
        (false, variant) => {
            return Err(DocumentStoreError::MethodNotAvailable(format!(
                "{}{} requires {} in overrideMethods",
                method,
                variant.suffix(),
                method,
            )));
        }
    };

    debug!(%method, ?variant, with_deleted, ?scope, "resolved soft-delete scope");

    Ok(scope)
}

impl Scope {
    /// The predicate selecting this scope's records, or `None` for [`Scope::All`].
    pub fn filter(self, options: &SoftDeleteOptions) -> Option<Expr> {
        match self {
            Scope::Active if options.use_ne_operator => Some(Filter::ne(DELETED, true)),
            Scope::Active => Some(Filter::eq(DELETED, false)),
            Scope::Deleted => Some(Filter::eq(DELETED, true)),
            Scope::All => None,
        }
    }

    /// AND-s this scope's predicate with the caller's conditions.
    pub fn restrict(self, options: &SoftDeleteOptions, conditions: Option<Expr>) -> Option<Expr> {
        conjoin(conditions, self.filter(options))
    }
}
