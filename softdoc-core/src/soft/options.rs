//! Soft-delete configuration.
//!
//! Options load from JSON with the same keys the plugin configuration has always used,
//! so an existing config such as
//!
//! ```json
//! { "overrideMethods": "all", "deletedAt": true, "deletedBy": true, "use$neOperator": false }
//! ```
//!
//! deserializes unchanged. They can also be assembled with [`SoftDeleteOptions::builder`].

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A read or update method whose behaviour the soft-delete layer can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Count,
    CountDocuments,
    Find,
    FindOne,
    FindOneAndUpdate,
    Update,
    UpdateOne,
    UpdateMany,
    Aggregate,
}

impl Method {
    /// Every overridable method.
    pub const ALL: [Method; 9] = [
        Method::Count,
        Method::CountDocuments,
        Method::Find,
        Method::FindOne,
        Method::FindOneAndUpdate,
        Method::Update,
        Method::UpdateOne,
        Method::UpdateMany,
        Method::Aggregate,
    ];

    /// The configuration name of the method.
    pub fn name(self) -> &'static str {
        match self {
            Method::Count => "count",
            Method::CountDocuments => "countDocuments",
            Method::Find => "find",
            Method::FindOne => "findOne",
            Method::FindOneAndUpdate => "findOneAndUpdate",
            Method::Update => "update",
            Method::UpdateOne => "updateOne",
            Method::UpdateMany => "updateMany",
            Method::Aggregate => "aggregate",
        }
    }

    /// Looks a method up by its configuration name.
    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL
            .into_iter()
            .find(|method| method.name() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A deletion-state field that can be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexField {
    Deleted,
    DeletedAt,
    DeletedBy,
}

impl IndexField {
    pub const ALL: [IndexField; 3] = [IndexField::Deleted, IndexField::DeletedAt, IndexField::DeletedBy];

    /// The stored field name.
    pub fn name(self) -> &'static str {
        match self {
            IndexField::Deleted => "deleted",
            IndexField::DeletedAt => "deletedAt",
            IndexField::DeletedBy => "deletedBy",
        }
    }

    pub fn from_name(name: &str) -> Option<IndexField> {
        IndexField::ALL
            .into_iter()
            .find(|field| field.name() == name)
    }
}

/// The kind of value accepted as the `deletedBy` actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum DeletedByType {
    /// A BSON object id.
    #[default]
    #[serde(rename = "objectId", alias = "ObjectId")]
    ObjectId,
    /// A string.
    #[serde(rename = "string", alias = "String")]
    String,
    /// A UUID (binary subtype 4).
    #[serde(rename = "uuid", alias = "Uuid", alias = "UUID")]
    Uuid,
    /// Any value.
    #[serde(rename = "any", alias = "Any", alias = "Mixed")]
    Any,
}

impl DeletedByType {
    /// Returns true when `actor` is a value of this kind.
    pub fn accepts(self, actor: &bson::Bson) -> bool {
        match (self, actor) {
            (DeletedByType::Any, _) => true,
            (DeletedByType::ObjectId, bson::Bson::ObjectId(_)) => true,
            (DeletedByType::String, bson::Bson::String(_)) => true,
            (DeletedByType::Uuid, bson::Bson::Binary(binary)) => {
                binary.subtype == bson::spec::BinarySubtype::Uuid
            }
            _ => false,
        }
    }
}

/// Soft-delete configuration of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftDeleteOptions {
    /// Methods whose default form hides deleted records and which gain `*_deleted` and
    /// `*_with_deleted` variants.
    #[serde(deserialize_with = "deserialize_methods")]
    pub override_methods: BTreeSet<Method>,
    /// Stamp `deletedAt` when deleting.
    pub deleted_at: bool,
    /// Record the actor in `deletedBy` when deleting.
    pub deleted_by: bool,
    /// Accepted `deletedBy` values.
    pub deleted_by_type: DeletedByType,
    /// Fields `ensure_indexes` creates indexes for.
    #[serde(deserialize_with = "deserialize_index_fields")]
    pub index_fields: BTreeSet<IndexField>,
    /// Run document validation when a document deletes itself.
    pub validate_before_delete: bool,
    /// Run document validation when a document restores itself.
    pub validate_before_restore: bool,
    /// Hide records with `deleted != true` rather than `deleted == false`.
    #[serde(rename = "use$neOperator")]
    pub use_ne_operator: bool,
}

impl Default for SoftDeleteOptions {
    fn default() -> Self {
        SoftDeleteOptions {
            override_methods: BTreeSet::new(),
            deleted_at: false,
            deleted_by: false,
            deleted_by_type: DeletedByType::default(),
            index_fields: BTreeSet::new(),
            validate_before_delete: true,
            validate_before_restore: true,
            use_ne_operator: true,
        }
    }
}

impl SoftDeleteOptions {
    /// Creates a builder starting from the defaults.
    pub fn builder() -> SoftDeleteOptionsBuilder {
        SoftDeleteOptionsBuilder::default()
    }

    /// Loads options from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] when the value has the wrong shape.
    pub fn from_json(value: Value) -> DocumentStoreResult<Self> {
        serde_json::from_value(value).map_err(|e| DocumentStoreError::Configuration(e.to_string()))
    }

    /// Loads options from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] when the text is not valid options JSON.
    pub fn from_json_str(json: &str) -> DocumentStoreResult<Self> {
        serde_json::from_str(json).map_err(|e| DocumentStoreError::Configuration(e.to_string()))
    }

    /// Returns true when `method` is overridden.
    pub fn overrides(&self, method: Method) -> bool {
        self.override_methods.contains(&method)
    }

    /// Returns true when a method of that name exists on a collection with these options.
    ///
    /// Base names (`find`) always exist. `findDeleted` and `findWithDeleted` exist only
    /// when `find` is overridden. Unknown names do not exist.
    pub fn exposes(&self, name: &str) -> bool {
        if let Some(base) = name.strip_suffix("WithDeleted") {
            return Method::from_name(base).is_some_and(|method| self.overrides(method));
        }
        if let Some(base) = name.strip_suffix("Deleted") {
            return Method::from_name(base).is_some_and(|method| self.overrides(method));
        }

        Method::from_name(name).is_some()
    }

    /// Returns true when `ensure_indexes` should index `field`.
    ///
    /// `deletedAt` and `deletedBy` only count when the matching field is enabled.
    pub fn indexes(&self, field: IndexField) -> bool {
        self.index_fields.contains(&field)
            && match field {
                IndexField::Deleted => true,
                IndexField::DeletedAt => self.deleted_at,
                IndexField::DeletedBy => self.deleted_by,
            }
    }
}

/// Fluent construction of [`SoftDeleteOptions`].
///
/// ```ignore
/// let options = SoftDeleteOptions::builder()
///     .override_all()
///     .deleted_at(true)
///     .deleted_by(true)
///     .deleted_by_type(DeletedByType::String)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SoftDeleteOptionsBuilder {
    options: SoftDeleteOptions,
}

impl SoftDeleteOptionsBuilder {
    /// Overrides every method.
    pub fn override_all(mut self) -> Self {
        self.options.override_methods = Method::ALL.into_iter().collect();
        self
    }

    /// Overrides the listed methods, in addition to any already chosen.
    pub fn override_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.options.override_methods.extend(methods);
        self
    }

    /// Overrides methods given by configuration name. Unknown names are skipped.
    pub fn override_method_names<S: AsRef<str>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.options
            .override_methods
            .extend(parse_names(names, Method::from_name, "overrideMethods"));
        self
    }

    pub fn deleted_at(mut self, enabled: bool) -> Self {
        self.options.deleted_at = enabled;
        self
    }

    pub fn deleted_by(mut self, enabled: bool) -> Self {
        self.options.deleted_by = enabled;
        self
    }

    pub fn deleted_by_type(mut self, kind: DeletedByType) -> Self {
        self.options.deleted_by_type = kind;
        self
    }

    /// Indexes every deletion-state field.
    pub fn index_all(mut self) -> Self {
        self.options.index_fields = IndexField::ALL.into_iter().collect();
        self
    }

    pub fn index_fields(mut self, fields: impl IntoIterator<Item = IndexField>) -> Self {
        self.options.index_fields.extend(fields);
        self
    }

    pub fn validate_before_delete(mut self, enabled: bool) -> Self {
        self.options.validate_before_delete = enabled;
        self
    }

    pub fn validate_before_restore(mut self, enabled: bool) -> Self {
        self.options.validate_before_restore = enabled;
        self
    }

    pub fn use_ne_operator(mut self, enabled: bool) -> Self {
        self.options.use_ne_operator = enabled;
        self
    }

    pub fn build(self) -> SoftDeleteOptions {
        self.options
    }
}

/// The accepted shapes of a multi-choice option: a flag, `"all"`, or a list of names.
#[derive(Deserialize)]
#[serde(untagged)]
enum Selection {
    Flag(bool),
    Names(Vec<String>),
    Name(String),
}

impl Selection {
    fn resolve<T: Ord + Copy>(
        self,
        all: &[T],
        parse: fn(&str) -> Option<T>,
        option: &str,
    ) -> BTreeSet<T> {
        match self {
            Selection::Flag(false) => BTreeSet::new(),
            Selection::Flag(true) => all.iter().copied().collect(),
            Selection::Name(name) if name == "all" => all.iter().copied().collect(),
            Selection::Name(name) => parse_names([name], parse, option),
            Selection::Names(names) => parse_names(names, parse, option),
        }
    }
}

fn parse_names<T: Ord, S: AsRef<str>>(
    names: impl IntoIterator<Item = S>,
    parse: fn(&str) -> Option<T>,
    option: &str,
) -> BTreeSet<T> {
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let parsed = parse(name);
            if parsed.is_none() {
                warn!(option, name, "ignoring unknown name in soft-delete options");
            }
            parsed
        })
        .collect()
}

fn deserialize_methods<'de, D>(deserializer: D) -> Result<BTreeSet<Method>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Selection::deserialize(deserializer)?.resolve(&Method::ALL, Method::from_name, "overrideMethods"))
}

fn deserialize_index_fields<'de, D>(deserializer: D) -> Result<BTreeSet<IndexField>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Selection::deserialize(deserializer)?.resolve(&IndexField::ALL, IndexField::from_name, "indexFields"))
}
