use crate::{consistency::ConsistencyType, error::InternalError, value::Fields};
use std::{any::Any, fmt, sync::Arc};

///
/// FieldKind
///
/// Value shape of a record field, used to retype values recovered from
/// composite keys and to skip structured fields in filters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Bool,
    Binary,
    Nested,
}

///
/// FieldMeta
///
/// Declarative per-field metadata supplied by the record-type registry.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldMeta {
    pub name: String,
    /// Stored attribute name override; `-` means the field is not persisted.
    pub storage_name: Option<String>,
    pub kind: FieldKind,
    /// Key statements, e.g. `pk.0='User',!gsi1:sk.1`.
    pub keys: Option<String>,
    /// Constraint statements, e.g. `unique(tenant)`.
    pub constraints: Option<String>,
}

impl FieldMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    #[must_use]
    pub fn nested(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Nested)
    }

    #[must_use]
    pub fn keys(mut self, statements: impl Into<String>) -> Self {
        self.keys = Some(statements.into());
        self
    }

    #[must_use]
    pub fn constraints(mut self, statements: impl Into<String>) -> Self {
        self.constraints = Some(statements.into());
        self
    }

    #[must_use]
    pub fn stored_as(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }
}

///
/// Record
///
/// Object-safe view of one application record. Field values are exchanged
/// as attribute values keyed by record field name.
///

pub trait Record: Any + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Current field values. Zero values may be present or omitted.
    fn fields(&self) -> Fields;

    /// Overwrite fields from stored values. Unknown names are ignored.
    fn apply_fields(&mut self, fields: &Fields) -> Result<(), InternalError>;

    /// Per-record consistency override; `None` uses the table default.
    fn consistency(&self) -> Option<ConsistencyType> {
        None
    }
}

impl dyn Record {
    #[must_use]
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn downcast<T: Record>(self: Box<Self>) -> Result<Box<T>, Box<dyn Any>> {
        (self as Box<dyn Any>).downcast::<T>()
    }
}

///
/// Persistable
///
/// Typed records registered with a table.
///

pub trait Persistable: Record + Default {
    const TYPE_NAME: &'static str;

    fn field_meta() -> Vec<FieldMeta>;
}

/// Constructor producing an empty record of one type.
pub type RecordFactory = Arc<dyn Fn() -> Box<dyn Record> + Send + Sync>;

///
/// RecordType
///
/// Registration entry for one record type: its name, field metadata, and a
/// factory used by the resolver to rehydrate stored items.
///

#[derive(Clone)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldMeta>,
    pub factory: RecordFactory,
}

impl RecordType {
    #[must_use]
    pub fn of<T: Persistable>() -> Self {
        Self {
            name: T::TYPE_NAME.to_string(),
            fields: T::field_meta(),
            factory: Arc::new(|| Box::new(T::default())),
        }
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
