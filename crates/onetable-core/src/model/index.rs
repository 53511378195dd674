use crate::client::ScalarType;
use derive_more::Deref;
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

///
/// SortOrder
///
/// Per-key-part direction. `Unconstrained` leaves the scan direction to the
/// store default when querying.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
    Unconstrained,
}

impl SortOrder {
    /// Scan direction implied by this order, if any.
    #[must_use]
    pub const fn scan_forward(self) -> Option<bool> {
        match self {
            Self::Asc => Some(true),
            Self::Desc => Some(false),
            Self::Unconstrained => None,
        }
    }
}

///
/// KeyPart
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KeyPart {
    Partition,
    Sort,
}

impl Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partition => write!(f, "pk"),
            Self::Sort => write!(f, "sk"),
        }
    }
}

///
/// KeySource
///
/// Where a key slot's value comes from.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum KeySource {
    /// Runtime value of the named record field.
    Field(String),
    /// Constant pinned by the key statement.
    Literal(String),
}

impl Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Literal(value) => write!(f, "'{value}'"),
        }
    }
}

///
/// KeyField
///
/// One component of a (possibly composite) key attribute.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KeyField {
    pub source: KeySource,
    pub preferred: bool,
    pub order: SortOrder,
}

impl KeyField {
    #[must_use]
    pub const fn field(name: String) -> Self {
        Self {
            source: KeySource::Field(name),
            preferred: false,
            order: SortOrder::Asc,
        }
    }

    /// Record field feeding this slot, if it is not a literal.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match &self.source {
            KeySource::Field(name) => Some(name),
            KeySource::Literal(_) => None,
        }
    }
}

///
/// CompositeKey
///
/// Dense, gap-free slot sequence for one record type on one key attribute.
/// Only constructed from a completed slot arena.
///

#[derive(Clone, Debug, Deref, Eq, PartialEq)]
pub struct CompositeKey(Vec<KeyField>);

impl CompositeKey {
    pub(crate) const fn from_dense(fields: Vec<KeyField>) -> Self {
        Self(fields)
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.0.len() > 1
    }
}

///
/// KeyAttribute
///
/// One physical key column of an index and, per record type, the ordered
/// fields packed into it.
///

#[derive(Clone, Debug)]
pub struct KeyAttribute {
    pub name: String,
    pub scalar_type: ScalarType,
    pub(crate) fields_by_type: BTreeMap<String, CompositeKey>,
}

impl KeyAttribute {
    #[must_use]
    pub fn key_fields(&self, type_name: &str) -> Option<&CompositeKey> {
        self.fields_by_type.get(type_name)
    }
}

///
/// IndexKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexKind {
    Primary,
    LocalSecondary,
    GlobalSecondary,
}

///
/// Index
///
/// Immutable after setup. The primary index has an empty name.
///

#[derive(Clone, Debug)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    pub pk: KeyAttribute,
    pub sk: Option<KeyAttribute>,
    pub consistent_reads: bool,
}

impl Index {
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        matches!(self.kind, IndexKind::Primary)
    }

    /// Store-facing index name; `None` for the primary index.
    #[must_use]
    pub fn store_name(&self) -> Option<&str> {
        if self.is_primary() {
            None
        } else {
            Some(&self.name)
        }
    }

    pub fn key_attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.pk).chain(self.sk.as_ref())
    }

    #[must_use]
    pub const fn key_attribute(&self, part: KeyPart) -> Option<&KeyAttribute> {
        match part {
            KeyPart::Partition => Some(&self.pk),
            KeyPart::Sort => self.sk.as_ref(),
        }
    }

    /// Whether `field` feeds any key slot of this index for the given type.
    #[must_use]
    pub fn is_key_field(&self, type_name: &str, field: &str) -> bool {
        self.key_attributes()
            .filter_map(|attribute| attribute.key_fields(type_name))
            .any(|key| key.iter().any(|kf| kf.field_name() == Some(field)))
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_primary() {
            write!(f, "primary")
        } else {
            write!(f, "{}", self.name)
        }
    }
}
