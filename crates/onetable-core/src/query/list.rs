use crate::{
    consistency::ConsistencyType,
    model::record::{Persistable, Record},
    value::{AttributeValue, Fields},
};
use std::fmt::{self, Display};

///
/// KeyOp
///
/// Comparison applied to a non-prefix sort-key condition.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum KeyOp {
    #[default]
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Display for KeyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        };
        write!(f, "{op}")
    }
}

///
/// ListQuery
///
/// A list request for one record type. Populated `fields` drive index
/// selection, key conditions and filters; after a successful list the
/// `items` and `next_page_token` outputs are filled in.
///

#[derive(Default)]
pub struct ListQuery {
    pub type_name: String,
    pub fields: Fields,
    pub key_op: Option<KeyOp>,
    pub ascending: Option<bool>,
    pub consistency: Option<ConsistencyType>,

    /// Requested page size; zero selects the configured default.
    pub page_size: u32,
    pub page_token: Option<String>,

    pub items: Vec<Box<dyn Record>>,
    pub next_page_token: Option<String>,
}

impl ListQuery {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn of<T: Persistable>() -> Self {
        Self::new(T::TYPE_NAME)
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub const fn key_op(mut self, op: KeyOp) -> Self {
        self.key_op = Some(op);
        self
    }

    #[must_use]
    pub const fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = Some(ascending);
        self
    }

    #[must_use]
    pub const fn consistency(mut self, consistency: ConsistencyType) -> Self {
        self.consistency = Some(consistency);
        self
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    /// Populated scalar fields, i.e. the ones that shape the query.
    pub fn populated(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_zero())
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Result items of type `T`; items of other types are skipped.
    pub fn records<T: Record>(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|item| item.downcast_ref::<T>())
    }
}

impl fmt::Debug for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListQuery")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("key_op", &self.key_op)
            .field("ascending", &self.ascending)
            .field("page_size", &self.page_size)
            .field("items", &self.items.len())
            .field("next_page_token", &self.next_page_token.is_some())
            .finish_non_exhaustive()
    }
}
