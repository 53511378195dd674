///
/// ConsistencyType
///
/// Read-consistency policy for one record type or query.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConsistencyType {
    /// Never request a consistent read.
    #[default]
    Indifferent,

    /// Always request a consistent read.
    Required,

    /// Request a consistent read only when the index supports it.
    Preferred,
}

impl ConsistencyType {
    /// Resolve the consistent-read flag for an index.
    #[must_use]
    pub const fn consistent_read(self, index_supports_consistency: bool) -> bool {
        match self {
            Self::Indifferent => false,
            Self::Required => true,
            Self::Preferred => index_supports_consistency,
        }
    }

    /// Whether indexes with consistent reads should win selection ties.
    #[must_use]
    pub const fn favors_consistent_index(self) -> bool {
        !matches!(self, Self::Indifferent)
    }
}

///
/// TESTS
///
