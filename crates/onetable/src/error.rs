use derive_more::Display;
use onetable_core::error::{
    ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError, OperationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self.kind, ErrorKind::Retriable)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class.into(), err.origin.into(), err.message)
    }
}

impl From<OperationError> for Error {
    fn from(err: OperationError) -> Self {
        let message = err.to_string();
        let source = err.source;

        Self::new(source.class.into(), source.origin.into(), message)
    }
}

///
/// ErrorKind
/// Caller-facing error taxonomy.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Setup or declaration problem; fix the record types or table config.
    Configuration,

    /// The request cannot be served as written.
    Invalid,

    /// A uniqueness or existence condition failed.
    Conflict,

    NotFound,

    /// Throttled by the store; the same call may succeed later.
    Retriable,

    /// The store failed in a way the caller cannot remediate.
    Dependency,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Configuration => Self::Configuration,
            ErrorClass::Validation | ErrorClass::Unsupported | ErrorClass::LimitExceeded => {
                Self::Invalid
            }
            ErrorClass::Conflict => Self::Conflict,
            ErrorClass::NotFound => Self::NotFound,
            ErrorClass::Throughput => Self::Retriable,
            ErrorClass::Dependency => Self::Dependency,
            ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Setup,
    Key,
    Index,
    Query,
    Cursor,
    Constraint,
    Store,
    Serialize,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Setup => Self::Setup,
            CoreErrorOrigin::Key => Self::Key,
            CoreErrorOrigin::Index => Self::Index,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Cursor => Self::Cursor,
            CoreErrorOrigin::Constraint => Self::Constraint,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Serialize => Self::Serialize,
        }
    }
}

///
/// TESTS
///
