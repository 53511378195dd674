use crate::{client::ClientError, cursor::TokenError, value::Item};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Component errors convert into this type at their boundary.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a structured detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Construct a setup-time configuration error.
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Setup, message)
    }

    /// Construct a record-validation error for a key or field problem.
    pub(crate) fn key_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, ErrorOrigin::Key, message)
    }

    /// Construct a query-origin internal error.
    pub(crate) fn query_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Query, message)
    }

    /// Construct a typed not-found error for one record key.
    pub(crate) fn not_found(type_name: &str, key: &Item) -> Self {
        let rendered = key
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");

        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Store,
            format!("{type_name} not found: {rendered}"),
        )
    }

    /// Construct a uniqueness violation carrying the colliding stored item.
    pub(crate) fn unique_violation(type_name: &str, fields: &[String], existing: Item) -> Self {
        Self::new(
            ErrorClass::Conflict,
            ErrorOrigin::Constraint,
            format!(
                "unique constraint violation: {type_name} ({})",
                fields.join(", ")
            ),
        )
        .with_detail(ErrorDetail::Existing(existing))
    }

    /// Wrap a store client failure, preserving it as the error detail.
    pub(crate) fn client(class: ErrorClass, message: impl Into<String>, err: ClientError) -> Self {
        Self::new(class, ErrorOrigin::Store, message).with_detail(ErrorDetail::Client(err))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    /// Only throughput signals are worth retrying; nothing is retried here.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self.class, ErrorClass::Throughput)
    }

    /// The stored item that collided with a uniqueness constraint.
    #[must_use]
    pub const fn existing_item(&self) -> Option<&Item> {
        match &self.detail {
            Some(ErrorDetail::Existing(item)) => Some(item),
            _ => None,
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Client(ClientError),

    #[error("existing item with {} attributes", .0.len())]
    Existing(Item),

    #[error("{0}")]
    Token(TokenError),
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Configuration,
    Validation,
    Conflict,
    NotFound,
    Throughput,
    LimitExceeded,
    Dependency,
    Unsupported,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Throughput => "throughput",
            Self::LimitExceeded => "limit_exceeded",
            Self::Dependency => "dependency",
            Self::Unsupported => "unsupported",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Setup => "setup",
            Self::Key => "key",
            Self::Index => "index",
            Self::Query => "query",
            Self::Cursor => "cursor",
            Self::Constraint => "constraint",
            Self::Store => "store",
            Self::Serialize => "serialize",
        };
        write!(f, "{label}")
    }
}

///
/// Operation
///
/// Logical store operation named in [`OperationError`].
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        };
        write!(f, "{label}")
    }
}

///
/// OperationError
///
/// Operation-scoped wrapper returned by every `Store` method. The underlying
/// cause stays inspectable through `source`.
///

#[derive(Debug, ThisError)]
#[error("{operation} {record} failed: {source}")]
pub struct OperationError {
    pub operation: Operation,
    pub record: String,
    #[source]
    pub source: InternalError,
}

impl OperationError {
    pub(crate) fn new(operation: Operation, record: impl Into<String>, source: InternalError) -> Self {
        Self {
            operation,
            record: record.into(),
            source,
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.source.class
    }

    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        self.source.is_retriable()
    }
}

///
/// TESTS
///
