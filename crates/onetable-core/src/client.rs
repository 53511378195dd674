//! Store client boundary.
//!
//! The wire transport is out of scope: callers hand the table a
//! [`StoreClient`] that accepts and returns attribute maps. Every call is a
//! synchronous round-trip.

use crate::value::{AttributeValue, Item};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// ClientError
///
/// Failure signals a store client reports back to the table.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ClientError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    #[error("throughput exceeded: {0}")]
    ThroughputExceeded(String),

    #[error("item collection size limit exceeded: {0}")]
    ItemCollectionSizeLimitExceeded(String),

    #[error("{code}: {message}")]
    Service { code: String, message: String },
}

///
/// KeyRole
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyRole {
    Partition,
    Sort,
}

///
/// ScalarType
///
/// Declared type of a key attribute.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScalarType {
    #[default]
    S,
    N,
    B,
}

///
/// KeySchemaElement
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub role: KeyRole,
}

impl KeySchemaElement {
    #[must_use]
    pub fn partition(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            role: KeyRole::Partition,
        }
    }

    #[must_use]
    pub fn sort(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            role: KeyRole::Sort,
        }
    }
}

///
/// IndexDescription
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexDescription {
    pub index_name: String,
    pub key_schema: Vec<KeySchemaElement>,
}

///
/// TableDescription
///
/// Result of `describe_table`: the primary key schema, secondary indexes,
/// and declared attribute types.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TableDescription {
    pub key_schema: Vec<KeySchemaElement>,
    pub local_secondary_indexes: Vec<IndexDescription>,
    pub global_secondary_indexes: Vec<IndexDescription>,
    pub attribute_types: BTreeMap<String, ScalarType>,
}

///
/// GetItemRequest
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetItemRequest {
    pub table_name: String,
    pub key: Item,
    pub consistent_read: bool,
}

///
/// PutItemRequest
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PutItemRequest {
    pub table_name: String,
    pub item: Item,
    pub condition_expression: Option<String>,
}

///
/// DeleteItemRequest
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteItemRequest {
    pub table_name: String,
    pub key: Item,
    pub condition_expression: Option<String>,
}

///
/// QueryRequest
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: String,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: BTreeMap<String, String>,
    pub expression_attribute_values: BTreeMap<String, AttributeValue>,
    pub consistent_read: bool,
    pub scan_index_forward: Option<bool>,
    pub limit: u32,
    pub exclusive_start_key: Option<Item>,
}

///
/// QueryOutput
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryOutput {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

///
/// StoreClient
///
/// Black-box store client. Implementations must be safe to share across
/// request threads.
///

pub trait StoreClient: Send + Sync {
    fn describe_table(&self, table_name: &str) -> Result<TableDescription, ClientError>;

    fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, ClientError>;

    fn put_item(&self, request: PutItemRequest) -> Result<(), ClientError>;

    fn delete_item(&self, request: DeleteItemRequest) -> Result<(), ClientError>;

    fn query(&self, request: QueryRequest) -> Result<QueryOutput, ClientError>;
}
