//! Engine for single-table record storage on a wide-column store: key
//! statements, composite key codec, index selection, query planning,
//! uniqueness checks and encrypted continuation tokens.
//!
//! The store itself is reached through [`client::StoreClient`]; everything
//! else is built once at [`table::Table::open`] and shared read-only.

pub mod client;
pub mod consistency;
pub mod cursor;
pub mod error;
pub mod index;
pub mod key;
pub mod model;
pub mod obs;
pub mod query;
pub mod registry;
pub mod schema;
pub mod serialize;
pub mod table;
pub mod unique;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use unique::UNIQUE_CHECK_CEILING;

///
/// Prelude
///
/// Vocabulary needed to declare record types and run store operations.
///

pub mod prelude {
    pub use crate::{
        consistency::ConsistencyType,
        model::record::{FieldKind, FieldMeta, Persistable, Record, RecordType},
        query::{KeyOp, ListQuery},
        table::{Store as _, Table, TableConfig},
        value::{AttributeValue, Fields, Item},
    };
}
