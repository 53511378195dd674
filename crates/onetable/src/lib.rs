//! ## Crate layout
//! - `core`: the engine (key codec, index selection, planning, tokens).
//! - `error`: the public error type returned at the facade boundary.
//!
//! Most applications only need the [`prelude`]: declare record types with
//! [`prelude::Persistable`], open a [`Table`], and call the [`Store`]
//! operations on it.

pub use onetable_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};
pub use onetable_core::{
    client::{ClientError, StoreClient, TableDescription},
    cursor::{Aes256GcmCipher, TokenCipher},
    obs::{CounterSink, MetricsSink},
    registry::{TableRegistry, TableRegistryError},
    table::{Store, Table, TableConfig},
};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open a table, converting setup failures to the public [`Error`].
pub fn open(
    config: TableConfig,
    client: std::sync::Arc<dyn StoreClient>,
    record_types: &[onetable_core::model::record::RecordType],
) -> Result<Table, Error> {
    Table::open(config, client, record_types).map_err(Error::from)
}

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{Error, ErrorKind};
    pub use onetable_core::prelude::*;
}
