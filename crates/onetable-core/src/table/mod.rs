//! One physical table: setup, and the store operations built on top of
//! index selection, planning and continuation tokens.

mod config;
pub(crate) mod keys;
mod ops;

pub use config::{MAX_RESULTS_DEFAULT, MAX_RESULTS_MAX, TableConfig};

use crate::{
    client::{ClientError, StoreClient},
    consistency::ConsistencyType,
    cursor::ContinuationTokens,
    error::{ErrorClass, ErrorOrigin, InternalError, OperationError},
    index::IndexRegistry,
    key::KeyCodec,
    model::record::{Record, RecordType},
    obs::MetricsSink,
    query::{ListQuery, PageLimits},
    schema::SchemaDescriptor,
    value::Item,
};
use std::{collections::BTreeMap, fmt, sync::Arc};

///
/// Store
///
/// Record operations exposed to the application. Every failure names the
/// operation and record type and keeps the underlying cause.
///

pub trait Store {
    fn create(&self, record: &dyn Record) -> Result<(), OperationError>;

    /// Fill `record` from the stored item addressed by its primary key.
    fn read(&self, record: &mut dyn Record) -> Result<(), OperationError>;

    /// Merge `patch` into `current` and persist the result.
    fn update(&self, current: &mut dyn Record, patch: &dyn Record) -> Result<(), OperationError>;

    fn delete(&self, record: &dyn Record) -> Result<(), OperationError>;

    /// Run one page of `query`, filling its items and next-page token.
    fn list(&self, query: &mut ListQuery) -> Result<(), OperationError>;
}

///
/// Table
///
/// Immutable after `open`; safe to share across threads.
///

pub struct Table {
    pub(crate) name: String,
    pub(crate) client: Arc<dyn StoreClient>,
    pub(crate) indexes: IndexRegistry,
    pub(crate) schemas: BTreeMap<String, SchemaDescriptor>,
    pub(crate) codec: KeyCodec,
    pub(crate) limits: PageLimits,
    pub(crate) consistency_default: ConsistencyType,
    pub(crate) tokens: ContinuationTokens,
    pub(crate) fail_delete_if_not_present: bool,
    pub(crate) metrics: Arc<dyn MetricsSink>,
}

impl Table {
    /// Describe the table, build every record type's schema and all index
    /// key assignments. Any configuration problem aborts setup.
    pub fn open(
        config: TableConfig,
        client: Arc<dyn StoreClient>,
        record_types: &[RecordType],
    ) -> Result<Self, InternalError> {
        let chars = config.key_chars()?;
        let limits = config.page_limits()?;

        let description = client
            .describe_table(&config.table_name)
            .map_err(|err| match err {
                ClientError::ResourceNotFound(_) => InternalError::client(
                    ErrorClass::Unsupported,
                    format!("table '{}' does not exist", config.table_name),
                    err,
                ),
                other => InternalError::client(
                    ErrorClass::Dependency,
                    format!("unable to describe table '{}'", config.table_name),
                    other,
                ),
            })?;

        let mut schemas = BTreeMap::new();
        for record_type in record_types {
            let schema = SchemaDescriptor::build(record_type)?;
            if schemas.insert(record_type.name.clone(), schema).is_some() {
                return Err(InternalError::configuration(format!(
                    "record type '{}' registered twice with table '{}'",
                    record_type.name, config.table_name
                )));
            }
        }

        let refs: Vec<_> = schemas.values().collect();
        let indexes = IndexRegistry::build(&description, &refs, chars)?;

        tracing::info!(
            table = %config.table_name,
            indexes = indexes.len(),
            record_types = schemas.len(),
            "table ready"
        );

        Ok(Self {
            name: config.table_name,
            client,
            indexes,
            schemas,
            codec: KeyCodec::new(chars, config.type_discriminator),
            limits,
            consistency_default: config.consistency_default,
            tokens: ContinuationTokens::new(config.token_cipher),
            fail_delete_if_not_present: config.fail_delete_if_not_present,
            metrics: config.metrics,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn indexes(&self) -> &IndexRegistry {
        &self.indexes
    }

    #[must_use]
    pub fn schema(&self, type_name: &str) -> Option<&SchemaDescriptor> {
        self.schemas.get(type_name)
    }

    pub(crate) fn registered_schema(
        &self,
        type_name: &str,
    ) -> Result<&SchemaDescriptor, InternalError> {
        self.schemas.get(type_name).ok_or_else(|| {
            InternalError::new(
                ErrorClass::Configuration,
                ErrorOrigin::Setup,
                format!(
                    "record type '{type_name}' is not registered with table '{}'",
                    self.name
                ),
            )
        })
    }

    // Pick the resolver for a listed item: by discriminator when enabled,
    // otherwise the queried type.
    fn resolver_for<'a>(
        &'a self,
        item: &Item,
        fallback: &'a SchemaDescriptor,
    ) -> &'a SchemaDescriptor {
        for attribute in self.indexes.primary().key_attributes() {
            let Some(stored) = item.get(&attribute.name).and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(head) = self.codec.discriminator(stored, 2) else {
                continue;
            };
            if let Some(schema) = self.schemas.get(head)
                && attribute.key_fields(head).is_some_and(|key| key.is_composite())
            {
                return schema;
            }
        }

        fallback
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("indexes", &self.indexes.len())
            .field("record_types", &self.schemas.keys().collect::<Vec<_>>())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// Map a write/read client failure to a classified error.
pub(crate) fn store_error(context: &str, err: ClientError) -> InternalError {
    let class = match &err {
        ClientError::ThroughputExceeded(_) => {
            tracing::warn!(context, error = %err, "store throughput exceeded");
            ErrorClass::Throughput
        }
        ClientError::ItemCollectionSizeLimitExceeded(_) => ErrorClass::LimitExceeded,
        ClientError::ResourceNotFound(_)
        | ClientError::ConditionalCheckFailed(_)
        | ClientError::Service { .. } => ErrorClass::Dependency,
    };

    InternalError::client(class, format!("{context}: {err}"), err)
}
