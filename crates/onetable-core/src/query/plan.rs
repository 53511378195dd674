//! Query plan construction.
//!
//! A plan is the complete store request for one list call: equality on the
//! partition key, an optional sort-key condition, ANDed filter terms over
//! the remaining populated scalar fields, the alias and value tables, and
//! paging bounds.

use crate::{
    client::{QueryRequest, ScalarType},
    error::{ErrorClass, ErrorOrigin, InternalError},
    index::Selection,
    key::{KeyCodec, KeyCodecError},
    model::{
        index::{CompositeKey, KeyAttribute, KeySource},
        record::FieldKind,
    },
    query::{
        list::{KeyOp, ListQuery},
        names::ExpressionNames,
    },
    schema::SchemaDescriptor,
    value::{AttributeValue, Item},
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// PlanError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    #[error("partition key {attribute} has no value for field '{field}'")]
    MissingPartitionValue { attribute: String, field: String },

    #[error("sort key {attribute} is a prefix match and cannot also use the '{op}' range hint")]
    PrefixWithRangeHint { attribute: String, op: KeyOp },

    #[error(transparent)]
    Key(#[from] KeyCodecError),
}

impl From<PlanError> for InternalError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::MissingPartitionValue { .. } => Self::query_internal(err.to_string()),
            PlanError::PrefixWithRangeHint { .. } => {
                Self::new(ErrorClass::Configuration, ErrorOrigin::Query, err.to_string())
            }
            PlanError::Key(inner) => inner.into(),
        }
    }
}

///
/// PageLimits
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageLimits {
    pub default: u32,
    pub max: u32,
}

impl PageLimits {
    /// Requested size clamped to `max`; zero means "use the default".
    #[must_use]
    pub fn clamp(self, requested: u32) -> u32 {
        if requested > 0 {
            requested.min(self.max)
        } else {
            self.default
        }
    }
}

///
/// QueryPlan
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryPlan {
    pub type_name: String,
    /// Store-facing index name; `None` for the primary index.
    pub index_name: Option<String>,
    pub key_condition: String,
    pub filter: Option<String>,
    pub names: ExpressionNames,
    pub values: BTreeMap<String, AttributeValue>,
    pub scan_forward: Option<bool>,
    pub consistent_read: bool,
    pub limit: u32,
    pub exclusive_start_key: Option<Item>,
}

impl QueryPlan {
    #[must_use]
    pub fn to_request(&self, table_name: &str) -> QueryRequest {
        QueryRequest {
            table_name: table_name.to_string(),
            index_name: self.index_name.clone(),
            key_condition_expression: self.key_condition.clone(),
            filter_expression: self.filter.clone(),
            expression_attribute_names: self.names.to_request_names(),
            expression_attribute_values: self.values.clone(),
            consistent_read: self.consistent_read,
            scan_index_forward: self.scan_forward,
            limit: self.limit,
            exclusive_start_key: self.exclusive_start_key.clone(),
        }
    }
}

///
/// PlanBuilder
///
/// Shared, setup-time inputs for building plans of one table.
///

#[derive(Clone, Copy, Debug)]
pub struct PlanBuilder<'a> {
    pub schema: &'a SchemaDescriptor,
    pub codec: KeyCodec,
    pub limits: PageLimits,
}

impl PlanBuilder<'_> {
    /// Build the plan for `query` against the selected index.
    pub fn build(
        &self,
        query: &ListQuery,
        selection: &Selection<'_>,
        start_key: Option<Item>,
    ) -> Result<QueryPlan, PlanError> {
        let type_name = query.type_name.as_str();
        let index = selection.index;
        let mut names = ExpressionNames::new();
        let mut values = BTreeMap::new();
        let mut consumed = BTreeSet::new();

        // partition key: always equality
        let pk_key = index.pk.key_fields(type_name).ok_or_else(|| {
            PlanError::MissingPartitionValue {
                attribute: index.pk.name.clone(),
                field: String::new(),
            }
        })?;
        let mut pk_parts = Vec::with_capacity(pk_key.len());
        for kf in pk_key.iter() {
            let part = match &kf.source {
                KeySource::Literal(literal) => literal.clone(),
                KeySource::Field(name) => {
                    consumed.insert(name.as_str());
                    query
                        .fields
                        .get(name)
                        .filter(|v| !v.is_zero())
                        .and_then(AttributeValue::as_key_text)
                        .ok_or_else(|| PlanError::MissingPartitionValue {
                            attribute: index.pk.name.clone(),
                            field: name.clone(),
                        })?
                }
            };
            pk_parts.push(part);
        }
        let pk_value = self.codec.encode(type_name, &pk_parts)?;
        values.insert(":pk".to_string(), key_value(&index.pk, pk_key, pk_value, false));
        let mut key_condition = format!("{}=:pk", names.safe(&index.pk.name));

        // sort key: prefix, range, or nothing
        if let Some(sk) = &index.sk
            && let Some(sk_key) = sk.key_fields(type_name)
        {
            let mut parts = Vec::with_capacity(sk_key.len());
            for kf in sk_key.iter() {
                let part = match &kf.source {
                    KeySource::Literal(literal) => Some(literal.clone()),
                    KeySource::Field(name) => query
                        .fields
                        .get(name)
                        .filter(|v| v.is_scalar() && !v.is_zero())
                        .and_then(AttributeValue::as_key_text),
                };
                let Some(part) = part else {
                    break;
                };
                if let Some(name) = kf.field_name() {
                    consumed.insert(name);
                }
                let wildcard = self.codec.chars().strip_wildcard(&part).is_some();
                parts.push(Some(part));
                if wildcard {
                    break;
                }
            }
            parts.resize(sk_key.len(), None);

            if let Some(condition) = self.codec.encode_query(type_name, &parts) {
                let sk_name = names.safe(&sk.name);
                let op = query.key_op.unwrap_or_default();

                if condition.prefix {
                    if op != KeyOp::Eq {
                        return Err(PlanError::PrefixWithRangeHint {
                            attribute: sk.name.clone(),
                            op,
                        });
                    }
                    key_condition.push_str(&format!(" AND begins_with({sk_name},:sk)"));
                } else {
                    key_condition.push_str(&format!(" AND {sk_name}{op}:sk"));
                }
                values.insert(
                    ":sk".to_string(),
                    key_value(sk, sk_key, condition.value, condition.prefix),
                );
            }
        }

        let filter = self.filter(query, &consumed, &mut names, &mut values);

        let plan = QueryPlan {
            type_name: type_name.to_string(),
            index_name: index.store_name().map(str::to_string),
            key_condition,
            filter,
            names,
            values,
            scan_forward: selection.scan_forward,
            consistent_read: selection.consistent_read,
            limit: self.limits.clamp(query.page_size),
            exclusive_start_key: start_key,
        };

        tracing::debug!(
            type_name = %plan.type_name,
            index = plan.index_name.as_deref().unwrap_or("primary"),
            key_condition = %plan.key_condition,
            filtered = plan.filter.is_some(),
            limit = plan.limit,
            "query planned"
        );

        Ok(plan)
    }

    // Populated, persisted, scalar fields not consumed by the key condition
    // become ANDed filter terms.
    fn filter(
        &self,
        query: &ListQuery,
        consumed: &BTreeSet<&str>,
        names: &mut ExpressionNames,
        values: &mut BTreeMap<String, AttributeValue>,
    ) -> Option<String> {
        let chars = self.codec.chars();
        let mut terms = Vec::new();

        for (field, value) in query.populated() {
            if consumed.contains(field) || !value.is_scalar() {
                continue;
            }
            if self.schema.kind(field) == FieldKind::Nested {
                continue;
            }
            let Some(stored) = self.schema.storage_name(field) else {
                continue;
            };

            let placeholder = format!(":f{}", terms.len());
            let term = match value {
                AttributeValue::S(text) => match chars.strip_wildcard(text) {
                    Some("") => continue,
                    Some(prefix) => {
                        values.insert(placeholder.clone(), AttributeValue::text(prefix));
                        format!("begins_with({},{placeholder})", names.safe(stored))
                    }
                    None => {
                        values.insert(placeholder.clone(), value.clone());
                        format!("{}={placeholder}", names.safe(stored))
                    }
                },
                _ => {
                    values.insert(placeholder.clone(), value.clone());
                    format!("{}={placeholder}", names.safe(stored))
                }
            };
            terms.push(term);
        }

        (!terms.is_empty()).then(|| terms.join(" AND "))
    }
}

// Single-field keys on a numeric attribute are written as numbers; every
// composite or prefix value is text.
fn key_value(
    attribute: &KeyAttribute,
    key: &CompositeKey,
    value: String,
    prefix: bool,
) -> AttributeValue {
    if attribute.scalar_type == ScalarType::N && !key.is_composite() && !prefix {
        AttributeValue::N(value)
    } else {
        AttributeValue::S(value)
    }
}

///
/// TESTS
///
