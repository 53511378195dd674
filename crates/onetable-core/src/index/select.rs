//! Index selection for one list-query shape.
//!
//! Selection is a pure function of the populated query fields and the
//! registry. Candidates must fully satisfy their partition key; the winner
//! is ranked by pinned sort slots, then preferred slots, then (when the
//! consistency policy cares) consistent-read support. Remaining ties go to
//! the primary index, then to index name order.

use crate::{
    consistency::ConsistencyType,
    error::{ErrorClass, ErrorOrigin, InternalError},
    index::IndexRegistry,
    key::KeyChars,
    model::index::{CompositeKey, Index, KeySource},
    value::{AttributeValue, Fields},
};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// SelectError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SelectError {
    #[error("no index available for query shape of {type_name}")]
    NoIndex { type_name: String },

    #[error("index {index} cannot serve consistent reads required by {type_name}")]
    ConsistencyUnsupported { index: String, type_name: String },
}

impl From<SelectError> for InternalError {
    fn from(err: SelectError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Index, err.to_string())
    }
}

///
/// QueryShape
///
/// The inputs selection looks at: record type, populated query fields,
/// an optional direction override, and the consistency policy.
///

#[derive(Clone, Copy, Debug)]
pub struct QueryShape<'a> {
    pub type_name: &'a str,
    pub fields: &'a Fields,
    pub ascending: Option<bool>,
    pub consistency: ConsistencyType,
}

///
/// Selection
///

#[derive(Clone, Copy, Debug)]
pub struct Selection<'a> {
    pub index: &'a Index,
    /// `None` leaves the direction to the store default.
    pub scan_forward: Option<bool>,
    pub consistent_read: bool,
}

///
/// Score
///
/// Ranking tuple for one candidate; compared field by field.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct Score {
    sort_slots: usize,
    preferred: usize,
    consistent: bool,
}

/// Pick the index serving a query shape.
pub fn select_index<'a>(
    registry: &'a IndexRegistry,
    shape: &QueryShape<'_>,
    chars: KeyChars,
) -> Result<Selection<'a>, SelectError> {
    let mut best: Option<(&Index, Score)> = None;

    for index in registry.iter() {
        let Some(score) = score(index, shape, chars) else {
            continue;
        };

        // Registry order is primary first, then by name; only a strictly
        // better score displaces an earlier candidate.
        let better = best
            .as_ref()
            .is_none_or(|(_, current)| score.cmp(current) == Ordering::Greater);
        if better {
            best = Some((index, score));
        }
    }

    let Some((index, _)) = best else {
        return Err(SelectError::NoIndex {
            type_name: shape.type_name.to_string(),
        });
    };

    if shape.consistency == ConsistencyType::Required && !index.consistent_reads {
        return Err(SelectError::ConsistencyUnsupported {
            index: index.to_string(),
            type_name: shape.type_name.to_string(),
        });
    }

    let default_direction = index
        .sk
        .as_ref()
        .and_then(|sk| sk.key_fields(shape.type_name))
        .and_then(|key| key.first())
        .and_then(|kf| kf.order.scan_forward());

    Ok(Selection {
        index,
        scan_forward: shape.ascending.or(default_direction),
        consistent_read: shape.consistency.consistent_read(index.consistent_reads),
    })
}

// `None` when the partition key cannot be fully resolved.
fn score(index: &Index, shape: &QueryShape<'_>, chars: KeyChars) -> Option<Score> {
    let pk = index.pk.key_fields(shape.type_name)?;
    if !pk
        .iter()
        .all(|kf| slot_value(&kf.source, shape.fields, chars) == Some(SlotValue::Exact))
    {
        return None;
    }

    let mut preferred = pk.iter().filter(|kf| kf.preferred).count();
    let mut sort_slots = 0;
    if let Some(sk) = index.sk.as_ref().and_then(|sk| sk.key_fields(shape.type_name)) {
        let (pinned, pinned_preferred) = leading_sort_slots(sk, shape.fields, chars);
        sort_slots = pinned;
        preferred += pinned_preferred;
    }

    Some(Score {
        sort_slots,
        preferred,
        consistent: shape.consistency.favors_consistent_index() && index.consistent_reads,
    })
}

// Count contiguous satisfied sort slots from the front; a wildcard prefix
// counts but ends the run.
fn leading_sort_slots(key: &CompositeKey, fields: &Fields, chars: KeyChars) -> (usize, usize) {
    let mut pinned = 0;
    let mut preferred = 0;

    for kf in key.iter() {
        let Some(value) = slot_value(&kf.source, fields, chars) else {
            break;
        };
        pinned += 1;
        if kf.preferred {
            preferred += 1;
        }
        if value == SlotValue::Prefix {
            break;
        }
    }

    (pinned, preferred)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SlotValue {
    Exact,
    Prefix,
}

fn slot_value(source: &KeySource, fields: &Fields, chars: KeyChars) -> Option<SlotValue> {
    let name = match source {
        KeySource::Literal(_) => return Some(SlotValue::Exact),
        KeySource::Field(name) => name,
    };

    let value = fields.get(name).filter(|v| v.is_scalar() && !v.is_zero())?;
    match value {
        AttributeValue::S(text) => match chars.strip_wildcard(text) {
            Some("") => None,
            Some(_) => Some(SlotValue::Prefix),
            None => Some(SlotValue::Exact),
        },
        _ => Some(SlotValue::Exact),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::record::RecordType,
        schema::SchemaDescriptor,
        testing::fixtures::{Order, User, table_description},
    };

    fn registry() -> IndexRegistry {
        let user = SchemaDescriptor::build(&RecordType::of::<User>()).expect("user schema");
        let order = SchemaDescriptor::build(&RecordType::of::<Order>()).expect("order schema");

        IndexRegistry::build(&table_description(), &[&user, &order], chars()).expect("registry")
    }

    fn chars() -> KeyChars {
        KeyChars::new(':', Some('*')).expect("valid chars")
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), AttributeValue::text(*v)))
            .collect()
    }

    fn shape<'a>(type_name: &'a str, fields: &'a Fields) -> QueryShape<'a> {
        QueryShape {
            type_name,
            fields,
            ascending: None,
            consistency: ConsistencyType::Indifferent,
        }
    }

    #[test]
    fn partition_only_query_selects_primary() {
        let registry = registry();
        let fields = fields(&[("tenant_id", "t1")]);

        let selection = select_index(&registry, &shape("Order", &fields), chars()).expect("index");
        assert!(selection.index.is_primary());
        assert_eq!(selection.scan_forward, Some(true));
        assert!(!selection.consistent_read);
    }

    #[test]
    fn unsatisfied_partition_key_fails() {
        let registry = registry();
        let fields = fields(&[("kind", "order")]);

        let err = select_index(&registry, &shape("Order", &fields), chars()).expect_err("no pk");
        assert_eq!(
            err,
            SelectError::NoIndex {
                type_name: "Order".into()
            }
        );
    }

    #[test]
    fn wildcard_partition_value_is_not_satisfiable() {
        let registry = registry();
        let fields = fields(&[("tenant_id", "t*")]);

        assert!(select_index(&registry, &shape("Order", &fields), chars()).is_err());
    }

    #[test]
    fn more_pinned_sort_slots_win() {
        let registry = registry();
        // Both primary (tenant_id) and gsi1 (id) are satisfiable; the primary
        // sort key pins `kind`, gsi1 pins nothing.
        let fields = fields(&[("tenant_id", "t1"), ("id", "o1"), ("kind", "order")]);

        let selection = select_index(&registry, &shape("Order", &fields), chars()).expect("index");
        assert!(selection.index.is_primary());
    }

    #[test]
    fn preferred_slot_breaks_ties() {
        let registry = registry();
        // Order marks `id` preferred on gsi1; with no sort slots pinned
        // anywhere, gsi1 outranks the primary index.
        let fields = fields(&[("tenant_id", "t1"), ("id", "o1")]);

        let selection = select_index(&registry, &shape("Order", &fields), chars()).expect("index");
        assert_eq!(selection.index.name, "gsi1");
    }

    #[test]
    fn required_consistency_on_global_index_is_rejected() {
        let registry = registry();
        let fields = fields(&[("email", "a@b.c")]);
        let mut shape = shape("User", &fields);
        shape.consistency = ConsistencyType::Required;

        let err = select_index(&registry, &shape, chars()).expect_err("gsi only");
        assert!(matches!(err, SelectError::ConsistencyUnsupported { .. }));
    }

    #[test]
    fn preferred_consistency_falls_back_on_global_index() {
        let registry = registry();
        let fields = fields(&[("email", "a@b.c"), ("tenant", "t1")]);
        let mut shape = shape("User", &fields);
        shape.consistency = ConsistencyType::Preferred;

        let selection = select_index(&registry, &shape, chars()).expect("index");
        assert_eq!(selection.index.name, "gsi1");
        assert!(!selection.consistent_read);
    }

    #[test]
    fn explicit_direction_overrides_index_default() {
        let registry = registry();
        let fields = fields(&[("tenant_id", "t1")]);
        let mut shape = shape("Order", &fields);
        shape.ascending = Some(false);

        let selection = select_index(&registry, &shape, chars()).expect("index");
        assert_eq!(selection.scan_forward, Some(false));
    }

    #[test]
    fn selection_is_deterministic() {
        let registry = registry();
        let fields = fields(&[("tenant_id", "t1"), ("kind", "order"), ("id", "o1")]);

        let a = select_index(&registry, &shape("Order", &fields), chars()).expect("index");
        let b = select_index(&registry, &shape("Order", &fields), chars()).expect("index");
        assert_eq!(a.index.name, b.index.name);
        assert_eq!(a.scan_forward, b.scan_forward);
        assert_eq!(a.consistent_read, b.consistent_read);
    }
}
