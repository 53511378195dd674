use crate::model::index::{CompositeKey, KeyField};
use std::collections::BTreeMap;

///
/// KeySlots
///
/// Sparse slot arena for one (index, key part, record type) while setup is
/// still collecting statements. Slots are addressed by explicit position;
/// `finish` is the only way to obtain a dense [`CompositeKey`].
///

#[derive(Clone, Debug, Default)]
pub(crate) struct KeySlots {
    slots: BTreeMap<usize, KeyField>,
}

///
/// SlotConflict
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SlotConflict {
    pub existing: KeyField,
}

///
/// SlotGap
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SlotGap {
    pub position: usize,
    pub width: usize,
}

impl KeySlots {
    /// Claim one position. A position is filled at most once.
    pub(crate) fn insert(&mut self, position: usize, field: KeyField) -> Result<(), SlotConflict> {
        if let Some(existing) = self.slots.get(&position) {
            return Err(SlotConflict {
                existing: existing.clone(),
            });
        }

        self.slots.insert(position, field);
        Ok(())
    }

    /// Densify, failing on the first unfilled position below the highest one.
    pub(crate) fn finish(self) -> Result<CompositeKey, SlotGap> {
        let width = self.slots.keys().next_back().map_or(0, |last| last + 1);

        let mut dense = Vec::with_capacity(width);
        for (expected, (position, field)) in self.slots.into_iter().enumerate() {
            if position != expected {
                return Err(SlotGap {
                    position: expected,
                    width,
                });
            }
            dense.push(field);
        }

        Ok(CompositeKey::from_dense(dense))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn kf(name: &str) -> KeyField {
        KeyField::field(name.to_string())
    }

    #[test]
    fn out_of_order_inserts_densify() {
        let mut slots = KeySlots::default();
        slots.insert(1, kf("created_at")).expect("free slot");
        slots.insert(0, kf("kind")).expect("free slot");

        let key = slots.finish().expect("no gaps");
        assert_eq!(key.len(), 2);
        assert_eq!(key[0].field_name(), Some("kind"));
        assert_eq!(key[1].field_name(), Some("created_at"));
    }

    #[test]
    fn duplicate_position_reports_existing_field() {
        let mut slots = KeySlots::default();
        slots.insert(0, kf("kind")).expect("free slot");

        let conflict = slots.insert(0, kf("other")).expect_err("taken");
        assert_eq!(conflict.existing, kf("kind"));
    }

    #[test]
    fn gap_reports_first_missing_position() {
        let mut slots = KeySlots::default();
        slots.insert(0, kf("a")).expect("free slot");
        slots.insert(3, kf("d")).expect("free slot");

        assert_eq!(
            slots.finish(),
            Err(SlotGap {
                position: 1,
                width: 4
            })
        );
    }
}
