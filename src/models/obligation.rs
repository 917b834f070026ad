//! Cross-month obligations.
//!
//! When a swap partner is taken from the following month, the displaced
//! person is bound to that future slot. The next month's run reads the
//! binding and places them there ahead of rotation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DateRange, DayCategory, GroupId, PersonId};

/// A binding of a person to a future (date, group) slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossMonthObligation {
    /// The future slot date.
    pub date: NaiveDate,
    /// Group of the slot.
    pub group: GroupId,
    /// Category of the future slot.
    pub category: DayCategory,
    /// Person who must occupy it.
    pub person: PersonId,
    /// Person who took over the person's home slot.
    pub partner: PersonId,
    /// The home slot date that was surrendered.
    pub origin_date: NaiveDate,
    /// Category of the originating stage.
    pub origin_category: DayCategory,
    /// Adjacent date that caused the original conflict.
    pub conflict_date: Option<NaiveDate>,
    /// Pair id shared with the originating swap reasons.
    pub swap_pair_id: String,
    /// Set once a later run has placed the person.
    pub fulfilled: bool,
}

/// Obligations keyed by future date and group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationTable {
    entries: BTreeMap<NaiveDate, BTreeMap<GroupId, CrossMonthObligation>>,
}

impl ObligationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an obligation, replacing any binding for the same slot.
    pub fn register(&mut self, obligation: CrossMonthObligation) -> Option<CrossMonthObligation> {
        self.entries
            .entry(obligation.date)
            .or_default()
            .insert(obligation.group, obligation)
    }

    /// Binding for a slot.
    pub fn get(&self, date: NaiveDate, group: GroupId) -> Option<&CrossMonthObligation> {
        self.entries.get(&date).and_then(|g| g.get(&group))
    }

    /// Whether a slot is bound.
    pub fn is_bound(&self, date: NaiveDate, group: GroupId) -> bool {
        self.get(date, group).is_some()
    }

    /// Marks a binding as honoured. Returns whether one existed.
    pub fn mark_fulfilled(&mut self, date: NaiveDate, group: GroupId) -> bool {
        match self.entries.get_mut(&date).and_then(|g| g.get_mut(&group)) {
            Some(o) => {
                o.fulfilled = true;
                true
            }
            None => false,
        }
    }

    /// Removes and returns every binding originated by a stage of
    /// `category` over `range`.
    pub fn remove_originating(
        &mut self,
        range: DateRange,
        category: DayCategory,
    ) -> Vec<CrossMonthObligation> {
        let mut removed = Vec::new();
        for groups in self.entries.values_mut() {
            let keys: Vec<GroupId> = groups
                .iter()
                .filter(|(_, o)| o.origin_category == category && range.contains(o.origin_date))
                .map(|(g, _)| *g)
                .collect();
            for key in keys {
                if let Some(o) = groups.remove(&key) {
                    removed.push(o);
                }
            }
        }
        self.entries.retain(|_, groups| !groups.is_empty());
        removed
    }

    /// Bindings whose slot falls within a range.
    pub fn in_range(&self, range: DateRange) -> impl Iterator<Item = &CrossMonthObligation> {
        self.entries
            .range(range.start()..=range.end())
            .flat_map(|(_, groups)| groups.values())
    }

    /// Iterates all bindings ascending by date then group.
    pub fn iter(&self) -> impl Iterator<Item = &CrossMonthObligation> {
        self.entries.values().flat_map(|groups| groups.values())
    }

    /// Bindings not yet honoured.
    pub fn pending(&self) -> impl Iterator<Item = &CrossMonthObligation> {
        self.iter().filter(|o| !o.fulfilled)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn g(id: u8) -> GroupId {
        GroupId::new(id).unwrap()
    }

    fn sample(origin: NaiveDate, date: NaiveDate, group: GroupId) -> CrossMonthObligation {
        CrossMonthObligation {
            date,
            group,
            category: DayCategory::Semi,
            person: "D".into(),
            partner: "A".into(),
            origin_date: origin,
            origin_category: DayCategory::Semi,
            conflict_date: Some(origin.succ_opt().unwrap()),
            swap_pair_id: "x".into(),
            fulfilled: false,
        }
    }

    #[test]
    fn test_register_and_fulfil() {
        let mut t = ObligationTable::new();
        t.register(sample(d(2, 27), d(3, 6), g(1)));
        assert!(t.is_bound(d(3, 6), g(1)));
        assert!(!t.is_bound(d(3, 6), g(2)));
        assert_eq!(t.pending().count(), 1);

        assert!(t.mark_fulfilled(d(3, 6), g(1)));
        assert!(!t.mark_fulfilled(d(3, 7), g(1)));
        assert_eq!(t.pending().count(), 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_remove_originating() {
        let mut t = ObligationTable::new();
        t.register(sample(d(2, 27), d(3, 6), g(1)));
        t.register(sample(d(2, 20), d(3, 6), g(2)));
        t.register(sample(d(1, 30), d(2, 6), g(1)));

        let feb_late = DateRange::new(d(2, 21), d(2, 28)).unwrap();
        let removed = t.remove_originating(feb_late, DayCategory::Semi);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].group, g(1));
        assert_eq!(t.len(), 2);

        let range = DateRange::new(d(1, 1), d(2, 28)).unwrap();
        let removed = t.remove_originating(range, DayCategory::Normal);
        assert!(removed.is_empty());

        let march = DateRange::new(d(3, 1), d(3, 31)).unwrap();
        assert_eq!(t.in_range(march).count(), 1);
    }
}
