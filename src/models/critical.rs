//! Operator-anchored assignments.
//!
//! History is append-only: recalculation never removes an entry. When a
//! slot has several anchors the latest one wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{GroupId, PersonId};

/// A manually anchored (date, group) → person pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalAssignment {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Anchored person.
    pub person: PersonId,
    /// Operator note.
    pub note: String,
}

/// Append-only anchor history keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalAssignments {
    entries: BTreeMap<NaiveDate, Vec<CriticalAssignment>>,
}

impl CriticalAssignments {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors a person to a slot.
    pub fn anchor(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        person: impl Into<PersonId>,
        note: impl Into<String>,
    ) {
        self.entries.entry(date).or_default().push(CriticalAssignment {
            date,
            group,
            person: person.into(),
            note: note.into(),
        });
    }

    /// The effective anchor for a slot.
    pub fn for_slot(&self, date: NaiveDate, group: GroupId) -> Option<&CriticalAssignment> {
        self.entries
            .get(&date)
            .and_then(|list| list.iter().rev().find(|c| c.group == group))
    }

    /// Every anchor recorded on a date, oldest first.
    pub fn on(&self, date: NaiveDate) -> &[CriticalAssignment] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates the full history ascending by date.
    pub fn iter(&self) -> impl Iterator<Item = &CriticalAssignment> {
        self.entries.values().flatten()
    }

    /// Whether nothing has been anchored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_anchor_wins() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let g1 = GroupId::new(1).unwrap();
        let g2 = GroupId::new(2).unwrap();

        let mut c = CriticalAssignments::new();
        c.anchor(date, g1, "A", "inspection");
        c.anchor(date, g2, "X", "");
        c.anchor(date, g1, "B", "replaces A");

        assert_eq!(c.for_slot(date, g1).unwrap().person.as_str(), "B");
        assert_eq!(c.for_slot(date, g2).unwrap().person.as_str(), "X");
        assert_eq!(c.on(date).len(), 3);
        assert_eq!(c.iter().count(), 3);
        assert!(c.for_slot(date.succ_opt().unwrap(), g1).is_none());
    }
}
