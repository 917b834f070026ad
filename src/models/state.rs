//! Persisted engine state.
//!
//! [`DutyState`] bundles everything a run reads and commits. Storage is
//! the caller's concern; the bundle serializes with serde.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    CriticalAssignments, DayCategory, GroupId, MonthKey, ObligationTable, PersonId, ReasonLedger,
    RosterStore, ScheduleTable,
};

/// Last final person of a (category, group, month).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSeed {
    /// Category.
    pub category: DayCategory,
    /// Group.
    pub group: GroupId,
    /// Month the seed was written for.
    pub month: MonthKey,
    /// Last finally-assigned person.
    pub person: PersonId,
}

/// Rotation seeds keyed by category, group and month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTable {
    seeds: BTreeMap<DayCategory, BTreeMap<GroupId, BTreeMap<MonthKey, PersonId>>>,
}

impl SeedTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed stored for a month.
    pub fn get(&self, category: DayCategory, group: GroupId, month: MonthKey) -> Option<&PersonId> {
        self.seeds
            .get(&category)
            .and_then(|g| g.get(&group))
            .and_then(|m| m.get(&month))
    }

    /// Stores a seed, replacing any previous value.
    pub fn set(&mut self, seed: RotationSeed) {
        self.seeds
            .entry(seed.category)
            .or_default()
            .entry(seed.group)
            .or_default()
            .insert(seed.month, seed.person);
    }

    /// Removes a seed.
    pub fn remove(
        &mut self,
        category: DayCategory,
        group: GroupId,
        month: MonthKey,
    ) -> Option<PersonId> {
        self.seeds
            .get_mut(&category)
            .and_then(|g| g.get_mut(&group))
            .and_then(|m| m.remove(&month))
    }

    /// Iterates all seeds.
    pub fn iter(&self) -> impl Iterator<Item = RotationSeed> + '_ {
        self.seeds.iter().flat_map(|(category, groups)| {
            groups.iter().flat_map(move |(group, months)| {
                months.iter().map(move |(month, person)| RotationSeed {
                    category: *category,
                    group: *group,
                    month: *month,
                    person: person.clone(),
                })
            })
        })
    }
}

/// All state read and written by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyState {
    /// Groups, rosters and availability.
    pub rosters: RosterStore,
    /// Rotation seeds.
    pub seeds: SeedTable,
    /// Pure-rotation assignments, write-once.
    pub baseline: ScheduleTable,
    /// Committed, conflict-resolved assignments.
    pub finals: ScheduleTable,
    /// Reasons for every deviation from baseline.
    pub reasons: ReasonLedger,
    /// Cross-month bindings.
    pub obligations: ObligationTable,
    /// Operator anchors.
    pub critical: CriticalAssignments,
}

impl DutyState {
    /// Creates an empty state around a roster store.
    pub fn new(rosters: RosterStore) -> Self {
        Self {
            rosters,
            ..Self::default()
        }
    }

    /// Anchors a person to a slot. Takes effect from the next stage run.
    pub fn anchor(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        person: impl Into<PersonId>,
        note: impl Into<String>,
    ) {
        self.critical.anchor(date, group, person, note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_table() {
        let g = GroupId::new(1).unwrap();
        let feb = MonthKey::new(2026, 2).unwrap();
        let mut seeds = SeedTable::new();
        seeds.set(RotationSeed {
            category: DayCategory::Normal,
            group: g,
            month: feb,
            person: "D".into(),
        });
        assert_eq!(seeds.get(DayCategory::Normal, g, feb).unwrap().as_str(), "D");
        assert!(seeds.get(DayCategory::Weekend, g, feb).is_none());
        assert!(seeds.get(DayCategory::Normal, g, feb.next()).is_none());
        assert_eq!(seeds.iter().count(), 1);

        assert!(seeds.remove(DayCategory::Normal, g, feb).is_some());
        assert!(seeds.get(DayCategory::Normal, g, feb).is_none());
    }

    #[test]
    fn test_state_json_round_trip() {
        let g = GroupId::new(2).unwrap();
        let rosters = RosterStore::new().with_roster(g, DayCategory::Weekend, ["A", "B"]);
        let mut state = DutyState::new(rosters);
        let date = NaiveDate::from_ymd_opt(2026, 2, 7).unwrap();
        state.finals.set(date, DayCategory::Weekend, g, "A".into());
        state.seeds.set(RotationSeed {
            category: DayCategory::Weekend,
            group: g,
            month: MonthKey::of(date),
            person: "A".into(),
        });
        state.anchor(date, g, "A", "cover");

        let json = serde_json::to_string(&state).unwrap();
        let back: DutyState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
