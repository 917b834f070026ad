//! Assignment table model.
//!
//! A schedule table maps each date to its category and the person holding
//! each group's slot. The same type stores both the baseline (pure
//! rotation, write-once) and the final (conflict-resolved) calendars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DateRange, DayCategory, GroupId, PersonId};

/// The slots of one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAssignment {
    /// Category of the date.
    pub category: DayCategory,
    /// Person per group.
    pub slots: BTreeMap<GroupId, PersonId>,
}

impl DayAssignment {
    /// Creates an empty day.
    pub fn new(category: DayCategory) -> Self {
        Self {
            category,
            slots: BTreeMap::new(),
        }
    }
}

/// Per-date, per-group assignment table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTable {
    days: BTreeMap<NaiveDate, DayAssignment>,
}

impl ScheduleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Person holding (date, group).
    pub fn get(&self, date: NaiveDate, group: GroupId) -> Option<&PersonId> {
        self.days.get(&date).and_then(|d| d.slots.get(&group))
    }

    /// Whether `person` holds (date, group).
    pub fn holds(&self, date: NaiveDate, group: GroupId, person: &PersonId) -> bool {
        self.get(date, group) == Some(person)
    }

    /// The day record for a date.
    pub fn day(&self, date: NaiveDate) -> Option<&DayAssignment> {
        self.days.get(&date)
    }

    /// Category recorded for a date.
    pub fn category(&self, date: NaiveDate) -> Option<DayCategory> {
        self.days.get(&date).map(|d| d.category)
    }

    /// Assigns a slot; returns the previous holder.
    pub fn set(
        &mut self,
        date: NaiveDate,
        category: DayCategory,
        group: GroupId,
        person: PersonId,
    ) -> Option<PersonId> {
        let day = self
            .days
            .entry(date)
            .or_insert_with(|| DayAssignment::new(category));
        day.category = category;
        day.slots.insert(group, person)
    }

    /// Assigns a slot only if it is empty. Returns whether it was written.
    pub fn set_if_absent(
        &mut self,
        date: NaiveDate,
        category: DayCategory,
        group: GroupId,
        person: PersonId,
    ) -> bool {
        if self.get(date, group).is_some() {
            return false;
        }
        self.set(date, category, group, person);
        true
    }

    /// Empties a slot; returns the previous holder.
    pub fn clear(&mut self, date: NaiveDate, group: GroupId) -> Option<PersonId> {
        let day = self.days.get_mut(&date)?;
        let previous = day.slots.remove(&group);
        if day.slots.is_empty() {
            self.days.remove(&date);
        }
        previous
    }

    /// Drops a whole day, every group included.
    pub fn remove_day(&mut self, date: NaiveDate) -> Option<DayAssignment> {
        self.days.remove(&date)
    }

    /// Exchanges the holders of (a, group) and (b, group).
    ///
    /// Empty slots are exchanged too. Both dates must already carry a
    /// category (i.e. have been assigned at least once).
    pub fn swap(&mut self, a: NaiveDate, b: NaiveDate, group: GroupId) {
        if a == b {
            return;
        }
        let (Some(cat_a), Some(cat_b)) = (self.category(a), self.category(b)) else {
            return;
        };
        let first = self.clear(a, group);
        let second = self.clear(b, group);
        if let Some(p) = second {
            self.set(a, cat_a, group, p);
        }
        if let Some(p) = first {
            self.set(b, cat_b, group, p);
        }
    }

    /// Iterates days ascending.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DayAssignment)> {
        self.days.iter().map(|(d, a)| (*d, a))
    }

    /// All (date, group, person) entries of a category within a range.
    pub fn entries_in(
        &self,
        range: DateRange,
        category: DayCategory,
    ) -> impl Iterator<Item = (NaiveDate, GroupId, &PersonId)> {
        self.days
            .range(range.start()..=range.end())
            .filter(move |(_, d)| d.category == category)
            .flat_map(|(date, d)| d.slots.iter().map(move |(g, p)| (*date, *g, p)))
    }

    /// Removes every slot of a category within a range.
    pub fn remove_category_in(&mut self, range: DateRange, category: DayCategory) {
        let dates: Vec<NaiveDate> = self
            .days
            .range(range.start()..=range.end())
            .filter(|(_, d)| d.category == category)
            .map(|(date, _)| *date)
            .collect();
        for date in dates {
            self.days.remove(&date);
        }
    }

    /// Latest (date, person) of a category for a group within a range.
    pub fn last_in(
        &self,
        range: DateRange,
        category: DayCategory,
        group: GroupId,
    ) -> Option<(NaiveDate, &PersonId)> {
        self.days
            .range(range.start()..=range.end())
            .rev()
            .filter(|(_, d)| d.category == category)
            .find_map(|(date, d)| d.slots.get(&group).map(|p| (*date, p)))
    }

    /// Most recent (date, person) of a category for a group strictly before `date`.
    pub fn latest_before(
        &self,
        date: NaiveDate,
        category: DayCategory,
        group: GroupId,
    ) -> Option<(NaiveDate, &PersonId)> {
        self.days
            .range(..date)
            .rev()
            .filter(|(_, d)| d.category == category)
            .find_map(|(day, d)| d.slots.get(&group).map(|p| (*day, p)))
    }

    /// Dates within a range on which `person` holds a category slot for a group.
    pub fn dates_of(
        &self,
        person: &PersonId,
        group: GroupId,
        range: DateRange,
        category: DayCategory,
    ) -> Vec<NaiveDate> {
        self.entries_in(range, category)
            .filter(|(_, g, p)| *g == group && *p == person)
            .map(|(d, _, _)| d)
            .collect()
    }

    /// Number of filled slots.
    pub fn assignment_count(&self) -> usize {
        self.days.values().map(|d| d.slots.len()).sum()
    }

    /// Whether the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}
