//! Roster model.
//!
//! A roster is the ordered, duplicate-free list of people who rotate through
//! one (group, category) pair. Order is priority: position 0 has priority 1.
//! Every mutation renumbers priorities to match the new order.
//!
//! A [`Group`] owns four rosters plus per-person availability flags and
//! missing periods; [`RosterStore`] holds the groups and answers
//! availability queries for the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{AvailabilityOracle, DayCategory, GroupId, PersonId, UnavailableCause};
use crate::error::RotationError;

/// One roster position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// The person.
    pub person: PersonId,
    /// Priority number (1 = first in rotation).
    pub priority: u32,
}

/// Ordered, duplicate-free rotation list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from names in priority order, dropping repeats.
    pub fn from_people<I, P>(people: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PersonId>,
    {
        let mut roster = Self::new();
        for person in people {
            let person = person.into();
            if roster.position(&person).is_none() {
                roster.entries.push(RosterEntry { person, priority: 0 });
            }
        }
        roster.renumber();
        roster
    }

    /// Number of people.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in priority order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// People in priority order.
    pub fn people(&self) -> impl Iterator<Item = &PersonId> {
        self.entries.iter().map(|e| &e.person)
    }

    /// Person at a roster position.
    pub fn get(&self, index: usize) -> Option<&PersonId> {
        self.entries.get(index).map(|e| &e.person)
    }

    /// Person at a rotation index (wraps around).
    pub fn at_rotation(&self, index: usize) -> Option<&PersonId> {
        if self.entries.is_empty() {
            return None;
        }
        self.get(index % self.entries.len())
    }

    /// Position of a person, matching names after normalization.
    pub fn position(&self, person: &PersonId) -> Option<usize> {
        let key = person.normalized();
        self.entries
            .iter()
            .position(|e| e.person == *person || e.person.normalized() == key)
    }

    /// Whether the person is on the roster.
    pub fn contains(&self, person: &PersonId) -> bool {
        self.position(person).is_some()
    }

    /// Priority number of a person.
    pub fn priority(&self, person: &PersonId) -> Option<u32> {
        self.position(person).map(|i| self.entries[i].priority)
    }

    fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.priority = i as u32 + 1;
        }
    }

    fn insert_at(&mut self, position: usize, person: PersonId) -> bool {
        if self.contains(&person) {
            return false;
        }
        let position = position.min(self.entries.len());
        self.entries
            .insert(position, RosterEntry { person, priority: 0 });
        self.renumber();
        true
    }

    fn remove_person(&mut self, person: &PersonId) -> Option<PersonId> {
        let index = self.position(person)?;
        let entry = self.entries.remove(index);
        self.renumber();
        Some(entry.person)
    }

    fn move_to(&mut self, person: &PersonId, position: usize) -> Option<()> {
        let index = self.position(person)?;
        let entry = self.entries.remove(index);
        self.entries.insert(position, entry);
        self.renumber();
        Some(())
    }
}

/// Availability switches for one person in one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Off for every category.
    pub disabled: bool,
    /// Off for these categories only.
    pub disabled_categories: BTreeSet<DayCategory>,
}

impl Availability {
    /// Available for everything.
    pub fn available() -> Self {
        Self::default()
    }

    /// Off entirely.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            disabled_categories: BTreeSet::new(),
        }
    }

    /// Off for the given categories.
    pub fn disabled_for(categories: impl IntoIterator<Item = DayCategory>) -> Self {
        Self {
            disabled: false,
            disabled_categories: categories.into_iter().collect(),
        }
    }

    /// Cause if the person may not serve `category`.
    pub fn blocks(&self, category: DayCategory) -> Option<UnavailableCause> {
        if self.disabled {
            Some(UnavailableCause::Disabled)
        } else if self.disabled_categories.contains(&category) {
            Some(UnavailableCause::DisabledForCategory(category))
        } else {
            None
        }
    }
}

/// A span during which a person is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingPeriod {
    /// First absent day (inclusive).
    pub start: NaiveDate,
    /// Last absent day (inclusive).
    pub end: NaiveDate,
    /// Free-text reason.
    pub reason: String,
}

impl MissingPeriod {
    /// Creates a missing period.
    pub fn new(start: NaiveDate, end: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Whether the period covers `date`.
    #[inline]
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A duty group: four rosters plus availability records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identity.
    pub id: GroupId,
    /// One roster per category.
    pub rosters: BTreeMap<DayCategory, Roster>,
    /// Availability switches by person.
    pub availability: BTreeMap<PersonId, Availability>,
    /// Absences by person.
    pub missing: BTreeMap<PersonId, Vec<MissingPeriod>>,
}

impl Group {
    /// Creates a group with empty rosters.
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            rosters: DayCategory::ALL
                .iter()
                .map(|c| (*c, Roster::new()))
                .collect(),
            availability: BTreeMap::new(),
            missing: BTreeMap::new(),
        }
    }

    /// Roster for a category.
    pub fn roster(&self, category: DayCategory) -> Option<&Roster> {
        self.rosters.get(&category)
    }

    /// Whether the person is on any of this group's rosters.
    pub fn is_member(&self, person: &PersonId) -> bool {
        self.rosters.values().any(|r| r.contains(person))
    }

    fn lookup<'a, T>(map: &'a BTreeMap<PersonId, T>, person: &PersonId) -> Option<&'a T> {
        map.get(person).or_else(|| {
            let key = person.normalized();
            map.iter()
                .find(|(p, _)| p.normalized() == key)
                .map(|(_, v)| v)
        })
    }

    /// Availability switches for a person (default: available).
    pub fn availability_of(&self, person: &PersonId) -> Option<&Availability> {
        Self::lookup(&self.availability, person)
    }

    /// Missing periods for a person.
    pub fn missing_of(&self, person: &PersonId) -> &[MissingPeriod] {
        Self::lookup(&self.missing, person)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cause if the person cannot serve `category` on `date`.
    pub fn unavailability(
        &self,
        person: &PersonId,
        date: NaiveDate,
        category: DayCategory,
    ) -> Option<UnavailableCause> {
        if let Some(cause) = self.availability_of(person).and_then(|a| a.blocks(category)) {
            return Some(cause);
        }
        self.missing_of(person)
            .iter()
            .find(|p| p.covers(date))
            .map(|p| UnavailableCause::Missing {
                reason: p.reason.clone(),
                until: p.end,
            })
    }
}

/// All groups, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStore {
    groups: BTreeMap<GroupId, Group>,
}

impl RosterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a full roster in one call (builder style, drops repeats).
    pub fn with_roster<I, P>(mut self, group: GroupId, category: DayCategory, people: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PersonId>,
    {
        self.group_mut(group)
            .rosters
            .insert(category, Roster::from_people(people));
        self
    }

    /// Group ids present, ascending.
    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.keys().copied().collect()
    }

    /// Groups, ascending by id.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    /// Looks up a group, creating it if absent.
    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        self.groups.entry(id).or_insert_with(|| Group::new(id))
    }

    /// Roster for (group, category).
    pub fn roster(&self, group: GroupId, category: DayCategory) -> Option<&Roster> {
        self.group(group).and_then(|g| g.roster(category))
    }

    /// Priority of a person on (group, category).
    pub fn priority(
        &self,
        group: GroupId,
        category: DayCategory,
        person: &PersonId,
    ) -> Option<u32> {
        self.roster(group, category).and_then(|r| r.priority(person))
    }

    fn roster_mut(&mut self, group: GroupId, category: DayCategory) -> &mut Roster {
        self.group_mut(group).rosters.entry(category).or_default()
    }

    /// Appends a person to the end of a roster.
    pub fn add_person(
        &mut self,
        group: GroupId,
        category: DayCategory,
        person: impl Into<PersonId>,
    ) -> Result<(), RotationError> {
        self.insert_person(group, category, person, usize::MAX)
    }

    /// Inserts a person at a position (clamped to the roster end).
    pub fn insert_person(
        &mut self,
        group: GroupId,
        category: DayCategory,
        person: impl Into<PersonId>,
        position: usize,
    ) -> Result<(), RotationError> {
        let person = person.into();
        if self.roster_mut(group, category).insert_at(position, person.clone()) {
            Ok(())
        } else {
            Err(RotationError::DuplicatePerson {
                person,
                group,
                category,
            })
        }
    }

    /// Removes a person from a roster.
    pub fn remove_person(
        &mut self,
        group: GroupId,
        category: DayCategory,
        person: &PersonId,
    ) -> Result<PersonId, RotationError> {
        self.roster_mut(group, category)
            .remove_person(person)
            .ok_or_else(|| RotationError::UnknownPerson {
                person: person.clone(),
                group,
                category,
            })
    }

    /// Moves a person to a new roster position.
    pub fn reorder(
        &mut self,
        group: GroupId,
        category: DayCategory,
        person: &PersonId,
        position: usize,
    ) -> Result<(), RotationError> {
        let roster = self.roster_mut(group, category);
        let len = roster.len();
        if !roster.contains(person) {
            return Err(RotationError::UnknownPerson {
                person: person.clone(),
                group,
                category,
            });
        }
        if position >= len {
            return Err(RotationError::PositionOutOfBounds { position, len });
        }
        roster.move_to(person, position);
        Ok(())
    }

    /// Moves a person, with their availability and absences, to another group.
    ///
    /// The person is removed from every roster of `from` and appended to the
    /// same-category rosters of `to`.
    pub fn transfer(
        &mut self,
        person: &PersonId,
        from: GroupId,
        to: GroupId,
    ) -> Result<(), RotationError> {
        let source = self.group(from).ok_or(RotationError::NotAMember {
            person: person.clone(),
            group: from,
        })?;
        if !source.is_member(person) {
            return Err(RotationError::NotAMember {
                person: person.clone(),
                group: from,
            });
        }
        if from == to {
            return Ok(());
        }

        let categories: Vec<DayCategory> = source
            .rosters
            .iter()
            .filter(|(_, r)| r.contains(person))
            .map(|(c, _)| *c)
            .collect();
        for category in &categories {
            if self
                .roster(to, *category)
                .is_some_and(|r| r.contains(person))
            {
                return Err(RotationError::DuplicatePerson {
                    person: person.clone(),
                    group: to,
                    category: *category,
                });
            }
        }

        let source = self.group_mut(from);
        let mut canonical = person.clone();
        for category in &categories {
            if let Some(removed) = source
                .rosters
                .get_mut(category)
                .and_then(|r| r.remove_person(person))
            {
                canonical = removed;
            }
        }
        let availability = source.availability.remove(&canonical);
        let missing = source.missing.remove(&canonical);

        let target = self.group_mut(to);
        for category in categories {
            target
                .rosters
                .entry(category)
                .or_default()
                .insert_at(usize::MAX, canonical.clone());
        }
        if let Some(a) = availability {
            target.availability.insert(canonical.clone(), a);
        }
        if let Some(m) = missing {
            target.missing.entry(canonical).or_default().extend(m);
        }
        Ok(())
    }

    /// Replaces a person's availability switches.
    pub fn set_availability(
        &mut self,
        group: GroupId,
        person: impl Into<PersonId>,
        availability: Availability,
    ) {
        self.group_mut(group)
            .availability
            .insert(person.into(), availability);
    }

    /// Switches a person off entirely.
    pub fn disable(&mut self, group: GroupId, person: impl Into<PersonId>) {
        self.set_availability(group, person, Availability::disabled());
    }

    /// Switches a person off for one category.
    pub fn disable_for(
        &mut self,
        group: GroupId,
        person: impl Into<PersonId>,
        category: DayCategory,
    ) {
        self.group_mut(group)
            .availability
            .entry(person.into())
            .or_default()
            .disabled_categories
            .insert(category);
    }

    /// Clears every availability switch for a person.
    pub fn enable(&mut self, group: GroupId, person: &PersonId) {
        self.group_mut(group).availability.remove(person);
    }

    /// Records an absence.
    pub fn add_missing_period(
        &mut self,
        group: GroupId,
        person: impl Into<PersonId>,
        period: MissingPeriod,
    ) -> Result<(), RotationError> {
        let person = person.into();
        if period.end < period.start {
            return Err(RotationError::InvalidMissingPeriod {
                person,
                start: period.start,
                end: period.end,
            });
        }
        self.group_mut(group)
            .missing
            .entry(person)
            .or_default()
            .push(period);
        Ok(())
    }
}

impl AvailabilityOracle for RosterStore {
    fn unavailability(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> Option<UnavailableCause> {
        self.group(group)
            .and_then(|g| g.unavailability(person, date, category))
    }
}
