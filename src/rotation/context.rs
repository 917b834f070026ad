//! Read-only inputs of a stage run.

use chrono::NaiveDate;

use super::Stage;
use crate::config::RotationConfig;
use crate::models::{
    AvailabilityOracle, DateRange, DayCategory, DayClassifier, DutyState, GroupId, MonthKey,
    PersonId, Roster, UnavailableCause,
};

/// Everything a stage may read.
///
/// `range` is the part of `month` covered by the run. Availability is the
/// union of the roster store's own records and the optional external
/// oracle.
pub struct StageContext<'a> {
    /// Stage being computed.
    pub stage: Stage,
    /// Month being computed.
    pub month: MonthKey,
    /// Run range clipped to the month.
    pub range: DateRange,
    /// Day classifier.
    pub classifier: &'a dyn DayClassifier,
    /// External availability source, consulted after the roster store.
    pub oracle: Option<&'a dyn AvailabilityOracle>,
    /// Committed state.
    pub state: &'a DutyState,
    /// Tunables.
    pub config: &'a RotationConfig,
}

impl<'a> StageContext<'a> {
    /// Category of the stage.
    pub fn category(&self) -> DayCategory {
        self.stage.category()
    }

    /// Classifies a date.
    pub fn classify(&self, date: NaiveDate) -> DayCategory {
        self.classifier.classify(date)
    }

    /// Dates of `category` within `range`, ascending.
    pub fn dates_of(&self, category: DayCategory, range: DateRange) -> Vec<NaiveDate> {
        range.days().filter(|d| self.classify(*d) == category).collect()
    }

    /// Number of dates of `category` in `[from, to)`.
    pub fn count_between(&self, category: DayCategory, from: NaiveDate, to: NaiveDate) -> usize {
        from.iter_days()
            .take_while(|d| *d < to)
            .filter(|d| self.classify(*d) == category)
            .count()
    }

    /// The stage's own dates.
    pub fn stage_dates(&self) -> Vec<NaiveDate> {
        self.dates_of(self.category(), self.range)
    }

    /// Groups with a non-empty roster for `category`.
    pub fn groups_for(&self, category: DayCategory) -> Vec<GroupId> {
        self.state
            .rosters
            .groups()
            .filter(|g| g.roster(category).is_some_and(|r| !r.is_empty()))
            .map(|g| g.id)
            .collect()
    }

    /// Roster for (group, category).
    pub fn roster(&self, group: GroupId, category: DayCategory) -> Option<&'a Roster> {
        self.state.rosters.roster(group, category)
    }

    /// Cause if `person` cannot serve `group` on `date`.
    pub fn unavailability(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> Option<UnavailableCause> {
        self.state
            .rosters
            .unavailability(person, group, date, category)
            .or_else(|| {
                self.oracle
                    .and_then(|o| o.unavailability(person, group, date, category))
            })
    }

    /// Whether `person` can serve `group` on `date`.
    pub fn is_available(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> bool {
        self.unavailability(person, group, date, category).is_none()
    }
}
