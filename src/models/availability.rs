//! Person availability seam.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DayCategory, GroupId, PersonId};

/// Why a person cannot take a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableCause {
    /// Switched off for every category.
    Disabled,
    /// Switched off for one category.
    DisabledForCategory(DayCategory),
    /// Inside a recorded missing period.
    Missing {
        /// Free-text reason (leave, course, sick...).
        reason: String,
        /// Last day of the period.
        until: NaiveDate,
    },
    /// Reported by an external predicate without detail.
    Reported,
}

impl fmt::Display for UnavailableCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableCause::Disabled => f.write_str("disabled"),
            UnavailableCause::DisabledForCategory(c) => {
                write!(f, "disabled for {} duty", c.label())
            }
            UnavailableCause::Missing { reason, until } => {
                if reason.is_empty() {
                    write!(f, "missing until {until}")
                } else {
                    write!(f, "missing ({reason}) until {until}")
                }
            }
            UnavailableCause::Reported => f.write_str("unavailable"),
        }
    }
}

/// Answers whether a person can serve a slot.
///
/// [`RosterStore`](super::RosterStore) implements this from its
/// availability flags and missing periods. Any
/// `Fn(&PersonId, GroupId, NaiveDate, DayCategory) -> bool` closure that
/// returns `true` for "unavailable" also works.
pub trait AvailabilityOracle {
    /// Returns the cause if `person` cannot serve `group` on `date`.
    fn unavailability(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> Option<UnavailableCause>;

    /// Whether `person` cannot serve `group` on `date`.
    fn is_unavailable(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> bool {
        self.unavailability(person, group, date, category).is_some()
    }
}

impl<F> AvailabilityOracle for F
where
    F: Fn(&PersonId, GroupId, NaiveDate, DayCategory) -> bool,
{
    fn unavailability(
        &self,
        person: &PersonId,
        group: GroupId,
        date: NaiveDate,
        category: DayCategory,
    ) -> Option<UnavailableCause> {
        if self(person, group, date, category) {
            Some(UnavailableCause::Reported)
        } else {
            None
        }
    }
}
