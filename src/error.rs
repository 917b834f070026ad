//! Error and issue types.
//!
//! [`RotationError`] covers API misuse and malformed input; it is returned
//! through `Result`. [`Issue`] covers conditions a stage recovers from
//! locally (an empty slot, a clash left for review); issues are collected
//! into stage outcomes and never abort a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DayCategory, GroupId, MonthKey, PersonId};

/// Fatal errors returned by roster mutations, parsing and the session API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    /// Group ids are limited to 1..=4.
    #[error("group {0} is outside the supported range 1..=4")]
    InvalidGroup(u8),

    /// The person is already on the roster.
    #[error("{person} is already on the {category} roster of group {group}")]
    DuplicatePerson {
        person: PersonId,
        group: GroupId,
        category: DayCategory,
    },

    /// The person is not on the roster.
    #[error("{person} is not on the {category} roster of group {group}")]
    UnknownPerson {
        person: PersonId,
        group: GroupId,
        category: DayCategory,
    },

    /// The person is not a member of the group at all.
    #[error("{person} is not a member of group {group}")]
    NotAMember { person: PersonId, group: GroupId },

    /// Reorder target beyond the roster end.
    #[error("position {position} is out of bounds for a roster of {len}")]
    PositionOutOfBounds { position: usize, len: usize },

    /// Range end precedes its start.
    #[error("invalid date range {start}..={end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Missing period ends before it starts.
    #[error("missing period for {person} ends ({end}) before it starts ({start})")]
    InvalidMissingPeriod {
        person: PersonId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Text is not a `YYYY-MM` month key.
    #[error("invalid month key: {0:?}")]
    InvalidMonthKey(String),

    /// Text is not a `Name (Group N)` assignee.
    #[error("invalid assignee: {0:?}")]
    InvalidAssignee(String),

    /// `commit` was called with no preview pending.
    #[error("no stage preview is pending")]
    NothingToCommit,

    /// Every stage of the session has been committed.
    #[error("the planning session has no stages left")]
    SessionFinished,
}

/// Conditions recovered locally within the detecting stage.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Issue {
    /// Every candidate was unavailable; the slot stays unassigned.
    #[error("no eligible {category} person for group {group} on {date}")]
    NoEligiblePerson {
        date: NaiveDate,
        group: GroupId,
        category: DayCategory,
    },

    /// No swap partner was found in range or across the month boundary.
    #[error(
        "{person} (group {group}) has {category} duty on {date} next to {neighbor_category} duty on {neighbor_date}"
    )]
    UnresolvedConflict {
        date: NaiveDate,
        group: GroupId,
        person: PersonId,
        category: DayCategory,
        neighbor_date: NaiveDate,
        neighbor_category: DayCategory,
    },

    /// No seed derivable by any strategy; rotation starts at index 0.
    #[error("no {category} rotation seed for group {group} in {month}; starting at the top")]
    MissingSeed {
        category: DayCategory,
        group: GroupId,
        month: MonthKey,
    },

    /// A remembered seed name is no longer on the roster.
    #[error("{category} seed {name} for group {group} is not on the roster; using day count")]
    MalformedRosterReference {
        category: DayCategory,
        group: GroupId,
        name: PersonId,
    },

    /// A cross-month obligation could not be honoured.
    #[error("{person} is bound to group {group} on {date} but is unavailable")]
    ObligationUnmet {
        date: NaiveDate,
        group: GroupId,
        person: PersonId,
    },

    /// A weekend month-skip found nobody to take the slot.
    #[error("no replacement for {person} (group {group}) on {date} after month skip")]
    MonthSkipExhausted {
        date: NaiveDate,
        group: GroupId,
        person: PersonId,
    },

    /// A return-from-missing cascade would place someone on a day they cannot serve.
    #[error("reinsertion of {person} (group {group}) on {date} blocked: {detail}")]
    ReinsertionBlocked {
        date: NaiveDate,
        group: GroupId,
        person: PersonId,
        detail: String,
    },
}

impl Issue {
    /// Whether an operator must look at this before trusting the calendar.
    pub fn needs_review(&self) -> bool {
        !matches!(
            self,
            Issue::MissingSeed { .. } | Issue::MalformedRosterReference { .. }
        )
    }

    /// The slot this issue concerns, if any.
    pub fn slot(&self) -> Option<(NaiveDate, GroupId)> {
        match self {
            Issue::NoEligiblePerson { date, group, .. }
            | Issue::UnresolvedConflict { date, group, .. }
            | Issue::ObligationUnmet { date, group, .. }
            | Issue::MonthSkipExhausted { date, group, .. }
            | Issue::ReinsertionBlocked { date, group, .. } => Some((*date, *group)),
            Issue::MissingSeed { .. } | Issue::MalformedRosterReference { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    #[test]
    fn test_issue_review_flags() {
        let g = GroupId::new(1).unwrap();
        let conflict = Issue::UnresolvedConflict {
            date: d(2),
            group: g,
            person: PersonId::new("Alex"),
            category: DayCategory::Normal,
            neighbor_date: d(1),
            neighbor_category: DayCategory::Weekend,
        };
        assert!(conflict.needs_review());
        assert_eq!(conflict.slot(), Some((d(2), g)));

        let seed = Issue::MissingSeed {
            category: DayCategory::Normal,
            group: g,
            month: MonthKey::of(d(1)),
        };
        assert!(!seed.needs_review());
        assert_eq!(seed.slot(), None);
    }

    #[test]
    fn test_error_messages() {
        let err = RotationError::InvalidGroup(7);
        assert_eq!(err.to_string(), "group 7 is outside the supported range 1..=4");

        let issue = Issue::NoEligiblePerson {
            date: d(7),
            group: GroupId::new(2).unwrap(),
            category: DayCategory::Weekend,
        };
        assert_eq!(
            issue.to_string(),
            "no eligible weekend person for group 2 on 2026-02-07"
        );
    }
}
