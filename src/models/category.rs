//! Day categories and the adjacency conflict relation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a calendar day.
///
/// Variant order is pipeline order: special holidays are assigned first,
/// normal days last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayCategory {
    /// Special (major) holiday.
    Special,
    /// Weekend day or ordinary public holiday.
    Weekend,
    /// Working day before a non-working day.
    Semi,
    /// Ordinary working day.
    Normal,
}

impl DayCategory {
    /// All categories in pipeline order.
    pub const ALL: [DayCategory; 4] = [
        DayCategory::Special,
        DayCategory::Weekend,
        DayCategory::Semi,
        DayCategory::Normal,
    ];

    /// Whether one person may not hold duties of these two categories on
    /// adjacent days.
    ///
    /// Conflicting pairs: normal↔semi, normal↔weekend, normal↔special,
    /// semi↔weekend, semi↔special. Same-category neighbours and
    /// weekend↔special never conflict.
    pub fn conflicts_with(self, other: DayCategory) -> bool {
        use DayCategory::*;
        matches!(
            (self, other),
            (Normal, Semi)
                | (Semi, Normal)
                | (Normal, Weekend)
                | (Weekend, Normal)
                | (Normal, Special)
                | (Special, Normal)
                | (Semi, Weekend)
                | (Weekend, Semi)
                | (Semi, Special)
                | (Special, Semi)
        )
    }

    /// Whether the day is non-working (weekend, holiday or special holiday).
    pub fn is_non_working(self) -> bool {
        matches!(self, DayCategory::Special | DayCategory::Weekend)
    }

    /// Human-readable label used in reason texts.
    pub fn label(self) -> &'static str {
        match self {
            DayCategory::Special => "special holiday",
            DayCategory::Weekend => "weekend/holiday",
            DayCategory::Semi => "semi-normal",
            DayCategory::Normal => "normal",
        }
    }
}

impl fmt::Display for DayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            DayCategory::Special => "special",
            DayCategory::Weekend => "weekend",
            DayCategory::Semi => "semi",
            DayCategory::Normal => "normal",
        };
        f.write_str(key)
    }
}
