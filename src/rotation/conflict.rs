//! Adjacent-day conflict detection.

use chrono::NaiveDate;

use crate::error::Issue;
use crate::models::{DayCategory, GroupId, PersonId, ScheduleTable};

/// A person holding duties of conflicting categories on adjacent days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Date of the slot being checked.
    pub date: NaiveDate,
    /// Group.
    pub group: GroupId,
    /// The person.
    pub person: PersonId,
    /// Category of `date`.
    pub category: DayCategory,
    /// Adjacent date holding the other duty.
    pub neighbor_date: NaiveDate,
    /// Category of the adjacent duty.
    pub neighbor_category: DayCategory,
}

impl Conflict {
    /// Converts into the issue reported when no swap resolves it.
    pub fn into_issue(self) -> Issue {
        Issue::UnresolvedConflict {
            date: self.date,
            group: self.group,
            person: self.person,
            category: self.category,
            neighbor_date: self.neighbor_date,
            neighbor_category: self.neighbor_category,
        }
    }
}

/// Checks whether `person` holding (`date`, `group`) as `category` clashes
/// with their own duty on the previous or next day.
///
/// Only neighbour duties whose recorded category is in `scope` count. The
/// previous day is checked first.
pub fn find_conflict(
    finals: &ScheduleTable,
    date: NaiveDate,
    group: GroupId,
    person: &PersonId,
    category: DayCategory,
    scope: &[DayCategory],
) -> Option<Conflict> {
    [date.pred_opt(), date.succ_opt()]
        .into_iter()
        .flatten()
        .find_map(|neighbor| {
            let neighbor_category = finals.category(neighbor)?;
            let holder = finals.get(neighbor, group)?;
            let clash = scope.contains(&neighbor_category)
                && category.conflicts_with(neighbor_category)
                && (holder == person || holder.normalized() == person.normalized());
            clash.then(|| Conflict {
                date,
                group,
                person: person.clone(),
                category,
                neighbor_date: neighbor,
                neighbor_category,
            })
        })
}

/// Whether `person` would be conflict-free on (`date`, `group`).
pub(crate) fn is_clear(
    finals: &ScheduleTable,
    date: NaiveDate,
    group: GroupId,
    person: &PersonId,
    category: DayCategory,
    scope: &[DayCategory],
) -> bool {
    find_conflict(finals, date, group, person, category, scope).is_none()
}
