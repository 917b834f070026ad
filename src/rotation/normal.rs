//! Normal-day conflict resolver.
//!
//! Partners are paired by weekday track: Monday with Wednesday, Tuesday
//! with Thursday. For a conflict on date `d` the candidates are tried in
//! this order, stopping at the first exchange that leaves both people
//! conflict-free and available:
//!
//! 1. the alternate-track day of the same week
//! 2. `d + 7`
//! 3. the alternate-track day two weeks out, or the first alternate-track
//!    normal day of next month when that falls outside the month
//! 4. the first same-weekday normal day of next month
//! 5. the first alternate-track normal day of next month
//!
//! Same-month candidates always precede next-month ones, for both tracks.
//! Before the ordered pass, a same-month candidate whose occupant is also
//! in conflict is tried first, since one exchange can clear both.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::swap::{try_cross_month, try_exchange};
use super::{find_conflict, StageContext, StageOutcome};
use crate::models::{DayCategory, GroupId};

/// Weekday track used to pair normal days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    /// Monday and Wednesday.
    MonWed,
    /// Tuesday and Thursday.
    TueThu,
}

impl Track {
    /// Track of a weekday, if it has one.
    pub fn of(weekday: Weekday) -> Option<Track> {
        match weekday {
            Weekday::Mon | Weekday::Wed => Some(Track::MonWed),
            Weekday::Tue | Weekday::Thu => Some(Track::TueThu),
            _ => None,
        }
    }

    /// Whether a weekday belongs to this track.
    pub fn contains(self, weekday: Weekday) -> bool {
        Track::of(weekday) == Some(self)
    }

    /// The other weekday on the same track.
    pub fn alternate(weekday: Weekday) -> Option<Weekday> {
        match weekday {
            Weekday::Mon => Some(Weekday::Wed),
            Weekday::Wed => Some(Weekday::Mon),
            Weekday::Tue => Some(Weekday::Thu),
            Weekday::Thu => Some(Weekday::Tue),
            _ => None,
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::MonWed => f.write_str("Monday/Wednesday"),
            Track::TueThu => f.write_str("Tuesday/Thursday"),
        }
    }
}

/// Alternate-track day of the same week.
fn alternate_date(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Mon | Weekday::Tue => date.checked_add_days(Days::new(2)),
        Weekday::Wed | Weekday::Thu => date.checked_sub_days(Days::new(2)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    SameMonth(NaiveDate),
    NextMonth(NaiveDate),
}

fn candidates(ctx: &StageContext<'_>, date: NaiveDate) -> Vec<Candidate> {
    let in_month = |d: NaiveDate| {
        d != date && ctx.range.contains(d) && ctx.classify(d) == DayCategory::Normal
    };
    let next = ctx.month.next().range();
    let first_next = |weekday: Weekday| {
        next.days()
            .find(|d| d.weekday() == weekday && ctx.classify(*d) == DayCategory::Normal)
    };
    let alt_weekday = Track::alternate(date.weekday());
    let mut list = Vec::new();

    if let Some(alt) = alternate_date(date).filter(|d| in_month(*d)) {
        list.push(Candidate::SameMonth(alt));
    }
    if let Some(week_on) = date.checked_add_days(Days::new(7)).filter(|d| in_month(*d)) {
        list.push(Candidate::SameMonth(week_on));
    }
    if let Some(alt) = alternate_date(date) {
        match alt.checked_add_days(Days::new(14)).filter(|d| in_month(*d)) {
            Some(later) => list.push(Candidate::SameMonth(later)),
            None => {
                if let Some(n) = alt_weekday.and_then(first_next) {
                    list.push(Candidate::NextMonth(n));
                }
            }
        }
    }
    if let Some(n) = first_next(date.weekday()) {
        list.push(Candidate::NextMonth(n));
    }
    if let Some(n) = alt_weekday.and_then(first_next) {
        list.push(Candidate::NextMonth(n));
    }

    // Same-month entries first, duplicates dropped
    let mut ordered: Vec<Candidate> = Vec::with_capacity(list.len());
    for c in list
        .iter()
        .filter(|c| matches!(c, Candidate::SameMonth(_)))
        .chain(list.iter().filter(|c| matches!(c, Candidate::NextMonth(_))))
    {
        if !ordered.contains(c) {
            ordered.push(*c);
        }
    }
    ordered
}

pub(crate) fn resolve_conflicts(ctx: &StageContext<'_>, out: &mut StageOutcome) {
    let category = ctx.category();
    let scope = ctx.stage.conflict_scope();

    for date in out.dates.clone() {
        for group in out.groups.clone() {
            if out.is_locked(date, group) {
                continue;
            }
            let Some(person) = out.final_at(date, group).cloned() else {
                continue;
            };
            let Some(conflict) =
                find_conflict(&out.finals, date, group, &person, category, scope)
            else {
                continue;
            };

            let list = candidates(ctx, date);
            let resolved = try_double_resolution(ctx, out, group, date, &list, &conflict)
                || list.iter().any(|c| match c {
                    Candidate::SameMonth(b) => try_exchange(ctx, out, group, date, *b, &conflict),
                    Candidate::NextMonth(n) => {
                        try_cross_month(ctx, out, group, date, *n, category, &conflict)
                    }
                });
            if !resolved {
                debug!(%date, %group, %person, "normal-day conflict left for review");
            }
        }
    }
}

/// Tries same-month partners who are themselves in conflict.
fn try_double_resolution(
    ctx: &StageContext<'_>,
    out: &mut StageOutcome,
    group: GroupId,
    date: NaiveDate,
    list: &[Candidate],
    conflict: &super::Conflict,
) -> bool {
    let scope = ctx.stage.conflict_scope();
    for c in list {
        let Candidate::SameMonth(b) = *c else {
            continue;
        };
        let partner_conflicted = out.final_at(b, group).is_some_and(|y| {
            find_conflict(&out.finals, b, group, y, DayCategory::Normal, scope).is_some()
        });
        if partner_conflicted && try_exchange(ctx, out, group, date, b, conflict) {
            debug!(%date, partner_date = %b, %group, "swap cleared two conflicts");
            return true;
        }
    }
    false
}
