//! Weekend month-skip.
//!
//! Runs after the weekend baseline. Anyone holding a special-holiday final
//! in the same month and group gives up their weekend turns that month;
//! the first skip names the special duty, later ones say the person was
//! already skipped.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{StageContext, StageOutcome};
use crate::error::Issue;
use crate::models::{
    AssignmentReason, DateRange, DayCategory, GroupId, PersonId, Roster, SkipCause,
};

pub(crate) fn apply_month_skip(ctx: &StageContext<'_>, out: &mut StageOutcome) {
    let category = ctx.category();
    let month = ctx.month.range();

    for group in out.groups.clone() {
        let Some(roster) = ctx.roster(group, category) else {
            continue;
        };
        let mut skipped: BTreeSet<String> = BTreeSet::new();

        for date in out.dates.clone() {
            if out.is_locked(date, group) {
                continue;
            }
            let Some(current) = out.final_at(date, group).cloned() else {
                continue;
            };
            let key = current.normalized();
            let (cause, text) = if skipped.contains(&key) {
                (
                    SkipCause::AlreadySkippedThisMonth,
                    format!("{current} already skipped this month"),
                )
            } else if holds_special(out, &current, group, month) {
                (
                    SkipCause::SpecialDutySameMonth,
                    format!("{current} had special holiday duty in the same month"),
                )
            } else {
                continue;
            };

            let Some(replacement) = walk(ctx, out, roster, group, date, &current, &skipped) else {
                warn!(%date, %group, person = %current, "month skip found no replacement");
                out.issues.push(Issue::MonthSkipExhausted {
                    date,
                    group,
                    person: current,
                });
                continue;
            };
            // Only a turn actually given up counts as skipped
            skipped.insert(key);

            debug!(%date, %group, skipped = %current, %replacement, "weekend month skip");
            let expected = out.expected(ctx, date, group);
            if expected.as_ref().is_some_and(|e| e.matches(replacement.as_str())) {
                out.reasons.remove(date, group, current.as_str());
            } else {
                let reason =
                    AssignmentReason::skip(replacement.clone(), current.clone(), cause, text)
                        .with_baseline(expected);
                out.replace_reason(date, group, Some(&current), reason);
            }
            out.finals.set(date, category, group, replacement);
        }
    }
}

fn holds_special(out: &StageOutcome, person: &PersonId, group: GroupId, month: DateRange) -> bool {
    !out
        .finals
        .dates_of(person, group, month, DayCategory::Special)
        .is_empty()
}

/// First roster member after `current` who holds no special duty this
/// month, has not been skipped and can serve the date.
fn walk(
    ctx: &StageContext<'_>,
    out: &StageOutcome,
    roster: &Roster,
    group: GroupId,
    date: NaiveDate,
    current: &PersonId,
    skipped: &BTreeSet<String>,
) -> Option<PersonId> {
    let month = ctx.month.range();
    let from = roster.position(current).unwrap_or(roster.len().saturating_sub(1));
    (1..=roster.len())
        .filter_map(|offset| roster.at_rotation(from + offset))
        .find(|candidate| {
            !skipped.contains(&candidate.normalized())
                && !holds_special(out, candidate, group, month)
                && ctx.is_available(candidate, group, date, DayCategory::Weekend)
        })
        .cloned()
}
