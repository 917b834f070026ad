//! Semi-normal conflict resolver.
//!
//! A semi-normal holder who also has weekend or special-holiday duty on an
//! adjacent day is exchanged with the nearest later semi-normal date of the
//! month. Failing that, the slot goes to whoever rotation would put on the
//! first semi-normal date of the next month, and the displaced person is
//! bound to that date.

use chrono::NaiveDate;
use tracing::debug;

use super::swap::{try_cross_month, try_exchange};
use super::{find_conflict, StageContext, StageOutcome};
use crate::models::DayCategory;

pub(crate) fn resolve_conflicts(ctx: &StageContext<'_>, out: &mut StageOutcome) {
    let category = ctx.category();
    let scope = ctx.stage.conflict_scope();
    let dates = out.dates.clone();
    let next_month_first = first_of_next_month(ctx, category);

    for (i, date) in dates.iter().copied().enumerate() {
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

            let resolved = dates[i + 1..]
                .iter()
                .any(|later| try_exchange(ctx, out, group, date, *later, &conflict))
                || next_month_first.is_some_and(|target| {
                    try_cross_month(ctx, out, group, date, target, category, &conflict)
                });
            if !resolved {
                debug!(%date, %group, %person, "semi-normal conflict left for review");
            }
        }
    }
}

fn first_of_next_month(ctx: &StageContext<'_>, category: DayCategory) -> Option<NaiveDate> {
    let next = ctx.month.next();
    next.range().days().find(|d| ctx.classify(*d) == category)
}
