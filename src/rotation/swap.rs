//! Swap primitives shared by the semi-normal and normal resolvers.
//!
//! A swap is only kept when both people end conflict-free and available;
//! otherwise the tables are restored. Locked slots and slots already part
//! of a swap pair never move, so every pair id stays shared by exactly two
//! entries.

use chrono::NaiveDate;
use tracing::debug;

use super::conflict::is_clear;
use super::{resolve_seed, Conflict, StageContext, StageOutcome};
use crate::models::{
    AssignmentReason, CrossMonthMeta, CrossMonthObligation, DayCategory, GroupId, PersonId,
    ReasonMeta,
};

/// Pair id shared by both halves of a swap.
pub(crate) fn pair_id(group: GroupId, a: NaiveDate, b: NaiveDate) -> String {
    format!("swap-g{group}-{a}-{b}")
}

/// Exchanges the holders of (`a`, `group`) and (`b`, `group`) within the
/// working finals to resolve `conflict` (which concerns the holder of `a`).
pub(crate) fn try_exchange(
    ctx: &StageContext<'_>,
    out: &mut StageOutcome,
    group: GroupId,
    a: NaiveDate,
    b: NaiveDate,
    conflict: &Conflict,
) -> bool {
    if a == b || out.is_locked(a, group) || out.is_locked(b, group) {
        return false;
    }
    let (Some(x), Some(y)) = (
        out.final_at(a, group).cloned(),
        out.final_at(b, group).cloned(),
    ) else {
        return false;
    };
    let (Some(cat_a), Some(cat_b)) = (out.finals.category(a), out.finals.category(b)) else {
        return false;
    };
    if x.matches(y.as_str()) || out.has_swap(a, group, &x) || out.has_swap(b, group, &y) {
        return false;
    }
    if !ctx.is_available(&y, group, a, cat_a) || !ctx.is_available(&x, group, b, cat_b) {
        return false;
    }

    let scope = ctx.stage.conflict_scope();
    out.finals.swap(a, b, group);
    let clear = is_clear(&out.finals, a, group, &y, cat_a, scope)
        && is_clear(&out.finals, b, group, &x, cat_b, scope);
    if !clear {
        out.finals.swap(a, b, group);
        return false;
    }

    let id = pair_id(group, a.min(b), a.max(b));
    debug!(%group, %a, %b, first = %x, second = %y, pair = %id, "conflict swap");

    let cause = format!(
        "{x} has {} duty on {}",
        conflict.neighbor_category.label(),
        conflict.neighbor_date
    );
    let into_a = AssignmentReason::swap(
        y.clone(),
        x.clone(),
        id.clone(),
        format!("swapped with {x} ({b}): {cause}"),
    )
    .with_meta(ReasonMeta {
        baseline_person: out.expected(ctx, a, group),
        conflict_date: Some(conflict.neighbor_date),
        ..ReasonMeta::default()
    });
    let into_b = AssignmentReason::swap(
        x.clone(),
        y.clone(),
        id,
        format!("swapped with {y} ({a}): {cause}"),
    )
    .with_meta(ReasonMeta {
        baseline_person: out.expected(ctx, b, group),
        conflict_date: Some(conflict.neighbor_date),
        ..ReasonMeta::default()
    });
    out.replace_reason(a, group, Some(&x), into_a);
    out.replace_reason(b, group, Some(&y), into_b);
    true
}

/// Who rotation would place on `target` (first month after the context
/// month) without persisting anything.
///
/// A final already committed for the slot wins. Otherwise the index
/// continues after the month's last working final of `category`, or after
/// the month's seed-derived run when there is none.
pub(crate) fn predict_occupant(
    ctx: &StageContext<'_>,
    out: &StageOutcome,
    group: GroupId,
    category: DayCategory,
    target: NaiveDate,
) -> Option<PersonId> {
    if out.finals.category(target) == Some(category) {
        if let Some(p) = out.finals.get(target, group) {
            return Some(p.clone());
        }
    }
    let roster = ctx.roster(group, category)?;
    if roster.is_empty() {
        return None;
    }
    let month = ctx.month.range();
    let last = out
        .finals
        .last_in(month, category, group)
        .and_then(|(_, p)| roster.position(p));
    let base = match last {
        Some(index) => index + 1,
        None => {
            let (seed, _) = resolve_seed(ctx, category, group, roster);
            seed.start + ctx.dates_of(category, month).len()
        }
    };
    let ahead = ctx.count_between(category, ctx.month.next().first_day(), target);
    roster.at_rotation(base + ahead).cloned()
}

/// Hands (`date`, `group`) to the predicted occupant of `target` and binds
/// the current holder to `target` through a cross-month obligation.
pub(crate) fn try_cross_month(
    ctx: &StageContext<'_>,
    out: &mut StageOutcome,
    group: GroupId,
    date: NaiveDate,
    target: NaiveDate,
    target_category: DayCategory,
    conflict: &Conflict,
) -> bool {
    if !ctx.config.cross_month_swaps || out.is_locked(date, group) {
        return false;
    }
    if out.is_bound(ctx, target, group) || ctx.state.critical.for_slot(target, group).is_some() {
        return false;
    }
    let Some(x) = out.final_at(date, group).cloned() else {
        return false;
    };
    let category = ctx.category();
    if out.has_swap(date, group, &x) {
        return false;
    }
    let Some(y) = predict_occupant(ctx, out, group, target_category, target) else {
        return false;
    };
    if x.matches(y.as_str())
        || !ctx.is_available(&y, group, date, category)
        || !ctx.is_available(&x, group, target, target_category)
    {
        return false;
    }

    let scope = ctx.stage.conflict_scope();
    out.finals.set(date, category, group, y.clone());
    let previous = out.finals.set(target, target_category, group, x.clone());
    let clear = is_clear(&out.finals, date, group, &y, category, scope)
        && is_clear(&out.finals, target, group, &x, target_category, scope);
    match previous {
        Some(p) => {
            out.finals.set(target, target_category, group, p);
        }
        None => {
            out.finals.clear(target, group);
        }
    }
    if !clear {
        out.finals.set(date, category, group, x);
        return false;
    }

    let id = pair_id(group, date, target);
    debug!(%group, %date, %target, moved = %x, incoming = %y, pair = %id, "cross-month swap");

    let meta = ReasonMeta {
        conflict_date: Some(conflict.neighbor_date),
        cross_month: Some(CrossMonthMeta {
            origin_date: date,
            target_date: target,
            conflict_date: Some(conflict.neighbor_date),
        }),
        ..ReasonMeta::default()
    };
    let here = AssignmentReason::swap(
        y.clone(),
        x.clone(),
        id.clone(),
        format!(
            "cross-month swap: takes over from {x}, who moves to {target}; {x} has {} duty on {}",
            conflict.neighbor_category.label(),
            conflict.neighbor_date
        ),
    )
    .with_meta(ReasonMeta {
        baseline_person: out.expected(ctx, date, group),
        ..meta.clone()
    });
    let there = AssignmentReason::swap(
        x.clone(),
        y.clone(),
        id.clone(),
        format!("cross-month swap with {y}: moved here from {date}"),
    )
    .with_meta(ReasonMeta {
        baseline_person: Some(y.clone()),
        ..meta
    });
    out.replace_reason(date, group, Some(&x), here);
    out.reasons.record(target, group, there);
    out.obligations.push(CrossMonthObligation {
        date: target,
        group,
        category: target_category,
        person: x,
        partner: y,
        origin_date: date,
        origin_category: category,
        conflict_date: Some(conflict.neighbor_date),
        swap_pair_id: id,
        fulfilled: false,
    });
    true
}
