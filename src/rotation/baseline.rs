//! Baseline rotation and availability skips.
//!
//! The baseline pointer advances one roster slot per qualifying date no
//! matter who ends up serving: an unavailable person's turn is not donated
//! to their replacement.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{resolve_seed, StageContext, StageOutcome};
use crate::error::Issue;
use crate::models::{
    AssignmentReason, CrossMonthMeta, DayCategory, GroupId, PersonId, ReasonMeta, Roster,
    SkipCause,
};

/// Pure round-robin result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    /// (date, person) in date order.
    pub assignments: Vec<(NaiveDate, PersonId)>,
    /// Roster index the next qualifying date would take.
    pub next_index: usize,
}

/// Assigns `dates` round-robin over `roster` starting at `start`.
///
/// An empty roster yields no assignments.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use u_rotation::models::Roster;
/// use u_rotation::rotation::rotate;
///
/// let roster = Roster::from_people(["A", "B", "C"]);
/// let dates: Vec<NaiveDate> = (2..=5)
///     .map(|d| NaiveDate::from_ymd_opt(2026, 2, d).unwrap())
///     .collect();
/// let r = rotate(&roster, 2, &dates);
/// let names: Vec<&str> = r.assignments.iter().map(|(_, p)| p.as_str()).collect();
/// assert_eq!(names, ["C", "A", "B", "C"]);
/// assert_eq!(r.next_index, 0);
/// ```
pub fn rotate(roster: &Roster, start: usize, dates: &[NaiveDate]) -> Rotation {
    if roster.is_empty() {
        return Rotation {
            assignments: Vec::new(),
            next_index: 0,
        };
    }
    let assignments = dates
        .iter()
        .enumerate()
        .filter_map(|(i, date)| roster.at_rotation(start + i).map(|p| (*date, p.clone())))
        .collect();
    Rotation {
        assignments,
        next_index: (start + dates.len()) % roster.len(),
    }
}

/// Starting index for the first stage date, aligned for runs that begin
/// mid-month.
pub(crate) fn start_index(
    ctx: &StageContext<'_>,
    out: &mut StageOutcome,
    category: DayCategory,
    group: GroupId,
    roster: &Roster,
) -> usize {
    let len = roster.len().max(1);
    let (seed, issue) = resolve_seed(ctx, category, group, roster);

    let Some(lead_in) = ctx.range.lead_in(ctx.month) else {
        out.issues.extend(issue);
        return seed.start;
    };

    let committed = ctx
        .state
        .baseline
        .last_in(lead_in, category, group)
        .and_then(|(_, person)| roster.position(person));
    if let Some(index) = committed {
        return (index + 1) % len;
    }

    out.issues.extend(issue);
    let elapsed = ctx.count_between(category, lead_in.start(), ctx.range.start());
    (seed.start + elapsed) % len
}

/// Computes baseline and first-pass finals for every stage date and group.
pub(crate) fn assign_category(ctx: &StageContext<'_>, out: &mut StageOutcome) {
    let category = ctx.category();
    let dates = out.dates.clone();

    for group in out.groups.clone() {
        let Some(roster) = ctx.roster(group, category) else {
            continue;
        };
        let start = start_index(ctx, out, category, group, roster);
        let rotation = rotate(roster, start, &dates);

        for (offset, (date, expected)) in rotation.assignments.into_iter().enumerate() {
            out.baseline.set(date, category, group, expected.clone());
            assign_slot(ctx, out, roster, group, date, start + offset, expected);
        }
    }
}

fn assign_slot(
    ctx: &StageContext<'_>,
    out: &mut StageOutcome,
    roster: &Roster,
    group: GroupId,
    date: NaiveDate,
    pointer: usize,
    expected: PersonId,
) {
    let category = ctx.category();

    if let Some(anchor) = ctx.state.critical.for_slot(date, group) {
        out.finals.set(date, category, group, anchor.person.clone());
        out.locked.insert((date, group));
        if !anchor.person.matches(expected.as_str()) {
            let text = if anchor.note.is_empty() {
                format!("anchored by operator in place of {expected}")
            } else {
                format!("anchored by operator in place of {expected}: {}", anchor.note)
            };
            let reason = AssignmentReason::skip(
                anchor.person.clone(),
                expected.clone(),
                SkipCause::CriticalAnchor,
                text,
            )
            .with_baseline(Some(expected));
            out.reasons.record(date, group, reason);
        }
        debug!(%date, %group, person = %anchor.person, "critical anchor applied");
        return;
    }

    if ctx.config.preserve_existing && ctx.state.finals.category(date) == Some(category) {
        if let Some(kept) = ctx.state.finals.get(date, group) {
            out.finals.set(date, category, group, kept.clone());
            out.locked.insert((date, group));
            for reason in ctx.state.reasons.for_slot(date, group) {
                out.reasons.record(date, group, reason.clone());
            }
            return;
        }
    }

    if let Some(obligation) = ctx
        .state
        .obligations
        .get(date, group)
        .filter(|o| o.category == category)
    {
        let bound = &obligation.person;
        if ctx.is_available(bound, group, date, category) {
            out.finals.set(date, category, group, bound.clone());
            out.locked.insert((date, group));
            out.fulfilled.push((date, group));
            let text = format!(
                "cross-month swap with {}: moved here from {}",
                obligation.partner, obligation.origin_date
            );
            let reason = AssignmentReason::swap(
                bound.clone(),
                obligation.partner.clone(),
                obligation.swap_pair_id.clone(),
                text,
            )
            .with_meta(ReasonMeta {
                baseline_person: Some(expected),
                conflict_date: obligation.conflict_date,
                cross_month: Some(CrossMonthMeta {
                    origin_date: obligation.origin_date,
                    target_date: date,
                    conflict_date: obligation.conflict_date,
                }),
                ..ReasonMeta::default()
            });
            out.reasons.record(date, group, reason);
            debug!(%date, %group, person = %bound, "cross-month obligation honoured");
            return;
        }
        warn!(%date, %group, person = %bound, "cross-month obligation cannot be honoured");
        out.issues.push(Issue::ObligationUnmet {
            date,
            group,
            person: bound.clone(),
        });
    }

    let Some(cause) = ctx.unavailability(&expected, group, date, category) else {
        out.finals.set(date, category, group, expected);
        return;
    };

    match find_replacement(ctx, out, roster, group, date, pointer) {
        Some(replacement) => {
            debug!(
                %date,
                %group,
                unavailable = %expected,
                %replacement,
                %cause,
                "availability skip"
            );
            let text = format!("covering for {expected} ({cause})");
            let reason = AssignmentReason::skip(
                replacement.clone(),
                expected.clone(),
                SkipCause::Unavailable(cause),
                text,
            )
            .with_baseline(Some(expected));
            out.finals.set(date, category, group, replacement);
            out.reasons.record(date, group, reason);
        }
        None => {
            warn!(%date, %group, unavailable = %expected, "no eligible person for slot");
            out.issues.push(Issue::NoEligiblePerson {
                date,
                group,
                category,
            });
        }
    }
}

/// Scans forward from the pointer for the first available person.
///
/// The first lap prefers people without a duty of this category yet this
/// month; later laps (up to the configured bound) accept anyone available.
fn find_replacement(
    ctx: &StageContext<'_>,
    out: &StageOutcome,
    roster: &Roster,
    group: GroupId,
    date: NaiveDate,
    pointer: usize,
) -> Option<PersonId> {
    let category = ctx.category();
    let len = roster.len();
    let bound = ctx.config.skip_scan_factor.max(1) * len;
    let month = ctx.month.range();

    for offset in 1..=bound {
        let candidate = roster.at_rotation(pointer + offset)?;
        if !ctx.is_available(candidate, group, date, category) {
            continue;
        }
        let busy = !out
            .finals
            .dates_of(candidate, group, month, category)
            .is_empty();
        if !busy || offset > len {
            return Some(candidate.clone());
        }
    }
    None
}
