//! Return-from-missing reinsertion.
//!
//! When a missing period ends inside the run and rotation skipped some of
//! the person's normal-day turns during it, the person is put back on the
//! first normal day of their track after a grace period, and every later
//! normal slot holder moves forward one slot until the chain reaches the
//! returning person's own next turn.
//!
//! Planning is separate from applying: [`plan_reinsertion`] returns the
//! change list and the resolver decides how to record it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{StageContext, StageOutcome, Track};
use crate::error::Issue;
use crate::models::{AssignmentReason, DayCategory, GroupId, MissingPeriod, PersonId, ReasonMeta};

/// One slot rewritten by a reinsertion cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftChange {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Holder before the cascade.
    pub previous: Option<PersonId>,
    /// Holder after the cascade.
    pub new: PersonId,
    /// Internal displacement, hidden from user-facing summaries.
    pub internal: bool,
}

/// A computed reinsertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinsertionPlan {
    /// Returning person.
    pub person: PersonId,
    /// Group.
    pub group: GroupId,
    /// The period that ended.
    pub period: MissingPeriod,
    /// Normal turns lost during the period.
    pub missed: Vec<NaiveDate>,
    /// Track of the first missed turn.
    pub track: Option<Track>,
    /// Reinsertion date.
    pub target: NaiveDate,
    /// Cascade, in date order. The first change places the returning person.
    pub changes: Vec<ShiftChange>,
}

/// Plans the reinsertion of `person` after `period`.
///
/// Returns `Ok(None)` when nothing is owed (the period does not end in the
/// range, no turn was missed, or no target day is left in the month), and
/// [`Issue::ReinsertionBlocked`] when a cascade step would place someone on
/// a day they cannot serve.
pub fn plan_reinsertion(
    ctx: &StageContext<'_>,
    out: &StageOutcome,
    group: GroupId,
    person: &PersonId,
    period: &MissingPeriod,
) -> Result<Option<ReinsertionPlan>, Issue> {
    let normal = DayCategory::Normal;
    if !ctx.range.contains(period.end) {
        return Ok(None);
    }
    let is_person = |p: &PersonId| p.matches(person.as_str());

    let missed: Vec<NaiveDate> = ctx
        .dates_of(normal, ctx.month.range())
        .into_iter()
        .filter(|d| period.covers(*d))
        .filter(|d| out.expected(ctx, *d, group).is_some_and(|b| is_person(&b)))
        .filter(|d| !out.final_at(*d, group).is_some_and(is_person))
        .collect();
    let Some(first_missed) = missed.first() else {
        return Ok(None);
    };
    let track = Track::of(first_missed.weekday());

    let after: Vec<NaiveDate> = out
        .dates
        .iter()
        .copied()
        .filter(|d| *d > period.end)
        .collect();
    let target = after
        .iter()
        .copied()
        .skip(ctx.config.reinsertion_grace_days)
        .find(|d| {
            track.map_or(true, |t| t.contains(d.weekday())) && !out.is_locked(*d, group)
        });
    let Some(target) = target else {
        debug!(%person, %group, end = %period.end, "no reinsertion day left in the month");
        return Ok(None);
    };
    if out.final_at(target, group).is_some_and(is_person) {
        return Ok(None);
    }

    let mut changes = Vec::new();
    let mut carry = person.clone();
    for date in after.into_iter().filter(|d| *d >= target) {
        if out.is_locked(date, group) {
            continue;
        }
        if let Some(cause) = ctx.unavailability(&carry, group, date, normal) {
            return Err(Issue::ReinsertionBlocked {
                date,
                group,
                person: person.clone(),
                detail: format!("{carry} cannot take {date}: {cause}"),
            });
        }
        let previous = out.final_at(date, group).cloned();
        let natural = previous.as_ref().is_some_and(is_person);
        changes.push(ShiftChange {
            date,
            group,
            previous: previous.clone(),
            new: carry.clone(),
            internal: true,
        });
        match previous {
            Some(p) if !natural => carry = p,
            _ => break,
        }
    }

    Ok(Some(ReinsertionPlan {
        person: person.clone(),
        group,
        period: period.clone(),
        missed,
        track,
        target,
        changes,
    }))
}

/// Plans and applies reinsertions for every returning normal-roster member.
pub(crate) fn reinsert_returning(ctx: &StageContext<'_>, out: &mut StageOutcome) {
    for group in out.groups.clone() {
        let (Some(members), Some(roster)) = (
            ctx.state.rosters.group(group),
            ctx.roster(group, DayCategory::Normal),
        ) else {
            continue;
        };
        for person in roster.people() {
            for period in members.missing_of(person) {
                match plan_reinsertion(ctx, out, group, person, period) {
                    Ok(Some(plan)) => apply_plan(out, plan),
                    Ok(None) => {}
                    Err(issue) => {
                        warn!(%person, %group, %issue, "reinsertion blocked");
                        out.issues.push(issue);
                    }
                }
            }
        }
    }
}

fn apply_plan(out: &mut StageOutcome, plan: ReinsertionPlan) {
    debug!(
        person = %plan.person,
        group = %plan.group,
        target = %plan.target,
        shifted = plan.changes.len(),
        "reinsertion planned"
    );
    let track = plan
        .track
        .map(|t| format!(" on the {t} track"))
        .unwrap_or_default();

    for change in &plan.changes {
        let text = if change.new.matches(plan.person.as_str()) {
            format!(
                "returned from missing period ending {}; reinserted{track}",
                plan.period.end
            )
        } else {
            format!("moved forward one slot by the reinsertion of {}", plan.person)
        };
        let reason = AssignmentReason::shift(change.new.clone(), change.previous.clone(), text)
            .with_meta(ReasonMeta {
                reinserted: Some(plan.person.clone()),
                ..ReasonMeta::default()
            });
        out.finals
            .set(change.date, DayCategory::Normal, change.group, change.new.clone());
        out.replace_reason(change.date, change.group, change.previous.as_ref(), reason);
    }
    out.changes.extend(plan.changes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RotationConfig;
    use crate::models::{DutyState, HolidayCalendar, MonthKey, ReasonKind, RosterStore};
    use crate::rotation::{run_stage, Stage};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn g1() -> GroupId {
        GroupId::new(1).unwrap()
    }

    fn normal_outcome(state: &DutyState) -> StageOutcome {
        let cal = HolidayCalendar::new();
        let config = RotationConfig::default();
        let month = MonthKey::new(2026, 2).unwrap();
        let ctx = StageContext {
            stage: Stage::Normal,
            month,
            range: month.range(),
            classifier: &cal,
            oracle: None,
            state,
            config: &config,
        };
        run_stage(&ctx)
    }

    fn returning_state() -> DutyState {
        let mut rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D"]);
        rosters
            .add_missing_period(g1(), "A", MissingPeriod::new(d(2), d(4), "course"))
            .unwrap();
        DutyState::new(rosters)
    }

    #[test]
    fn test_cascade_after_grace_period() {
        let out = normal_outcome(&returning_state());

        // Normal days after the 4th: 5 9 10 | 11 (Wed, Mon/Wed track)
        assert_eq!(out.final_at(d(11), g1()).unwrap().as_str(), "A");
        assert_eq!(out.final_at(d(12), g1()).unwrap().as_str(), "C");
        assert_eq!(out.final_at(d(16), g1()).unwrap().as_str(), "D");
        // A's natural turn on the 16th absorbed the chain
        assert_eq!(out.final_at(d(17), g1()).unwrap().as_str(), "B");

        for day in [11, 12, 16] {
            let holder = out.final_at(d(day), g1()).unwrap().clone();
            let r = out.reasons.get(d(day), g1(), holder.as_str()).unwrap();
            assert_eq!(r.kind, ReasonKind::Shift);
            assert_eq!(r.meta.reinserted.as_ref().unwrap().as_str(), "A");
        }
        assert_eq!(out.changes.len(), 3);
        assert!(out.changes.iter().all(|c| c.internal));
    }

    #[test]
    fn test_blocked_cascade_changes_nothing() {
        let mut state = returning_state();
        // C cannot move onto the 12th
        state
            .rosters
            .add_missing_period(g1(), "C", MissingPeriod::new(d(12), d(12), "leave"))
            .unwrap();
        let out = normal_outcome(&state);

        assert!(out
            .issues
            .iter()
            .any(|i| matches!(i, Issue::ReinsertionBlocked { .. })));
        assert_eq!(out.final_at(d(11), g1()).unwrap().as_str(), "C");
        assert!(out.changes.is_empty());
    }

    #[test]
    fn test_nothing_owed_when_no_turn_missed() {
        let mut rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D"]);
        // B's only turn near the period is the 3rd; the period covers the 4th
        rosters
            .add_missing_period(g1(), "B", MissingPeriod::new(d(4), d(4), ""))
            .unwrap();
        let out = normal_outcome(&DutyState::new(rosters));
        assert!(out.changes.is_empty());
    }
}
