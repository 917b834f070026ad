//! Writing a stage outcome into the persisted state.

use tracing::{debug, info};

use crate::models::{DutyState, ReasonKind};
use crate::rotation::StageOutcome;

/// Persists a stage outcome.
///
/// 1. Finals of the stage's category within the range are replaced.
/// 2. Baseline entries are written only where none exist.
/// 3. Reasons on the stage's dates are replaced.
/// 4. Obligations an earlier run of the same stage originated in the range
///    are dropped together with their future-dated reasons.
/// 5. New obligations are registered and honoured ones marked.
/// 6. The month's rotation seeds are stored.
pub(crate) fn commit_outcome(state: &mut DutyState, outcome: StageOutcome) {
    let category = outcome.category();

    state.finals.remove_category_in(outcome.range, category);
    for date in &outcome.dates {
        state.finals.remove_day(*date);
    }
    for (date, group, person) in outcome.assignments() {
        state.finals.set(date, category, group, person.clone());
    }

    let mut written = 0usize;
    for (date, day) in outcome.baseline.iter() {
        for (group, person) in &day.slots {
            if state.baseline.set_if_absent(date, day.category, *group, person.clone()) {
                written += 1;
            }
        }
    }

    state.reasons.clear_dates(&outcome.dates);
    for stale in state.obligations.remove_originating(outcome.range, category) {
        let owned = state
            .reasons
            .get(stale.date, stale.group, stale.person.as_str())
            .is_some_and(|r| {
                r.kind == ReasonKind::Swap
                    && r.swap_pair_id.as_deref() == Some(stale.swap_pair_id.as_str())
            });
        if owned {
            state
                .reasons
                .remove(stale.date, stale.group, stale.person.as_str());
        }
        debug!(
            date = %stale.date,
            group = %stale.group,
            person = %stale.person,
            "dropped stale obligation"
        );
    }

    let registered = outcome.obligations.len();
    let assigned = outcome.assignments().count();
    state.reasons.merge(outcome.reasons);
    for obligation in outcome.obligations {
        state.obligations.register(obligation);
    }
    for (date, group) in &outcome.fulfilled {
        state.obligations.mark_fulfilled(*date, *group);
    }
    for seed in outcome.seeds {
        state.seeds.set(seed);
    }

    info!(
        month = %outcome.month,
        stage = %outcome.stage,
        assigned,
        baseline_written = written,
        obligations = registered,
        issues = outcome.issues.len(),
        "stage committed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::config::RotationConfig;
    use crate::models::{DayCategory, GroupId, HolidayCalendar, MonthKey, RosterStore};
    use crate::rotation::{run_stage, Stage, StageContext};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn g1() -> GroupId {
        GroupId::new(1).unwrap()
    }

    fn semi_outcome(state: &DutyState) -> StageOutcome {
        let cal = HolidayCalendar::new();
        let config = RotationConfig::default();
        let month = MonthKey::new(2026, 2).unwrap();
        let ctx = StageContext {
            stage: Stage::SemiNormal,
            month,
            range: month.range(),
            classifier: &cal,
            oracle: None,
            state,
            config: &config,
        };
        run_stage(&ctx)
    }

    fn semi_state() -> DutyState {
        // Semi Fridays 6 13 20 27 -> A B C D
        let rosters = RosterStore::new().with_roster(g1(), DayCategory::Semi, ["A", "B", "C", "D"]);
        let mut state = DutyState::new(rosters);
        state.finals.set(d(2, 28), DayCategory::Weekend, g1(), "D".into());
        state
    }

    #[test]
    fn test_commit_writes_finals_and_obligation() {
        let mut state = semi_state();
        let out = semi_outcome(&state);
        commit_outcome(&mut state, out);

        assert_eq!(state.finals.get(d(2, 27), g1()).unwrap().as_str(), "A");
        // Other categories are left alone
        assert_eq!(state.finals.get(d(2, 28), g1()).unwrap().as_str(), "D");
        assert_eq!(state.baseline.get(d(2, 27), g1()).unwrap().as_str(), "D");

        let obligation = state.obligations.get(d(3, 6), g1()).unwrap();
        assert_eq!(obligation.person.as_str(), "D");
        let there = state.reasons.get(d(3, 6), g1(), "D").unwrap();
        assert_eq!(there.swap_pair_id.as_deref(), Some(obligation.swap_pair_id.as_str()));
        assert!(state.seeds.iter().next().is_some());
    }

    #[test]
    fn test_recommit_drops_stale_obligation() {
        let mut state = semi_state();
        let out = semi_outcome(&state);
        commit_outcome(&mut state, out);
        assert!(state.obligations.get(d(3, 6), g1()).is_some());

        // Weekend changed, so the Friday clash is gone
        state.finals.set(d(2, 28), DayCategory::Weekend, g1(), "F".into());
        let out = semi_outcome(&state);
        assert!(out.obligations.is_empty());
        commit_outcome(&mut state, out);

        assert_eq!(state.finals.get(d(2, 27), g1()).unwrap().as_str(), "D");
        assert!(state.obligations.get(d(3, 6), g1()).is_none());
        assert!(state.reasons.get(d(3, 6), g1(), "D").is_none());
        assert!(state.reasons.get(d(2, 27), g1(), "A").is_none());
        assert!(state.reasons.is_empty());
    }

    #[test]
    fn test_baseline_is_write_once() {
        let mut state = semi_state();
        let out = semi_outcome(&state);
        commit_outcome(&mut state, out);

        let mut out = semi_outcome(&state);
        out.baseline.set(d(2, 6), DayCategory::Semi, g1(), "Z".into());
        commit_outcome(&mut state, out);

        assert_eq!(state.baseline.get(d(2, 6), g1()).unwrap().as_str(), "A");
    }
}
