//! Checkpointed four-stage pipeline.
//!
//! A [`PlanningSession`] walks `(month, stage)` steps in order: months
//! ascending, and within a month special holiday → weekend/holiday →
//! semi-normal → normal. Each step is previewed against committed state
//! only, then committed (or discarded) before the next step unlocks.
//!
//! # Protocol
//!
//! | Call | Effect |
//! |------|--------|
//! | `preview()` | computes the current step; no state is written |
//! | `commit()` | persists the preview and advances |
//! | `discard_preview()` | drops the preview; the step can be recomputed |
//! | `cancel()` | ends the session, keeping only committed steps |
//! | `run_to_end()` | previews and commits every remaining step |
//!
//! # Example
//! ```
//! use chrono::NaiveDate;
//! use u_rotation::models::{
//!     DateRange, DayCategory, DutyState, GroupId, HolidayCalendar, RosterStore,
//! };
//! use u_rotation::pipeline::RotationPlanner;
//!
//! let g1 = GroupId::new(1).unwrap();
//! let rosters = RosterStore::new()
//!     .with_roster(g1, DayCategory::Normal, ["A", "B", "C", "D"])
//!     .with_roster(g1, DayCategory::Semi, ["E", "F"])
//!     .with_roster(g1, DayCategory::Weekend, ["G", "H", "I"]);
//! let mut state = DutyState::new(rosters);
//!
//! let calendar = HolidayCalendar::new();
//! let planner = RotationPlanner::new(&calendar);
//! let feb = DateRange::new(
//!     NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
//!     NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
//! )
//! .unwrap();
//! let report = planner.run(&mut state, feb);
//!
//! let monday = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
//! assert_eq!(state.finals.get(monday, g1).unwrap().as_str(), "A");
//! assert!(report.stages.len() == 4);
//! ```

mod commit;
mod report;

pub use report::{violations_report, RunReport, StageSummary, SummaryLine, ViolationRow};

use tracing::debug;

use crate::config::RotationConfig;
use crate::error::RotationError;
use crate::models::{AvailabilityOracle, DateRange, DayClassifier, DutyState, MonthKey};
use crate::rotation::{run_stage, Stage, StageContext, StageOutcome};

/// Entry point: holds the external collaborators and configuration.
pub struct RotationPlanner<'a> {
    classifier: &'a dyn DayClassifier,
    oracle: Option<&'a dyn AvailabilityOracle>,
    config: RotationConfig,
}

impl<'a> RotationPlanner<'a> {
    /// Creates a planner with the default configuration.
    ///
    /// Availability comes from the roster store alone until
    /// [`with_availability`](Self::with_availability) adds an external source.
    pub fn new(classifier: &'a dyn DayClassifier) -> Self {
        Self {
            classifier,
            oracle: None,
            config: RotationConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: RotationConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds an external availability source, consulted after the roster store.
    pub fn with_availability(mut self, oracle: &'a dyn AvailabilityOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Opens a session over `range`.
    pub fn begin<'s>(&'s self, state: &'s mut DutyState, range: DateRange) -> PlanningSession<'s> {
        let steps = range
            .months()
            .into_iter()
            .filter_map(|month| month.range().intersect(&range).map(|r| (month, r)))
            .flat_map(|(month, r)| {
                Stage::ALL.into_iter().map(move |stage| Step {
                    month,
                    stage,
                    range: r,
                })
            })
            .collect();
        PlanningSession {
            classifier: self.classifier,
            oracle: self.oracle,
            config: &self.config,
            state,
            steps,
            cursor: 0,
            preview: None,
            report: RunReport::default(),
        }
    }

    /// Runs every step over `range`, committing each one.
    pub fn run(&self, state: &mut DutyState, range: DateRange) -> RunReport {
        self.begin(state, range).run_to_end()
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    month: MonthKey,
    stage: Stage,
    range: DateRange,
}

/// An in-progress run. Dropping it is the same as [`cancel`](Self::cancel).
pub struct PlanningSession<'a> {
    classifier: &'a dyn DayClassifier,
    oracle: Option<&'a dyn AvailabilityOracle>,
    config: &'a RotationConfig,
    state: &'a mut DutyState,
    steps: Vec<Step>,
    cursor: usize,
    preview: Option<StageOutcome>,
    report: RunReport,
}

impl<'a> PlanningSession<'a> {
    /// The step `preview`/`commit` will act on.
    pub fn next_step(&self) -> Option<(MonthKey, Stage)> {
        self.steps.get(self.cursor).map(|s| (s.month, s.stage))
    }

    /// Number of steps left, the current one included.
    pub fn remaining(&self) -> usize {
        self.steps.len() - self.cursor
    }

    /// Whether every step has been committed.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Committed state as seen by the next preview.
    pub fn state(&self) -> &DutyState {
        self.state
    }

    /// Summaries committed so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Computes (or returns the cached) preview of the current step.
    pub fn preview(&mut self) -> Result<&StageOutcome, RotationError> {
        let step = *self
            .steps
            .get(self.cursor)
            .ok_or(RotationError::SessionFinished)?;
        if self.preview.is_none() {
            let ctx = StageContext {
                stage: step.stage,
                month: step.month,
                range: step.range,
                classifier: self.classifier,
                oracle: self.oracle,
                state: self.state,
                config: self.config,
            };
            self.preview = Some(run_stage(&ctx));
        }
        self.preview.as_ref().ok_or(RotationError::NothingToCommit)
    }

    /// Summary of the current preview, computing it if needed.
    pub fn preview_summary(&mut self) -> Result<StageSummary, RotationError> {
        self.preview().map(StageSummary::from_outcome)
    }

    /// Persists the current preview and unlocks the next step.
    pub fn commit(&mut self) -> Result<StageSummary, RotationError> {
        if self.is_finished() {
            return Err(RotationError::SessionFinished);
        }
        let outcome = self.preview.take().ok_or(RotationError::NothingToCommit)?;
        let summary = StageSummary::from_outcome(&outcome);
        commit::commit_outcome(self.state, outcome);
        self.cursor += 1;
        self.report.stages.push(summary.clone());
        Ok(summary)
    }

    /// Drops the current preview without writing anything.
    pub fn discard_preview(&mut self) {
        if self.preview.take().is_some() {
            debug!(step = self.cursor, "preview discarded");
        }
    }

    /// Ends the session. Committed steps stay; the pending preview is lost.
    pub fn cancel(mut self) -> RunReport {
        self.discard_preview();
        debug!(committed = self.cursor, remaining = self.remaining(), "session cancelled");
        std::mem::take(&mut self.report)
    }

    /// Previews and commits every remaining step.
    pub fn run_to_end(mut self) -> RunReport {
        while !self.is_finished() {
            if self.preview().is_err() || self.commit().is_err() {
                break;
            }
        }
        std::mem::take(&mut self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::error::Issue;
    use crate::models::{
        DayCategory, GroupId, HolidayCalendar, MissingPeriod, PersonId, ReasonKind, RosterStore,
        SkipCause,
    };
    use crate::rotation::find_conflict;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn g1() -> GroupId {
        GroupId::new(1).unwrap()
    }

    fn month(m: u32) -> DateRange {
        MonthKey::new(2026, m).unwrap().range()
    }

    fn final_name(state: &DutyState, date: NaiveDate) -> &str {
        state.finals.get(date, g1()).map(PersonId::as_str).unwrap_or("-")
    }

    #[test]
    fn test_plain_normal_rotation() {
        let rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        let range = DateRange::new(d(2, 2), d(2, 28)).unwrap();

        let report = RotationPlanner::new(&cal).run(&mut state, range);

        // Mon-Thu are normal days; Fridays are semi-normal
        let got: Vec<&str> = [2, 3, 4, 5, 9, 10, 11, 12]
            .iter()
            .map(|day| final_name(&state, d(2, *day)))
            .collect();
        assert_eq!(got, ["A", "B", "C", "D", "A", "B", "C", "D"]);
        assert_eq!(report.stages.len(), 4);
        assert_eq!(report.total_unassigned(), 0);
        assert_eq!(report.skip_count(), 0);
        assert!(!report.needs_review());
    }

    #[test]
    fn test_disabled_person_is_covered() {
        let mut rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Weekend, ["C", "A", "B"]);
        rosters.disable(g1(), "A");
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();

        let report = RotationPlanner::new(&cal).run(&mut state, month(2));

        // Weekend dates 1 7 8: baseline C A B
        assert_eq!(final_name(&state, d(2, 1)), "C");
        assert_eq!(final_name(&state, d(2, 7)), "B");
        assert_eq!(state.baseline.get(d(2, 7), g1()).unwrap().as_str(), "A");
        let r = state.reasons.get(d(2, 7), g1(), "B").unwrap();
        assert_eq!(r.kind, ReasonKind::Skip);
        assert_eq!(r.swapped_with.as_ref().unwrap().as_str(), "A");
        assert!(report.skip_count() >= 1);
        assert!(state
            .finals
            .dates_of(&"A".into(), g1(), month(2), DayCategory::Weekend)
            .is_empty());
    }

    #[test]
    fn test_special_holder_loses_weekend_turn() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Special, ["A", "S1"])
            .with_roster(g1(), DayCategory::Weekend, ["A", "B", "C", "D"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new().with_special(d(2, 23));

        RotationPlanner::new(&cal).run(&mut state, month(2));

        assert_eq!(final_name(&state, d(2, 23)), "A");
        assert_eq!(final_name(&state, d(2, 1)), "B");
        let r = state.reasons.get(d(2, 1), g1(), "B").unwrap();
        assert_eq!(r.meta.cause, Some(SkipCause::SpecialDutySameMonth));
        assert!(r.text.contains("had special holiday duty in the same month"));
    }

    #[test]
    fn test_normal_conflict_swapped_within_month() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["X", "P", "Y", "Q"])
            .with_roster(g1(), DayCategory::Weekend, ["X", "W1", "W2", "W3"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();

        let report = RotationPlanner::new(&cal).run(&mut state, month(2));

        // X has weekend duty on Sunday the 1st and Monday the 2nd
        assert_eq!(final_name(&state, d(2, 1)), "X");
        assert_eq!(final_name(&state, d(2, 2)), "Y");
        assert_eq!(final_name(&state, d(2, 4)), "X");
        let a = state.reasons.get(d(2, 2), g1(), "Y").unwrap();
        let b = state.reasons.get(d(2, 4), g1(), "X").unwrap();
        assert_eq!(a.kind, ReasonKind::Swap);
        assert_eq!(a.swap_pair_id, b.swap_pair_id);
        let pair_id = a.swap_pair_id.clone().unwrap();
        assert_eq!(state.reasons.pair(&pair_id).len(), 2);
        assert_eq!(report.unresolved().count(), 0);
    }

    #[test]
    fn test_semi_conflict_crosses_into_next_month() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Semi, ["A", "B", "C", "D"])
            .with_roster(g1(), DayCategory::Weekend, ["E", "D", "F"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        let planner = RotationPlanner::new(&cal);

        // Semi Fridays 6 13 20 27 -> A B C D; D also has Saturday the 28th
        planner.run(&mut state, month(2));
        assert_eq!(final_name(&state, d(2, 28)), "D");
        assert_eq!(final_name(&state, d(2, 27)), "A");
        let obligation = state.obligations.get(d(3, 6), g1()).unwrap().clone();
        assert_eq!(obligation.person.as_str(), "D");
        assert_eq!(obligation.partner.as_str(), "A");
        assert_eq!(obligation.origin_date, d(2, 27));
        assert!(!obligation.fulfilled);
        // March has not run yet
        assert!(state.finals.get(d(3, 6), g1()).is_none());

        planner.run(&mut state, month(3));
        assert_eq!(final_name(&state, d(3, 6)), "D");
        let there = state.reasons.get(d(3, 6), g1(), "D").unwrap();
        assert_eq!(there.kind, ReasonKind::Swap);
        assert_eq!(there.swap_pair_id.as_deref(), Some(obligation.swap_pair_id.as_str()));
        assert!(state.obligations.get(d(3, 6), g1()).unwrap().fulfilled);
        assert_eq!(state.reasons.pair(&obligation.swap_pair_id).len(), 2);
    }

    #[test]
    fn test_return_from_missing_is_reinserted() {
        let mut rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D"]);
        rosters
            .add_missing_period(g1(), "A", MissingPeriod::new(d(2, 2), d(2, 4), "training"))
            .unwrap();
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();

        let report = RotationPlanner::new(&cal).run(&mut state, month(2));

        assert_eq!(final_name(&state, d(2, 2)), "B");
        assert_eq!(final_name(&state, d(2, 11)), "A");
        assert_eq!(final_name(&state, d(2, 12)), "C");
        assert_eq!(final_name(&state, d(2, 16)), "D");
        assert_eq!(final_name(&state, d(2, 17)), "B");

        let normal = report.stages.last().unwrap();
        assert_eq!(normal.shifts, 3);
        assert_eq!(normal.missing_replacements.len(), 1);

        // Shifts are internal; only the cover on the 2nd is a violation
        let rows = violations_report(&state, MonthKey::new(2026, 2).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, d(2, 2));
        assert_eq!(rows[0].kind, Some(ReasonKind::Skip));
    }

    #[test]
    fn test_runs_are_deterministic() {
        let mut rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D", "E"])
            .with_roster(g1(), DayCategory::Semi, ["A", "C", "E"])
            .with_roster(g1(), DayCategory::Weekend, ["B", "D", "A"]);
        rosters
            .add_missing_period(g1(), "C", MissingPeriod::new(d(2, 9), d(2, 13), ""))
            .unwrap();
        let cal = HolidayCalendar::new().with_holiday(d(2, 16));
        let range = DateRange::new(d(2, 1), d(3, 31)).unwrap();

        let mut first = DutyState::new(rosters.clone());
        let mut second = DutyState::new(rosters);
        let a = RotationPlanner::new(&cal).run(&mut first, range);
        let b = RotationPlanner::new(&cal).run(&mut second, range);

        assert_eq!(first, second);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_rerun_over_committed_month_is_stable() {
        let mut rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D", "E"])
            .with_roster(g1(), DayCategory::Semi, ["A", "C", "E"])
            .with_roster(g1(), DayCategory::Weekend, ["B", "D", "A"]);
        rosters
            .add_missing_period(g1(), "C", MissingPeriod::new(d(2, 9), d(2, 13), ""))
            .unwrap();
        let cal = HolidayCalendar::new().with_holiday(d(2, 16));
        let planner = RotationPlanner::new(&cal);
        let mut state = DutyState::new(rosters);

        let a = planner.run(&mut state, month(2));
        let finals = state.finals.clone();
        let baseline = state.baseline.clone();
        let obligations = state.obligations.clone();
        let reasons = state.reasons.clone();

        let b = planner.run(&mut state, month(2));
        assert_eq!(state.finals, finals);
        assert_eq!(state.baseline, baseline);
        assert_eq!(state.obligations, obligations);
        assert_eq!(state.reasons, reasons);
        assert_eq!(a.total_assigned(), b.total_assigned());
        assert_eq!(a.unresolved().count(), b.unresolved().count());
    }

    #[test]
    fn test_rerun_keeps_cross_month_swap() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Semi, ["A", "B", "C", "D"])
            .with_roster(g1(), DayCategory::Weekend, ["E", "D", "F"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        let planner = RotationPlanner::new(&cal);

        planner.run(&mut state, month(2));
        let finals = state.finals.clone();
        let obligations = state.obligations.clone();
        let reasons = state.reasons.clone();

        // The committed 03-06 binding came from this same stage and is replaced
        let report = planner.run(&mut state, month(2));
        assert_eq!(final_name(&state, d(2, 27)), "A");
        assert_eq!(state.finals, finals);
        assert_eq!(state.obligations, obligations);
        assert_eq!(state.reasons, reasons);
        assert_eq!(state.obligations.iter().count(), 1);
        assert_eq!(report.unresolved().count(), 0);

        let pair_id = &state.obligations.get(d(3, 6), g1()).unwrap().swap_pair_id;
        assert_eq!(state.reasons.pair(pair_id).len(), 2);
    }

    #[test]
    fn test_seed_is_last_final_of_month() {
        let rosters =
            RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B", "C", "D", "E"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        RotationPlanner::new(&cal).run(&mut state, month(2));

        let feb = MonthKey::new(2026, 2).unwrap();
        let (_, last) = state.finals.last_in(month(2), DayCategory::Normal, g1()).unwrap();
        assert_eq!(state.seeds.get(DayCategory::Normal, g1(), feb), Some(last));
    }

    #[test]
    fn test_rotation_continues_across_months() {
        let cal = HolidayCalendar::new();
        let range = DateRange::new(d(2, 1), d(4, 30)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..8 {
            let len = rng.random_range(2..=6);
            let people: Vec<String> = (0..len).map(|i| format!("P{i}")).collect();
            let rosters = RosterStore::new().with_roster(g1(), DayCategory::Normal, people);
            let roster = rosters.roster(g1(), DayCategory::Normal).unwrap().clone();
            let mut state = DutyState::new(rosters);

            RotationPlanner::new(&cal).run(&mut state, range);

            let positions: Vec<usize> = state
                .finals
                .entries_in(range, DayCategory::Normal)
                .map(|(_, _, p)| roster.position(p).unwrap())
                .collect();
            assert!(positions.len() > 40);
            assert_eq!(positions[0], 0);
            for pair in positions.windows(2) {
                assert_eq!(pair[1], (pair[0] + 1) % len);
            }
        }
    }

    #[test]
    fn test_every_remaining_conflict_is_flagged() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["X"])
            .with_roster(g1(), DayCategory::Weekend, ["X"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        let planner = RotationPlanner::new(&cal)
            .with_config(RotationConfig::new().with_cross_month_swaps(false));

        let report = planner.run(&mut state, month(2));
        let flagged: Vec<(NaiveDate, GroupId)> =
            report.unresolved().filter_map(Issue::slot).collect();

        let mut conflicts = 0;
        for (date, group, person) in state.finals.entries_in(month(2), DayCategory::Normal) {
            let scope = Stage::Normal.conflict_scope();
            let conflict =
                find_conflict(&state.finals, date, group, person, DayCategory::Normal, scope);
            if conflict.is_some() {
                conflicts += 1;
                assert!(flagged.contains(&(date, group)));
            }
        }
        // Mondays 2 9 16 23 follow X's Sunday duty
        assert_eq!(conflicts, 4);
        assert!(report.needs_review());
    }

    #[test]
    fn test_session_step_protocol() {
        let rosters = RosterStore::new().with_roster(g1(), DayCategory::Normal, ["A", "B"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        let planner = RotationPlanner::new(&cal);
        let feb = MonthKey::new(2026, 2).unwrap();

        let mut session = planner.begin(&mut state, month(2));
        assert_eq!(session.next_step(), Some((feb, Stage::SpecialHoliday)));
        assert_eq!(session.remaining(), 4);
        assert!(matches!(session.commit(), Err(RotationError::NothingToCommit)));

        for _ in 0..3 {
            session.preview().unwrap();
            session.commit().unwrap();
        }
        assert_eq!(session.next_step(), Some((feb, Stage::Normal)));
        let summary = session.preview_summary().unwrap();
        assert_eq!(summary.stage, Stage::Normal);
        assert_eq!(summary.assigned, 16);
        // Nothing is written until commit
        assert!(session.state().finals.is_empty());

        session.discard_preview();
        assert!(matches!(session.commit(), Err(RotationError::NothingToCommit)));
        session.preview().unwrap();
        session.commit().unwrap();

        assert!(session.is_finished());
        assert!(matches!(session.preview(), Err(RotationError::SessionFinished)));
        assert!(matches!(session.commit(), Err(RotationError::SessionFinished)));
        assert_eq!(session.report().stages.len(), 4);
        drop(session);
        assert_eq!(final_name(&state, d(2, 2)), "A");
    }

    #[test]
    fn test_cancel_keeps_committed_steps_only() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["A", "B", "C"])
            .with_roster(g1(), DayCategory::Weekend, ["D", "E"]);
        let mut state = DutyState::new(rosters);
        let untouched = state.clone();
        let cal = HolidayCalendar::new();
        let planner = RotationPlanner::new(&cal);

        let mut session = planner.begin(&mut state, month(2));
        session.preview().unwrap();
        let report = session.cancel();
        assert!(report.stages.is_empty());
        assert_eq!(state, untouched);

        let mut session = planner.begin(&mut state, month(2));
        session.preview().unwrap();
        session.commit().unwrap();
        session.preview().unwrap();
        session.commit().unwrap();
        session.preview().unwrap();
        let report = session.cancel();
        assert_eq!(report.stages.len(), 2);
        assert_eq!(final_name(&state, d(2, 1)), "D");
        assert!(state.finals.get(d(2, 2), g1()).is_none());
    }
}
