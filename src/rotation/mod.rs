//! Stage engine.
//!
//! One stage assigns one day category for one month (or the part of it
//! inside the run range). Every stage starts with baseline rotation plus
//! availability skips; later stages then repair what they can see:
//!
//! | Stage | After baseline | Conflicts checked against |
//! |-------|----------------|---------------------------|
//! | `SpecialHoliday` | none | none |
//! | `WeekendHoliday` | month-skip for special-duty holders | none |
//! | `SemiNormal` | semi swap resolver | weekend, special |
//! | `Normal` | reinsertion, then normal swap resolver | semi, weekend, special |
//!
//! A stage never touches [`DutyState`](crate::models::DutyState): it reads
//! committed state through a [`StageContext`] and returns a
//! [`StageOutcome`] that the pipeline commits.

mod baseline;
mod conflict;
mod context;
mod normal;
mod outcome;
mod reinsert;
mod seed;
mod semi;
mod swap;
mod weekend;

pub use baseline::{rotate, Rotation};
pub use conflict::{find_conflict, Conflict};
pub use context::StageContext;
pub use normal::Track;
pub use outcome::StageOutcome;
pub use reinsert::{plan_reinsertion, ReinsertionPlan, ShiftChange};
pub use seed::{resolve_seed, SeedResolution, SeedSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::models::DayCategory;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Special (major) holidays.
    SpecialHoliday,
    /// Weekends and ordinary holidays.
    WeekendHoliday,
    /// Working days before a non-working day.
    SemiNormal,
    /// Ordinary working days.
    Normal,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::SpecialHoliday,
        Stage::WeekendHoliday,
        Stage::SemiNormal,
        Stage::Normal,
    ];

    /// The category this stage assigns.
    pub fn category(self) -> DayCategory {
        match self {
            Stage::SpecialHoliday => DayCategory::Special,
            Stage::WeekendHoliday => DayCategory::Weekend,
            Stage::SemiNormal => DayCategory::Semi,
            Stage::Normal => DayCategory::Normal,
        }
    }

    /// The stage assigning a category.
    pub fn for_category(category: DayCategory) -> Self {
        match category {
            DayCategory::Special => Stage::SpecialHoliday,
            DayCategory::Weekend => Stage::WeekendHoliday,
            DayCategory::Semi => Stage::SemiNormal,
            DayCategory::Normal => Stage::Normal,
        }
    }

    /// Neighbour categories this stage resolves conflicts against.
    ///
    /// Only categories committed by earlier stages are visible.
    pub fn conflict_scope(self) -> &'static [DayCategory] {
        match self {
            Stage::SpecialHoliday | Stage::WeekendHoliday => &[],
            Stage::SemiNormal => &[DayCategory::Weekend, DayCategory::Special],
            Stage::Normal => &[DayCategory::Semi, DayCategory::Weekend, DayCategory::Special],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category().label())
    }
}

/// Computes one stage against committed state.
///
/// The result is a preview: nothing is written until the pipeline commits
/// the returned outcome.
pub fn run_stage(ctx: &StageContext<'_>) -> StageOutcome {
    debug!(
        month = %ctx.month,
        stage = %ctx.stage,
        range_start = %ctx.range.start(),
        range_end = %ctx.range.end(),
        "running stage"
    );

    let mut outcome = StageOutcome::new(ctx);
    baseline::assign_category(ctx, &mut outcome);

    match ctx.stage {
        Stage::SpecialHoliday => {}
        Stage::WeekendHoliday => weekend::apply_month_skip(ctx, &mut outcome),
        Stage::SemiNormal => semi::resolve_conflicts(ctx, &mut outcome),
        Stage::Normal => {
            reinsert::reinsert_returning(ctx, &mut outcome);
            normal::resolve_conflicts(ctx, &mut outcome);
        }
    }

    outcome.finish(ctx);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_categories() {
        let cats: Vec<DayCategory> = Stage::ALL.iter().map(|s| s.category()).collect();
        assert_eq!(cats, DayCategory::ALL.to_vec());
        for c in DayCategory::ALL {
            assert_eq!(Stage::for_category(c).category(), c);
        }
    }

    #[test]
    fn test_conflict_scope_only_sees_earlier_stages() {
        for stage in Stage::ALL {
            for c in stage.conflict_scope() {
                assert!(Stage::for_category(*c) < stage);
                assert!(stage.category().conflicts_with(*c));
            }
        }
        assert_eq!(Stage::SemiNormal.to_string(), "semi-normal");
    }
}
