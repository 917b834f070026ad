//! Stage results awaiting commit.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::warn;

use super::{find_conflict, ShiftChange, Stage, StageContext};
use crate::error::Issue;
use crate::models::{
    AssignmentReason, CrossMonthObligation, DateRange, DayCategory, GroupId, MonthKey, PersonId,
    ReasonKind, ReasonLedger, RotationSeed, ScheduleTable,
};

/// The preview produced by one stage.
///
/// `finals` is a working copy of every committed final with this stage's
/// slots recomputed; only the slots of the stage's own category within
/// `range` are written back on commit.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Stage computed.
    pub stage: Stage,
    /// Month computed.
    pub month: MonthKey,
    /// Run range clipped to the month.
    pub range: DateRange,
    /// Dates of the stage's category within `range`.
    pub dates: Vec<NaiveDate>,
    /// Groups with a roster for the category.
    pub groups: Vec<GroupId>,
    /// Pure-rotation assignments for `dates`.
    pub baseline: ScheduleTable,
    /// Working finals.
    pub finals: ScheduleTable,
    /// Reasons produced by the stage, including future-dated swap halves.
    pub reasons: ReasonLedger,
    /// Slots no resolver may move (critical anchors, preserved finals,
    /// honoured obligations).
    pub locked: BTreeSet<(NaiveDate, GroupId)>,
    /// Obligations registered by this stage.
    pub obligations: Vec<CrossMonthObligation>,
    /// Existing obligations honoured by this stage.
    pub fulfilled: Vec<(NaiveDate, GroupId)>,
    /// Reinsertion cascade changes, already applied to `finals`.
    pub changes: Vec<ShiftChange>,
    /// Recovered conditions.
    pub issues: Vec<Issue>,
    /// Seeds to store for the month.
    pub seeds: Vec<RotationSeed>,
}

impl StageOutcome {
    pub(crate) fn new(ctx: &StageContext<'_>) -> Self {
        let category = ctx.category();
        let dates = ctx.stage_dates();
        let mut finals = ctx.state.finals.clone();
        finals.remove_category_in(ctx.range, category);
        for date in &dates {
            finals.remove_day(*date);
        }

        Self {
            stage: ctx.stage,
            month: ctx.month,
            range: ctx.range,
            dates,
            groups: ctx.groups_for(category),
            baseline: ScheduleTable::new(),
            finals,
            reasons: ReasonLedger::new(),
            locked: BTreeSet::new(),
            obligations: Vec::new(),
            fulfilled: Vec::new(),
            changes: Vec::new(),
            issues: Vec::new(),
            seeds: Vec::new(),
        }
    }

    /// Category of the stage.
    pub fn category(&self) -> DayCategory {
        self.stage.category()
    }

    /// Final holder of a slot.
    pub fn final_at(&self, date: NaiveDate, group: GroupId) -> Option<&PersonId> {
        self.finals.get(date, group)
    }

    /// The stage's final assignments, ascending.
    pub fn assignments(&self) -> impl Iterator<Item = (NaiveDate, GroupId, &PersonId)> {
        self.finals.entries_in(self.range, self.category())
    }

    /// Effective baseline for a slot: the stored one if any (baseline is
    /// write-once), else the one computed by this stage.
    pub fn expected(
        &self,
        ctx: &StageContext<'_>,
        date: NaiveDate,
        group: GroupId,
    ) -> Option<PersonId> {
        ctx.state
            .baseline
            .get(date, group)
            .or_else(|| self.baseline.get(date, group))
            .cloned()
    }

    /// Whether a slot is locked.
    pub fn is_locked(&self, date: NaiveDate, group: GroupId) -> bool {
        self.locked.contains(&(date, group))
    }

    /// Whether `person` already holds a swap reason on a slot.
    pub fn has_swap(&self, date: NaiveDate, group: GroupId, person: &PersonId) -> bool {
        self.reasons
            .get(date, group, person.as_str())
            .is_some_and(|r| r.kind == ReasonKind::Swap)
    }

    /// Whether a slot is bound by an existing or newly registered obligation.
    ///
    /// Committed obligations originated by this stage over this range are
    /// ignored: commit replaces them with the ones this run registers.
    pub fn is_bound(&self, ctx: &StageContext<'_>, date: NaiveDate, group: GroupId) -> bool {
        let committed = ctx.state.obligations.get(date, group).is_some_and(|o| {
            o.origin_category != ctx.category() || !ctx.range.contains(o.origin_date)
        });
        committed
            || self
                .obligations
                .iter()
                .any(|o| o.date == date && o.group == group)
    }

    /// Records a reason for the current holder of a slot, dropping the
    /// reason of the person who held it before.
    pub(crate) fn replace_reason(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        previous: Option<&PersonId>,
        reason: AssignmentReason,
    ) {
        let old = previous.and_then(|p| self.reasons.remove(date, group, p.as_str()));
        let reason = if old.is_some() {
            reason.superseding(old.as_ref())
        } else {
            reason
        };
        self.reasons.record(date, group, reason);
    }

    /// Whether any issue needs operator review.
    pub fn needs_review(&self) -> bool {
        self.issues.iter().any(Issue::needs_review)
    }

    /// Residual conflict scan and seed computation.
    pub(crate) fn finish(&mut self, ctx: &StageContext<'_>) {
        let category = self.category();
        let scope = self.stage.conflict_scope();

        if !scope.is_empty() {
            for date in &self.dates {
                for group in &self.groups {
                    let Some(person) = self.finals.get(*date, *group) else {
                        continue;
                    };
                    let conflict =
                        find_conflict(&self.finals, *date, *group, person, category, scope);
                    if let Some(c) = conflict {
                        warn!(
                            date = %c.date,
                            group = %c.group,
                            person = %c.person,
                            neighbor = %c.neighbor_date,
                            "unresolved adjacency conflict"
                        );
                        self.issues.push(c.into_issue());
                    }
                }
            }
        }

        let month_range = ctx.month.range();
        self.seeds = self
            .groups
            .iter()
            .filter_map(|g| {
                self.finals
                    .last_in(month_range, category, *g)
                    .map(|(_, person)| RotationSeed {
                        category,
                        group: *g,
                        month: ctx.month,
                        person: person.clone(),
                    })
            })
            .collect();
    }
}
