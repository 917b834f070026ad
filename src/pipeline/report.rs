//! Stage summaries, run reports and the violations report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Issue;
use crate::models::{
    CrossMonthObligation, DayCategory, DutyState, GroupId, MonthKey, PersonId, ReasonKind,
    SkipCause, UnavailableCause,
};
use crate::rotation::{Stage, StageOutcome};

/// One user-facing deviation from rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Person now holding the slot.
    pub person: PersonId,
    /// Person replaced or exchanged with.
    pub counterpart: Option<PersonId>,
    /// Reason text.
    pub text: String,
    /// Swap pair id, for swaps.
    pub pair_id: Option<String>,
}

/// What a stage did, shown before the operator confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Month.
    pub month: MonthKey,
    /// Stage.
    pub stage: Stage,
    /// Slots to fill (dates × groups with a roster).
    pub slots: usize,
    /// Slots filled.
    pub assigned: usize,
    /// Slots left empty.
    pub unassigned: usize,
    /// Skips other than missing-period replacements.
    pub skips: Vec<SummaryLine>,
    /// Skips caused by a missing period.
    pub missing_replacements: Vec<SummaryLine>,
    /// Swap halves.
    pub swaps: Vec<SummaryLine>,
    /// Internal reinsertion shifts (not listed).
    pub shifts: usize,
    /// Obligations registered for the following month.
    pub obligations: Vec<CrossMonthObligation>,
    /// Conflicts left for review.
    pub unresolved: Vec<Issue>,
    /// Every other issue.
    pub issues: Vec<Issue>,
}

impl StageSummary {
    /// Summarizes a stage outcome.
    pub fn from_outcome(outcome: &StageOutcome) -> Self {
        let slots = outcome.dates.len() * outcome.groups.len();
        let assigned = outcome.assignments().count();

        let mut skips = Vec::new();
        let mut missing_replacements = Vec::new();
        let mut swaps = Vec::new();
        let mut shifts = 0;
        for (date, group, reason) in outcome.reasons.iter() {
            let line = SummaryLine {
                date,
                group,
                person: reason.person.clone(),
                counterpart: reason.swapped_with.clone(),
                text: reason.text.clone(),
                pair_id: reason.swap_pair_id.clone(),
            };
            match reason.kind {
                ReasonKind::Skip => {
                    let missing = matches!(
                        reason.meta.cause,
                        Some(SkipCause::Unavailable(UnavailableCause::Missing { .. }))
                    );
                    if missing {
                        missing_replacements.push(line);
                    } else {
                        skips.push(line);
                    }
                }
                ReasonKind::Swap => swaps.push(line),
                ReasonKind::Shift => shifts += 1,
            }
        }

        let (unresolved, issues): (Vec<Issue>, Vec<Issue>) = outcome
            .issues
            .iter()
            .cloned()
            .partition(|i| matches!(i, Issue::UnresolvedConflict { .. }));

        Self {
            month: outcome.month,
            stage: outcome.stage,
            slots,
            assigned,
            unassigned: slots.saturating_sub(assigned),
            skips,
            missing_replacements,
            swaps,
            shifts,
            obligations: outcome.obligations.clone(),
            unresolved,
            issues,
        }
    }

    /// Whether anything needs operator review.
    pub fn needs_review(&self) -> bool {
        !self.unresolved.is_empty() || self.issues.iter().any(Issue::needs_review)
    }
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}: {}/{} slots assigned",
            self.month, self.stage, self.assigned, self.slots
        )?;
        for (title, lines) in [
            ("skip", &self.skips),
            ("missing", &self.missing_replacements),
            ("swap", &self.swaps),
        ] {
            for l in lines {
                writeln!(f, "  {title} {} g{} {}: {}", l.date, l.group, l.person, l.text)?;
            }
        }
        if self.shifts > 0 {
            writeln!(f, "  {} internal shifts", self.shifts)?;
        }
        for o in &self.obligations {
            writeln!(f, "  bound {} to g{} on {}", o.person, o.group, o.date)?;
        }
        for i in self.unresolved.iter().chain(&self.issues) {
            writeln!(f, "  ! {i}")?;
        }
        Ok(())
    }
}

/// Summaries of every committed stage of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Committed stages, in order.
    pub stages: Vec<StageSummary>,
}

impl RunReport {
    /// Slots filled across all stages.
    pub fn total_assigned(&self) -> usize {
        self.stages.iter().map(|s| s.assigned).sum()
    }

    /// Slots left empty across all stages.
    pub fn total_unassigned(&self) -> usize {
        self.stages.iter().map(|s| s.unassigned).sum()
    }

    /// Skip lines, missing replacements included.
    pub fn skip_count(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.skips.len() + s.missing_replacements.len())
            .sum()
    }

    /// Swap halves.
    pub fn swap_count(&self) -> usize {
        self.stages.iter().map(|s| s.swaps.len()).sum()
    }

    /// Conflicts left for review.
    pub fn unresolved(&self) -> impl Iterator<Item = &Issue> {
        self.stages.iter().flat_map(|s| s.unresolved.iter())
    }

    /// Whether any stage needs review.
    pub fn needs_review(&self) -> bool {
        self.stages.iter().any(StageSummary::needs_review)
    }
}

/// One row of the per-month violations report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRow {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Category of the date.
    pub category: DayCategory,
    /// Final holder.
    pub assigned: PersonId,
    /// Baseline holder.
    pub expected: Option<PersonId>,
    /// Reason text, if recorded.
    pub reason: Option<String>,
    /// Reason kind, if recorded.
    pub kind: Option<ReasonKind>,
}

/// Every committed slot in `month` whose final differs from its baseline.
///
/// Slots explained only by an internal shift are left out.
pub fn violations_report(state: &DutyState, month: MonthKey) -> Vec<ViolationRow> {
    let mut rows = Vec::new();
    for (date, day) in state.finals.iter().filter(|(d, _)| month.contains(*d)) {
        for (group, person) in &day.slots {
            let expected = state.baseline.get(date, *group).cloned();
            if expected.as_ref().is_some_and(|e| e.matches(person.as_str())) {
                continue;
            }
            let reason = state.reasons.get(date, *group, person.as_str());
            if reason.is_some_and(|r| !r.is_visible()) {
                continue;
            }
            rows.push(ViolationRow {
                date,
                group: *group,
                category: day.category,
                assigned: person.clone(),
                expected,
                reason: reason.map(|r| r.text.clone()),
                kind: reason.map(|r| r.kind),
            });
        }
    }
    rows
}
