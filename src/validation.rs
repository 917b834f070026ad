//! Roster integrity checks and post-run schedule audit.
//!
//! [`validate_rosters`] inspects input before a run. Detects:
//! - Duplicate persons on one roster (after name normalization)
//! - Priorities that are not exactly 1..=n in roster order
//! - Missing periods that end before they start
//! - Availability or missing records for persons on none of the group's rosters
//!
//! [`audit_schedule`] inspects committed state after a run. Detects:
//! - One person holding conflicting categories on adjacent days
//! - Finals that differ from baseline with no recorded reason
//! - Swap pair ids not shared by exactly two ledger entries

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DateRange, DayClassifier, DutyState, ReasonKind, RosterStore};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A person appears twice on one roster.
    DuplicatePerson,
    /// Roster priorities are not contiguous from 1.
    PriorityGap,
    /// A missing period ends before it starts.
    InvertedMissingPeriod,
    /// An availability or missing record names a non-member.
    OrphanRecord,
    /// A person holds conflicting categories on adjacent days.
    AdjacentConflict,
    /// A final differs from baseline and no reason explains it.
    UnexplainedDeviation,
    /// A swap pair id is not shared by exactly two entries.
    BrokenSwapPair,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates every group of a roster store.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_rosters(rosters: &RosterStore) -> ValidationResult {
    let mut errors = Vec::new();

    for group in rosters.groups() {
        for (category, roster) in &group.rosters {
            let mut seen = BTreeSet::new();
            for (index, entry) in roster.entries().iter().enumerate() {
                if !seen.insert(entry.person.normalized()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicatePerson,
                        format!(
                            "{} appears twice on the {category} roster of group {}",
                            entry.person, group.id
                        ),
                    ));
                }
                if entry.priority as usize != index + 1 {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::PriorityGap,
                        format!(
                            "{} has priority {} at position {} of the {category} roster of group {}",
                            entry.person,
                            entry.priority,
                            index + 1,
                            group.id
                        ),
                    ));
                }
            }
        }

        for (person, periods) in &group.missing {
            for period in periods.iter().filter(|p| p.end < p.start) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvertedMissingPeriod,
                    format!(
                        "missing period for {person} in group {} ends {} before it starts {}",
                        group.id, period.end, period.start
                    ),
                ));
            }
        }

        let records = group
            .availability
            .keys()
            .map(|p| (p, "availability"))
            .chain(group.missing.keys().map(|p| (p, "missing-period")));
        for (person, what) in records {
            if !group.is_member(person) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OrphanRecord,
                    format!("{what} record for {person} who is on no roster of group {}", group.id),
                ));
            }
        }
    }

    into_result(errors)
}

/// Audits committed finals within `range`.
///
/// Adjacency is judged by `classifier`, not by the categories stored with
/// the finals, so a calendar change after commit shows up here.
pub fn audit_schedule(
    state: &DutyState,
    classifier: &dyn DayClassifier,
    range: DateRange,
) -> ValidationResult {
    let mut errors = Vec::new();

    for (date, day) in state.finals.iter().filter(|(d, _)| range.contains(*d)) {
        let category = classifier.classify(date);
        let next = date.succ_opt();

        for (group, person) in &day.slots {
            // Forward neighbour only, so each clash is reported once
            if let Some(next) = next {
                let next_category = classifier.classify(next);
                let clash = state
                    .finals
                    .get(next, *group)
                    .is_some_and(|p| p.matches(person.as_str()));
                if clash && category.conflicts_with(next_category) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::AdjacentConflict,
                        format!(
                            "{person} (group {group}) has {category} duty on {date} and {next_category} duty on {next}"
                        ),
                    ));
                }
            }

            let deviates = state
                .baseline
                .get(date, *group)
                .is_some_and(|b| !b.matches(person.as_str()));
            if deviates && state.reasons.get(date, *group, person.as_str()).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnexplainedDeviation,
                    format!(
                        "{person} (group {group}) on {date} differs from baseline with no reason"
                    ),
                ));
            }
        }
    }

    let mut pairs: BTreeMap<&str, Vec<NaiveDate>> = BTreeMap::new();
    for (date, _, reason) in state.reasons.iter() {
        if reason.kind != ReasonKind::Swap {
            continue;
        }
        if let Some(id) = reason.swap_pair_id.as_deref() {
            pairs.entry(id).or_default().push(date);
        }
    }
    for (id, dates) in pairs {
        if dates.len() != 2 && dates.iter().any(|d| range.contains(*d)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::BrokenSwapPair,
                format!("swap pair {id} has {} entries", dates.len()),
            ));
        }
    }

    into_result(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RotationConfig;
    use crate::models::{
        Availability, DayCategory, GroupId, HolidayCalendar, MissingPeriod, MonthKey, Roster,
    };
    use crate::pipeline::RotationPlanner;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn g1() -> GroupId {
        GroupId::new(1).unwrap()
    }

    fn feb() -> DateRange {
        MonthKey::new(2026, 2).unwrap().range()
    }

    fn sample_rosters() -> RosterStore {
        RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["X", "P", "Y", "Q"])
            .with_roster(g1(), DayCategory::Weekend, ["X", "W1", "W2", "W3"])
    }

    #[test]
    fn test_valid_rosters() {
        let mut rosters = sample_rosters();
        rosters.disable(g1(), "P");
        rosters
            .add_missing_period(g1(), "Y", MissingPeriod::new(d(2, 3), d(2, 5), ""))
            .unwrap();
        assert!(validate_rosters(&rosters).is_ok());
    }

    #[test]
    fn test_duplicate_person_and_priority_gap() {
        let roster: Roster = serde_json::from_value(serde_json::json!({
            "entries": [
                { "person": "Kim", "priority": 1 },
                { "person": "kim ", "priority": 3 }
            ]
        }))
        .unwrap();
        let mut rosters = sample_rosters();
        rosters
            .group_mut(g1())
            .rosters
            .insert(DayCategory::Semi, roster);

        let errors = validate_rosters(&rosters).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicatePerson));
        assert!(errors.iter().any(|e| {
            e.kind == ValidationErrorKind::PriorityGap && e.message.contains("priority 3")
        }));
    }

    #[test]
    fn test_inverted_period_and_orphans() {
        let mut rosters = sample_rosters();
        let group = rosters.group_mut(g1());
        group
            .missing
            .entry("X".into())
            .or_default()
            .push(MissingPeriod::new(d(2, 10), d(2, 1), "typo"));
        group
            .availability
            .insert("Nobody".into(), Availability::disabled());

        let errors = validate_rosters(&rosters).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvertedMissingPeriod));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::OrphanRecord && e.message.contains("Nobody")));
    }

    #[test]
    fn test_clean_run_passes_audit() {
        let mut state = DutyState::new(sample_rosters());
        let cal = HolidayCalendar::new();
        RotationPlanner::new(&cal).run(&mut state, feb());

        assert!(audit_schedule(&state, &cal, feb()).is_ok());
    }

    #[test]
    fn test_audit_reports_adjacent_conflicts() {
        let rosters = RosterStore::new()
            .with_roster(g1(), DayCategory::Normal, ["X"])
            .with_roster(g1(), DayCategory::Weekend, ["X"]);
        let mut state = DutyState::new(rosters);
        let cal = HolidayCalendar::new();
        RotationPlanner::new(&cal)
            .with_config(RotationConfig::new().with_cross_month_swaps(false))
            .run(&mut state, feb());

        let errors = audit_schedule(&state, &cal, feb()).unwrap_err();
        let conflicts: Vec<_> = errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::AdjacentConflict)
            .collect();
        // Sunday -> Monday for 1/2, 8/9, 15/16, 22/23
        assert_eq!(conflicts.len(), 4);
    }

    #[test]
    fn test_audit_reports_unexplained_edits() {
        let mut state = DutyState::new(sample_rosters());
        let cal = HolidayCalendar::new();
        RotationPlanner::new(&cal).run(&mut state, feb());

        // Hand edit without a reason
        state.finals.set(d(2, 10), DayCategory::Normal, g1(), "Q".into());
        // Break a swap pair
        let pair_id = state
            .reasons
            .get(d(2, 2), g1(), "Y")
            .and_then(|r| r.swap_pair_id.clone())
            .unwrap();
        state.reasons.remove(d(2, 4), g1(), "X");

        let errors = audit_schedule(&state, &cal, feb()).unwrap_err();
        assert!(errors.iter().any(|e| {
            e.kind == ValidationErrorKind::UnexplainedDeviation && e.message.contains("2026-02-10")
        }));
        assert!(errors.iter().any(|e| {
            e.kind == ValidationErrorKind::BrokenSwapPair && e.message.contains(&pair_id)
        }));
    }
}
