//! Assignment reason ledger.
//!
//! Explains why a final assignment differs from the baseline. Entries are
//! keyed by (date, group, normalized person name), so a slot holds at most
//! one reason per person.
//!
//! | Kind | Produced by | User-facing |
//! |------|-------------|-------------|
//! | `Skip` | availability skip, weekend month-skip, critical anchor | yes |
//! | `Swap` | semi/normal conflict swaps (always in pairs) | yes |
//! | `Shift` | return-from-missing cascade | no |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{normalize_name, DateRange, GroupId, PersonId, UnavailableCause};

/// Classification of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonKind {
    /// Replaced an ineligible baseline person on the same date.
    Skip,
    /// Exchanged with another date to resolve an adjacency conflict.
    Swap,
    /// Internal displacement from a reinsertion cascade.
    Shift,
}

/// What made a skip necessary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipCause {
    /// The replaced person was unavailable.
    Unavailable(UnavailableCause),
    /// The replaced person holds a special-holiday duty in the same month.
    SpecialDutySameMonth,
    /// The replaced person was already skipped this month.
    AlreadySkippedThisMonth,
    /// An operator anchored someone else in the slot.
    CriticalAnchor,
}

/// Bookkeeping for swaps whose partner slot lies in the following month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossMonthMeta {
    /// Date of the conflicted slot in the current month.
    pub origin_date: NaiveDate,
    /// Date in the following month the displaced person is bound to.
    pub target_date: NaiveDate,
    /// Adjacent date that caused the conflict.
    pub conflict_date: Option<NaiveDate>,
}

/// Structured detail attached to a reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonMeta {
    /// Who pure rotation put in the slot.
    pub baseline_person: Option<PersonId>,
    /// Skip cause.
    pub cause: Option<SkipCause>,
    /// Adjacent date behind a swap.
    pub conflict_date: Option<NaiveDate>,
    /// Set for swaps crossing into the following month.
    pub cross_month: Option<CrossMonthMeta>,
    /// Returning person whose reinsertion caused a shift.
    pub reinserted: Option<PersonId>,
    /// Text of the entry this one replaced, if any.
    pub previous_reason: Option<String>,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReason {
    /// The person now holding the slot.
    pub person: PersonId,
    /// Entry kind.
    pub kind: ReasonKind,
    /// Human-readable explanation.
    pub text: String,
    /// The person replaced or exchanged with.
    pub swapped_with: Option<PersonId>,
    /// Shared by both halves of a swap.
    pub swap_pair_id: Option<String>,
    /// Structured detail.
    pub meta: ReasonMeta,
}

impl AssignmentReason {
    /// A skip entry: `person` replaced `replaced`.
    pub fn skip(
        person: PersonId,
        replaced: PersonId,
        cause: SkipCause,
        text: impl Into<String>,
    ) -> Self {
        Self {
            person,
            kind: ReasonKind::Skip,
            text: text.into(),
            swapped_with: Some(replaced),
            swap_pair_id: None,
            meta: ReasonMeta {
                cause: Some(cause),
                ..ReasonMeta::default()
            },
        }
    }

    /// One half of a swap pair.
    pub fn swap(
        person: PersonId,
        partner: PersonId,
        pair_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            person,
            kind: ReasonKind::Swap,
            text: text.into(),
            swapped_with: Some(partner),
            swap_pair_id: Some(pair_id.into()),
            meta: ReasonMeta::default(),
        }
    }

    /// An internal shift entry.
    pub fn shift(person: PersonId, displaced: Option<PersonId>, text: impl Into<String>) -> Self {
        Self {
            person,
            kind: ReasonKind::Shift,
            text: text.into(),
            swapped_with: displaced,
            swap_pair_id: None,
            meta: ReasonMeta::default(),
        }
    }

    /// Replaces the structured detail.
    pub fn with_meta(mut self, meta: ReasonMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the baseline person.
    pub fn with_baseline(mut self, baseline: Option<PersonId>) -> Self {
        self.meta.baseline_person = baseline;
        self
    }

    /// Records the text of a superseded entry.
    pub fn superseding(mut self, previous: Option<&AssignmentReason>) -> Self {
        self.meta.previous_reason = previous.map(|r| r.text.clone());
        self
    }

    /// Whether the entry is shown in user-facing summaries.
    pub fn is_visible(&self) -> bool {
        self.kind != ReasonKind::Shift
    }
}

type SlotReasons = BTreeMap<String, AssignmentReason>;

/// Reasons keyed by date, group and normalized person name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonLedger {
    entries: BTreeMap<NaiveDate, BTreeMap<GroupId, SlotReasons>>,
}

impl ReasonLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reason, replacing any entry for the same person and slot.
    pub fn record(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        reason: AssignmentReason,
    ) -> Option<AssignmentReason> {
        self.entries
            .entry(date)
            .or_default()
            .entry(group)
            .or_default()
            .insert(reason.person.normalized(), reason)
    }

    /// Reason for a person in a slot; `person` is normalized before matching.
    pub fn get(&self, date: NaiveDate, group: GroupId, person: &str) -> Option<&AssignmentReason> {
        self.entries
            .get(&date)
            .and_then(|g| g.get(&group))
            .and_then(|s| s.get(&normalize_name(person)))
    }

    /// Removes the reason for a person in a slot.
    pub fn remove(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        person: &str,
    ) -> Option<AssignmentReason> {
        let groups = self.entries.get_mut(&date)?;
        let slot = groups.get_mut(&group)?;
        let removed = slot.remove(&normalize_name(person));
        if slot.is_empty() {
            groups.remove(&group);
        }
        if groups.is_empty() {
            self.entries.remove(&date);
        }
        removed
    }

    /// Every reason recorded for a slot.
    pub fn for_slot(
        &self,
        date: NaiveDate,
        group: GroupId,
    ) -> impl Iterator<Item = &AssignmentReason> {
        self.entries
            .get(&date)
            .and_then(|g| g.get(&group))
            .into_iter()
            .flat_map(|s| s.values())
    }

    /// Iterates all entries ascending by date then group.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, GroupId, &AssignmentReason)> {
        self.entries.iter().flat_map(|(date, groups)| {
            groups
                .iter()
                .flat_map(move |(g, slot)| slot.values().map(move |r| (*date, *g, r)))
        })
    }

    /// Entries within a range.
    pub fn iter_range(
        &self,
        range: DateRange,
    ) -> impl Iterator<Item = (NaiveDate, GroupId, &AssignmentReason)> {
        self.entries
            .range(range.start()..=range.end())
            .flat_map(|(date, groups)| {
                groups
                    .iter()
                    .flat_map(move |(g, slot)| slot.values().map(move |r| (*date, *g, r)))
            })
    }

    /// User-facing entries (skips and swaps) within a range.
    pub fn visible_in(
        &self,
        range: DateRange,
    ) -> impl Iterator<Item = (NaiveDate, GroupId, &AssignmentReason)> {
        self.iter_range(range).filter(|(_, _, r)| r.is_visible())
    }

    /// Entries sharing a swap pair id.
    pub fn pair(&self, pair_id: &str) -> Vec<(NaiveDate, GroupId, &AssignmentReason)> {
        self.iter()
            .filter(|(_, _, r)| r.swap_pair_id.as_deref() == Some(pair_id))
            .collect()
    }

    /// Drops every entry on the given dates.
    pub fn clear_dates(&mut self, dates: &[NaiveDate]) {
        for date in dates {
            self.entries.remove(date);
        }
    }

    /// Moves every entry of `other` into this ledger, replacing on collision.
    pub fn merge(&mut self, other: ReasonLedger) {
        for (date, groups) in other.entries {
            for (group, slot) in groups {
                self.entries
                    .entry(date)
                    .or_default()
                    .entry(group)
                    .or_default()
                    .extend(slot);
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
