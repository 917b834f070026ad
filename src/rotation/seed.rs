//! Rotation seed resolution.
//!
//! The starting roster index for a month comes from, in order:
//! 1. the seed stored for the previous month,
//! 2. the most recent baseline entry before the month,
//! 3. index 0 (reported as [`Issue::MissingSeed`]).
//!
//! The start is the position after the seed person. A seed person who has
//! left the roster falls back to the number of qualifying days elapsed
//! since the configured epoch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StageContext;
use crate::error::Issue;
use crate::models::{DayCategory, GroupId, PersonId, Roster};

/// Where a seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedSource {
    /// Stored seed of the previous month.
    Stored,
    /// Latest baseline entry before the month.
    BaselineHistory,
    /// Seed person left the roster; elapsed-day count used.
    EpochCount,
    /// Nothing found; index 0.
    Missing,
}

/// A resolved starting index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedResolution {
    /// Roster index of the month's first qualifying date.
    pub start: usize,
    /// Strategy that produced it.
    pub source: SeedSource,
    /// Seed person, when one was found.
    pub person: Option<PersonId>,
}

/// Resolves the starting index for (category, group) in the context month.
pub fn resolve_seed(
    ctx: &StageContext<'_>,
    category: DayCategory,
    group: GroupId,
    roster: &Roster,
) -> (SeedResolution, Option<Issue>) {
    let month_start = ctx.month.first_day();
    let stored = ctx
        .state
        .seeds
        .get(category, group, ctx.month.prev())
        .map(|p| (p.clone(), SeedSource::Stored));
    let found = stored.or_else(|| {
        ctx.state
            .baseline
            .latest_before(month_start, category, group)
            .map(|(_, p)| (p.clone(), SeedSource::BaselineHistory))
    });

    let Some((person, source)) = found else {
        debug!(%category, %group, month = %ctx.month, "no rotation seed, starting at index 0");
        let issue = Issue::MissingSeed {
            category,
            group,
            month: ctx.month,
        };
        let resolution = SeedResolution {
            start: 0,
            source: SeedSource::Missing,
            person: None,
        };
        return (resolution, Some(issue));
    };

    let len = roster.len().max(1);
    match roster.position(&person) {
        Some(index) => {
            let start = (index + 1) % len;
            debug!(%category, %group, seed = %person, start, "rotation seed resolved");
            (
                SeedResolution {
                    start,
                    source,
                    person: Some(person),
                },
                None,
            )
        }
        None => {
            let elapsed = if month_start > ctx.config.epoch {
                ctx.count_between(category, ctx.config.epoch, month_start)
            } else {
                0
            };
            let start = elapsed % len;
            debug!(
                %category,
                %group,
                seed = %person,
                elapsed,
                start,
                "seed person left the roster, using elapsed count"
            );
            let issue = Issue::MalformedRosterReference {
                category,
                group,
                name: person.clone(),
            };
            (
                SeedResolution {
                    start,
                    source: SeedSource::EpochCount,
                    person: Some(person),
                },
                Some(issue),
            )
        }
    }
}
