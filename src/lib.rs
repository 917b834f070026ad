//! Duty-rotation calendar engine for the U-Engine ecosystem.
//!
//! For a span of calendar days, assigns exactly one member of each duty
//! group to every relevant day, rotating through priority-ordered rosters
//! while respecting availability and avoiding forbidden adjacent-day
//! combinations. Every deviation from pure rotation is explained in an
//! assignment reason ledger.
//!
//! # Modules
//!
//! - **`models`**: Domain types (`DayCategory`, `Roster`, `RosterStore`,
//!   `ScheduleTable`, `ReasonLedger`, `ObligationTable`, `DutyState`)
//! - **`rotation`**: Stage engine for seed resolution, baseline rotation,
//!   availability skips, weekend month-skips, semi/normal conflict swaps,
//!   return-from-missing reinsertion
//! - **`pipeline`**: Checkpointed four-stage runs, summaries, reports
//! - **`validation`**: Roster integrity checks and post-run audits
//!
//! # Pipeline
//!
//! Stages run strictly in order, each reading the committed output of the
//! ones before it:
//!
//! ```text
//! special holiday → weekend/holiday → semi-normal → normal
//! ```
//!
//! Multi-month runs process months in ascending order so each month's
//! rotation seed derives from the previous month's committed finals.
//!
//! # External Collaborators
//!
//! The holiday calendar and the availability source are consumed through
//! two traits, [`models::DayClassifier`] and [`models::AvailabilityOracle`].
//! Persistence and rendering stay outside this crate.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod rotation;
pub mod validation;

pub use config::RotationConfig;
pub use error::{Issue, RotationError};
