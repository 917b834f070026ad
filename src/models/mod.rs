//! Duty-rotation domain models.
//!
//! Provides the data types shared by every stage: calendar classification,
//! people and groups, rosters with availability, the baseline and final
//! assignment tables, the reason ledger, cross-month obligations and the
//! persisted state bundle.
//!
//! # Tables
//!
//! | Type | Keyed by | Written by |
//! |------|----------|------------|
//! | `ScheduleTable` (baseline) | date × group | stage commit, write-once |
//! | `ScheduleTable` (finals) | date × group | stage commit, overwritten on re-run |
//! | `ReasonLedger` | date × group × person | stage commit |
//! | `ObligationTable` | future date × group | semi/normal swap resolvers |
//! | `SeedTable` | category × group × month | stage commit |
//! | `CriticalAssignments` | date | operator, never deleted |

mod availability;
mod calendar;
mod category;
mod critical;
mod obligation;
mod person;
mod reason;
mod roster;
mod schedule;
mod state;

pub use availability::{AvailabilityOracle, UnavailableCause};
pub use calendar::{DateRange, DayClassifier, HolidayCalendar, MonthKey};
pub use category::DayCategory;
pub use critical::{CriticalAssignment, CriticalAssignments};
pub use obligation::{CrossMonthObligation, ObligationTable};
pub use person::{normalize_name, Assignee, GroupId, PersonId};
pub use reason::{AssignmentReason, CrossMonthMeta, ReasonKind, ReasonLedger, ReasonMeta, SkipCause};
pub use roster::{Availability, Group, MissingPeriod, Roster, RosterEntry, RosterStore};
pub use schedule::{DayAssignment, ScheduleTable};
pub use state::{DutyState, RotationSeed, SeedTable};
