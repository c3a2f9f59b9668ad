//! # session-scheduler
//!
//! Recurrence expansion and conflict resolution for class-session scheduling.
//!
//! When a class definition is created with session templates, each template is
//! expanded into concrete occurrences, every occurrence is checked against
//! existing commitments through an injected [`ConflictCheck`], and collisions
//! are settled by the template's FAIL / SKIP / ROLLOVER policy. The engine is
//! synchronous and keeps no state between calls.
//!
//! ## Modules
//!
//! - [`model`] — templates, rules, scopes, instances, conflicts
//! - [`expander`] — first window + rule → candidate occurrences
//! - [`detector`] — the `ConflictCheck` capability and reason normalization
//! - [`resolver`] — FAIL / SKIP / ROLLOVER decisions
//! - [`materializer`] — the `materialize` entry point
//! - [`timetable`] — in-memory `ConflictCheck` implementation
//! - [`ical`] — RFC 5545 export of a template's series
//! - [`dst`] — DST transition policies
//! - [`config`] — engine configuration
//! - [`error`] — Error types

pub mod config;
pub mod detector;
pub mod dst;
pub mod error;
pub mod expander;
pub mod ical;
pub mod materializer;
pub mod model;
pub mod resolver;
pub mod timetable;

pub use config::SchedulerConfig;
pub use detector::{ConflictCheck, ConflictDetector, OverlapKind, OverlapReason};
pub use error::{CheckError, ScheduleError};
pub use expander::{expand, expand_template, Occurrences};
pub use ical::export_rrule;
pub use materializer::{materialize, Scheduler};
pub use model::{
    ConflictOutcome, ConflictResolutionStrategy, DayOfWeek, Materialization, RecurrenceRule,
    RecurrenceType, ScheduledInstance, SchedulingConflict, Scope, SessionTemplate, TemplateError,
    TemplateErrorKind, TimeWindow,
};
pub use timetable::InMemoryTimetable;
