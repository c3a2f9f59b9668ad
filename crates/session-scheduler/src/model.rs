//! Request and result types shared by every stage of the engine.
//!
//! Field names serialize in camelCase so the result can be embedded verbatim
//! into the class-creation response.

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(ScheduleError::InvalidWindow(format!(
                "end {} is not after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two windows overlap iff `a.start < b.end && b.start < a.end`.
    ///
    /// Back-to-back windows (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Length of the shared part in minutes; 0 when the windows do not overlap.
    pub fn overlap_minutes(&self, other: &TimeWindow) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        (self.end.min(other.end) - self.start.max(other.start)).num_minutes()
    }
}

/// How a template's recurrence repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

/// Weekday tag as it appears in requests (`"MONDAY"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

fn default_interval() -> u32 {
    1
}

/// Governs expansion of a template into multiple occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub recurrence_type: RecurrenceType,
    /// Repeat every N units (days, weeks or months).
    #[serde(default = "default_interval")]
    pub interval_value: u32,
    /// Qualifying weekdays; only meaningful for `WEEKLY`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<DayOfWeek>,
    /// Target day 1-31; only meaningful for `MONTHLY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    /// Inclusive bound on the start date of generated occurrences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Maximum number of occurrences to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_count: Option<u32>,
}

impl RecurrenceRule {
    fn of(recurrence_type: RecurrenceType) -> Self {
        Self {
            recurrence_type,
            interval_value: 1,
            days_of_week: Vec::new(),
            day_of_month: None,
            end_date: None,
            occurrence_count: None,
        }
    }

    pub fn none() -> Self {
        Self::of(RecurrenceType::None)
    }

    pub fn daily() -> Self {
        Self::of(RecurrenceType::Daily)
    }

    pub fn weekly(days: impl IntoIterator<Item = DayOfWeek>) -> Self {
        Self {
            days_of_week: days.into_iter().collect(),
            ..Self::of(RecurrenceType::Weekly)
        }
    }

    pub fn monthly(day_of_month: u32) -> Self {
        Self {
            day_of_month: Some(day_of_month),
            ..Self::of(RecurrenceType::Monthly)
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval_value = interval;
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn count(mut self, occurrences: u32) -> Self {
        self.occurrence_count = Some(occurrences);
        self
    }
}

/// What to do when an occurrence collides with an existing commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictResolutionStrategy {
    /// Any conflict discards the whole template.
    #[default]
    Fail,
    /// Drop the conflicting occurrence and keep going.
    Skip,
    /// Move the conflicting occurrence forward until it fits.
    Rollover,
}

/// One planned time slot for a class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTemplate {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub conflict_resolution: ConflictResolutionStrategy,
    /// IANA timezone whose wall clock anchors the recurrence. UTC when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl SessionTemplate {
    /// A single-occurrence template with the default FAIL strategy.
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            recurrence: None,
            conflict_resolution: ConflictResolutionStrategy::default(),
            timezone: None,
        }
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictResolutionStrategy) -> Self {
        self.conflict_resolution = strategy;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn first_window(&self) -> Result<TimeWindow> {
        TimeWindow::new(self.start_time, self.end_time)
    }
}

/// The identifiers a window is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub instructor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub organisation_id: String,
    /// Seats the class needs; used by capacity checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_participants: Option<u32>,
}

impl Scope {
    pub fn new(instructor_id: impl Into<String>, organisation_id: impl Into<String>) -> Self {
        Self {
            instructor_id: instructor_id.into(),
            location_id: None,
            organisation_id: organisation_id.into(),
            expected_participants: None,
        }
    }

    pub fn at_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn with_participants(mut self, participants: u32) -> Self {
        self.expected_participants = Some(participants);
        self
    }
}

/// One occurrence produced by expansion, before conflict checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// 1-based position within the template's generated series.
    pub sequence_number: u32,
    pub window: TimeWindow,
}

/// One concrete, conflict-cleared occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledInstance {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub template_index: usize,
    pub sequence_number: u32,
    /// How many days ROLLOVER moved this occurrence; 0 when it kept its slot.
    #[serde(default)]
    pub rollover_days: u32,
}

impl ScheduledInstance {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Why a conflicting occurrence did not make it into the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictOutcome {
    /// Dropped under SKIP.
    Skipped,
    /// Caused a FAIL template to be discarded.
    Aborted,
    /// ROLLOVER ran out of probes.
    RolloverExhausted,
}

/// A candidate that could not be honored as proposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingConflict {
    pub template_index: usize,
    pub sequence_number: u32,
    pub requested_start: DateTime<Utc>,
    pub requested_end: DateTime<Utc>,
    pub reasons: Vec<String>,
    pub outcome: ConflictOutcome,
}

impl SchedulingConflict {
    pub(crate) fn new(
        template_index: usize,
        candidate: &Candidate,
        reasons: Vec<String>,
        outcome: ConflictOutcome,
    ) -> Self {
        Self {
            template_index,
            sequence_number: candidate.sequence_number,
            requested_start: candidate.window.start,
            requested_end: candidate.window.end,
            reasons,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateErrorKind {
    MalformedRecurrence,
    InvalidWindow,
    InvalidTimezone,
}

/// A template the engine refused to expand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateError {
    pub template_index: usize,
    pub kind: TemplateErrorKind,
    pub message: String,
}

/// Accepted instances plus everything that could not be scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Materialization {
    pub instances: Vec<ScheduledInstance>,
    pub conflicts: Vec<SchedulingConflict>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_errors: Vec<TemplateError>,
}

impl Materialization {
    /// Instances that came from the template at `index`.
    pub fn instances_for(&self, index: usize) -> impl Iterator<Item = &ScheduledInstance> {
        self.instances
            .iter()
            .filter(move |i| i.template_index == index)
    }

    /// Conflicts recorded for the template at `index`.
    pub fn conflicts_for(&self, index: usize) -> impl Iterator<Item = &SchedulingConflict> {
        self.conflicts
            .iter()
            .filter(move |c| c.template_index == index)
    }
}
