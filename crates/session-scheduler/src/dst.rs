//! DST transition policies for recurring sessions.
//!
//! Recurrence arithmetic happens on local wall-clock time in the template's
//! timezone. Converting a local time back to UTC can hit a gap (spring forward)
//! or a fold (fall back); this module decides what happens then.

use chrono::{DateTime, Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for handling sessions that fall during DST transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DstPolicy {
    /// Skip occurrences that fall in the DST gap (e.g., 2:30 AM during spring forward)
    Skip,
    /// Shift to the next valid time after the gap
    ShiftForward,
    /// Keep the offset in force before the transition
    #[default]
    WallClock,
}

/// Resolve a local wall-clock time in `tz` to a UTC instant.
///
/// Ambiguous times (fall back) take the earliest mapping. Returns `None` only
/// when the time sits in a gap and the policy is [`DstPolicy::Skip`].
pub fn resolve_local(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return Some(dt.with_timezone(&Utc));
    }

    match policy {
        DstPolicy::Skip => None,
        DstPolicy::ShiftForward => {
            // Gaps are at most a few hours; walk forward in minutes until valid.
            let mut probe = local;
            for _ in 0..(24 * 60) {
                probe += Duration::minutes(1);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return Some(dt.with_timezone(&Utc));
                }
            }
            None
        }
        DstPolicy::WallClock => {
            // Offset in force a day before the gap, applied to the requested time.
            let before = tz
                .from_local_datetime(&(local - Duration::days(1)))
                .earliest()?;
            let offset = before.offset().fix().local_minus_utc();
            Some((local - Duration::seconds(offset as i64)).and_utc())
        }
    }
}

/// Parse an optional IANA timezone name; `None` means UTC.
pub fn parse_timezone(name: Option<&str>) -> crate::error::Result<Tz> {
    match name {
        None => Ok(Tz::UTC),
        Some(name) => name
            .parse()
            .map_err(|_| crate::error::ScheduleError::InvalidTimezone(name.to_string())),
    }
}
