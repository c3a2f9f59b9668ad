//! iCalendar export -- renders a session template as an RFC 5545 `DTSTART` +
//! `RRULE` block that reproduces exactly the engine's series.
//!
//! `COUNT` is derived from the engine's effective occurrence count, so the
//! engine's bounds (end date, ceiling) carry over even though RFC 5545 forbids
//! `COUNT` and `UNTIL` together. Where the engine departs from the bare rule
//! (dates dropped or moved inside a DST gap), the difference is carried by
//! `EXDATE` and `RDATE` lines.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::config::SchedulerConfig;
use crate::dst;
use crate::error::{Result, ScheduleError};
use crate::expander;
use crate::model::{RecurrenceType, SessionTemplate};

/// Render `template` as RFC 5545 text.
///
/// The rendered block is parsed back with the `rrule` crate before it is
/// returned, so callers always receive text a calendar client will accept.
///
/// # Errors
/// Returns the expansion errors of [`expander::expand_template`], and
/// `ScheduleError::Export` if the template yields no occurrences or the
/// rendered text does not parse.
pub fn export_rrule(template: &SessionTemplate, config: &SchedulerConfig) -> Result<String> {
    let tz = dst::parse_timezone(template.timezone.as_deref())?;
    let starts: Vec<DateTime<Utc>> = expander::expand_template(template, config)?
        .map(|c| c.window.start)
        .collect();
    let (first, last) = match (starts.first(), starts.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ScheduleError::Export(
                "template yields no occurrences".to_string(),
            ))
        }
    };

    let header = format!("DTSTART;TZID={}:{}", tz, local_stamp(first, tz));
    let rule = rule_parts(template, first.with_timezone(&tz).date_naive()).join(";");

    // What the bare rule yields up to the engine's last occurrence.
    let bounded = format!("{}\nRRULE:{};UNTIL={}", header, rule, until_stamp(last, tz));
    let generated = expand_text(&bounded, starts.len())?;
    let excluded: Vec<DateTime<Utc>> = generated
        .iter()
        .filter(|dt| !starts.contains(*dt))
        .copied()
        .collect();
    let added: Vec<DateTime<Utc>> = starts
        .iter()
        .filter(|dt| !generated.contains(*dt))
        .copied()
        .collect();

    let mut text = format!("{}\nRRULE:{};COUNT={}", header, rule, generated.len());
    if !excluded.is_empty() {
        tracing::debug!(excluded = excluded.len(), "exporting with EXDATE");
        text.push_str(&format!("\nEXDATE;TZID={}:{}", tz, local_list(&excluded, tz)));
    }
    if !added.is_empty() {
        tracing::debug!(added = added.len(), "exporting with RDATE");
        text.push_str(&format!("\nRDATE;TZID={}:{}", tz, local_list(&added, tz)));
    }

    text.parse::<RRuleSet>()
        .map_err(|e| ScheduleError::Export(format!("{}", e)))?;

    Ok(text)
}

/// `RRULE` parts without the bound.
fn rule_parts(template: &SessionTemplate, anchor: NaiveDate) -> Vec<String> {
    let interval = template
        .recurrence
        .as_ref()
        .map(|r| r.interval_value)
        .unwrap_or(1);
    let recurrence_type = template
        .recurrence
        .as_ref()
        .map(|r| r.recurrence_type)
        .unwrap_or_default();

    let mut parts: Vec<String> = Vec::new();
    match recurrence_type {
        RecurrenceType::None => parts.push("FREQ=DAILY".to_string()),
        RecurrenceType::Daily => {
            parts.push("FREQ=DAILY".to_string());
            parts.push(format!("INTERVAL={}", interval));
        }
        RecurrenceType::Weekly => {
            parts.push("FREQ=WEEKLY".to_string());
            parts.push(format!("INTERVAL={}", interval));
            parts.push("WKST=MO".to_string());
            parts.push(format!("BYDAY={}", weekly_days(template, anchor)));
        }
        RecurrenceType::Monthly => {
            let day = template
                .recurrence
                .as_ref()
                .and_then(|r| r.day_of_month)
                .unwrap_or(1);
            parts.push("FREQ=MONTHLY".to_string());
            parts.push(format!("INTERVAL={}", interval));
            parts.push(month_day_rule(day));
        }
    }
    parts
}

/// Expand RFC 5545 text with the `rrule` crate.
fn expand_text(text: &str, expected: usize) -> Result<Vec<DateTime<Utc>>> {
    let set: RRuleSet = text
        .parse()
        .map_err(|e| ScheduleError::Export(format!("{}", e)))?;
    // Gap dates the engine dropped still count here, hence the headroom.
    let limit = u16::try_from(expected)
        .unwrap_or(u16::MAX)
        .saturating_mul(2)
        .saturating_add(16);
    Ok(set
        .all(limit)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

fn local_stamp(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%Y%m%dT%H%M%S")
        .to_string()
}

/// UNTIL shares DTSTART's zone: `Z` form for UTC, local time otherwise.
fn until_stamp(instant: DateTime<Utc>, tz: Tz) -> String {
    if tz == Tz::UTC {
        format!("{}Z", instant.format("%Y%m%dT%H%M%S"))
    } else {
        local_stamp(instant, tz)
    }
}

fn local_list(instants: &[DateTime<Utc>], tz: Tz) -> String {
    instants
        .iter()
        .map(|dt| local_stamp(*dt, tz))
        .collect::<Vec<_>>()
        .join(",")
}

/// `BYDAY` value for a weekly template, in Monday-first order.
fn weekly_days(template: &SessionTemplate, anchor: NaiveDate) -> String {
    use chrono::Datelike;

    let mut days: Vec<Weekday> = template
        .recurrence
        .as_ref()
        .map(|r| r.days_of_week.iter().map(|d| (*d).into()).collect())
        .unwrap_or_default();
    if days.is_empty() {
        days.push(anchor.weekday());
    }
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();

    days.iter()
        .map(|d| ical_day(*d))
        .collect::<Vec<_>>()
        .join(",")
}

fn ical_day(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Day-of-month selector that clamps to the last day of short months.
///
/// Plain `BYMONTHDAY=30` skips February; picking the last of 28..=30 does not.
fn month_day_rule(day: u32) -> String {
    match day {
        31 => "BYMONTHDAY=-1".to_string(),
        29 | 30 => {
            let days: Vec<String> = (28..=day).map(|d| d.to_string()).collect();
            format!("BYMONTHDAY={};BYSETPOS=-1", days.join(","))
        }
        _ => format!("BYMONTHDAY={}", day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_month_days_render_plainly() {
        assert_eq!(month_day_rule(15), "BYMONTHDAY=15");
        assert_eq!(month_day_rule(28), "BYMONTHDAY=28");
    }

    #[test]
    fn long_month_days_clamp() {
        assert_eq!(month_day_rule(31), "BYMONTHDAY=-1");
        assert_eq!(month_day_rule(30), "BYMONTHDAY=28,29,30;BYSETPOS=-1");
    }
}
