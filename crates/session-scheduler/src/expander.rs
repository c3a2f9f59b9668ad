//! Recurrence expansion -- turns a first-occurrence window plus a recurrence rule
//! into an ordered, finite sequence of candidate windows.
//!
//! Calendar arithmetic runs on the local wall clock of the template's timezone,
//! so a 09:00 session stays at 09:00 across DST transitions. Every window keeps
//! the absolute duration of the first window.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::config::SchedulerConfig;
use crate::dst::{self, DstPolicy};
use crate::error::{Result, ScheduleError};
use crate::model::{Candidate, RecurrenceRule, RecurrenceType, SessionTemplate, TimeWindow};

/// Expand a template's first window and rule into candidate occurrences.
///
/// # Errors
/// Returns `ScheduleError::InvalidWindow` if the template's end is not after its start.
/// Returns `ScheduleError::InvalidTimezone` if the timezone is not a valid IANA identifier.
/// Returns `ScheduleError::MalformedRecurrence` if the rule is inconsistent with its type.
pub fn expand_template(template: &SessionTemplate, config: &SchedulerConfig) -> Result<Occurrences> {
    let first = template.first_window()?;
    let tz = dst::parse_timezone(template.timezone.as_deref())?;
    expand_in(first, template.recurrence.as_ref(), tz, config)
}

/// Expand `first` and `rule` in UTC.
///
/// Each call recomputes the series from scratch; the returned iterator is lazy,
/// finite and can be cloned to restart from its current position.
pub fn expand(
    first: TimeWindow,
    rule: Option<&RecurrenceRule>,
    config: &SchedulerConfig,
) -> Result<Occurrences> {
    expand_in(first, rule, Tz::UTC, config)
}

/// Expand `first` and `rule` using the wall clock of `tz`.
pub fn expand_in(
    first: TimeWindow,
    rule: Option<&RecurrenceRule>,
    tz: Tz,
    config: &SchedulerConfig,
) -> Result<Occurrences> {
    if first.end <= first.start {
        return Err(ScheduleError::InvalidWindow(
            "first window must end after it starts".to_string(),
        ));
    }

    let local_start = first.start.with_timezone(&tz).naive_local();
    let anchor = local_start.date();

    let (pattern, end_date, limit) = match rule {
        None => (Pattern::Once, None, 1),
        Some(rule) if rule.recurrence_type == RecurrenceType::None => (Pattern::Once, None, 1),
        Some(rule) => {
            let pattern = Pattern::from_rule(rule, anchor)?;
            if let Some(end) = rule.end_date {
                if end < anchor {
                    return Err(ScheduleError::MalformedRecurrence(format!(
                        "endDate {} precedes the first occurrence on {}",
                        end, anchor
                    )));
                }
            }
            let limit = rule
                .occurrence_count
                .unwrap_or(u32::MAX)
                .min(config.max_occurrences);
            (pattern, rule.end_date, limit)
        }
    };

    Ok(Occurrences {
        tz,
        policy: config.dst_policy,
        duration: first.duration(),
        time_of_day: local_start.time(),
        anchor,
        pattern,
        end_date,
        limit,
        // Each calendar step yields one date; only DST gaps and the weekly/monthly
        // lead-in before the anchor produce dates that are not emitted.
        scan_budget: limit.saturating_mul(2).saturating_add(16),
        emitted: 0,
        period: 0,
        weekday_slot: 0,
        last_start: None,
        done: false,
    })
}

/// Date-generation pattern, validated and normalized from a [`RecurrenceRule`].
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Once,
    Daily { interval: u32 },
    /// `mask` bit `n` set means `n` days after Monday qualifies.
    Weekly { interval: u32, mask: u8 },
    Monthly { interval: u32, day: u32 },
}

impl Pattern {
    fn from_rule(rule: &RecurrenceRule, anchor: NaiveDate) -> Result<Self> {
        let interval = rule.interval_value;
        if interval == 0 {
            return Err(ScheduleError::MalformedRecurrence(
                "intervalValue must be at least 1".to_string(),
            ));
        }

        match rule.recurrence_type {
            RecurrenceType::None => Ok(Pattern::Once),
            RecurrenceType::Daily => Ok(Pattern::Daily { interval }),
            RecurrenceType::Weekly => {
                let mut mask = rule.days_of_week.iter().fold(0u8, |mask, day| {
                    let weekday: chrono::Weekday = (*day).into();
                    mask | (1 << weekday.num_days_from_monday())
                });
                if mask == 0 {
                    // No weekdays given: repeat on the first occurrence's weekday.
                    mask = 1 << anchor.weekday().num_days_from_monday();
                }
                Ok(Pattern::Weekly { interval, mask })
            }
            RecurrenceType::Monthly => match rule.day_of_month {
                None => Err(ScheduleError::MalformedRecurrence(
                    "MONTHLY rule requires dayOfMonth".to_string(),
                )),
                Some(day) if !(1..=31).contains(&day) => Err(ScheduleError::MalformedRecurrence(
                    format!("dayOfMonth {} is outside 1-31", day),
                )),
                Some(day) => Ok(Pattern::Monthly { interval, day }),
            },
        }
    }
}

/// Lazy iterator over the candidate occurrences of one template.
#[derive(Debug, Clone)]
pub struct Occurrences {
    tz: Tz,
    policy: DstPolicy,
    duration: Duration,
    time_of_day: NaiveTime,
    anchor: NaiveDate,
    pattern: Pattern,
    end_date: Option<NaiveDate>,
    limit: u32,
    scan_budget: u32,
    emitted: u32,
    /// Days, weeks or months elapsed since the anchor, in units of the pattern.
    period: u32,
    weekday_slot: u32,
    last_start: Option<chrono::DateTime<Utc>>,
    done: bool,
}

impl Occurrences {
    /// Next calendar date produced by the pattern, ignoring bounds.
    fn next_date(&mut self) -> Option<NaiveDate> {
        match self.pattern {
            Pattern::Once => {
                if self.period > 0 {
                    return None;
                }
                self.period = 1;
                Some(self.anchor)
            }
            Pattern::Daily { interval } => {
                let offset = u64::from(self.period) * u64::from(interval);
                self.period = self.period.checked_add(1)?;
                self.anchor.checked_add_days(chrono::Days::new(offset))
            }
            Pattern::Weekly { interval, mask } => {
                let week_start = self.anchor
                    - Duration::days(i64::from(self.anchor.weekday().num_days_from_monday()));
                loop {
                    if self.weekday_slot > 6 {
                        self.weekday_slot = 0;
                        self.period = self.period.checked_add(interval)?;
                    }
                    let slot = self.weekday_slot;
                    self.weekday_slot += 1;
                    if mask & (1 << slot) == 0 {
                        continue;
                    }
                    let offset = u64::from(self.period) * 7 + u64::from(slot);
                    let date = week_start.checked_add_days(chrono::Days::new(offset))?;
                    if date < self.anchor {
                        continue;
                    }
                    return Some(date);
                }
            }
            Pattern::Monthly { interval, day } => loop {
                let months = self.period.checked_mul(interval)?;
                self.period = self.period.checked_add(1)?;
                let first_of_month = self
                    .anchor
                    .with_day(1)?
                    .checked_add_months(Months::new(months))?;
                let clamped = day.min(days_in_month(first_of_month));
                let date = first_of_month.with_day(clamped)?;
                if date < self.anchor {
                    continue;
                }
                return Some(date);
            },
        }
    }
}

impl Iterator for Occurrences {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while !self.done {
            if self.emitted >= self.limit || self.scan_budget == 0 {
                self.done = true;
                break;
            }
            self.scan_budget -= 1;

            let Some(date) = self.next_date() else {
                self.done = true;
                break;
            };
            if self.end_date.is_some_and(|end| date > end) {
                self.done = true;
                break;
            }

            let local = NaiveDateTime::new(date, self.time_of_day);
            let Some(start) = dst::resolve_local(self.tz, local, self.policy) else {
                tracing::debug!(%local, tz = %self.tz, "occurrence falls in a DST gap, skipped");
                continue;
            };
            if self.last_start.is_some_and(|last| start <= last) {
                continue;
            }

            self.last_start = Some(start);
            self.emitted += 1;
            return Some(Candidate {
                sequence_number: self.emitted,
                window: TimeWindow {
                    start,
                    end: start + self.duration,
                },
            });
        }
        None
    }
}

/// Number of days in the month containing `first_of_month`.
fn days_in_month(first_of_month: NaiveDate) -> u32 {
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Shift a window forward by whole local calendar days, preserving time of day
/// in `tz` and the absolute duration.
///
/// Returns `None` when the shifted local time cannot be resolved under `policy`.
pub fn shift_days(window: &TimeWindow, days: u32, tz: Tz, policy: DstPolicy) -> Option<TimeWindow> {
    let local = window.start.with_timezone(&tz).naive_local();
    let shifted = local.checked_add_days(chrono::Days::new(u64::from(days)))?;
    let start = dst::resolve_local(tz, shifted, policy)?;
    Some(TimeWindow {
        start,
        end: start + window.duration(),
    })
}
