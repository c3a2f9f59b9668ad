//! Conflict detection -- asks the timetable whether a candidate window collides
//! with an existing commitment and turns the answer into readable reasons.

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result, ScheduleError};
use crate::model::{Scope, TimeWindow};

/// Category of an existing commitment that blocks a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlapKind {
    Instructor,
    Location,
    Capacity,
}

impl OverlapKind {
    fn summary(self) -> &'static str {
        match self {
            OverlapKind::Instructor => "instructor already booked",
            OverlapKind::Location => "location already booked",
            OverlapKind::Capacity => "location at capacity",
        }
    }
}

/// A raw overlap record returned by the timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapReason {
    pub kind: OverlapKind,
    pub detail: String,
}

impl OverlapReason {
    pub fn new(kind: OverlapKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Capability for looking up commitments that overlap a window.
///
/// Implemented by whatever stores finalized bookings. Implementations must be
/// safe to call repeatedly and must reflect currently committed bookings.
///
/// The engine does not lock anything. Two requests racing for the same
/// instructor or location can both see "no conflict" unless the backing store
/// is serializable, or the final persistence step re-validates or enforces a
/// unique constraint on (instructor, window).
pub trait ConflictCheck {
    /// Return every commitment overlapping `window` within `scope`.
    /// An empty list means the window is free.
    fn check_overlap(
        &self,
        scope: &Scope,
        window: &TimeWindow,
    ) -> std::result::Result<Vec<OverlapReason>, CheckError>;
}

impl<T: ConflictCheck + ?Sized> ConflictCheck for &T {
    fn check_overlap(
        &self,
        scope: &Scope,
        window: &TimeWindow,
    ) -> std::result::Result<Vec<OverlapReason>, CheckError> {
        (**self).check_overlap(scope, window)
    }
}

impl<T: ConflictCheck + ?Sized> ConflictCheck for Box<T> {
    fn check_overlap(
        &self,
        scope: &Scope,
        window: &TimeWindow,
    ) -> std::result::Result<Vec<OverlapReason>, CheckError> {
        (**self).check_overlap(scope, window)
    }
}

/// Thin adapter over a [`ConflictCheck`].
#[derive(Debug, Clone)]
pub struct ConflictDetector<C> {
    check: C,
}

impl<C: ConflictCheck> ConflictDetector<C> {
    pub fn new(check: C) -> Self {
        Self { check }
    }

    /// Reasons `window` cannot be booked in `scope`; empty means no conflict.
    ///
    /// Produces one reason per colliding commitment kind, ordered instructor,
    /// location, capacity. Details of the same kind are joined.
    ///
    /// # Errors
    /// Returns `ScheduleError::CollaboratorUnavailable` if the check fails.
    pub fn detect(&self, window: &TimeWindow, scope: &Scope) -> Result<Vec<String>> {
        let raw = self
            .check
            .check_overlap(scope, window)
            .map_err(ScheduleError::CollaboratorUnavailable)?;
        Ok(normalize(raw))
    }

    /// Like [`detect`](Self::detect), but also reports overlaps with `held`.
    /// An empty `held` makes this identical to `detect`.
    pub fn detect_against(
        &self,
        window: &TimeWindow,
        scope: &Scope,
        held: &[TimeWindow],
    ) -> Result<Vec<String>> {
        let mut reasons = self.detect(window, scope)?;
        if let Some(other) = held.iter().find(|h| h.overlaps(window)) {
            reasons.push(format!(
                "overlaps another session of this class ({} - {})",
                other.start.to_rfc3339(),
                other.end.to_rfc3339()
            ));
        }
        Ok(reasons)
    }
}

fn normalize(mut raw: Vec<OverlapReason>) -> Vec<String> {
    // Stable sort keeps the collaborator's detail order within a kind.
    raw.sort_by_key(|r| r.kind);

    let mut grouped: Vec<(OverlapKind, Vec<String>)> = Vec::new();
    for reason in raw {
        if grouped.last().map(|(kind, _)| *kind) != Some(reason.kind) {
            grouped.push((reason.kind, Vec::new()));
        }
        if let Some((_, details)) = grouped.last_mut() {
            if !reason.detail.is_empty() && !details.contains(&reason.detail) {
                details.push(reason.detail);
            }
        }
    }

    grouped
        .iter()
        .map(|(kind, details)| render(*kind, details))
        .collect()
}

fn render(kind: OverlapKind, details: &[String]) -> String {
    if details.is_empty() {
        kind.summary().to_string()
    } else {
        format!("{}: {}", kind.summary(), details.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_grouped_and_ordered_by_kind() {
        let raw = vec![
            OverlapReason::new(OverlapKind::Capacity, "30 of 30 seats taken"),
            OverlapReason::new(OverlapKind::Instructor, "booking b-1"),
            OverlapReason::new(OverlapKind::Instructor, "booking b-2"),
        ];
        assert_eq!(
            normalize(raw),
            vec![
                "instructor already booked: booking b-1; booking b-2".to_string(),
                "location at capacity: 30 of 30 seats taken".to_string(),
            ]
        );
    }

    #[test]
    fn duplicate_and_empty_details_collapse() {
        let raw = vec![
            OverlapReason::new(OverlapKind::Location, ""),
            OverlapReason::new(OverlapKind::Location, ""),
        ];
        assert_eq!(normalize(raw), vec!["location already booked".to_string()]);
    }

    #[test]
    fn no_records_means_no_reasons() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
