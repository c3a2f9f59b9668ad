//! In-memory timetable implementing [`ConflictCheck`].
//!
//! Used by tests and the CLI, and by callers that already hold the relevant
//! bookings in memory. Only bookings of the scope's organisation are visible.

use serde::{Deserialize, Serialize};

use crate::detector::{ConflictCheck, OverlapKind, OverlapReason};
use crate::error::CheckError;
use crate::model::{ScheduledInstance, Scope, TimeWindow};

/// An existing commitment in the timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub instructor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    pub organisation_id: String,
    #[serde(flatten)]
    pub window: TimeWindow,
    /// Seats this booking occupies at its location.
    #[serde(default)]
    pub participants: u32,
}

/// A room or venue. Locations without `seats` host one session at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InMemoryTimetable {
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl InMemoryTimetable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_booking(mut self, booking: Booking) -> Self {
        self.bookings.push(booking);
        self
    }

    pub fn with_location(mut self, id: impl Into<String>, seats: Option<u32>) -> Self {
        self.locations.push(Location {
            id: id.into(),
            seats,
        });
        self
    }

    /// Book an instructor (and optionally a location) for `window`, returning
    /// the new booking id.
    pub fn book(
        &mut self,
        scope: &Scope,
        window: TimeWindow,
        participants: u32,
    ) -> String {
        let id = format!("b-{}", self.bookings.len() + 1);
        let booking = Booking {
            id: id.clone(),
            instructor_id: scope.instructor_id.clone(),
            location_id: scope.location_id.clone(),
            organisation_id: scope.organisation_id.clone(),
            window,
            participants,
        };
        self.bookings.push(booking);
        id
    }

    /// Store materialized instances as bookings, as a persisting collaborator would.
    pub fn record(&mut self, instances: &[ScheduledInstance], scope: &Scope) {
        let participants = scope.expected_participants.unwrap_or(0);
        for instance in instances {
            self.book(scope, instance.window(), participants);
        }
    }

    fn seats(&self, location_id: &str) -> Option<u32> {
        self.locations
            .iter()
            .find(|l| l.id == location_id)
            .and_then(|l| l.seats)
    }
}

impl ConflictCheck for InMemoryTimetable {
    fn check_overlap(
        &self,
        scope: &Scope,
        window: &TimeWindow,
    ) -> Result<Vec<OverlapReason>, CheckError> {
        let visible: Vec<&Booking> = self
            .bookings
            .iter()
            .filter(|b| b.organisation_id == scope.organisation_id && b.window.overlaps(window))
            .collect();

        let mut reasons: Vec<OverlapReason> = visible
            .iter()
            .filter(|b| b.instructor_id == scope.instructor_id)
            .map(|b| OverlapReason::new(OverlapKind::Instructor, describe(b)))
            .collect();

        if let Some(location_id) = scope.location_id.as_deref() {
            let at_location = visible
                .iter()
                .filter(|b| b.location_id.as_deref() == Some(location_id));

            match self.seats(location_id) {
                None => reasons.extend(
                    at_location.map(|b| OverlapReason::new(OverlapKind::Location, describe(b))),
                ),
                Some(seats) => {
                    let taken: u32 = at_location.map(|b| b.participants).sum();
                    let needed = scope.expected_participants.unwrap_or(0);
                    if taken.saturating_add(needed) > seats {
                        reasons.push(OverlapReason::new(
                            OverlapKind::Capacity,
                            format!(
                                "{} of {} seats taken at {}, {} requested",
                                taken, seats, location_id, needed
                            ),
                        ));
                    }
                }
            }
        }

        Ok(reasons)
    }
}

fn describe(booking: &Booking) -> String {
    format!(
        "{} ({} - {})",
        booking.id,
        booking.window.start.to_rfc3339(),
        booking.window.end.to_rfc3339()
    )
}
