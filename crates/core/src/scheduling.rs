//! Appointment slot availability.
//!
//! The clinic books on a fixed grid of times per day. Availability is a pure
//! set difference: canonical slots minus the slots already taken for the
//! selected specialist and date. The computation is advisory: it shapes
//! what is offered, while the store's uniqueness constraint is what actually
//! prevents a double booking.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::records::Appointment;

/// The fixed, ordered set of bookable times per day.
///
/// Static configuration, not derived data. The default grid is business
/// hours on the hour, skipping the midday break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSlots(Vec<NaiveTime>);

impl CanonicalSlots {
    /// 08:00–11:00 and 13:00–16:00, hourly.
    pub fn business_hours() -> Self {
        let times = [8, 9, 10, 11, 13, 14, 15, 16]
            .into_iter()
            .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
            .collect();
        Self(times)
    }

    /// A custom grid. Slots are kept in the order given; duplicates are
    /// dropped after their first occurrence.
    pub fn new(times: impl IntoIterator<Item = NaiveTime>) -> Self {
        let mut seen = Vec::new();
        for t in times {
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
        Self(seen)
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.0.contains(&time)
    }
}

impl Default for CanonicalSlots {
    fn default() -> Self {
        Self::business_hours()
    }
}

/// Booking-time validation failures. These guard the create path; the
/// availability computation itself never errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("appointments cannot be booked for past dates")]
    DateInPast,
    #[error("the requested time is not on the booking grid")]
    TimeOffGrid,
}

/// Computes the open slots for a specialist on a date.
///
/// Filters `appointments` to rows matching both selectors, collects their
/// times, and returns the canonical grid minus those times, preserving
/// canonical order. When either selector is absent the answer is the empty
/// sequence; no specialist or date selected means nothing is offered, which
/// keeps the booking form inert rather than misleading. That is policy, not
/// a failure.
///
/// Pure with respect to its inputs; re-run whenever the appointment
/// collection, the date, or the specialist changes.
pub fn available_slots(
    appointments: &[Appointment],
    specialist_id: Option<Uuid>,
    date: Option<NaiveDate>,
    slots: &CanonicalSlots,
) -> Vec<NaiveTime> {
    let (Some(specialist_id), Some(date)) = (specialist_id, date) else {
        return Vec::new();
    };

    let taken: Vec<NaiveTime> = appointments
        .iter()
        .filter(|a| a.specialist_id == specialist_id && a.date == date)
        .map(|a| a.time)
        .collect();

    slots.iter().filter(|t| !taken.contains(t)).collect()
}

/// Rejects bookings for dates before `today`.
///
/// `today` is an argument rather than a clock read so the rule stays
/// deterministic under test and callers control the timezone question.
pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), BookingError> {
    if date < today {
        return Err(BookingError::DateInPast);
    }
    Ok(())
}

/// Rejects times that are not on the canonical grid.
pub fn validate_booking_time(time: NaiveTime, slots: &CanonicalSlots) -> Result<(), BookingError> {
    if !slots.contains(time) {
        return Err(BookingError::TimeOffGrid);
    }
    Ok(())
}
