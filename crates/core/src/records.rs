//! Row types stored behind the data-access boundary.
//!
//! These mirror the backing tables one-to-one. Display concerns (joined
//! names, formatted dates) live in [`crate::enrich`], not here.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account row. Every authenticated actor has exactly one profile;
/// the stored role string is normalised into [`crate::Role`] at the
/// data-access boundary and never compared as text anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    /// Linkage to the external auth identity (subject claim).
    pub identity: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Raw stored role. Historical rows carry inconsistent casing and
    /// spelling ("admin", "Administrador", ...), hence the normalisation.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Profile linkage for patients who can sign in; walk-ins have none.
    pub profile_id: Option<Uuid>,
    pub name: String,
    /// National identity document number.
    pub document: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialist {
    pub id: Uuid,
    /// The profile holding the specialist's display name and contact data.
    pub profile_id: Uuid,
    pub specialty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// The only stored state. Cancellation deletes the row rather than
    /// transitioning it.
    Scheduled,
}

/// A booked appointment.
///
/// Invariant: `(specialist_id, date, time)` is unique among stored rows; the
/// store enforces it atomically at insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    /// One of the canonical slot times.
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub notes: String,
    /// Storage path of the attached report, if one was uploaded.
    pub pdf_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    InProgress,
    Resolved,
    Finalized,
}

impl ReferralStatus {
    /// Stored spelling, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::InProgress => "in_progress",
            ReferralStatus::Resolved => "resolved",
            ReferralStatus::Finalized => "finalized",
        }
    }

    /// Parses the stored spelling; `None` for anything unknown.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ReferralStatus::Pending),
            "in_progress" => Some(ReferralStatus::InProgress),
            "resolved" => Some(ReferralStatus::Resolved),
            "finalized" => Some(ReferralStatus::Finalized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub reason: String,
    pub status: ReferralStatus,
}
