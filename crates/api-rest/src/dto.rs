//! Wire types for the REST API.
//!
//! Identifiers, dates and times cross the wire as strings and are parsed at
//! the handler boundary; the typed domain lives in `clinia-core`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use clinia_core::enrich::{AppointmentView, ReferralView};
use clinia_core::records::{Exam, Patient, Profile};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInReq {
    /// External auth identity (subject claim).
    pub identity: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInRes {
    pub token: String,
    pub role: String,
    pub profile_id: Option<String>,
    pub patient_id: Option<String>,
    pub specialist_id: Option<String>,
    pub can_view: bool,
    pub can_cancel: bool,
    pub can_create_new: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentRes {
    pub id: String,
    pub patient_id: String,
    pub specialist_id: String,
    pub date: String,
    pub time: String,
    pub reason: Option<String>,
    pub patient_name: String,
    pub doctor: String,
    pub specialty: String,
}

impl From<AppointmentView> for AppointmentRes {
    fn from(view: AppointmentView) -> Self {
        Self {
            id: view.id.to_string(),
            patient_id: view.patient_id.to_string(),
            specialist_id: view.specialist_id.to_string(),
            date: view.date.to_string(),
            time: view.time.format("%H:%M").to_string(),
            reason: view.reason,
            patient_name: view.patient_name,
            doctor: view.doctor,
            specialty: view.specialty,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListAppointmentsRes {
    pub appointments: Vec<AppointmentRes>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppointmentReq {
    pub patient_id: String,
    pub specialist_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    /// Canonical slot time, `HH:MM`.
    pub time: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotsRes {
    /// Open times in canonical order, `HH:MM`.
    pub slots: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRes {
    pub success: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub name: String,
    pub document: String,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub created_at: String,
}

impl From<Patient> for PatientRes {
    fn from(row: Patient) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            document: row.document,
            phone: row.phone,
            birth_date: row.birth_date.map(|d| d.to_string()),
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub name: String,
    pub document: String,
    pub phone: Option<String>,
    /// ISO date, `YYYY-MM-DD`.
    pub birth_date: Option<String>,
}

/// Generic field-mapped edit payload: display field name to new value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFieldsReq {
    #[schema(value_type = Object)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExamRes {
    pub id: String,
    pub patient_id: String,
    pub specialist_id: String,
    pub date: String,
    pub notes: String,
    pub pdf_path: Option<String>,
    pub patient_name: String,
}

impl ExamRes {
    pub fn from_row(row: Exam, patient_name: String) -> Self {
        Self {
            id: row.id.to_string(),
            patient_id: row.patient_id.to_string(),
            specialist_id: row.specialist_id.to_string(),
            date: row.date.to_string(),
            notes: row.notes,
            pdf_path: row.pdf_path,
            patient_name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListExamsRes {
    pub exams: Vec<ExamRes>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateExamReq {
    pub patient_id: String,
    pub specialist_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentRes {
    /// Storage path now referenced by the exam row.
    pub pdf_path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileUrlRes {
    pub url: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReferralRes {
    pub id: String,
    pub patient_id: String,
    pub specialist_id: String,
    pub date: String,
    pub reason: String,
    pub status: String,
    pub patient_name: String,
    pub doctor: String,
    pub specialty: String,
}

impl From<ReferralView> for ReferralRes {
    fn from(view: ReferralView) -> Self {
        Self {
            id: view.id.to_string(),
            patient_id: view.patient_id.to_string(),
            specialist_id: view.specialist_id.to_string(),
            date: view.date.to_string(),
            reason: view.reason,
            status: view.status.as_str().to_owned(),
            patient_name: view.patient_name,
            doctor: view.doctor,
            specialty: view.specialty,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListReferralsRes {
    pub referrals: Vec<ReferralRes>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReferralReq {
    pub patient_id: String,
    pub specialist_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    /// One of `pending`, `in_progress`, `resolved`, `finalized`.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRes {
    pub id: String,
    pub identity: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl From<Profile> for UserRes {
    fn from(row: Profile) -> Self {
        Self {
            id: row.id.to_string(),
            identity: row.identity,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role: row.role,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListUsersRes {
    pub users: Vec<UserRes>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub identity: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    /// Specialty for specialist accounts; ignored otherwise.
    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleReq {
    pub role: String,
}
