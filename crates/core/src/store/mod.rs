//! The data-access boundary the core consumes.
//!
//! The trait is the contract: any backing implementation (hosted row store,
//! SQL, the in-memory store used by tests and local runs) must provide these
//! operations with these semantics. Business logic never talks to a backend
//! directly.
//!
//! The one semantic that matters for correctness lives here and not in the
//! resolvers: `create_appointment` enforces the `(specialist, date, time)`
//! uniqueness invariant atomically. The availability computation upstream is
//! advisory UX; this is the fix for the booking race.

mod memory;

pub use memory::MemoryStore;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::fields::UpdatePayload;
use crate::records::{
    Appointment, Exam, Patient, Profile, Referral, ReferralStatus, Specialist,
};
use crate::roles::Role;
use crate::StoreResult;

#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub time: chrono::NaiveTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub profile_id: Option<Uuid>,
    pub name: String,
    pub document: String,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExam {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub notes: String,
    pub pdf_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReferral {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub identity: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Stored as given; normalised wherever it is read.
    pub role: String,
    /// Specialty for the linked specialist row, when the role is a
    /// specialist. Defaults to the clinic's principal specialty.
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSpecialist {
    pub profile_id: Uuid,
    pub specialty: String,
}

/// Operations the core consumes from the backing store.
///
/// Read failures map to [`crate::StoreError::Transient`]; "no such row" on
/// lookups is `Ok(None)`, never an error. Writes that name a specific row
/// return [`crate::StoreError::NotFound`] when it is gone.
pub trait DataStore {
    // -- viewer linkage --------------------------------------------------
    fn lookup_profile_by_identity(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = StoreResult<Option<Profile>>> + Send;
    fn lookup_patient_by_profile(
        &self,
        profile_id: Uuid,
    ) -> impl std::future::Future<Output = StoreResult<Option<Patient>>> + Send;
    fn lookup_specialist_by_profile(
        &self,
        profile_id: Uuid,
    ) -> impl std::future::Future<Output = StoreResult<Option<Specialist>>> + Send;

    // -- appointments ----------------------------------------------------
    fn list_appointments(
        &self,
    ) -> impl std::future::Future<Output = StoreResult<Vec<Appointment>>> + Send;
    fn get_appointment(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = StoreResult<Option<Appointment>>> + Send;
    /// Fails with `Conflict` when the slot is taken; the check and the
    /// insert are one atomic step.
    fn create_appointment(
        &self,
        new: NewAppointment,
    ) -> impl std::future::Future<Output = StoreResult<Appointment>> + Send;
    /// Cancellation is deletion; there is no cancelled state.
    fn delete_appointment(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;

    // -- patients --------------------------------------------------------
    fn list_patients(&self)
        -> impl std::future::Future<Output = StoreResult<Vec<Patient>>> + Send;
    /// Case-insensitive substring match on name; only when that yields
    /// nothing, on document number. At most 10 rows.
    fn search_patients(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = StoreResult<Vec<Patient>>> + Send;
    fn create_patient(
        &self,
        new: NewPatient,
    ) -> impl std::future::Future<Output = StoreResult<Patient>> + Send;
    fn update_patient(
        &self,
        id: Uuid,
        payload: &UpdatePayload,
    ) -> impl std::future::Future<Output = StoreResult<Patient>> + Send;

    // -- exams -----------------------------------------------------------
    fn list_exams(&self) -> impl std::future::Future<Output = StoreResult<Vec<Exam>>> + Send;
    fn create_exam(
        &self,
        new: NewExam,
    ) -> impl std::future::Future<Output = StoreResult<Exam>> + Send;
    fn update_exam(
        &self,
        id: Uuid,
        payload: &UpdatePayload,
    ) -> impl std::future::Future<Output = StoreResult<Exam>> + Send;
    /// Returns the deleted row so the caller can clean up its attachment.
    fn delete_exam(&self, id: Uuid)
        -> impl std::future::Future<Output = StoreResult<Exam>> + Send;

    // -- referrals -------------------------------------------------------
    fn list_referrals(
        &self,
    ) -> impl std::future::Future<Output = StoreResult<Vec<Referral>>> + Send;
    fn create_referral(
        &self,
        new: NewReferral,
    ) -> impl std::future::Future<Output = StoreResult<Referral>> + Send;
    fn update_referral_status(
        &self,
        id: Uuid,
        status: ReferralStatus,
    ) -> impl std::future::Future<Output = StoreResult<Referral>> + Send;

    // -- profiles & specialists ------------------------------------------
    fn list_profiles(
        &self,
    ) -> impl std::future::Future<Output = StoreResult<Vec<Profile>>> + Send;
    fn get_profile(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = StoreResult<Option<Profile>>> + Send;
    /// Creates the profile and, when the role is a specialist, its
    /// specialist row as one atomic step.
    fn create_profile(
        &self,
        new: NewProfile,
    ) -> impl std::future::Future<Output = StoreResult<Profile>> + Send;
    fn update_profile_role(
        &self,
        id: Uuid,
        role: Role,
    ) -> impl std::future::Future<Output = StoreResult<Profile>> + Send;
    fn list_specialists(
        &self,
    ) -> impl std::future::Future<Output = StoreResult<Vec<Specialist>>> + Send;
}
