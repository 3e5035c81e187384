//! In-memory reference implementation of [`DataStore`].
//!
//! Backs the test suite, the CLI and local runs. All tables live behind one
//! `RwLock`, which makes every write, including the appointment uniqueness
//! check, a single atomic step. A hosted row store without transactions
//! would need a compensating delete around the profile + specialist pair;
//! here the pair commits under one lock instead.

use std::sync::{PoisonError, RwLock};

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::fields::UpdatePayload;
use crate::records::{
    Appointment, AppointmentStatus, Exam, Patient, Profile, Referral, ReferralStatus, Specialist,
};
use crate::roles::Role;
use crate::store::{
    DataStore, NewAppointment, NewExam, NewPatient, NewProfile, NewReferral, NewSpecialist,
};
use crate::{StoreError, StoreResult};

const SEARCH_LIMIT: usize = 10;
const DEFAULT_SPECIALTY: &str = "optometry";

#[derive(Debug, Default)]
struct Tables {
    profiles: Vec<Profile>,
    patients: Vec<Patient>,
    specialists: Vec<Specialist>,
    appointments: Vec<Appointment>,
    exams: Vec<Exam>,
    referrals: Vec<Referral>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn string_column(column: &str, value: &Value) -> StoreResult<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| StoreError::InvalidInput(format!("column '{}' expects a string", column)))
}

fn optional_string_column(column: &str, value: &Value) -> StoreResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    string_column(column, value).map(Some)
}

fn date_column(column: &str, value: &Value) -> StoreResult<NaiveDate> {
    string_column(column, value)?.parse().map_err(|_| {
        StoreError::InvalidInput(format!("column '{}' expects an ISO date", column))
    })
}

impl DataStore for MemoryStore {
    async fn lookup_profile_by_identity(&self, identity: &str) -> StoreResult<Option<Profile>> {
        let tables = self.read();
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.identity == identity)
            .cloned())
    }

    async fn lookup_patient_by_profile(&self, profile_id: Uuid) -> StoreResult<Option<Patient>> {
        let tables = self.read();
        Ok(tables
            .patients
            .iter()
            .find(|p| p.profile_id == Some(profile_id))
            .cloned())
    }

    async fn lookup_specialist_by_profile(
        &self,
        profile_id: Uuid,
    ) -> StoreResult<Option<Specialist>> {
        let tables = self.read();
        Ok(tables
            .specialists
            .iter()
            .find(|s| s.profile_id == profile_id)
            .cloned())
    }

    async fn list_appointments(&self) -> StoreResult<Vec<Appointment>> {
        let tables = self.read();
        let mut rows = tables.appointments.clone();
        rows.sort_by_key(|a| (a.date, a.time));
        Ok(rows)
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let tables = self.read();
        Ok(tables.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn create_appointment(&self, new: NewAppointment) -> StoreResult<Appointment> {
        let mut tables = self.write();

        let taken = tables.appointments.iter().any(|a| {
            a.specialist_id == new.specialist_id && a.date == new.date && a.time == new.time
        });
        if taken {
            return Err(StoreError::Conflict);
        }

        let row = Appointment {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            specialist_id: new.specialist_id,
            date: new.date,
            time: new.time,
            reason: new.reason,
            status: AppointmentStatus::Scheduled,
        };
        tables.appointments.push(row.clone());
        Ok(row)
    }

    async fn delete_appointment(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.write();
        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != id);
        if tables.appointments.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        let tables = self.read();
        Ok(tables.patients.clone())
    }

    async fn search_patients(&self, query: &str) -> StoreResult<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let tables = self.read();
        let by_name: Vec<Patient> = tables
            .patients
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .cloned()
            .collect();
        if !by_name.is_empty() {
            return Ok(by_name);
        }

        Ok(tables
            .patients
            .iter()
            .filter(|p| p.document.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .cloned()
            .collect())
    }

    async fn create_patient(&self, new: NewPatient) -> StoreResult<Patient> {
        let mut tables = self.write();
        let row = Patient {
            id: Uuid::new_v4(),
            profile_id: new.profile_id,
            name: new.name,
            document: new.document,
            phone: new.phone,
            birth_date: new.birth_date,
            created_at: Utc::now(),
        };
        tables.patients.push(row.clone());
        Ok(row)
    }

    async fn update_patient(&self, id: Uuid, payload: &UpdatePayload) -> StoreResult<Patient> {
        let mut tables = self.write();
        let row = tables
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;

        for (column, value) in payload.columns() {
            match column {
                "name" => row.name = string_column(column, value)?,
                "document" => row.document = string_column(column, value)?,
                "phone" => row.phone = optional_string_column(column, value)?,
                "birth_date" => {
                    row.birth_date = match value {
                        Value::Null => None,
                        other => Some(date_column(column, other)?),
                    }
                }
                other => {
                    return Err(StoreError::InvalidInput(format!(
                        "column '{}' is not part of the patients table",
                        other
                    )))
                }
            }
        }
        Ok(row.clone())
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        let tables = self.read();
        let mut rows = tables.exams.clone();
        rows.sort_by_key(|e| std::cmp::Reverse(e.date));
        Ok(rows)
    }

    async fn create_exam(&self, new: NewExam) -> StoreResult<Exam> {
        let mut tables = self.write();
        let row = Exam {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            specialist_id: new.specialist_id,
            date: new.date,
            notes: new.notes,
            pdf_path: new.pdf_path,
        };
        tables.exams.push(row.clone());
        Ok(row)
    }

    async fn update_exam(&self, id: Uuid, payload: &UpdatePayload) -> StoreResult<Exam> {
        let mut tables = self.write();
        let row = tables
            .exams
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;

        for (column, value) in payload.columns() {
            match column {
                "date" => row.date = date_column(column, value)?,
                "notes" => row.notes = string_column(column, value)?,
                "pdf_path" => row.pdf_path = optional_string_column(column, value)?,
                other => {
                    return Err(StoreError::InvalidInput(format!(
                        "column '{}' is not part of the exams table",
                        other
                    )))
                }
            }
        }
        Ok(row.clone())
    }

    async fn delete_exam(&self, id: Uuid) -> StoreResult<Exam> {
        let mut tables = self.write();
        let idx = tables
            .exams
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(tables.exams.remove(idx))
    }

    async fn list_referrals(&self) -> StoreResult<Vec<Referral>> {
        let tables = self.read();
        let mut rows = tables.referrals.clone();
        rows.sort_by_key(|r| std::cmp::Reverse(r.date));
        Ok(rows)
    }

    async fn create_referral(&self, new: NewReferral) -> StoreResult<Referral> {
        let mut tables = self.write();
        let row = Referral {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            specialist_id: new.specialist_id,
            date: new.date,
            reason: new.reason,
            status: ReferralStatus::Pending,
        };
        tables.referrals.push(row.clone());
        Ok(row)
    }

    async fn update_referral_status(
        &self,
        id: Uuid,
        status: ReferralStatus,
    ) -> StoreResult<Referral> {
        let mut tables = self.write();
        let row = tables
            .referrals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        row.status = status;
        Ok(row.clone())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let tables = self.read();
        let mut rows = tables.profiles.clone();
        rows.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(rows)
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let tables = self.read();
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn create_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        let mut tables = self.write();

        if tables.profiles.iter().any(|p| p.identity == new.identity) {
            return Err(StoreError::InvalidInput(format!(
                "identity '{}' already has a profile",
                new.identity
            )));
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            identity: new.identity,
            name: new.name,
            email: new.email,
            phone: new.phone,
            role: new.role,
            created_at: Utc::now(),
        };

        // Profile and specialist row commit under the same lock; there is
        // no partially created pair to compensate for.
        if Role::normalise(&profile.role) == Some(Role::Specialist) {
            let specialist = NewSpecialist {
                profile_id: profile.id,
                specialty: new
                    .specialty
                    .unwrap_or_else(|| DEFAULT_SPECIALTY.to_owned()),
            };
            tables.specialists.push(Specialist {
                id: Uuid::new_v4(),
                profile_id: specialist.profile_id,
                specialty: specialist.specialty,
            });
        }

        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile_role(&self, id: Uuid, role: Role) -> StoreResult<Profile> {
        let mut tables = self.write();
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        profile.role = role.as_str().to_owned();
        let profile = profile.clone();

        // Promote to specialist lazily: the linked row appears with the
        // role when it does not exist yet.
        if role == Role::Specialist
            && !tables.specialists.iter().any(|s| s.profile_id == profile.id)
        {
            tables.specialists.push(Specialist {
                id: Uuid::new_v4(),
                profile_id: profile.id,
                specialty: DEFAULT_SPECIALTY.to_owned(),
            });
        }

        Ok(profile)
    }

    async fn list_specialists(&self) -> StoreResult<Vec<Specialist>> {
        let tables = self.read();
        Ok(tables.specialists.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;
    use std::sync::Arc;

    fn d(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).expect("valid time")
    }

    fn booking(specialist_id: Uuid, date: &str, hour: u32) -> NewAppointment {
        NewAppointment {
            patient_id: Uuid::new_v4(),
            specialist_id,
            date: d(date),
            time: t(hour),
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_create_appointment_rejects_taken_slot() {
        let store = MemoryStore::new();
        let sp = Uuid::new_v4();

        store
            .create_appointment(booking(sp, "2025-11-01", 9))
            .await
            .expect("first booking should succeed");

        let err = store
            .create_appointment(booking(sp, "2025-11-01", 9))
            .await
            .expect_err("second booking of the same slot should fail");
        assert!(matches!(err, StoreError::Conflict));

        // Same time elsewhere is fine.
        store
            .create_appointment(booking(sp, "2025-11-02", 9))
            .await
            .expect("other date should succeed");
        store
            .create_appointment(booking(Uuid::new_v4(), "2025-11-01", 9))
            .await
            .expect("other specialist should succeed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_bookings_for_one_slot_yield_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let sp = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_appointment(booking(sp, "2025-11-01", 9)).await
            }));
        }

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.expect("task should not panic") {
                Ok(_) => wins += 1,
                Err(StoreError::Conflict) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(wins, 1, "exactly one booking must win the slot");
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_list_appointments_orders_by_date_then_time() {
        let store = MemoryStore::new();
        let sp = Uuid::new_v4();
        store
            .create_appointment(booking(sp, "2025-11-02", 9))
            .await
            .expect("booking should succeed");
        store
            .create_appointment(booking(sp, "2025-11-01", 14))
            .await
            .expect("booking should succeed");
        store
            .create_appointment(booking(sp, "2025-11-01", 8))
            .await
            .expect("booking should succeed");

        let rows = store.list_appointments().await.expect("list should succeed");
        let keys: Vec<_> = rows.iter().map(|a| (a.date, a.time)).collect();
        assert_eq!(
            keys,
            vec![
                (d("2025-11-01"), t(8)),
                (d("2025-11-01"), t(14)),
                (d("2025-11-02"), t(9)),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_appointment_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .delete_appointment(Uuid::new_v4())
            .await
            .expect_err("missing row should fail");
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_search_prefers_name_matches_over_document() {
        let store = MemoryStore::new();
        store
            .create_patient(NewPatient {
                profile_id: None,
                name: "Rosa 99".into(),
                document: "11111".into(),
                phone: None,
                birth_date: None,
            })
            .await
            .expect("create should succeed");
        store
            .create_patient(NewPatient {
                profile_id: None,
                name: "Pedro".into(),
                document: "99222".into(),
                phone: None,
                birth_date: None,
            })
            .await
            .expect("create should succeed");

        // "99" hits a name, so the document match is not consulted.
        let rows = store.search_patients("99").await.expect("search should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Rosa 99");

        // A query with no name hits falls through to documents.
        let rows = store
            .search_patients("222")
            .await
            .expect("search should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Pedro");
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let store = MemoryStore::new();
        for i in 0..15 {
            store
                .create_patient(NewPatient {
                    profile_id: None,
                    name: format!("Common Name {i}"),
                    document: format!("{i}"),
                    phone: None,
                    birth_date: None,
                })
                .await
                .expect("create should succeed");
        }

        let rows = store
            .search_patients("common")
            .await
            .expect("search should succeed");
        assert_eq!(rows.len(), SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn test_update_exam_applies_mapped_columns() {
        let store = MemoryStore::new();
        let exam = store
            .create_exam(NewExam {
                patient_id: Uuid::new_v4(),
                specialist_id: Uuid::new_v4(),
                date: d("2025-11-01"),
                notes: "initial".into(),
                pdf_path: None,
            })
            .await
            .expect("create should succeed");

        let payload = crate::fields::UpdatePayload::from_entries::<crate::fields::ExamField>(vec![
            ("notes".to_owned(), json!("amended")),
            ("attachments".to_owned(), json!("exams/report.pdf")),
        ])
        .expect("payload should build");

        let updated = store
            .update_exam(exam.id, &payload)
            .await
            .expect("update should succeed");
        assert_eq!(updated.notes, "amended");
        assert_eq!(updated.pdf_path.as_deref(), Some("exams/report.pdf"));
    }

    #[tokio::test]
    async fn test_create_profile_with_specialist_role_creates_linked_row() {
        let store = MemoryStore::new();
        let profile = store
            .create_profile(NewProfile {
                identity: "dr-sara".into(),
                name: "Sara Vidal".into(),
                email: "sara@example.com".into(),
                phone: None,
                role: "Especialista".into(),
                specialty: None,
            })
            .await
            .expect("create should succeed");

        let specialist = store
            .lookup_specialist_by_profile(profile.id)
            .await
            .expect("lookup should succeed")
            .expect("specialist row should exist");
        assert_eq!(specialist.specialty, DEFAULT_SPECIALTY);
    }

    #[tokio::test]
    async fn test_create_profile_rejects_duplicate_identity() {
        let store = MemoryStore::new();
        let new = NewProfile {
            identity: "dup".into(),
            name: "One".into(),
            email: "one@example.com".into(),
            phone: None,
            role: "patient".into(),
            specialty: None,
        };
        store
            .create_profile(new.clone())
            .await
            .expect("first create should succeed");
        let err = store
            .create_profile(new)
            .await
            .expect_err("duplicate identity should fail");
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_role_promotion_creates_specialist_row_once() {
        let store = MemoryStore::new();
        let profile = store
            .create_profile(NewProfile {
                identity: "promo".into(),
                name: "Pat".into(),
                email: "pat@example.com".into(),
                phone: None,
                role: "patient".into(),
                specialty: None,
            })
            .await
            .expect("create should succeed");

        store
            .update_profile_role(profile.id, Role::Specialist)
            .await
            .expect("promotion should succeed");
        store
            .update_profile_role(profile.id, Role::Specialist)
            .await
            .expect("repeat promotion should succeed");

        let specialists = store.list_specialists().await.expect("list should succeed");
        assert_eq!(
            specialists
                .iter()
                .filter(|s| s.profile_id == profile.id)
                .count(),
            1,
            "promotion must not duplicate the specialist row"
        );
    }

    #[tokio::test]
    async fn test_referral_status_transition() {
        let store = MemoryStore::new();
        let referral = store
            .create_referral(NewReferral {
                patient_id: Uuid::new_v4(),
                specialist_id: Uuid::new_v4(),
                date: d("2025-11-05"),
                reason: "retina check".into(),
            })
            .await
            .expect("create should succeed");
        assert_eq!(referral.status, ReferralStatus::Pending);

        let updated = store
            .update_referral_status(referral.id, ReferralStatus::Resolved)
            .await
            .expect("update should succeed");
        assert_eq!(updated.status, ReferralStatus::Resolved);
    }
}
