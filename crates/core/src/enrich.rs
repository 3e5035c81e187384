//! Display enrichment: foreign keys to human-readable names.
//!
//! One join for every list surface: build a [`NameDirectory`] from the
//! side-loaded rows, then map. An unresolved foreign key always renders as
//! the empty string and is never an error, so no caller hand-rolls its own
//! null handling.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::records::{Appointment, Patient, Profile, Referral, ReferralStatus, Specialist};

/// Side-loaded lookup maps for display joins.
#[derive(Debug, Default)]
pub struct NameDirectory {
    patients: HashMap<Uuid, String>,
    /// specialist id -> (profile id, specialty)
    specialists: HashMap<Uuid, (Uuid, String)>,
    profiles: HashMap<Uuid, String>,
}

impl NameDirectory {
    pub fn new(patients: &[Patient], specialists: &[Specialist], profiles: &[Profile]) -> Self {
        Self {
            patients: patients.iter().map(|p| (p.id, p.name.clone())).collect(),
            specialists: specialists
                .iter()
                .map(|s| (s.id, (s.profile_id, s.specialty.clone())))
                .collect(),
            profiles: profiles.iter().map(|u| (u.id, u.name.clone())).collect(),
        }
    }

    /// Patient display name; empty string when the row is unknown.
    pub fn patient_name(&self, id: Uuid) -> String {
        self.patients.get(&id).cloned().unwrap_or_default()
    }

    /// Specialist display name, joined through the profile table; empty
    /// string when either hop is missing.
    pub fn doctor_name(&self, specialist_id: Uuid) -> String {
        self.specialists
            .get(&specialist_id)
            .and_then(|(profile_id, _)| self.profiles.get(profile_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Specialty label; empty string when the specialist row is unknown.
    pub fn specialty(&self, specialist_id: Uuid) -> String {
        self.specialists
            .get(&specialist_id)
            .map(|(_, specialty)| specialty.clone())
            .unwrap_or_default()
    }
}

/// An appointment row ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub patient_name: String,
    pub doctor: String,
    pub specialty: String,
}

pub fn appointment_views(rows: &[Appointment], names: &NameDirectory) -> Vec<AppointmentView> {
    rows.iter()
        .map(|r| AppointmentView {
            id: r.id,
            patient_id: r.patient_id,
            specialist_id: r.specialist_id,
            date: r.date,
            time: r.time,
            reason: r.reason.clone(),
            patient_name: names.patient_name(r.patient_id),
            doctor: names.doctor_name(r.specialist_id),
            specialty: names.specialty(r.specialist_id),
        })
        .collect()
}

/// A referral row ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub date: NaiveDate,
    pub reason: String,
    pub status: ReferralStatus,
    pub patient_name: String,
    pub doctor: String,
    pub specialty: String,
}

pub fn referral_views(rows: &[Referral], names: &NameDirectory) -> Vec<ReferralView> {
    rows.iter()
        .map(|r| ReferralView {
            id: r.id,
            patient_id: r.patient_id,
            specialist_id: r.specialist_id,
            date: r.date,
            reason: r.reason.clone(),
            status: r.status,
            patient_name: names.patient_name(r.patient_id),
            doctor: names.doctor_name(r.specialist_id),
            specialty: names.specialty(r.specialist_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::AppointmentStatus;
    use chrono::Utc;

    fn patient(name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            profile_id: None,
            name: name.into(),
            document: "123".into(),
            phone: None,
            birth_date: None,
            created_at: Utc::now(),
        }
    }

    fn profile(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            identity: name.to_ascii_lowercase(),
            name: name.into(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            phone: None,
            role: "especialista".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_enrichment_joins_all_three_hops() {
        let p = patient("Marta Ruiz");
        let doc = profile("Luis");
        let sp = Specialist {
            id: Uuid::new_v4(),
            profile_id: doc.id,
            specialty: "optometry".into(),
        };
        let names = NameDirectory::new(&[p.clone()], &[sp.clone()], &[doc]);

        let rows = vec![Appointment {
            id: Uuid::new_v4(),
            patient_id: p.id,
            specialist_id: sp.id,
            date: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"),
            time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            reason: Some("checkup".into()),
            status: AppointmentStatus::Scheduled,
        }];

        let views = appointment_views(&rows, &names);
        assert_eq!(views[0].patient_name, "Marta Ruiz");
        assert_eq!(views[0].doctor, "Luis");
        assert_eq!(views[0].specialty, "optometry");
    }

    #[test]
    fn test_missing_linkage_renders_empty_strings() {
        let names = NameDirectory::default();

        let rows = vec![Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            specialist_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"),
            time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            reason: None,
            status: AppointmentStatus::Scheduled,
        }];

        let views = appointment_views(&rows, &names);
        assert_eq!(views[0].patient_name, "");
        assert_eq!(views[0].doctor, "");
        assert_eq!(views[0].specialty, "");
    }

    #[test]
    fn test_specialist_without_profile_row_renders_empty_doctor() {
        let sp = Specialist {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(), // no matching profile loaded
            specialty: "optometry".into(),
        };
        let names = NameDirectory::new(&[], &[sp.clone()], &[]);

        assert_eq!(names.doctor_name(sp.id), "");
        assert_eq!(names.specialty(sp.id), "optometry");
    }

    #[test]
    fn test_referral_views_join_like_appointments() {
        let p = patient("Jon");
        let names = NameDirectory::new(&[p.clone()], &[], &[]);
        let rows = vec![Referral {
            id: Uuid::new_v4(),
            patient_id: p.id,
            specialist_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date"),
            reason: "retina".into(),
            status: ReferralStatus::Pending,
        }];

        let views = referral_views(&rows, &names);
        assert_eq!(views[0].patient_name, "Jon");
        assert_eq!(views[0].doctor, "");
    }
}
