//! Row-level visibility and per-viewer permissions.
//!
//! One policy for every record kind that carries patient/specialist linkage:
//! administrators see everything, specialists see their own rows, patients
//! see their own rows, everyone else sees nothing. Every list surface goes
//! through [`scope`]; no caller filters rows by role on its own.

use uuid::Uuid;

use crate::records::{Appointment, Exam, Referral};
use crate::roles::Role;
use crate::session::Viewer;

/// Records that can be scoped by viewer.
pub trait RowLinkage {
    fn patient_link(&self) -> Option<Uuid>;
    fn specialist_link(&self) -> Option<Uuid>;
}

impl RowLinkage for Appointment {
    fn patient_link(&self) -> Option<Uuid> {
        Some(self.patient_id)
    }
    fn specialist_link(&self) -> Option<Uuid> {
        Some(self.specialist_id)
    }
}

impl RowLinkage for Exam {
    fn patient_link(&self) -> Option<Uuid> {
        Some(self.patient_id)
    }
    fn specialist_link(&self) -> Option<Uuid> {
        Some(self.specialist_id)
    }
}

impl RowLinkage for Referral {
    fn patient_link(&self) -> Option<Uuid> {
        Some(self.patient_id)
    }
    fn specialist_link(&self) -> Option<Uuid> {
        Some(self.specialist_id)
    }
}

/// Tunable points of the role policy.
///
/// Whether administrators may cancel appointments is contradictory across
/// historical variants of the appointments screen; it is a product decision
/// still pending confirmation. Default matches the surviving variant:
/// administrators view but do not cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopePolicy {
    pub admins_may_cancel: bool,
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            admins_may_cancel: false,
        }
    }
}

/// Actions a viewer may take on appointment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Cancel,
    CreateNew,
}

/// The set of actions permitted to a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSet {
    view: bool,
    cancel: bool,
    create_new: bool,
}

impl ActionSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Cancel => self.cancel,
            Action::CreateNew => self.create_new,
        }
    }
}

/// Filters `rows` down to what `viewer` may see.
///
/// - administrator: all rows, membership unchanged
/// - specialist: rows whose specialist linkage matches the viewer's
///   specialist row; none when the linkage is unresolved
/// - patient: rows whose patient linkage matches the viewer's patient row;
///   none when the linkage is unresolved
/// - guest / unrecognised role: nothing
///
/// Idempotent: scoping an already-scoped collection changes nothing.
pub fn scope<R: RowLinkage>(rows: Vec<R>, viewer: &Viewer) -> Vec<R> {
    match viewer.role {
        Role::Administrator => rows,
        Role::Specialist => match viewer.specialist_id {
            Some(specialist_id) => rows
                .into_iter()
                .filter(|r| r.specialist_link() == Some(specialist_id))
                .collect(),
            None => Vec::new(),
        },
        Role::Patient => match viewer.patient_id {
            Some(patient_id) => rows
                .into_iter()
                .filter(|r| r.patient_link() == Some(patient_id))
                .collect(),
            None => Vec::new(),
        },
        Role::Guest => Vec::new(),
    }
}

/// The actions `viewer` may take on the appointments collection.
pub fn permissions(viewer: &Viewer, policy: &ScopePolicy) -> ActionSet {
    match viewer.role {
        Role::Patient if viewer.patient_id.is_some() => ActionSet {
            view: true,
            cancel: true,
            create_new: true,
        },
        Role::Specialist if viewer.specialist_id.is_some() => ActionSet {
            view: true,
            cancel: false,
            create_new: false,
        },
        Role::Administrator => ActionSet {
            view: true,
            cancel: policy.admins_may_cancel,
            create_new: true,
        },
        _ => ActionSet::none(),
    }
}

/// Whether `viewer` may cancel this specific row: the Cancel action plus
/// visibility of the row itself.
pub fn can_cancel<R: RowLinkage>(viewer: &Viewer, row: &R, policy: &ScopePolicy) -> bool {
    if !permissions(viewer, policy).allows(Action::Cancel) {
        return false;
    }
    match viewer.role {
        Role::Administrator => true,
        Role::Patient => viewer.patient_id.is_some() && row.patient_link() == viewer.patient_id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::AppointmentStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn appt(patient_id: Uuid, specialist_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            specialist_id,
            date: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date"),
            time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            reason: None,
            status: AppointmentStatus::Scheduled,
        }
    }

    fn mixed_rows(p: Uuid, s: Uuid) -> Vec<Appointment> {
        vec![
            appt(p, s),
            appt(p, Uuid::new_v4()),
            appt(Uuid::new_v4(), s),
            appt(Uuid::new_v4(), Uuid::new_v4()),
        ]
    }

    #[test]
    fn test_administrator_sees_all_rows_unchanged() {
        let viewer = Viewer::administrator(Uuid::new_v4());
        let rows = mixed_rows(Uuid::new_v4(), Uuid::new_v4());
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let scoped = scope(rows, &viewer);
        assert_eq!(scoped.iter().map(|r| r.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_patient_sees_exactly_its_rows() {
        let p = Uuid::new_v4();
        let viewer = Viewer::patient(Uuid::new_v4(), p);
        let scoped = scope(mixed_rows(p, Uuid::new_v4()), &viewer);

        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|r| r.patient_id == p));
    }

    #[test]
    fn test_specialist_sees_exactly_its_rows() {
        let s = Uuid::new_v4();
        let viewer = Viewer::specialist(Uuid::new_v4(), s);
        let scoped = scope(mixed_rows(Uuid::new_v4(), s), &viewer);

        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|r| r.specialist_id == s));
    }

    #[test]
    fn test_guest_and_unlinked_viewers_see_nothing() {
        let rows = mixed_rows(Uuid::new_v4(), Uuid::new_v4());

        assert!(scope(rows.clone(), &Viewer::guest()).is_empty());

        let unlinked_patient = Viewer {
            profile_id: Some(Uuid::new_v4()),
            role: Role::Patient,
            patient_id: None,
            specialist_id: None,
        };
        assert!(scope(rows, &unlinked_patient).is_empty());
    }

    #[test]
    fn test_scope_is_idempotent() {
        let p = Uuid::new_v4();
        let viewer = Viewer::patient(Uuid::new_v4(), p);
        let once = scope(mixed_rows(p, Uuid::new_v4()), &viewer);
        let once_ids: Vec<Uuid> = once.iter().map(|r| r.id).collect();

        let twice = scope(once, &viewer);
        assert_eq!(twice.iter().map(|r| r.id).collect::<Vec<_>>(), once_ids);
    }

    #[test]
    fn test_patient_permissions() {
        let viewer = Viewer::patient(Uuid::new_v4(), Uuid::new_v4());
        let perms = permissions(&viewer, &ScopePolicy::default());
        assert!(perms.allows(Action::View));
        assert!(perms.allows(Action::Cancel));
        assert!(perms.allows(Action::CreateNew));
    }

    #[test]
    fn test_specialist_permissions_are_view_only() {
        let viewer = Viewer::specialist(Uuid::new_v4(), Uuid::new_v4());
        let perms = permissions(&viewer, &ScopePolicy::default());
        assert!(perms.allows(Action::View));
        assert!(!perms.allows(Action::Cancel));
        assert!(!perms.allows(Action::CreateNew));
    }

    #[test]
    fn test_admin_cancel_follows_policy() {
        let viewer = Viewer::administrator(Uuid::new_v4());

        let default_perms = permissions(&viewer, &ScopePolicy::default());
        assert!(default_perms.allows(Action::View));
        assert!(default_perms.allows(Action::CreateNew));
        assert!(!default_perms.allows(Action::Cancel));

        let permissive = ScopePolicy {
            admins_may_cancel: true,
        };
        assert!(permissions(&viewer, &permissive).allows(Action::Cancel));
    }

    #[test]
    fn test_can_cancel_requires_row_visibility() {
        let p = Uuid::new_v4();
        let viewer = Viewer::patient(Uuid::new_v4(), p);
        let own = appt(p, Uuid::new_v4());
        let other = appt(Uuid::new_v4(), Uuid::new_v4());
        let policy = ScopePolicy::default();

        assert!(can_cancel(&viewer, &own, &policy));
        assert!(!can_cancel(&viewer, &other, &policy));
        assert!(!can_cancel(&Viewer::guest(), &own, &policy));
    }
}
