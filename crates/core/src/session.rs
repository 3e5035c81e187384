//! Session-scoped viewer identity.
//!
//! The viewer is resolved ONCE at sign-in (profile by auth identity, then
//! the linked patient or specialist row) and passed explicitly to every
//! function that needs it. Nothing downstream re-fetches profile data per
//! operation.

use uuid::Uuid;

use crate::roles::Role;
use crate::store::DataStore;
use crate::StoreResult;

/// The authenticated actor behind a request, with its role and row linkage
/// already resolved.
///
/// A missing linkage (a patient role with no patient row, say) is carried as
/// `None` and degrades to deny-all at the scope layer; it is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub profile_id: Option<Uuid>,
    pub role: Role,
    /// The patient row linked to this profile, when `role == Patient`.
    pub patient_id: Option<Uuid>,
    /// The specialist row linked to this profile, when `role == Specialist`.
    pub specialist_id: Option<Uuid>,
}

impl Viewer {
    /// An unauthenticated (or unrecognised-role) viewer. Sees nothing.
    pub fn guest() -> Self {
        Self {
            profile_id: None,
            role: Role::Guest,
            patient_id: None,
            specialist_id: None,
        }
    }

    pub fn administrator(profile_id: Uuid) -> Self {
        Self {
            profile_id: Some(profile_id),
            role: Role::Administrator,
            patient_id: None,
            specialist_id: None,
        }
    }

    pub fn patient(profile_id: Uuid, patient_id: Uuid) -> Self {
        Self {
            profile_id: Some(profile_id),
            role: Role::Patient,
            patient_id: Some(patient_id),
            specialist_id: None,
        }
    }

    pub fn specialist(profile_id: Uuid, specialist_id: Uuid) -> Self {
        Self {
            profile_id: Some(profile_id),
            role: Role::Specialist,
            patient_id: None,
            specialist_id: Some(specialist_id),
        }
    }
}

/// Resolves the viewer for an auth identity, once, at sign-in.
///
/// Looks up the profile row, normalises its stored role, and resolves the
/// patient/specialist linkage for the roles that have one. An unknown
/// identity, an unrecognised role string, or a missing linkage row all
/// produce a viewer that the scope layer denies; none of them is an error.
///
/// # Errors
///
/// Only transient backend failures propagate; "no such row" does not.
pub async fn resolve_viewer<S: DataStore>(store: &S, identity: &str) -> StoreResult<Viewer> {
    let Some(profile) = store.lookup_profile_by_identity(identity).await? else {
        return Ok(Viewer::guest());
    };

    let Some(role) = Role::normalise(&profile.role) else {
        tracing::warn!(profile_id = %profile.id, raw = %profile.role, "unrecognised role string, denying");
        return Ok(Viewer::guest());
    };

    let viewer = match role {
        Role::Administrator => Viewer::administrator(profile.id),
        Role::Patient => {
            let patient = store.lookup_patient_by_profile(profile.id).await?;
            Viewer {
                profile_id: Some(profile.id),
                role,
                patient_id: patient.map(|p| p.id),
                specialist_id: None,
            }
        }
        Role::Specialist => {
            let specialist = store.lookup_specialist_by_profile(profile.id).await?;
            Viewer {
                profile_id: Some(profile.id),
                role,
                patient_id: None,
                specialist_id: specialist.map(|s| s.id),
            }
        }
        Role::Guest => Viewer::guest(),
    };

    Ok(viewer)
}
