//! # API REST
//!
//! REST API implementation for clinia.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, session tokens)
//!
//! Business rules live in `clinia-core`; attachments and signed URLs in
//! `clinia-files`.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use chrono::{NaiveDate, NaiveTime};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use clinia_core::enrich::NameDirectory;
use clinia_core::roles::Role;
use clinia_core::session::Viewer;
use clinia_core::store::{DataStore, MemoryStore, NewProfile};
use clinia_core::{CoreConfig, StoreError, StoreResult};
use clinia_files::AttachmentStore;

/// The uniform handler error shape: a status code plus a static message.
/// Details go to the log, not the wire.
pub type HandlerError = (StatusCode, &'static str);

/// Application state shared across REST API handlers
///
/// Holds the backing store, the attachment store, the startup-resolved core
/// configuration and the session table. Sessions are created at sign-in and
/// carry the fully resolved viewer, so request handling never repeats the
/// profile lookups.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub attachments: Arc<AttachmentStore>,
    pub cfg: Arc<CoreConfig>,
    sessions: Arc<RwLock<HashMap<Uuid, Viewer>>>,
}

impl AppState {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<MemoryStore>,
    ) -> Result<Self, clinia_files::FileError> {
        let attachments = Arc::new(AttachmentStore::new(cfg.attachment_dir())?);
        Ok(Self {
            store,
            attachments,
            cfg,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Stores a resolved viewer and returns its bearer token.
    pub fn insert_session(&self, viewer: Viewer) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, viewer);
        token
    }

    fn session(&self, token: Uuid) -> Option<Viewer> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&token)
            .cloned()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::sign_in,
        handlers::list_appointments,
        handlers::appointment_slots,
        handlers::create_appointment,
        handlers::cancel_appointment,
        handlers::list_patients,
        handlers::search_patients,
        handlers::create_patient,
        handlers::update_patient,
        handlers::list_exams,
        handlers::create_exam,
        handlers::update_exam,
        handlers::delete_exam,
        handlers::upload_exam_file,
        handlers::exam_file_url,
        handlers::serve_file,
        handlers::list_referrals,
        handlers::create_referral,
        handlers::update_referral_status,
        handlers::list_users,
        handlers::create_user,
        handlers::update_user_role,
    ),
    components(schemas(
        dto::HealthRes,
        dto::SignInReq,
        dto::SignInRes,
        dto::ListAppointmentsRes,
        dto::AppointmentRes,
        dto::CreateAppointmentReq,
        dto::SlotsRes,
        dto::DeleteRes,
        dto::ListPatientsRes,
        dto::PatientRes,
        dto::CreatePatientReq,
        dto::UpdateFieldsReq,
        dto::ListExamsRes,
        dto::ExamRes,
        dto::CreateExamReq,
        dto::AttachmentRes,
        dto::FileUrlRes,
        dto::ListReferralsRes,
        dto::ReferralRes,
        dto::CreateReferralReq,
        dto::UpdateStatusReq,
        dto::ListUsersRes,
        dto::UserRes,
        dto::CreateUserReq,
        dto::UpdateRoleReq,
    ))
)]
pub struct ApiDoc;

/// Builds the API router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments", post(handlers::create_appointment))
        .route("/appointments/slots", get(handlers::appointment_slots))
        .route("/appointments/:id", delete(handlers::cancel_appointment))
        .route("/patients", get(handlers::list_patients))
        .route("/patients", post(handlers::create_patient))
        .route("/patients/search", get(handlers::search_patients))
        .route("/patients/:id", patch(handlers::update_patient))
        .route("/exams", get(handlers::list_exams))
        .route("/exams", post(handlers::create_exam))
        .route("/exams/:id", patch(handlers::update_exam))
        .route("/exams/:id", delete(handlers::delete_exam))
        .route("/exams/:id/file", post(handlers::upload_exam_file))
        .route("/exams/:id/file-url", get(handlers::exam_file_url))
        .route("/files/*path", get(handlers::serve_file))
        .route("/referrals", get(handlers::list_referrals))
        .route("/referrals", post(handlers::create_referral))
        .route(
            "/referrals/:id/status",
            patch(handlers::update_referral_status),
        )
        .route("/users", get(handlers::list_users))
        .route("/users", post(handlers::create_user))
        .route("/users/:id/role", patch(handlers::update_user_role))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolves the session viewer from the `x-session-token` header.
pub(crate) fn session_viewer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Viewer, HandlerError> {
    let raw = headers
        .get("x-session-token")
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing session token"))?;
    let token: Uuid = raw
        .parse()
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid session token"))?;
    state
        .session(token)
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown session"))
}

/// Administrators and linked specialists; everyone else is turned away.
pub(crate) fn require_staff(viewer: &Viewer) -> Result<(), HandlerError> {
    let is_staff = matches!(viewer.role, Role::Administrator)
        || (viewer.role == Role::Specialist && viewer.specialist_id.is_some());
    if !is_staff {
        return Err((StatusCode::FORBIDDEN, "Staff only"));
    }
    Ok(())
}

/// Maps a store failure to the uniform wire shape.
pub(crate) fn store_status(err: &StoreError) -> HandlerError {
    use clinia_core::error::ErrorKind;
    match err.kind() {
        ErrorKind::Conflict => (StatusCode::CONFLICT, "The requested slot is already booked"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not found"),
        ErrorKind::Transient => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Backend temporarily unavailable",
        ),
        ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "Invalid input"),
    }
}

pub(crate) fn parse_uuid(raw: &str, message: &'static str) -> Result<Uuid, HandlerError> {
    raw.trim()
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, message))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, HandlerError> {
    raw.trim()
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid date, expected YYYY-MM-DD"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, HandlerError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid time, expected HH:MM"))
}

/// Loads the three side tables for display joins.
pub(crate) async fn load_directory<S: DataStore>(store: &S) -> StoreResult<NameDirectory> {
    let patients = store.list_patients().await?;
    let specialists = store.list_specialists().await?;
    let profiles = store.list_profiles().await?;
    Ok(NameDirectory::new(&patients, &specialists, &profiles))
}

/// Ensures an administrator profile exists for `identity`, creating it when
/// missing. Without this a fresh deployment has nobody able to sign in and
/// create accounts.
pub async fn ensure_bootstrap_admin(store: &MemoryStore, identity: &str) -> StoreResult<()> {
    if store.lookup_profile_by_identity(identity).await?.is_some() {
        return Ok(());
    }

    store
        .create_profile(NewProfile {
            identity: identity.to_owned(),
            name: "Administrator".to_owned(),
            email: format!("{identity}@clinia.local"),
            phone: None,
            role: Role::Administrator.as_str().to_owned(),
            specialty: None,
        })
        .await?;
    tracing::info!("Bootstrapped administrator profile '{}'", identity);
    Ok(())
}
