//! REST handlers.
//!
//! Handlers parse the wire types, resolve the session viewer, apply the core
//! resolvers (scope, availability, enrichment, field mapping) and translate
//! store failures to status codes. No business rule lives here.

use axum::body::Bytes;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;

use clinia_core::enrich::{appointment_views, referral_views};
use clinia_core::fields::{ExamField, PatientField, UpdatePayload};
use clinia_core::records::ReferralStatus;
use clinia_core::scheduling::{available_slots, validate_booking_date, validate_booking_time};
use clinia_core::scope::{can_cancel, permissions, scope, Action};
use clinia_core::session::resolve_viewer;
use clinia_core::store::{
    DataStore, NewAppointment, NewExam, NewPatient, NewProfile, NewReferral,
};
use clinia_core::{EmailAddress, NonEmptyText, Role, Viewer};
use clinia_files::signed;

use crate::dto;
use crate::{
    load_directory, parse_date, parse_time, parse_uuid, require_staff, session_viewer,
    store_status, AppState, HandlerError,
};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = dto::HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the clinia REST API service.
/// This endpoint is used for monitoring and load balancer health checks.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<dto::HealthRes> {
    Json(dto::HealthRes {
        ok: true,
        message: "clinia REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = dto::SignInReq,
    responses(
        (status = 200, description = "Session created", body = dto::SignInRes),
        (status = 401, description = "Unknown identity or unrecognised role"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Signs an identity in and resolves its viewer once.
///
/// Profile, role and patient/specialist linkage are looked up here and
/// stored with the session; no later request repeats those lookups. An
/// identity that resolves to a guest-level viewer is rejected.
#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<dto::SignInReq>,
) -> Result<Json<dto::SignInRes>, HandlerError> {
    let viewer = resolve_viewer(state.store.as_ref(), &req.identity)
        .await
        .map_err(|e| {
            tracing::error!("Sign-in lookup error: {:?}", e);
            store_status(&e)
        })?;

    if viewer.role == Role::Guest {
        return Err((StatusCode::UNAUTHORIZED, "Unknown identity or role"));
    }

    let perms = permissions(&viewer, state.cfg.scope_policy());
    let token = state.insert_session(viewer.clone());

    Ok(Json(dto::SignInRes {
        token: token.to_string(),
        role: viewer.role.as_str().to_owned(),
        profile_id: viewer.profile_id.map(|id| id.to_string()),
        patient_id: viewer.patient_id.map(|id| id.to_string()),
        specialist_id: viewer.specialist_id.map(|id| id.to_string()),
        can_view: perms.allows(Action::View),
        can_cancel: perms.allows(Action::Cancel),
        can_create_new: perms.allows(Action::CreateNew),
    }))
}

#[utoipa::path(
    get,
    path = "/appointments",
    responses(
        (status = 200, description = "Appointments visible to the session viewer", body = dto::ListAppointmentsRes),
        (status = 401, description = "Missing or invalid session"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Lists appointments, scoped to the viewer and enriched for display.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListAppointmentsRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;

    let rows = state.store.list_appointments().await.map_err(|e| {
        tracing::error!("List appointments error: {:?}", e);
        store_status(&e)
    })?;
    let visible = scope(rows, &viewer);

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::ListAppointmentsRes {
        appointments: appointment_views(&visible, &names)
            .into_iter()
            .map(Into::into)
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub specialist_id: Option<String>,
    pub date: Option<String>,
}

#[utoipa::path(
    get,
    path = "/appointments/slots",
    responses(
        (status = 200, description = "Open slots for a specialist and date", body = dto::SlotsRes),
        (status = 400, description = "Malformed specialist id or date"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Computes open slots for a specialist on a date.
///
/// Either selector absent yields an empty list: nothing is offered until
/// both are chosen. The answer is advisory; the booking write is what
/// enforces uniqueness.
#[axum::debug_handler]
pub async fn appointment_slots(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<dto::SlotsRes>, HandlerError> {
    session_viewer(&state, &headers)?;

    let specialist_id = match &query.specialist_id {
        Some(raw) => Some(parse_uuid(raw, "Invalid specialist id")?),
        None => None,
    };
    let date = match &query.date {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };

    let rows = state.store.list_appointments().await.map_err(|e| {
        tracing::error!("List appointments error: {:?}", e);
        store_status(&e)
    })?;

    let open = available_slots(&rows, specialist_id, date, state.cfg.slots());
    Ok(Json(dto::SlotsRes {
        slots: open
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = dto::CreateAppointmentReq,
    responses(
        (status = 200, description = "Appointment booked", body = dto::AppointmentRes),
        (status = 400, description = "Malformed request, past date or off-grid time"),
        (status = 403, description = "Viewer may not create appointments"),
        (status = 409, description = "Slot already booked"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Books an appointment.
///
/// Patients book for themselves only; administrators book for any patient.
/// A lost race on the slot surfaces as 409 and is not retried.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreateAppointmentReq>,
) -> Result<Json<dto::AppointmentRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    if !permissions(&viewer, state.cfg.scope_policy()).allows(Action::CreateNew) {
        return Err((StatusCode::FORBIDDEN, "Viewer may not create appointments"));
    }

    let patient_id = parse_uuid(&req.patient_id, "Invalid patient id")?;
    if viewer.role == Role::Patient && Some(patient_id) != viewer.patient_id {
        return Err((StatusCode::FORBIDDEN, "Patients may only book for themselves"));
    }

    let specialist_id = parse_uuid(&req.specialist_id, "Invalid specialist id")?;
    let date = parse_date(&req.date)?;
    let time = parse_time(&req.time)?;

    validate_booking_date(date, Utc::now().date_naive())
        .map_err(|_| (StatusCode::BAD_REQUEST, "Appointments cannot be booked for past dates"))?;
    validate_booking_time(time, state.cfg.slots())
        .map_err(|_| (StatusCode::BAD_REQUEST, "The requested time is not on the booking grid"))?;

    let row = state
        .store
        .create_appointment(NewAppointment {
            patient_id,
            specialist_id,
            date,
            time,
            reason: req.reason.filter(|r| !r.trim().is_empty()),
        })
        .await
        .map_err(|e| {
            tracing::error!("Create appointment error: {:?}", e);
            store_status(&e)
        })?;

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;
    let mut views = appointment_views(&[row], &names);
    let view = views.remove(0);
    Ok(Json(view.into()))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    responses(
        (status = 200, description = "Appointment cancelled", body = dto::DeleteRes),
        (status = 403, description = "Viewer may not cancel this appointment"),
        (status = 404, description = "No such appointment"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Cancels (deletes) an appointment the viewer owns.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<dto::DeleteRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    let id = parse_uuid(&id, "Invalid appointment id")?;

    let row = state
        .store
        .get_appointment(id)
        .await
        .map_err(|e| {
            tracing::error!("Get appointment error: {:?}", e);
            store_status(&e)
        })?
        .ok_or((StatusCode::NOT_FOUND, "No such appointment"))?;

    if !can_cancel(&viewer, &row, state.cfg.scope_policy()) {
        return Err((StatusCode::FORBIDDEN, "Viewer may not cancel this appointment"));
    }

    state.store.delete_appointment(id).await.map_err(|e| {
        tracing::error!("Delete appointment error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::DeleteRes { success: true }))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients visible to the viewer", body = dto::ListPatientsRes),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Lists patients.
///
/// Staff see the whole register; a patient sees only its own row.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListPatientsRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;

    let rows = state.store.list_patients().await.map_err(|e| {
        tracing::error!("List patients error: {:?}", e);
        store_status(&e)
    })?;

    let visible = match viewer.role {
        Role::Administrator | Role::Specialist => rows,
        Role::Patient => rows
            .into_iter()
            .filter(|p| Some(p.id) == viewer.patient_id)
            .collect(),
        Role::Guest => Vec::new(),
    };

    Ok(Json(dto::ListPatientsRes {
        patients: visible.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/patients/search",
    responses(
        (status = 200, description = "Patients matching the query", body = dto::ListPatientsRes),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Autocomplete search over the patient register.
///
/// Name matches first; document matches only when the name pass is empty.
/// At most ten rows. Debouncing is the caller's concern.
#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<dto::ListPatientsRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;

    let q = query.q.unwrap_or_default();
    let rows = state.store.search_patients(&q).await.map_err(|e| {
        tracing::error!("Search patients error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::ListPatientsRes {
        patients: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = dto::CreatePatientReq,
    responses(
        (status = 200, description = "Patient created", body = dto::PatientRes),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Viewer may not create patients"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Registers a patient. Staff only.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreatePatientReq>,
) -> Result<Json<dto::PatientRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;

    let name = NonEmptyText::new(&req.name)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Name and document are required"))?;
    let document = NonEmptyText::new(&req.document)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Name and document are required"))?;

    let birth_date = match &req.birth_date {
        Some(raw) => Some(parse_date(raw)?),
        None => None,
    };

    let row = state
        .store
        .create_patient(NewPatient {
            profile_id: None,
            name: name.into_string(),
            document: document.into_string(),
            phone: req.phone.filter(|p| !p.trim().is_empty()),
            birth_date,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create patient error: {:?}", e);
            store_status(&e)
        })?;

    Ok(Json(row.into()))
}

#[utoipa::path(
    patch,
    path = "/patients/{id}",
    request_body = dto::UpdateFieldsReq,
    responses(
        (status = 200, description = "Patient updated", body = dto::PatientRes),
        (status = 400, description = "Unknown, non-editable or empty field set"),
        (status = 404, description = "No such patient"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Edits a patient through the declared field mapping. Staff only.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::UpdateFieldsReq>,
) -> Result<Json<dto::PatientRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;
    let id = parse_uuid(&id, "Invalid patient id")?;

    let payload = UpdatePayload::from_entries::<PatientField>(req.fields).map_err(|e| {
        tracing::error!("Patient edit payload rejected: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid edit payload")
    })?;

    let row = state
        .store
        .update_patient(id, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Update patient error: {:?}", e);
            store_status(&e)
        })?;

    Ok(Json(row.into()))
}

#[utoipa::path(
    get,
    path = "/exams",
    responses(
        (status = 200, description = "Exams visible to the viewer", body = dto::ListExamsRes),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Lists exams, scoped to the viewer like every linked record kind.
#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListExamsRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;

    let rows = state.store.list_exams().await.map_err(|e| {
        tracing::error!("List exams error: {:?}", e);
        store_status(&e)
    })?;
    let visible = scope(rows, &viewer);

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::ListExamsRes {
        exams: visible
            .into_iter()
            .map(|row| {
                let patient_name = names.patient_name(row.patient_id);
                dto::ExamRes::from_row(row, patient_name)
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/exams",
    request_body = dto::CreateExamReq,
    responses(
        (status = 200, description = "Exam recorded", body = dto::ExamRes),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Viewer may not record exams"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Records an exam. Staff only.
#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreateExamReq>,
) -> Result<Json<dto::ExamRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;

    let row = state
        .store
        .create_exam(NewExam {
            patient_id: parse_uuid(&req.patient_id, "Invalid patient id")?,
            specialist_id: parse_uuid(&req.specialist_id, "Invalid specialist id")?,
            date: parse_date(&req.date)?,
            notes: req.notes,
            pdf_path: None,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create exam error: {:?}", e);
            store_status(&e)
        })?;

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;
    let patient_name = names.patient_name(row.patient_id);
    Ok(Json(dto::ExamRes::from_row(row, patient_name)))
}

#[utoipa::path(
    patch,
    path = "/exams/{id}",
    request_body = dto::UpdateFieldsReq,
    responses(
        (status = 200, description = "Exam updated", body = dto::ExamRes),
        (status = 400, description = "Unknown, non-editable or empty field set"),
        (status = 404, description = "No such exam"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Edits an exam through the declared field mapping. Staff only.
///
/// The display name `attachments` lands on the `pdf_path` column; identifier
/// and audit columns are not editable at all.
#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::UpdateFieldsReq>,
) -> Result<Json<dto::ExamRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;
    let id = parse_uuid(&id, "Invalid exam id")?;

    let payload = UpdatePayload::from_entries::<ExamField>(req.fields).map_err(|e| {
        tracing::error!("Exam edit payload rejected: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid edit payload")
    })?;

    let row = state.store.update_exam(id, &payload).await.map_err(|e| {
        tracing::error!("Update exam error: {:?}", e);
        store_status(&e)
    })?;

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;
    let patient_name = names.patient_name(row.patient_id);
    Ok(Json(dto::ExamRes::from_row(row, patient_name)))
}

#[utoipa::path(
    delete,
    path = "/exams/{id}",
    responses(
        (status = 200, description = "Exam deleted", body = dto::DeleteRes),
        (status = 404, description = "No such exam"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Deletes an exam and, best-effort, its stored attachment.
#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<dto::DeleteRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;
    let id = parse_uuid(&id, "Invalid exam id")?;

    let row = state.store.delete_exam(id).await.map_err(|e| {
        tracing::error!("Delete exam error: {:?}", e);
        store_status(&e)
    })?;

    // The row is gone either way; a dangling file is worth a warning, not a
    // failed request.
    if let Some(path) = &row.pdf_path {
        if let Err(e) = state.attachments.delete(path) {
            tracing::warn!("Failed to delete attachment {}: {}", path, e);
        }
    }

    Ok(Json(dto::DeleteRes { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/exams/{id}/file",
    request_body(content = Vec<u8>, description = "PDF bytes", content_type = "application/pdf"),
    responses(
        (status = 200, description = "Attachment stored", body = dto::AttachmentRes),
        (status = 400, description = "Not a PDF or too large"),
        (status = 404, description = "No such exam"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Uploads the exam's PDF report. Staff only.
///
/// Replaces any previous attachment; the old file is removed best-effort.
#[axum::debug_handler]
pub async fn upload_exam_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<dto::AttachmentRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;
    let id = parse_uuid(&id, "Invalid exam id")?;

    let existing = state
        .store
        .list_exams()
        .await
        .map_err(|e| {
            tracing::error!("List exams error: {:?}", e);
            store_status(&e)
        })?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or((StatusCode::NOT_FOUND, "No such exam"))?;

    let name = query.name.as_deref().unwrap_or("report.pdf");
    let stored = state
        .attachments
        .put(&body, name, Some("exams"))
        .map_err(|e| {
            tracing::error!("Store attachment error: {}", e);
            match e {
                clinia_files::FileError::NotAPdf => {
                    (StatusCode::BAD_REQUEST, "Only PDF attachments are accepted")
                }
                clinia_files::FileError::TooLarge { .. } => {
                    (StatusCode::BAD_REQUEST, "Attachment too large")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
            }
        })?;

    let payload = UpdatePayload::from_entries::<ExamField>([(
        "attachments".to_owned(),
        serde_json::Value::String(stored.path.clone()),
    )])
    .map_err(|e| {
        tracing::error!("Attachment payload rejected: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;

    state.store.update_exam(id, &payload).await.map_err(|e| {
        tracing::error!("Update exam error: {:?}", e);
        store_status(&e)
    })?;

    if let Some(old) = &existing.pdf_path {
        if let Err(e) = state.attachments.delete(old) {
            tracing::warn!("Failed to delete replaced attachment {}: {}", old, e);
        }
    }

    Ok(Json(dto::AttachmentRes {
        pdf_path: stored.path,
        size_bytes: stored.size_bytes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TtlQuery {
    pub ttl: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/exams/{id}/file-url",
    responses(
        (status = 200, description = "Signed URL for the attachment", body = dto::FileUrlRes),
        (status = 404, description = "No such exam, not visible, or no attachment"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Issues a time-limited signed URL for an exam attachment.
///
/// The row must be visible to the viewer; a hidden row answers 404, the same
/// as a missing one.
#[axum::debug_handler]
pub async fn exam_file_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<TtlQuery>,
) -> Result<Json<dto::FileUrlRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    let id = parse_uuid(&id, "Invalid exam id")?;

    let rows = state.store.list_exams().await.map_err(|e| {
        tracing::error!("List exams error: {:?}", e);
        store_status(&e)
    })?;
    let row = scope(rows, &viewer)
        .into_iter()
        .find(|e| e.id == id)
        .ok_or((StatusCode::NOT_FOUND, "No such exam"))?;

    let path = row
        .pdf_path
        .as_deref()
        .ok_or((StatusCode::NOT_FOUND, "Exam has no attachment"))?;

    let ttl = query.ttl.unwrap_or(3600).clamp(1, 86_400);
    let signed = signed::issue(state.cfg.url_signing_secret(), path, ttl, Utc::now());
    Ok(Json(dto::FileUrlRes {
        url: signed.url,
        expires_at: signed.expires_at.to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub expires: i64,
    pub token: String,
}

#[utoipa::path(
    get,
    path = "/files/{path}",
    responses(
        (status = 200, description = "Attachment bytes"),
        (status = 403, description = "Token mismatch or expired URL"),
        (status = 404, description = "No such attachment")
    )
)]
/// Serves a stored attachment against a signed URL.
///
/// The signature is the only credential; no session is required, which is
/// what lets a preview iframe load the document.
#[axum::debug_handler]
pub async fn serve_file(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(query): Query<FileQuery>,
) -> Result<([(HeaderName, &'static str); 1], Vec<u8>), HandlerError> {
    signed::verify(
        state.cfg.url_signing_secret(),
        &path,
        query.expires,
        &query.token,
        Utc::now(),
    )
    .map_err(|e| {
        tracing::warn!("Rejected file URL for {}: {}", path, e);
        (StatusCode::FORBIDDEN, "Signed URL rejected")
    })?;

    let bytes = state.attachments.read(&path).map_err(|e| {
        tracing::error!("Read attachment error: {}", e);
        (StatusCode::NOT_FOUND, "No such attachment")
    })?;

    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

#[utoipa::path(
    get,
    path = "/referrals",
    responses(
        (status = 200, description = "Referrals visible to the viewer", body = dto::ListReferralsRes),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Lists referrals, scoped and enriched.
#[axum::debug_handler]
pub async fn list_referrals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListReferralsRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;

    let rows = state.store.list_referrals().await.map_err(|e| {
        tracing::error!("List referrals error: {:?}", e);
        store_status(&e)
    })?;
    let visible = scope(rows, &viewer);

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::ListReferralsRes {
        referrals: referral_views(&visible, &names)
            .into_iter()
            .map(Into::into)
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/referrals",
    request_body = dto::CreateReferralReq,
    responses(
        (status = 200, description = "Referral created", body = dto::ReferralRes),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Viewer may not create referrals"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Creates a referral. Staff only. New referrals start pending.
#[axum::debug_handler]
pub async fn create_referral(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreateReferralReq>,
) -> Result<Json<dto::ReferralRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;

    let row = state
        .store
        .create_referral(NewReferral {
            patient_id: parse_uuid(&req.patient_id, "Invalid patient id")?,
            specialist_id: parse_uuid(&req.specialist_id, "Invalid specialist id")?,
            date: parse_date(&req.date)?,
            reason: req.reason,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create referral error: {:?}", e);
            store_status(&e)
        })?;

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;
    let mut views = referral_views(&[row], &names);
    Ok(Json(views.remove(0).into()))
}

#[utoipa::path(
    patch,
    path = "/referrals/{id}/status",
    request_body = dto::UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = dto::ReferralRes),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "No such referral"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Moves a referral through its status set. Staff only.
#[axum::debug_handler]
pub async fn update_referral_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::UpdateStatusReq>,
) -> Result<Json<dto::ReferralRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_staff(&viewer)?;
    let id = parse_uuid(&id, "Invalid referral id")?;

    let status = ReferralStatus::parse(&req.status)
        .ok_or((StatusCode::BAD_REQUEST, "Unknown referral status"))?;

    let row = state
        .store
        .update_referral_status(id, status)
        .await
        .map_err(|e| {
            tracing::error!("Update referral status error: {:?}", e);
            store_status(&e)
        })?;

    let names = load_directory(state.store.as_ref()).await.map_err(|e| {
        tracing::error!("Load name directory error: {:?}", e);
        store_status(&e)
    })?;
    let mut views = referral_views(&[row], &names);
    Ok(Json(views.remove(0).into()))
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All user profiles, newest first", body = dto::ListUsersRes),
        (status = 403, description = "Administrators only"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Lists user profiles. Administrators only.
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<dto::ListUsersRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_admin(&viewer)?;

    let rows = state.store.list_profiles().await.map_err(|e| {
        tracing::error!("List profiles error: {:?}", e);
        store_status(&e)
    })?;

    Ok(Json(dto::ListUsersRes {
        users: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = dto::CreateUserReq,
    responses(
        (status = 200, description = "Profile created", body = dto::UserRes),
        (status = 400, description = "Malformed request or duplicate identity"),
        (status = 403, description = "Administrators only"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Creates a user profile. Administrators only.
///
/// A specialist role brings its linked specialist row along in the same
/// write.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<dto::CreateUserReq>,
) -> Result<Json<dto::UserRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_admin(&viewer)?;

    if Role::normalise(&req.role).is_none() {
        return Err((StatusCode::BAD_REQUEST, "Unknown role"));
    }
    let email = EmailAddress::parse(&req.email)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid email address"))?;

    let row = state
        .store
        .create_profile(NewProfile {
            identity: req.identity,
            name: req.name,
            email: email.as_str().to_owned(),
            phone: req.phone,
            role: req.role,
            specialty: req.specialty,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create profile error: {:?}", e);
            store_status(&e)
        })?;

    Ok(Json(row.into()))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    request_body = dto::UpdateRoleReq,
    responses(
        (status = 200, description = "Role updated", body = dto::UserRes),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "No such profile"),
        (status = 403, description = "Administrators only"),
        (status = 401, description = "Missing or invalid session")
    )
)]
/// Changes a profile's role. Administrators only.
#[axum::debug_handler]
pub async fn update_user_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<dto::UpdateRoleReq>,
) -> Result<Json<dto::UserRes>, HandlerError> {
    let viewer = session_viewer(&state, &headers)?;
    require_admin(&viewer)?;
    let id = parse_uuid(&id, "Invalid profile id")?;

    let role =
        Role::normalise(&req.role).ok_or((StatusCode::BAD_REQUEST, "Unknown role"))?;

    let row = state
        .store
        .update_profile_role(id, role)
        .await
        .map_err(|e| {
            tracing::error!("Update role error: {:?}", e);
            store_status(&e)
        })?;

    Ok(Json(row.into()))
}

fn require_admin(viewer: &Viewer) -> Result<(), HandlerError> {
    if viewer.role != Role::Administrator {
        return Err((StatusCode::FORBIDDEN, "Administrators only"));
    }
    Ok(())
}
