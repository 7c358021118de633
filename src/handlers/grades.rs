//! Grade ledger endpoints, legacy flat grades and Form 137 rendering.
//!
//! Every endpoint here requires the teacher role and scope over the
//! addressed student.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Json,
};
use common::{GradeEntryDto, GradeType, LedgerSemester};
use compute::access::ensure_teacher_access;
use compute::grading::validate_score;
use compute::ledger::{student_ledger, upsert_grade};
use compute::transcript::{build_projection, transcript_filename};
use compute::GradeSubmission;
use model::entities::user::{self, Role};
use model::entities::{legacy_grade, student_profile};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::ToSchema;

/// A single partial score submission
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubmissionRequest {
    pub student_id: i32,
    pub subject_id: i32,
    pub grade_type: GradeType,
    /// Score in [0, 100]
    pub grade_value: f64,
    pub semester_id: i32,
    /// Version of the row the client last saw; a mismatch is rejected with 409
    pub expected_version: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct LegacyGradeRequest {
    pub grade: Option<f64>,
    pub subject_id: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LegacyGradeResponse {
    pub id: i32,
    pub student_id: i32,
    pub teacher_id: i32,
    pub subject_id: i32,
    pub grade: f64,
    pub year: i32,
}

impl From<legacy_grade::Model> for LegacyGradeResponse {
    fn from(model: legacy_grade::Model) -> Self {
        Self {
            id: model.id,
            student_id: model.student_id,
            teacher_id: model.teacher_id,
            subject_id: model.subject_id,
            grade: model.grade,
            year: model.year,
        }
    }
}

/// Checks the teacher role, then scope over `student_id`.
async fn authorize_student(state: &AppState, auth: &AuthUser, student_id: i32) -> Result<(), ApiError> {
    auth.require(&[Role::Teacher])?;
    ensure_teacher_access(&state.db, auth.id, student_id).await?;
    trace!("Teacher {} may access student {}", auth.id, student_id);
    Ok(())
}

/// Ledger of a student, grouped by semester
#[utoipa::path(
    get,
    path = "/api/v1/grades/student/{student_id}",
    tag = "grades",
    params(("student_id" = i32, Path, description = "Student user ID")),
    responses(
        (status = 200, description = "Ledger retrieved", body = ApiResponse<Vec<LedgerSemester>>),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 404, description = "Student not found or no grades recorded", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn get_student_grades(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<LedgerSemester>>>, ApiError> {
    authorize_student(&state, &auth, student_id).await?;
    let ledger = student_ledger(&state.db, student_id).await?;
    debug!("Student {} has grades in {} semesters", student_id, ledger.len());
    Ok(Json(ApiResponse::ok(ledger, "Grades retrieved successfully")))
}

async fn record_grade(
    state: &AppState,
    auth: &AuthUser,
    request: GradeSubmissionRequest,
) -> Result<GradeEntryDto, ApiError> {
    authorize_student(state, auth, request.student_id).await?;

    let student_id = request.student_id;
    let entry = upsert_grade(
        &state.db,
        GradeSubmission {
            student_id,
            subject_id: request.subject_id,
            semester_id: request.semester_id,
            grade_type: request.grade_type,
            value: request.grade_value,
            expected_version: request.expected_version,
            submitted_by: Some(auth.id),
        },
    )
    .await?;

    state.cache.invalidate(&student_id).await;
    info!(
        "Teacher {} recorded {} for student {} (version {})",
        auth.id, request.grade_type, student_id, entry.version
    );
    Ok(entry)
}

/// Record a midterm or finals score
#[utoipa::path(
    post,
    path = "/api/v1/grades",
    tag = "grades",
    request_body = GradeSubmissionRequest,
    responses(
        (status = 200, description = "Row after the write, with derived fields", body = ApiResponse<GradeEntryDto>),
        (status = 400, description = "Score outside [0, 100]", body = ErrorResponse),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 404, description = "Student, subject or semester not found", body = ErrorResponse),
        (status = 409, description = "Row changed since expectedVersion", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(teacher_id = auth.id))]
pub async fn submit_grade(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<GradeSubmissionRequest>,
) -> Result<Json<ApiResponse<GradeEntryDto>>, ApiError> {
    let entry = record_grade(&state, &auth, request).await?;
    Ok(Json(ApiResponse::ok(entry, "Grade recorded successfully")))
}

/// Record a midterm or finals score from the teacher dashboard
#[utoipa::path(
    post,
    path = "/api/v1/teacher/grades",
    tag = "grades",
    request_body = GradeSubmissionRequest,
    responses(
        (status = 200, description = "Row after the write, with derived fields", body = ApiResponse<GradeEntryDto>),
        (status = 400, description = "Score outside [0, 100]", body = ErrorResponse),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 409, description = "Row changed since expectedVersion", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(teacher_id = auth.id))]
pub async fn submit_teacher_grade(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<GradeSubmissionRequest>,
) -> Result<Json<ApiResponse<GradeEntryDto>>, ApiError> {
    let entry = record_grade(&state, &auth, request).await?;
    Ok(Json(ApiResponse::ok(entry, "Grade recorded successfully")))
}

async fn find_legacy_grade(state: &AppState, grade_id: i32) -> Result<legacy_grade::Model, ApiError> {
    legacy_grade::Entity::find_by_id(grade_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            warn!("Legacy grade {} not found", grade_id);
            ApiError::NotFound("Grade not found".to_string())
        })
}

/// Update a legacy flat grade record
#[utoipa::path(
    put,
    path = "/api/v1/grades/{grade_id}",
    tag = "grades",
    params(("grade_id" = i32, Path, description = "Legacy grade ID")),
    request_body = LegacyGradeRequest,
    responses(
        (status = 200, description = "Grade updated", body = ApiResponse<LegacyGradeResponse>),
        (status = 400, description = "Grade outside [0, 100]", body = ErrorResponse),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 404, description = "Grade not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(teacher_id = auth.id))]
pub async fn update_legacy_grade(
    Path(grade_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<LegacyGradeRequest>,
) -> Result<Json<ApiResponse<LegacyGradeResponse>>, ApiError> {
    auth.require(&[Role::Teacher])?;
    let existing = find_legacy_grade(&state, grade_id).await?;
    authorize_student(&state, &auth, existing.student_id).await?;

    let mut active: legacy_grade::ActiveModel = existing.into();
    if let Some(grade) = request.grade {
        active.grade = Set(validate_score(grade)?);
    }
    if let Some(subject_id) = request.subject_id {
        active.subject_id = Set(subject_id);
    }
    if let Some(year) = request.year {
        active.year = Set(year);
    }
    let updated = active.update(&state.db).await?;

    info!("Legacy grade {} updated by teacher {}", grade_id, auth.id);
    Ok(Json(ApiResponse::ok(LegacyGradeResponse::from(updated), "Grade updated successfully")))
}

/// Delete a legacy flat grade record
#[utoipa::path(
    delete,
    path = "/api/v1/grades/{grade_id}",
    tag = "grades",
    params(("grade_id" = i32, Path, description = "Legacy grade ID")),
    responses(
        (status = 204, description = "Grade deleted"),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 404, description = "Grade not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn delete_legacy_grade(
    Path(grade_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(&[Role::Teacher])?;
    let existing = find_legacy_grade(&state, grade_id).await?;
    authorize_student(&state, &auth, existing.student_id).await?;

    legacy_grade::Entity::delete_by_id(grade_id).exec(&state.db).await?;
    info!("Legacy grade {} deleted by teacher {}", grade_id, auth.id);
    Ok(StatusCode::NO_CONTENT)
}

/// File name for a student's transcript, from the profile or the username.
async fn filename_for(db: &DatabaseConnection, student_id: i32) -> Result<String, ApiError> {
    if let Some(profile) = student_profile::Entity::find_by_id(student_id).one(db).await? {
        return Ok(transcript_filename(&profile.last_name, &profile.first_name));
    }
    let username = user::Entity::find_by_id(student_id)
        .one(db)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();
    Ok(transcript_filename(&username, ""))
}

async fn render_transcript(state: &AppState, student_id: i32) -> Result<Arc<Vec<u8>>, ApiError> {
    if let Some(bytes) = state.cache.get(&student_id).await {
        debug!("Serving cached Form 137 for student {}", student_id);
        return Ok(bytes);
    }

    let ticket = state.cache.ticket(student_id).await;
    let projection = build_projection(&state.db, student_id, &state.config.school_name).await?;
    let renderer = state.renderer.clone();
    let bytes = tokio::task::spawn_blocking(move || renderer.render(&projection))
        .await
        .map_err(|e| {
            error!("Transcript rendering task failed: {}", e);
            ApiError::Internal(e.to_string())
        })??;

    let bytes = Arc::new(bytes);
    state.cache.insert(ticket, bytes.clone()).await;
    Ok(bytes)
}

/// Writes a copy of the document under the transcript directory.
async fn store_copy(dir: &str, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = PathBuf::from(dir).join(filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Render a student's Form 137
///
/// Responds with the document and writes a copy to the transcript
/// directory. A failed disk write is logged and does not fail the request.
#[utoipa::path(
    get,
    path = "/api/v1/grades/form137/{student_id}",
    tag = "grades",
    params(("student_id" = i32, Path, description = "Student user ID")),
    responses(
        (status = 200, description = "Form 137 document", content_type = "application/pdf", body = Vec<u8>),
        (status = 403, description = "Wrong role or student outside the teacher's sections", body = ErrorResponse),
        (status = 404, description = "Student not found or no grades recorded", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(teacher_id = auth.id))]
pub async fn generate_form137(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    authorize_student(&state, &auth, student_id).await?;

    let bytes = render_transcript(&state, student_id).await?;
    let filename = filename_for(&state.db, student_id).await?;
    match store_copy(&state.config.transcript_dir, &filename, &bytes).await {
        Ok(path) => debug!("Stored Form 137 copy at {}", path.display()),
        Err(e) => warn!(
            "Failed to store Form 137 copy for student {} in {}: {}",
            student_id, state.config.transcript_dir, e
        ),
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(state.renderer.content_type()),
    );
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    info!("Form 137 for student {} generated ({} bytes)", student_id, bytes.len());
    Ok((headers, bytes.to_vec()))
}
