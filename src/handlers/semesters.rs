use crate::auth::{AuthUser, ADMIN_ROLES};
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use compute::archive::archive_ended_semesters;
use model::entities::semester;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_date_range"))]
pub struct SemesterRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub strand_id: i32,
    pub year_level_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_date_range(request: &SemesterRequest) -> Result<(), ValidationError> {
    if request.start_date > request.end_date {
        return Err(ValidationError::new("start_date_after_end_date"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SemesterResponse {
    pub id: i32,
    pub name: String,
    pub strand_id: i32,
    pub year_level_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<semester::Model> for SemesterResponse {
    fn from(model: semester::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            strand_id: model.strand_id,
            year_level_id: model.year_level_id,
            start_date: model.start_date,
            end_date: model.end_date,
            archived_at: model.archived_at,
        }
    }
}

/// Archive cutoff; semesters ending strictly before `today` are archived
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ArchiveRequest {
    /// Defaults to the current UTC date
    pub today: Option<NaiveDate>,
}

/// List semesters that are not archived
#[utoipa::path(
    get,
    path = "/api/v1/semesters",
    tag = "semesters",
    responses(
        (status = 200, description = "Active semesters", body = ApiResponse<Vec<SemesterResponse>>),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
#[instrument(skip(state, _auth))]
pub async fn get_active_semesters(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SemesterResponse>>>, ApiError> {
    let semesters = semester::Entity::find()
        .filter(semester::Column::ArchivedAt.is_null())
        .order_by_asc(semester::Column::StartDate)
        .order_by_asc(semester::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} active semesters", semesters.len());
    let semesters = semesters.into_iter().map(SemesterResponse::from).collect();
    Ok(Json(ApiResponse::ok(semesters, "Semesters retrieved successfully")))
}

/// Create a semester
#[utoipa::path(
    post,
    path = "/api/v1/admin/semesters",
    tag = "semesters",
    request_body = SemesterRequest,
    responses(
        (status = 201, description = "Semester created", body = ApiResponse<SemesterResponse>),
        (status = 400, description = "Start date after end date", body = ErrorResponse),
        (status = 409, description = "Unknown strand or year level", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn create_semester(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SemesterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SemesterResponse>>), ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let created = semester::ActiveModel {
        name: Set(request.name.trim().to_string()),
        strand_id: Set(request.strand_id),
        year_level_id: Set(request.year_level_id),
        start_date: Set(request.start_date),
        end_date: Set(request.end_date),
        archived_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    info!("Semester {} created", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SemesterResponse::from(created), "Semester created successfully")),
    ))
}

/// Update a semester
#[utoipa::path(
    put,
    path = "/api/v1/admin/semesters/{semester_id}",
    tag = "semesters",
    params(("semester_id" = i32, Path, description = "Semester ID")),
    request_body = SemesterRequest,
    responses(
        (status = 200, description = "Semester updated", body = ApiResponse<SemesterResponse>),
        (status = 404, description = "Semester not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_semester(
    Path(semester_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SemesterRequest>,
) -> Result<Json<ApiResponse<SemesterResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    let existing = semester::Entity::find_by_id(semester_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Semester not found".to_string()))?;

    let mut active: semester::ActiveModel = existing.into();
    active.name = Set(request.name.trim().to_string());
    active.strand_id = Set(request.strand_id);
    active.year_level_id = Set(request.year_level_id);
    active.start_date = Set(request.start_date);
    active.end_date = Set(request.end_date);
    let updated = active.update(&state.db).await?;

    // Semester names and ordering appear on transcripts
    state.cache.invalidate_all().await;
    Ok(Json(ApiResponse::ok(SemesterResponse::from(updated), "Semester updated successfully")))
}

/// Delete a semester
#[utoipa::path(
    delete,
    path = "/api/v1/admin/semesters/{semester_id}",
    tag = "semesters",
    params(("semester_id" = i32, Path, description = "Semester ID")),
    responses(
        (status = 204, description = "Semester deleted"),
        (status = 404, description = "Semester not found", body = ErrorResponse),
        (status = 409, description = "Semester has recorded grades", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn delete_semester(
    Path(semester_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let result = semester::Entity::delete_by_id(semester_id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Semester not found".to_string()));
    }
    info!("Semester {} deleted", semester_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Archive every semester that has ended
#[utoipa::path(
    post,
    path = "/api/v1/admin/semesters/archive",
    tag = "semesters",
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Semesters archived by this call", body = ApiResponse<Vec<SemesterResponse>>)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn archive_semesters(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ArchiveRequest>,
) -> Result<Json<ApiResponse<Vec<SemesterResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
    let archived = archive_ended_semesters(&state.db, today).await?;
    info!("Archived {} semesters ending before {}", archived.len(), today);
    let archived = archived.into_iter().map(SemesterResponse::from).collect();
    Ok(Json(ApiResponse::ok(archived, "Semesters archived successfully")))
}

/// List archived semesters
#[utoipa::path(
    get,
    path = "/api/v1/admin/archived-semesters",
    tag = "semesters",
    responses(
        (status = 200, description = "Archived semesters", body = ApiResponse<Vec<SemesterResponse>>)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_archived_semesters(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<SemesterResponse>>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let semesters = semester::Entity::find()
        .filter(semester::Column::ArchivedAt.is_not_null())
        .order_by_desc(semester::Column::EndDate)
        .all(&state.db)
        .await?;
    let semesters = semesters.into_iter().map(SemesterResponse::from).collect();
    Ok(Json(ApiResponse::ok(semesters, "Archived semesters retrieved successfully")))
}
