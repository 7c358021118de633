use crate::auth::{AuthUser, ADMIN_ROLES};
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use common::LedgerSemester;
use compute::access::find_active_student;
use compute::ledger::student_ledger;
use model::entities::student_profile;
use model::entities::user::Role;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Biographical fields printed on the Form 137 header
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 64))]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub last_name: String,
    /// Learner reference number
    #[validate(length(min = 1, max = 32))]
    pub lrn: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub guardian: Option<String>,
    pub school_year: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: i32,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub display_name: String,
    pub lrn: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub guardian: Option<String>,
    pub school_year: Option<String>,
}

impl From<student_profile::Model> for ProfileResponse {
    fn from(model: student_profile::Model) -> Self {
        let display_name = model.display_name();
        Self {
            user_id: model.user_id,
            first_name: model.first_name,
            middle_name: model.middle_name,
            last_name: model.last_name,
            display_name,
            lrn: model.lrn,
            birthdate: model.birthdate,
            sex: model.sex,
            address: model.address,
            guardian: model.guardian,
            school_year: model.school_year,
        }
    }
}

async fn load_profile(state: &AppState, student_id: i32) -> Result<ProfileResponse, ApiError> {
    student_profile::Entity::find_by_id(student_id)
        .one(&state.db)
        .await?
        .map(ProfileResponse::from)
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// Get a student's profile
#[utoipa::path(
    get,
    path = "/api/v1/admin/students/{student_id}/profile",
    tag = "students",
    params(("student_id" = i32, Path, description = "Student user ID")),
    responses(
        (status = 200, description = "Profile retrieved", body = ApiResponse<ProfileResponse>),
        (status = 404, description = "Student or profile not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_student_profile(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    find_active_student(&state.db, student_id).await?;
    let profile = load_profile(&state, student_id).await?;
    Ok(Json(ApiResponse::ok(profile, "Profile retrieved successfully")))
}

/// Create or replace a student's profile
#[utoipa::path(
    put,
    path = "/api/v1/admin/students/{student_id}/profile",
    tag = "students",
    params(("student_id" = i32, Path, description = "Student user ID")),
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ApiResponse<ProfileResponse>),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn upsert_student_profile(
    Path(student_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    request.validate()?;
    find_active_student(&state.db, student_id).await?;

    let existing = student_profile::Entity::find_by_id(student_id)
        .one(&state.db)
        .await?;
    let is_new = existing.is_none();
    let mut active = match existing {
        Some(profile) => student_profile::ActiveModel::from(profile),
        None => {
            debug!("Creating profile for student {}", student_id);
            student_profile::ActiveModel {
                user_id: Set(student_id),
                ..Default::default()
            }
        }
    };
    active.first_name = Set(request.first_name.trim().to_string());
    active.middle_name = Set(request.middle_name);
    active.last_name = Set(request.last_name.trim().to_string());
    active.lrn = Set(request.lrn);
    active.birthdate = Set(request.birthdate);
    active.sex = Set(request.sex);
    active.address = Set(request.address);
    active.guardian = Set(request.guardian);
    active.school_year = Set(request.school_year);
    let saved = if is_new {
        active.insert(&state.db).await?
    } else {
        active.update(&state.db).await?
    };

    state.cache.invalidate(&student_id).await;
    info!("Profile of student {} saved", student_id);
    Ok(Json(ApiResponse::ok(ProfileResponse::from(saved), "Profile saved successfully")))
}

/// The signed-in student's own profile
#[utoipa::path(
    get,
    path = "/api/v1/student/profile",
    tag = "students",
    responses(
        (status = 200, description = "Profile retrieved", body = ApiResponse<ProfileResponse>),
        (status = 403, description = "Caller is not a student", body = ErrorResponse),
        (status = 404, description = "No profile on record", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn get_own_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    auth.require(&[Role::Student])?;
    let profile = load_profile(&state, auth.id).await?;
    Ok(Json(ApiResponse::ok(profile, "Profile retrieved successfully")))
}

/// The signed-in student's own ledger
#[utoipa::path(
    get,
    path = "/api/v1/student/grades",
    tag = "students",
    responses(
        (status = 200, description = "Ledger retrieved", body = ApiResponse<Vec<LedgerSemester>>),
        (status = 403, description = "Caller is not a student", body = ErrorResponse),
        (status = 404, description = "No grades recorded", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn get_own_grades(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<LedgerSemester>>>, ApiError> {
    auth.require(&[Role::Student])?;
    let ledger = student_ledger(&state.db, auth.id).await?;
    debug!("Student {} has grades in {} semesters", auth.id, ledger.len());
    Ok(Json(ApiResponse::ok(ledger, "Grades retrieved successfully")))
}
