use crate::auth::{AuthUser, ADMIN_ROLES};
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use compute::credentials::hash_password;
use model::entities::user::Role;
use model::entities::{section, section_enrollment, subject, user, user_subject};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, error, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for creating a student or teacher account
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    /// `student` or `teacher`
    pub role: String,
    pub strand_id: Option<i32>,
    /// Section to enroll a student in
    pub section_id: Option<i32>,
    pub subject_ids: Option<Vec<i32>>,
}

/// Request body for updating an account; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub strand_id: Option<i32>,
    /// Moves a student to this section
    pub section_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// Replaces the subject list of an account
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SetSubjectsRequest {
    pub subject_ids: Vec<i32>,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct UserListQuery {
    /// Only accounts with this role
    pub role: Option<String>,
    /// Include deactivated accounts
    pub include_inactive: Option<bool>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub strand_id: Option<i32>,
    pub is_active: bool,
    /// Enrolled section for students; taught or advised sections for teachers
    pub section_ids: Vec<i32>,
    pub subject_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role.to_string(),
            strand_id: model.strand_id,
            is_active: model.is_active,
            section_ids: Vec::new(),
            subject_ids: Vec::new(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Section references of an account, computed from enrollments and
/// section assignments.
pub async fn section_ids_for<C: ConnectionTrait>(db: &C, account: &user::Model) -> Result<Vec<i32>, DbErr> {
    match account.role {
        Role::Student => Ok(section_enrollment::Entity::find_by_id(account.id)
            .one(db)
            .await?
            .map(|e| vec![e.section_id])
            .unwrap_or_default()),
        Role::Teacher => section::Entity::find()
            .select_only()
            .column(section::Column::Id)
            .filter(
                Condition::any()
                    .add(section::Column::TeacherId.eq(account.id))
                    .add(section::Column::AdviserId.eq(account.id)),
            )
            .order_by_asc(section::Column::Id)
            .into_tuple()
            .all(db)
            .await,
        Role::Admin | Role::Superadmin => Ok(Vec::new()),
    }
}

pub async fn subject_ids_for<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<i32>, DbErr> {
    user_subject::Entity::find()
        .select_only()
        .column(user_subject::Column::SubjectId)
        .filter(user_subject::Column::UserId.eq(user_id))
        .order_by_asc(user_subject::Column::SubjectId)
        .into_tuple()
        .all(db)
        .await
}

/// Builds the full response for an account, including its references.
pub async fn load_user_response(db: &DatabaseConnection, account: user::Model) -> Result<UserResponse, DbErr> {
    let section_ids = section_ids_for(db, &account).await?;
    let subject_ids = subject_ids_for(db, account.id).await?;
    let mut response = UserResponse::from(account);
    response.section_ids = section_ids;
    response.subject_ids = subject_ids;
    Ok(response)
}

/// Hashes a password off the async executor.
pub async fn hash_in_background(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}

/// Puts a student into a section, replacing any previous enrollment.
pub async fn assign_section<C: ConnectionTrait>(db: &C, student_id: i32, section_id: i32) -> Result<(), ApiError> {
    if section::Entity::find_by_id(section_id).one(db).await?.is_none() {
        return Err(ApiError::NotFound("Section not found".to_string()));
    }
    section_enrollment::Entity::delete_by_id(student_id).exec(db).await?;
    section_enrollment::ActiveModel {
        student_id: Set(student_id),
        section_id: Set(section_id),
    }
    .insert(db)
    .await?;
    debug!("Student {} enrolled in section {}", student_id, section_id);
    Ok(())
}

/// Replaces the subject links of an account.
pub async fn replace_subjects<C: ConnectionTrait>(db: &C, user_id: i32, subject_ids: &[i32]) -> Result<(), ApiError> {
    let mut unique: Vec<i32> = subject_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let found = subject::Entity::find()
        .filter(subject::Column::Id.is_in(unique.clone()))
        .count(db)
        .await?;
    if found != unique.len() as u64 {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    user_subject::Entity::delete_many()
        .filter(user_subject::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    for subject_id in unique {
        user_subject::ActiveModel {
            user_id: Set(user_id),
            subject_id: Set(subject_id),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Loads a student or teacher account; administrative accounts are managed
/// through the superadmin endpoints and are reported as not found here.
async fn find_managed_user(db: &DatabaseConnection, user_id: i32) -> Result<user::Model, ApiError> {
    match user::Entity::find_by_id(user_id).one(db).await? {
        Some(account) if !account.role.is_administrative() => Ok(account),
        Some(_) => {
            warn!("User {} is administrative, not managed here", user_id);
            Err(ApiError::NotFound("User not found".to_string()))
        }
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

/// Create a student or teacher account
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(username = %request.username))]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    trace!("Entering create_user function");
    auth.require(ADMIN_ROLES)?;
    request.validate()?;

    let role = Role::from_str(&request.role).map_err(ApiError::InvalidArgument)?;
    if role.is_administrative() {
        return Err(ApiError::UnauthorizedRole(
            "Admin accounts are created through the superadmin endpoints".to_string(),
        ));
    }
    if request.section_id.is_some() && role != Role::Student {
        return Err(ApiError::InvalidArgument(
            "Only students are enrolled in a section".to_string(),
        ));
    }

    let password_hash = hash_in_background(request.password.clone()).await?;
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let created = user::ActiveModel {
        username: Set(request.username.trim().to_string()),
        password_hash: Set(password_hash),
        role: Set(role),
        strand_id: Set(request.strand_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict(format!("Username '{}' already exists", request.username)),
        other => other,
    })?;

    if let Some(section_id) = request.section_id {
        assign_section(&txn, created.id, section_id).await?;
    }
    if let Some(subject_ids) = &request.subject_ids {
        replace_subjects(&txn, created.id, subject_ids).await?;
    }
    txn.commit().await?;

    info!("Created {} account {} ({})", created.role, created.id, created.username);
    let response = load_user_response(&state.db, created).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response, "User created successfully")),
    ))
}

/// List student and teacher accounts
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Role not allowed", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Valid(Query(query)): Valid<Query<UserListQuery>>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    trace!("Entering get_users function");
    auth.require(ADMIN_ROLES)?;

    let mut select = user::Entity::find()
        .filter(user::Column::Role.is_in([Role::Student, Role::Teacher]))
        .order_by_asc(user::Column::Id);
    if let Some(role) = &query.role {
        let role = Role::from_str(role).map_err(ApiError::InvalidArgument)?;
        select = select.filter(user::Column::Role.eq(role));
    }
    if !query.include_inactive.unwrap_or(false) {
        select = select.filter(user::Column::IsActive.eq(true));
    }
    select = select
        .offset(query.offset.unwrap_or(0))
        .limit(query.limit.unwrap_or(100));

    let users = select.all(&state.db).await?;
    debug!("Retrieved {} users from database", users.len());

    let mut responses = Vec::with_capacity(users.len());
    for account in users {
        responses.push(load_user_response(&state.db, account).await?);
    }

    info!("Successfully retrieved {} users", responses.len());
    Ok(Json(ApiResponse::ok(responses, "Users retrieved successfully")))
}

/// Get a student or teacher account
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let account = find_managed_user(&state.db, user_id).await?;
    let response = load_user_response(&state.db, account).await?;
    Ok(Json(ApiResponse::ok(response, "User retrieved successfully")))
}

/// Update a student or teacher account
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    trace!("Entering update_user function for user_id: {}", user_id);
    auth.require(ADMIN_ROLES)?;
    request.validate()?;

    let existing = find_managed_user(&state.db, user_id).await?;
    if request.section_id.is_some() && existing.role != Role::Student {
        return Err(ApiError::InvalidArgument(
            "Only students are enrolled in a section".to_string(),
        ));
    }

    let password_hash = match request.password.clone() {
        Some(password) => Some(hash_in_background(password).await?),
        None => None,
    };

    let txn = state.db.begin().await?;
    let mut active: user::ActiveModel = existing.into();
    let mut updated_fields = Vec::new();
    if let Some(username) = &request.username {
        active.username = Set(username.trim().to_string());
        updated_fields.push("username");
    }
    if let Some(hash) = password_hash {
        active.password_hash = Set(hash);
        updated_fields.push("password");
    }
    if let Some(strand_id) = request.strand_id {
        active.strand_id = Set(Some(strand_id));
        updated_fields.push("strand_id");
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
        updated_fields.push("is_active");
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    if let Some(section_id) = request.section_id {
        assign_section(&txn, updated.id, section_id).await?;
        updated_fields.push("section_id");
    }
    txn.commit().await?;

    debug!("Updated fields for user {}: {}", user_id, updated_fields.join(", "));
    // Names and sections appear on the transcript
    state.cache.invalidate(&user_id).await;

    let response = load_user_response(&state.db, updated).await?;
    info!("User {} updated", user_id);
    Ok(Json(ApiResponse::ok(response, "User updated successfully")))
}

/// Deactivate a student or teacher account
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{user_id}",
    tag = "admin",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn deactivate_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let existing = find_managed_user(&state.db, user_id).await?;

    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    info!("User {} deactivated by {}", user_id, auth.id);
    let response = load_user_response(&state.db, updated).await?;
    Ok(Json(ApiResponse::ok(response, "User deactivated successfully")))
}

/// Replace the subject list of an account
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{user_id}/subjects",
    tag = "admin",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = SetSubjectsRequest,
    responses(
        (status = 200, description = "Subjects updated", body = ApiResponse<UserResponse>),
        (status = 404, description = "User or subject not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn set_user_subjects(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SetSubjectsRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let existing = find_managed_user(&state.db, user_id).await?;

    let txn = state.db.begin().await?;
    replace_subjects(&txn, user_id, &request.subject_ids).await?;
    txn.commit().await?;

    info!("User {} now linked to {} subjects", user_id, request.subject_ids.len());
    let response = load_user_response(&state.db, existing).await?;
    Ok(Json(ApiResponse::ok(response, "Subjects updated successfully")))
}
