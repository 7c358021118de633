use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::users::{hash_in_background, UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use model::entities::user::{self, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateAdminRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateAdminRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

async fn find_admin(state: &AppState, admin_id: i32) -> Result<user::Model, ApiError> {
    match user::Entity::find_by_id(admin_id).one(&state.db).await? {
        Some(account) if account.role == Role::Admin => Ok(account),
        _ => {
            warn!("Admin {} not found", admin_id);
            Err(ApiError::NotFound("Admin not found".to_string()))
        }
    }
}

/// Create an admin account
#[utoipa::path(
    post,
    path = "/api/v1/superadmin/admins",
    tag = "superadmin",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = ApiResponse<UserResponse>),
        (status = 403, description = "Caller is not a superadmin", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request), fields(username = %request.username))]
pub async fn create_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    auth.require(&[Role::Superadmin])?;
    request.validate()?;

    let password_hash = hash_in_background(request.password.clone()).await?;
    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(request.username.trim().to_string()),
        password_hash: Set(password_hash),
        role: Set(Role::Admin),
        strand_id: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Superadmin {} created admin {}", auth.id, created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(created), "Admin created successfully")),
    ))
}

/// List admin accounts
#[utoipa::path(
    get,
    path = "/api/v1/superadmin/admins",
    tag = "superadmin",
    responses(
        (status = 200, description = "Admins retrieved", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Caller is not a superadmin", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn get_admins(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    auth.require(&[Role::Superadmin])?;
    let admins = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Admin))
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} admins", admins.len());
    let admins = admins.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::ok(admins, "Admins retrieved successfully")))
}

/// Update an admin account
#[utoipa::path(
    put,
    path = "/api/v1/superadmin/admins/{admin_id}",
    tag = "superadmin",
    params(("admin_id" = i32, Path, description = "Admin user ID")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Admin updated", body = ApiResponse<UserResponse>),
        (status = 404, description = "Admin not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth, request))]
pub async fn update_admin(
    Path(admin_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateAdminRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(&[Role::Superadmin])?;
    request.validate()?;
    let existing = find_admin(&state, admin_id).await?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(username) = &request.username {
        active.username = Set(username.trim().to_string());
    }
    if let Some(password) = request.password.clone() {
        active.password_hash = Set(hash_in_background(password).await?);
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    info!("Admin {} updated", admin_id);
    Ok(Json(ApiResponse::ok(UserResponse::from(updated), "Admin updated successfully")))
}

/// Deactivate an admin account
#[utoipa::path(
    delete,
    path = "/api/v1/superadmin/admins/{admin_id}",
    tag = "superadmin",
    params(("admin_id" = i32, Path, description = "Admin user ID")),
    responses(
        (status = 200, description = "Admin deactivated", body = ApiResponse<UserResponse>),
        (status = 404, description = "Admin not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth))]
pub async fn deactivate_admin(
    Path(admin_id): Path<i32>,
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    auth.require(&[Role::Superadmin])?;
    let existing = find_admin(&state, admin_id).await?;

    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    info!("Admin {} deactivated", admin_id);
    Ok(Json(ApiResponse::ok(UserResponse::from(updated), "Admin deactivated successfully")))
}
