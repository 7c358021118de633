use crate::auth::{issue_token, AuthUser, SESSION_COOKIE};
use crate::error::ApiError;
use crate::handlers::users::{load_user_response, UserResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Json,
};
use compute::credentials::{verify_dummy_password, verify_password};
use model::entities::user;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Credentials for opening a session
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Session token, also set as the `jwt` cookie
    pub token: String,
    pub user: UserResponse,
}

fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    ))
    .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Open a session
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<LoginResponse>>), ApiError> {
    trace!("Entering login function");
    request.validate()?;

    let account = user::Entity::find()
        .filter(user::Column::Username.eq(request.username.as_str()))
        .one(&state.db)
        .await?;

    let verified = match &account {
        Some(account) => verify_password(&request.password, &account.password_hash),
        None => verify_dummy_password(&request.password),
    };
    let account = match account {
        Some(account) if verified && account.is_active => account,
        Some(_) => {
            warn!("Failed login for '{}'", request.username);
            return Err(ApiError::Unauthenticated("Invalid credentials".to_string()));
        }
        None => {
            debug!("Login for unknown user '{}'", request.username);
            return Err(ApiError::Unauthenticated("Invalid credentials".to_string()));
        }
    };

    let token = issue_token(&account, &state.config)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&token, state.config.token_ttl_minutes * 60)?,
    );

    info!("User {} logged in as {}", account.id, account.role);
    let user = load_user_response(&state.db, account).await?;
    Ok((
        headers,
        Json(ApiResponse::ok(LoginResponse { token, user }, "Logged in successfully")),
    ))
}

/// Close the current session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, HeaderMap, Json<ApiResponse<String>>), ApiError> {
    state.revoked_tokens.insert(auth.token.clone(), ()).await;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session_cookie("", 0)?);

    info!("User {} logged out", auth.id);
    Ok((
        StatusCode::OK,
        headers,
        Json(ApiResponse::ok(auth.username, "Logged out successfully")),
    ))
}

/// Current account
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let account = user::Entity::find_by_id(auth.id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let user = load_user_response(&state.db, account).await?;
    Ok(Json(ApiResponse::ok(user, "User retrieved successfully")))
}
