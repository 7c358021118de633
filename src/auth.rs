//! Session tokens and the authenticated-caller extractor.
//!
//! A session is an HS256 JWT carried either as `Authorization: Bearer` or in
//! the `jwt` cookie. Every handler authorizes through [`AuthUser::require`],
//! which is the single role capability check of the service.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use model::entities::user::{self, Role};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::schemas::AppState;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: i32,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs a session token for `account`.
pub fn issue_token(account: &user::Model, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: account.id,
        username: account.username.clone(),
        role: account.role.as_str().to_string(),
        iat: now,
        exp: now + config.token_ttl_minutes.max(1) * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to sign session token: {}", e);
        ApiError::Internal(e.to_string())
    })
}

/// Verifies signature and expiry of a session token.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected session token: {}", e);
        ApiError::Unauthenticated("Invalid or expired token".to_string())
    })
}

/// Pulls the raw token from the bearer header, falling back to the cookie.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

/// The authenticated caller, loaded fresh from the store on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    /// Raw token, kept so logout can revoke it
    pub token: String,
}

impl AuthUser {
    /// Fails with `UnauthorizedRole` unless the caller holds one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        require_role(self.role, allowed)
    }
}

pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        warn!("Role {} is not allowed here", role);
        Err(ApiError::UnauthorizedRole(format!(
            "Role '{}' is not authorized for this action",
            role
        )))
    }
}

/// Admin endpoints accept both administrative roles.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthenticated("Not authorized, no token".to_string()))?;

        if state.revoked_tokens.contains_key(&token) {
            debug!("Rejected revoked session token");
            return Err(ApiError::Unauthenticated("Session has ended".to_string()));
        }

        let claims = decode_token(&token, &state.config.jwt_secret)?;
        let account = user::Entity::find_by_id(claims.sub)
            .one(&state.db)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| {
                warn!("Token for missing or deactivated account {}", claims.sub);
                ApiError::Unauthenticated("Account is not active".to_string())
            })?;

        Ok(AuthUser {
            id: account.id,
            username: account.username,
            role: account.role,
            token,
        })
    }
}
