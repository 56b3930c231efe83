use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, TokenDto, UserDto};
use crate::db::User;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The resolved identity for the current request, inserted into request
/// extensions by [`auth_middleware`]. Resolved fresh on every request,
/// never cached across requests.
#[derive(Clone)]
pub struct CurrentUser(pub User);

// ============================================================================
// Middleware
// ============================================================================

/// Identity resolution for protected routes:
/// 1. extract the token from `Authorization: Bearer <token>`
/// 2. check signature and expiry
/// 3. look up the credential record by subject
/// 4. reject disabled accounts with a distinct signal
///
/// Any failure short-circuits before the protected handler runs.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens().verify(&token).ok_or(ApiError::Unauthorized)?;

    let user = state
        .store()
        .get_user_by_username(&claims.sub)
        .await
        .map_err(|e| ApiError::db(format!("Identity lookup failed: {e}")))?
        .ok_or(ApiError::Unauthorized)?;

    if !user.is_active {
        return Err(ApiError::AccountDisabled);
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/auth/login
/// Verify credentials and return a signed bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenDto>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // A missing user and a wrong password produce the same rejection.
    let is_valid = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::db(format!("Authentication error: {e}")))?;

    if !is_valid {
        return Err(ApiError::Unauthorized);
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::db(format!("Failed to get user: {e}")))?
        .ok_or(ApiError::Unauthorized)?;

    if !user.is_active {
        return Err(ApiError::AccountDisabled);
    }

    let access_token = state
        .tokens()
        .issue(&user.username, None)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(ApiResponse::success(TokenDto {
        access_token,
        token_type: "bearer".to_string(),
    })))
}

/// POST /api/v1/auth/register
/// Create a credential record. Responds with the public representation,
/// never the password or its hash.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    ensure_no_conflict(&state, &payload.username, &payload.email).await?;

    let user = state
        .store()
        .create_user(
            &payload.username,
            &payload.email,
            &payload.password,
            &state.config().security,
        )
        .await
        .map_err(|e| ApiError::user_write_error(&e))?;

    tracing::info!("Registered new user: {}", user.username);

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /api/v1/auth/me
/// Public representation of the authenticated user.
pub async fn get_current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}

// ============================================================================
// Validation helpers
// ============================================================================

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ApiError::validation(
            "Username must be between 3 and 50 characters",
        ));
    }
    Ok(())
}

/// Syntax check only; deliverability is not this layer's problem.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.is_empty()
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain.contains('.')
            && !email.contains(char::is_whitespace)
    });

    if !valid {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// Reject a username/email pair that collides with an existing record,
/// naming the colliding field.
pub async fn ensure_no_conflict(
    state: &AppState,
    username: &str,
    email: &str,
) -> Result<(), ApiError> {
    let existing = state
        .store()
        .get_user_by_username(username)
        .await
        .map_err(|e| ApiError::db(format!("Conflict check failed: {e}")))?;
    if existing.is_some() {
        return Err(ApiError::conflict("username"));
    }

    let existing = state
        .store()
        .get_user_by_email(email)
        .await
        .map_err(|e| ApiError::db(format!("Conflict check failed: {e}")))?;
    if existing.is_some() {
        return Err(ApiError::conflict("email"));
    }

    Ok(())
}
