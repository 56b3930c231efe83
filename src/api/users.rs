use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{
    ensure_no_conflict, validate_email, validate_password, validate_username,
};
use super::{ApiError, ApiResponse, AppState, MessageResponse, Pagination, UserDto};
use crate::db::UserChanges;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state
        .store()
        .list_users(page.skip, page.limit)
        .await
        .map_err(|e| ApiError::db(format!("Failed to list users: {e}")))?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store()
        .get_user_by_id(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::not_found("User", &id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /api/v1/users
/// Same shape as registration, but behind authentication.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
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

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(username) = &payload.username {
        validate_username(username)?;

        let existing = state
            .store()
            .get_user_by_username(username)
            .await
            .map_err(|e| ApiError::db(format!("Conflict check failed: {e}")))?;
        if existing.is_some_and(|u| u.id != id) {
            return Err(ApiError::conflict("username"));
        }
    }

    if let Some(email) = &payload.email {
        validate_email(email)?;

        let existing = state
            .store()
            .get_user_by_email(email)
            .await
            .map_err(|e| ApiError::db(format!("Conflict check failed: {e}")))?;
        if existing.is_some_and(|u| u.id != id) {
            return Err(ApiError::conflict("email"));
        }
    }

    if let Some(password) = &payload.password {
        validate_password(password)?;
    }

    let changes = UserChanges {
        username: payload.username,
        email: payload.email,
        password: payload.password,
        is_active: payload.is_active,
    };

    let user = state
        .store()
        .update_user(&id, changes, &state.config().security)
        .await
        .map_err(|e| ApiError::user_write_error(&e))?
        .ok_or_else(|| ApiError::not_found("User", &id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /api/v1/users/{id}
/// Removing a record does not invalidate outstanding tokens; they die at
/// natural expiry and fail identity lookup in the meantime.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let deleted = state
        .store()
        .delete_user(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to delete user: {e}")))?;

    if !deleted {
        return Err(ApiError::not_found("User", &id));
    }

    tracing::info!("Deleted user {id}");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("User {id} deleted"),
    })))
}
