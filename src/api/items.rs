use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, ItemDto, MessageResponse, Pagination};
use crate::db::ItemChanges;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let len = title.chars().count();
    if !(1..=100).contains(&len) {
        return Err(ApiError::validation(
            "Title must be between 1 and 100 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    if description.is_some_and(|d| d.chars().count() > 500) {
        return Err(ApiError::validation(
            "Description must be at most 500 characters",
        ));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ApiError::validation("Price must be greater than zero"));
    }
    Ok(())
}

/// GET /api/v1/items
/// Listing is open to any authenticated user; ownership only gates mutation.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<ItemDto>>>, ApiError> {
    let items = state
        .store()
        .list_items(page.skip, page.limit)
        .await
        .map_err(|e| ApiError::db(format!("Failed to list items: {e}")))?;

    Ok(Json(ApiResponse::success(
        items.into_iter().map(ItemDto::from).collect(),
    )))
}

/// GET /api/v1/items/{id}
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    let item = state
        .store()
        .get_item(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to get item: {e}")))?
        .ok_or_else(|| ApiError::not_found("Item", &id))?;

    Ok(Json(ApiResponse::success(ItemDto::from(item))))
}

/// POST /api/v1/items
/// The new item is owned by the caller.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    validate_title(&payload.title)?;
    validate_description(payload.description.as_deref())?;
    validate_price(payload.price)?;

    let item = state
        .store()
        .create_item(
            &payload.title,
            payload.description.as_deref(),
            payload.price,
            &user.id,
        )
        .await
        .map_err(|e| ApiError::db(format!("Failed to create item: {e}")))?;

    Ok(Json(ApiResponse::success(ItemDto::from(item))))
}

/// PUT /api/v1/items/{id}
/// Only the owner may modify an item.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemDto>>, ApiError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    validate_description(payload.description.as_deref())?;
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let item = state
        .store()
        .get_item(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to get item: {e}")))?
        .ok_or_else(|| ApiError::not_found("Item", &id))?;

    if item.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You do not own this item".to_string(),
        ));
    }

    let changes = ItemChanges {
        title: payload.title,
        description: payload.description,
        price: payload.price,
    };

    let item = state
        .store()
        .update_item(&id, changes)
        .await
        .map_err(|e| ApiError::db(format!("Failed to update item: {e}")))?
        .ok_or_else(|| ApiError::not_found("Item", &id))?;

    Ok(Json(ApiResponse::success(ItemDto::from(item))))
}

/// DELETE /api/v1/items/{id}
/// Only the owner may delete an item.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let item = state
        .store()
        .get_item(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to get item: {e}")))?
        .ok_or_else(|| ApiError::not_found("Item", &id))?;

    if item.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "You do not own this item".to_string(),
        ));
    }

    state
        .store()
        .delete_item(&id)
        .await
        .map_err(|e| ApiError::db(format!("Failed to delete item: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Item '{}' deleted", item.title),
    })))
}
