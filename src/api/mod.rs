use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::TokenKeys;
use crate::config::Config;
use crate::db::Store;

pub mod auth;
mod error;
mod items;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,

    store: Store,

    tokens: TokenKeys,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }
}

/// Build the shared application state: database pool plus signing keys,
/// both constructed once and read-only afterwards.
pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = TokenKeys::from_config(&config.security);

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        tokens,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", api_router)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", put(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/items", get(items::list_items))
        .route("/items", post(items::create_item))
        .route("/items/{id}", get(items::get_item))
        .route("/items/{id}", put(items::update_item))
        .route("/items/{id}", delete(items::delete_item))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

/// GET / - welcome page
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "stash API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health - liveness plus a store round-trip
async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::db(format!("Health check failed: {e}")))?;

    Ok(Json(serde_json::json!({ "status": "healthy" })))
}
