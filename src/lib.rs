//! Journal Query
//!
//! Read-side query layer over a versioned, multi-locale article repository,
//! served over a small JSON REST API with SQLite persistence.

pub mod api;
pub mod collab;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod observe;
pub mod query;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use query::QueryService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/articles", get(api::list_articles))
        .route("/articles/{group_id}/{article_id}", get(api::get_article))
        .route("/tags/{tag}/articles", get(api::articles_by_tag))
        .route("/categories/{category}/articles", get(api::articles_by_category))
        .route("/search", get(api::search_articles));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
