//! Lifelog: a personal tracker for activities, expenses and the tags that
//! group them.
//!
//! The library holds the domain rules (`usecase`), the storage contract and
//! its adapters (`store`), the REST transport (`api`, `auth`) and the
//! command-line client (`client`, `cli`). The two binaries are thin shells
//! around it.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod usecase;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::Authenticator;
use store::Repository;
use usecase::{EditingService, ListingService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub listing: ListingService,
    pub editing: EditingService,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, auth: Authenticator) -> Self {
        Self {
            listing: ListingService::new(repo.clone()),
            editing: EditingService::new(repo),
            auth: Arc::new(auth),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let authenticator = state.auth.clone();

    // API routes
    let api_routes = Router::new()
        // Tags
        .route("/tags", get(api::list_tags).post(api::create_tag))
        .route(
            "/tags/{id}",
            get(api::get_tag)
                .put(api::update_tag)
                .delete(api::delete_tag),
        )
        .route("/tags/{id}/expenses", get(api::tag_expenses))
        .route("/tags/{id}/activities", get(api::tag_activities))
        // Expenses
        .route("/expenses", get(api::list_expenses).post(api::create_expense))
        .route(
            "/expenses/{id}",
            get(api::get_expense)
                .put(api::update_expense)
                .delete(api::delete_expense),
        )
        // Activities
        .route(
            "/activities",
            get(api::list_activities).post(api::create_activity),
        )
        .route(
            "/activities/{id}",
            get(api::get_activity)
                .put(api::update_activity)
                .delete(api::delete_activity),
        )
        .route("/activities/{id}/expenses", get(api::activity_expenses))
        // Bearer token required
        .layer(middleware::from_fn(move |req, next| {
            auth::bearer_auth_layer(authenticator.clone(), req, next)
        }));

    // Login, refresh and health check (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(api::login))
        .route("/auth/refresh", post(api::refresh));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
