//! Thin `axum` read surface over the timeline pipeline: the two GET
//! routes and the OAuth callback documented alongside this crate.
//! Exists to let the pipeline be exercised end-to-end, not to be a
//! general API gateway -- profile/account CRUD lives outside this core.

pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use timeline_core::AppConfig;
use timeline_crypto::PayloadEncryptor;
use timeline_store::{MetadataStore, SnapshotStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<dyn MetadataStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub encryptor: Arc<PayloadEncryptor>,
    pub http: Client,
    pub config: Arc<AppConfig>,
}

/// Builds the router: bearer-auth middleware guards the two timeline
/// routes; the OAuth callback stays public since the state parameter
/// itself carries the caller's identity.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/timeline/{user_id}", get(routes::get_timeline))
        .route("/timeline/{user_id}/raw/{platform}", get(routes::get_raw_snapshot))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key));

    let public = Router::new().route("/oauth/{platform}/callback", get(routes::oauth_callback));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
