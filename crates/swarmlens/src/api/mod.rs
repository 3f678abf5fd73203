mod sessions;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use swarmlens_sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
}

pub fn create_router(store: Arc<SessionStore>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/api/sessions", get(sessions::list_sessions))
        .route("/api/sessions/{*id}", get(sessions::get_session))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
