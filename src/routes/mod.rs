mod api;
mod upload;

pub use api::{create_user, get_evaluation, list_user_evaluations, UserCreated};
pub use upload::upload_video;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Headroom on top of the video size limit for multipart framing and the
/// text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/users", post(create_user))
        .route(
            "/api/evaluations/upload",
            post(upload_video).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/evaluations/:id", get(get_evaluation))
        .route("/api/evaluations/user/:user_id", get(list_user_evaluations))
        .nest_service("/uploads", ServeDir::new(&state.config.upload_folder))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
