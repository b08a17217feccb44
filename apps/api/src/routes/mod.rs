pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/analyze-resume",
            post(handlers::handle_analyze_resume),
        )
        .route(
            "/api/v1/resume-question",
            post(handlers::handle_resume_question),
        )
        .route(
            "/api/v1/sessions/:session_id",
            get(handlers::handle_get_session),
        )
        .with_state(state)
}
