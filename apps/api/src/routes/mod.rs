pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::document::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/generate-excel",
            post(handlers::handle_generate_excel),
        )
        .with_state(state)
}
