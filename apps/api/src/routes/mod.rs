pub mod handlers;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/optimize", post(handlers::handle_optimize))
        .route(
            "/api/v1/transactions",
            get(handlers::handle_list_transactions),
        )
        .route(
            "/api/v1/transactions/:id",
            get(handlers::handle_get_transaction),
        )
        .route(
            "/api/v1/transactions/:id/download/:artifact",
            get(handlers::handle_download),
        )
        .with_state(state)
}
