use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Pattern discovery
        .route("/patterns/discover", post(handlers::discover_patterns))

        // Recurring block lifecycle
        .route("/blocks", post(handlers::create_block))
        .route("/blocks/renewable", get(handlers::list_renewable))
        .route("/blocks/renew", post(handlers::renew_block))
        .route("/appointments/{appointment_id}/dismiss-renewal", post(handlers::dismiss_renewal))

        .with_state(state)
}
