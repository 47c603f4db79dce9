mod agents;
mod charts;
mod health;
mod metrics;


use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/charts/suggest", post(charts::suggest_chart_handler))
        .route(
            "/api/agents/marketing/strategy",
            post(agents::marketing_handler),
        )
        .route(
            "/api/agents/content/generate",
            post(agents::content_handler),
        )
        .route("/api/agents/pipeline", post(agents::pipeline_handler))
        .route("/api/agents/usage", get(agents::usage_handler))
        .with_state(state)
}
