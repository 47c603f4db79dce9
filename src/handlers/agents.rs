use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

use crate::guard;
use crate::metrics::{DENIED_COST, REQUEST_TOTAL, UPSTREAM_LATENCY};
use crate::state::AppState;
use crate::upstream::AgentOp;

// Pre-flight estimates per operation, in cents. True spend is
// recorded from the token counts the backend reports once the call
// completes; these only have to be close enough to gate with.
const MARKETING_ESTIMATE_CENTS: f64 = 1.0;
const CONTENT_ESTIMATE_CENTS: f64 = 0.5;
const PIPELINE_ESTIMATE_CENTS: f64 = 2.0;

async fn metered(
    state: &AppState,
    headers: &HeaderMap,
    op: AgentOp,
    estimate_cents: f64,
    payload: Value,
) -> Response {
    REQUEST_TOTAL.inc();
    let ip = guard::client_ip(headers);

    if let Err(denied) = state.cost.check(&ip, estimate_cents) {
        DENIED_COST.inc();
        return denied.into_response();
    }

    // no lock is held across this call
    let start = Instant::now();
    let reply = state.backend.invoke(op, payload).await;
    UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

    match reply {
        Ok(reply) => {
            // true-up with actual counts; a failed call records nothing
            let usage = &reply.usage;
            state
                .cost
                .record(&ip, usage.input_tokens, usage.output_tokens, &usage.model);
            Json(reply.result).into_response()
        }
        Err(e) => {
            warn!("agent backend call failed: {e}");
            e.into_response()
        }
    }
}

pub async fn marketing_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    metered(
        &state,
        &headers,
        AgentOp::MarketingStrategy,
        MARKETING_ESTIMATE_CENTS,
        payload,
    )
    .await
}

pub async fn content_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    metered(
        &state,
        &headers,
        AgentOp::ContentGeneration,
        CONTENT_ESTIMATE_CENTS,
        payload,
    )
    .await
}

pub async fn pipeline_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    metered(
        &state,
        &headers,
        AgentOp::Pipeline,
        PIPELINE_ESTIMATE_CENTS,
        payload,
    )
    .await
}

// read-only spend snapshot for the calling IP
pub async fn usage_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ip = guard::client_ip(&headers);
    Json(state.cost.stats(&ip)).into_response()
}
