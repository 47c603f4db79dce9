use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::guard::{self, Gate};
use crate::metrics::{REQUEST_TOTAL, UPSTREAM_LATENCY};
use crate::state::AppState;
use crate::upstream::AgentOp;

// AI chart suggestion. Anonymous callers clear the burst, global and
// per-caller daily gates before the backend is touched; authenticated
// callers go straight through. The payload itself is opaque here —
// the backend owns its schema.
pub async fn suggest_chart_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    REQUEST_TOTAL.inc();

    let gate = match guard::enforce(&state, &headers).await {
        Ok(gate) => gate,
        Err(denial) => return denial.into_response(),
    };

    let start = Instant::now();
    let reply = state.backend.invoke(AgentOp::SuggestChart, payload).await;
    UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => return e.into_response(),
    };

    match gate {
        Gate::Bypass => Json(reply.result).into_response(),
        Gate::Anonymous(passport) => {
            let info = state.ledger.info(&passport.ip, Some(&passport.session_id));
            let rate_headers = guard::rate_limit_headers(&info, passport.fresh_token.as_deref());
            (rate_headers, Json(reply.result)).into_response()
        }
    }
}
