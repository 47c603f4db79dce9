use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cost::CostDenied;
use crate::ledger::QuotaDenied;
use crate::metrics::{DENIED_BURST, DENIED_GLOBAL, DENIED_QUOTA};
use crate::models::RateLimitInfo;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-anonymous-session";

// First X-Forwarded-For hop is the original client; X-Real-IP is what
// nginx sets when there is a single proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    "unknown".to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// What a request holds after clearing the anonymous gates
pub struct Passport {
    pub ip: String,
    pub session_id: String,
    // set when the client presented no valid token and we minted one
    pub fresh_token: Option<String>,
}

pub enum Gate {
    // valid authenticated session; anonymous gating does not apply
    Bypass,
    Anonymous(Passport),
}

#[derive(Debug, Error)]
pub enum GateDenial {
    #[error("too many requests in the last minute")]
    Burst,
    #[error("service-wide anonymous budget exhausted")]
    GlobalCap,
    #[error("daily quota reached")]
    Quota {
        denied: QuotaDenied,
        info: RateLimitInfo,
        fresh_token: Option<String>,
    },
}

// The gate for anonymous access, in the order the limits compose:
// burst first (cheapest caller misbehavior), then the service-wide
// cap (a drained budget rejects everyone uniformly), then the
// per-caller quota. Consumption is recorded as soon as all three
// pass, before the slow upstream call begins.
pub async fn enforce(state: &AppState, headers: &HeaderMap) -> Result<Gate, GateDenial> {
    if let Some(token) = bearer_token(headers) {
        if state.auth.is_valid(token).await {
            return Ok(Gate::Bypass);
        }
        // invalid bearer degrades to anonymous gating
    }

    let ip = client_ip(headers);

    // A forged or malformed session token is not an error; the caller
    // simply gets a fresh identity.
    let presented = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let (session_id, fresh_token) = match presented.and_then(|t| state.sessions.verify(t)) {
        Some(sid) => (sid, None),
        None => {
            let issued = state.sessions.issue();
            (issued.session_id, Some(issued.token))
        }
    };

    if state.burst.check(&ip) {
        DENIED_BURST.inc();
        return Err(GateDenial::Burst);
    }
    if state.global_cap.check() {
        DENIED_GLOBAL.inc();
        return Err(GateDenial::GlobalCap);
    }
    if let Err(denied) = state.ledger.check(&ip, Some(&session_id)) {
        DENIED_QUOTA.inc();
        let info = state.ledger.info(&ip, Some(&session_id));
        return Err(GateDenial::Quota {
            denied,
            info,
            fresh_token,
        });
    }

    // rejected requests never reach this point, so they are never charged
    state.ledger.increment(&ip, Some(&session_id));
    state.global_cap.increment();
    state.burst.record(&ip);

    Ok(Gate::Anonymous(Passport {
        ip,
        session_id,
        fresh_token,
    }))
}

// X-RateLimit-* headers, plus the fresh session token when one was minted
pub fn rate_limit_headers(info: &RateLimitInfo, fresh_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(info.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(info.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(info.reset));
    headers.insert("x-ratelimit-used", HeaderValue::from(info.used));
    if let Some(token) = fresh_token {
        if let Ok(value) = HeaderValue::from_str(token) {
            headers.insert(SESSION_HEADER, value);
        }
    }
    headers
}

impl IntoResponse for GateDenial {
    fn into_response(self) -> Response {
        match self {
            GateDenial::Burst => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests",
                    "message": "Too many requests. Please wait a moment.",
                    "code": "burst_limit_exceeded",
                })),
            )
                .into_response(),
            GateDenial::GlobalCap => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Service busy",
                    "message": "Service is experiencing high demand. Please try again later.",
                    "code": "global_limit_exceeded",
                })),
            )
                .into_response(),
            GateDenial::Quota {
                denied,
                info,
                fresh_token,
            } => {
                let headers = rate_limit_headers(&info, fresh_token.as_deref());
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    headers,
                    Json(json!({
                        "detail": "Daily AI query limit reached",
                        "code": "rate_limit_exceeded",
                        "queries_used": denied.used,
                        "queries_limit": denied.limit,
                        "reset_at": denied.reset_at.to_rfc3339(),
                        "message": "Sign up for a free account to get unlimited AI queries!",
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl IntoResponse for CostDenied {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded",
                "message": self.message,
                "code": "cost_limit_exceeded",
                "daily_limit_cents": self.limit_cents,
                "remaining_cents": self.remaining_cents,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::header::HeaderName::try_from(*name).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn forwarded_for_chain_uses_the_first_hop() {
        let map = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_ip(&map), "203.0.113.7");
    }

    #[test]
    fn real_ip_is_second_choice() {
        let map = headers(&[("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&map), "198.51.100.4");
    }

    #[test]
    fn unattributable_requests_share_one_bucket() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn empty_forwarded_entry_falls_through() {
        let map = headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "198.51.100.4")]);
        assert_eq!(client_ip(&map), "198.51.100.4");
    }

    #[test]
    fn bearer_token_requires_the_scheme_prefix() {
        let map = headers(&[("authorization", "Bearer abc123")]);
        assert_eq!(bearer_token(&map), Some("abc123"));
        let map = headers(&[("authorization", "Basic abc123")]);
        assert_eq!(bearer_token(&map), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
