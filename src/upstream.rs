use async_trait::async_trait;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::AgentReply;

// Guarded operations the agent backend performs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentOp {
    SuggestChart,
    MarketingStrategy,
    ContentGeneration,
    Pipeline,
}

impl AgentOp {
    pub fn path(self) -> &'static str {
        match self {
            AgentOp::SuggestChart => "/api/charts/suggest",
            AgentOp::MarketingStrategy => "/api/agents/marketing/strategy",
            AgentOp::ContentGeneration => "/api/agents/content/generate",
            AgentOp::Pipeline => "/api/agents/pipeline",
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("agent backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

// The AI collaborators behind the gateway. Each reply carries the
// token counts the call actually consumed, which is what the cost
// meter records.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn invoke(&self, op: AgentOp, payload: Value) -> Result<AgentReply, UpstreamError>;
}

pub struct HttpAgentBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentBackend {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn invoke(&self, op: AgentOp, payload: Value) -> Result<AgentReply, UpstreamError> {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, op.path()))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json::<AgentReply>().await?)
    }
}
