use serde::{Deserialize, Serialize};
use serde_json::Value;

// Token usage reported by the agent backend after a completed call
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub model: String,
}

// Reply envelope from the agent backend: the operation result plus
// the actual token usage for metering
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AgentReply {
    pub result: Value,
    pub usage: TokenUsage,
}

// Quota state exposed through X-RateLimit-* response headers
#[derive(Serialize, Clone, Copy, Debug)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64, // unix timestamp
    pub used: u32,
}

// Per-IP spend snapshot for the usage endpoint
#[derive(Serialize, Clone, Debug)]
pub struct CostStats {
    pub ip: String,
    pub date: String,
    pub cost_cents: f64,
    pub requests: u32,
    pub limit_cents: f64,
    pub remaining_cents: f64,
}
