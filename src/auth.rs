use async_trait::async_trait;
use tracing::warn;

// The auth collaborator answers exactly one question: is this bearer
// token a currently-valid authenticated session. It is only used to
// bypass anonymous gating, never consulted for quota state.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn is_valid(&self, bearer: &str) -> bool;
}

// Asks the auth service over HTTP. Any transport failure or non-2xx
// answer counts as not authenticated, so the caller falls back to
// anonymous gating instead of being rejected.
pub struct HttpAuthVerifier {
    client: reqwest::Client,
    url: String,
}

impl HttpAuthVerifier {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl AuthVerifier for HttpAuthVerifier {
    async fn is_valid(&self, bearer: &str) -> bool {
        match self.client.get(&self.url).bearer_auth(bearer).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                warn!("auth service unreachable: {e}");
                false
            }
        }
    }
}

// Used when no auth service is configured: everyone is anonymous
pub struct DisabledAuth;

#[async_trait]
impl AuthVerifier for DisabledAuth {
    async fn is_valid(&self, _bearer: &str) -> bool {
        false
    }
}
