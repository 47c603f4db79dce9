use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// Signed payload carried inside an anonymous session token
#[derive(Serialize, Deserialize)]
struct SessionClaims {
    sid: String,
    iat: String,
}

pub struct IssuedSession {
    pub token: String,
    pub session_id: String,
}

// Mints and verifies signed, stateless anonymous identities.
// No server-side session table; the HMAC is the only thing trusted.
pub struct IdentityIssuer {
    mac: HmacSha256,
}

impl IdentityIssuer {
    pub fn new(secret: &str) -> Self {
        let mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
        Self { mac }
    }

    // token = b64url(payload) + "." + b64url(hmac(payload))
    pub fn issue(&self) -> IssuedSession {
        let session_id = Uuid::new_v4().to_string();
        let claims = SessionClaims {
            sid: session_id.clone(),
            iat: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&claims).expect("claims are serializable");
        let mut mac = self.mac.clone();
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();
        let token = format!("{}.{}", URL_SAFE.encode(&payload), URL_SAFE.encode(signature));
        IssuedSession { token, session_id }
    }

    // Returns the embedded session id, or None for anything malformed,
    // tampered with, or signed under a different secret.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (payload_b64, signature_b64) = token.split_once('.')?;
        let payload = URL_SAFE.decode(payload_b64).ok()?;
        let signature = URL_SAFE.decode(signature_b64).ok()?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        // constant-time comparison
        mac.verify_slice(&signature).ok()?;

        let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;
        Some(claims.sid)
    }
}
