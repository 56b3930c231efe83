use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// JWT payload. The subject claim carries the username; `exp` is an absolute
/// unix timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// HS256 signing/verification keys derived once at startup from the
/// configured secret. Read-only for the process lifetime; passed to the
/// components that need it at construction time.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenKeys {
    #[must_use]
    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            security.secret_key.as_bytes(),
            Duration::minutes(security.token_ttl_minutes),
        )
    }

    #[must_use]
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Default leeway is 60s; expiry must be exact for short-lived tokens.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            default_ttl,
        }
    }

    /// Issue a signed bearer token for `subject`, valid for `ttl`
    /// (or the configured default when omitted).
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String> {
        let expires_at = Utc::now() + ttl.unwrap_or(self.default_ttl);
        let claims = Claims {
            sub: subject.to_string(),
            exp: usize::try_from(expires_at.timestamp())
                .map_err(|_| anyhow::anyhow!("Token expiry predates the unix epoch"))?,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("Failed to sign token: {e}"))
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// Every failure mode (bad signature, malformed payload, expired token)
    /// collapses to `None` so callers cannot leak which check failed.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Token rejected: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(b"unit-test-secret-key", Duration::minutes(30))
    }

    #[test]
    fn issued_token_roundtrips_subject() {
        let keys = keys();
        let token = keys.issue("alice", None).unwrap();
        let claims = keys.verify(&token).expect("fresh token should verify");
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn expired_token_is_invalid() {
        let keys = keys();
        let token = keys.issue("alice", Some(Duration::minutes(-5))).unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let keys = keys();
        let token = keys.issue("alice", None).unwrap();

        // Flip one byte of the base64 payload segment.
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        assert_eq!(parts.len(), 3);
        let mut payload = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();

        assert!(keys.verify(&parts.join(".")).is_none());
    }

    #[test]
    fn token_from_other_key_is_invalid() {
        let keys = keys();
        let other = TokenKeys::new(b"some-other-secret", Duration::minutes(30));
        let token = other.issue("alice", None).unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn garbage_is_invalid() {
        let keys = keys();
        assert!(keys.verify("not-a-token").is_none());
        assert!(keys.verify("").is_none());
        assert!(keys.verify("a.b.c").is_none());
    }
}
