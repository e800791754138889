// src/utils/token.rs

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AppError;

/// Payload of an account confirmation link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConfirmClaim {
    /// User ID being confirmed.
    pub confirm: i64,
}

/// Payload of an API bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthClaim {
    /// User ID the token authenticates as.
    pub id: i64,
}

/// Wire shape of every token: the caller's payload plus an expiry.
#[derive(Debug, Deserialize, Serialize)]
struct Signed<P> {
    #[serde(flatten)]
    payload: P,
    /// Issued at, Unix timestamp.
    iat: i64,
    /// Expiration time as Unix timestamp.
    exp: i64,
}

/// Issues and verifies signed, time-limited tokens.
///
/// The signing key is fixed at construction; tokens are HS256 JWTs whose
/// claims are the payload fields next to `iat`/`exp`.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs `payload` so that it expires `ttl_seconds` from now.
    pub fn issue<P: Serialize>(&self, payload: P, ttl_seconds: i64) -> Result<String, AppError> {
        self.issue_at(payload, ttl_seconds, Utc::now().timestamp())
    }

    /// Same as [`issue`](Self::issue) with an explicit clock reading.
    pub fn issue_at<P: Serialize>(
        &self,
        payload: P,
        ttl_seconds: i64,
        now: i64,
    ) -> Result<String, AppError> {
        let claims = Signed {
            payload,
            iat: now,
            exp: now + ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Returns the payload of a valid token.
    ///
    /// Bad signatures, malformed input, a payload of the wrong shape and
    /// expired tokens all yield `None`.
    pub fn verify<P: DeserializeOwned>(&self, token: &str) -> Option<P> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Same as [`verify`](Self::verify) with an explicit clock reading.
    pub fn verify_at<P: DeserializeOwned>(&self, token: &str, now: i64) -> Option<P> {
        // Expiry is checked below against `now`, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = match decode::<Signed<P>>(token, &self.decoding, &validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Rejected token: {}", e);
                return None;
            }
        };

        if now > data.claims.exp {
            tracing::debug!("Rejected expired token (exp={})", data.claims.exp);
            return None;
        }

        Some(data.claims.payload)
    }

    pub fn confirmation_token(&self, user_id: i64, ttl_seconds: i64) -> Result<String, AppError> {
        self.issue(ConfirmClaim { confirm: user_id }, ttl_seconds)
    }

    pub fn auth_token(&self, user_id: i64, ttl_seconds: i64) -> Result<String, AppError> {
        self.issue(AuthClaim { id: user_id }, ttl_seconds)
    }
}
