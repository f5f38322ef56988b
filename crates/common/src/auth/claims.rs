//! Client-side access token inspection
//!
//! Decodes the payload segment of a JWT without verifying its signature. The
//! backend remains the authority on validity; this only lets the client skip
//! requests it already knows will be rejected and refresh ahead of time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Registered claims the client cares about
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Absolute expiry, if the token carries one
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Reasons a token payload could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("token is not a three-part JWT")]
    NotAJwt,

    #[error("token payload is not valid base64url: {0}")]
    Encoding(String),

    #[error("token payload is not valid JSON: {0}")]
    Payload(String),
}

/// Decode the claims segment of `token`.
///
/// # Errors
/// Returns `ClaimsError` if the token is not shaped like a JWT or its payload
/// cannot be decoded.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_header), Some(payload), Some(_signature)) if !payload.is_empty() => payload,
        _ => return Err(ClaimsError::NotAJwt),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClaimsError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload(e.to_string()))
}

/// Check whether `token` has expired as of now.
///
/// A token that cannot be decoded counts as expired. A token without an `exp`
/// claim never expires locally.
#[must_use]
pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, Utc::now())
}

/// Check whether `token` has expired as of `now`.
#[must_use]
pub fn is_token_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(claims) => match claims.exp {
            Some(exp) => exp.saturating_mul(1000) < now.timestamp_millis(),
            None => false,
        },
        Err(_) => true,
    }
}
