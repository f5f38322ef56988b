//! JWT fixtures
//!
//! Tokens are unsigned (`alg: none`) and only meant for client-side expiry
//! checks. Each one carries a unique `jti` so two fixtures never compare
//! equal by accident.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};

static NEXT_JTI: AtomicU64 = AtomicU64::new(1);

/// Build a token around arbitrary claims.
pub fn jwt_with_claims(mut claims: Value) -> String {
    if let Some(object) = claims.as_object_mut() {
        object
            .entry("jti")
            .or_insert_with(|| json!(NEXT_JTI.fetch_add(1, Ordering::Relaxed)));
    }

    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.fixture")
}

/// Token expiring at `exp` (seconds since the epoch).
pub fn jwt_with_exp(exp: i64) -> String {
    jwt_with_claims(json!({ "sub": "1", "exp": exp }))
}

/// Token expiring `secs` seconds from now. Negative values are in the past.
pub fn jwt_expiring_in(secs: i64) -> String {
    jwt_with_exp(Utc::now().timestamp() + secs)
}

/// Token that expired an hour ago.
pub fn expired_jwt() -> String {
    jwt_expiring_in(-3600)
}

/// Token valid for the next hour.
pub fn valid_jwt() -> String {
    jwt_expiring_in(3600)
}
