//! Session model and backend payload parsing
//!
//! The backend answers login and refresh calls either with a bare object or
//! wrapped in a `{ "success": bool, "data": ... }` envelope. Both shapes are
//! accepted everywhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// An authenticated admin session
///
/// `access_token` is non-empty iff the session is authenticated.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to every request
    pub access_token: String,

    /// Long-lived token used to mint new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// User profile as returned by the backend
    #[serde(default)]
    pub user: Value,

    /// Employee record as returned by the backend
    #[serde(default)]
    pub employee: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            user: Value::Null,
            employee: Value::Null,
            company_id: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Build a session from a login response body.
    ///
    /// `company_id` is read from the payload itself, then from
    /// `employee.company_id`, then from `user.company_id`.
    ///
    /// # Errors
    /// Returns `PayloadError` if the envelope reports failure, the body is not
    /// an object, or any of `access_token`, `refresh_token`, `user` and
    /// `employee` is missing.
    pub fn from_login_payload(payload: Value) -> Result<Self, PayloadError> {
        let data = unwrap_envelope(payload)?;
        let object = data.as_object().ok_or(PayloadError::NotAnObject)?;

        let access_token = required_string(object, "access_token")?;
        let refresh_token = Some(required_string(object, "refresh_token")?);
        let user = required_value(object, "user")?;
        let employee = required_value(object, "employee")?;

        let company_id = id_field(object.get("company_id"))
            .or_else(|| id_field(employee.get("company_id")))
            .or_else(|| id_field(user.get("company_id")));

        Ok(Self { access_token, refresh_token, user, employee, company_id })
    }

    /// Apply a successful refresh. The refresh token only rotates when the
    /// backend issued a new one.
    pub fn apply_refresh(&mut self, tokens: &RefreshedTokens) {
        self.access_token.clone_from(&tokens.access_token);
        if let Some(refresh_token) = &tokens.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
    }
}

// Tokens never reach logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .field("employee", &self.employee)
            .field("company_id", &self.company_id)
            .finish()
    }
}

/// Credentials posted to the login endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Tokens returned by the refresh endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Present only when the backend rotated the refresh token
    pub refresh_token: Option<String>,
}

impl RefreshedTokens {
    /// Parse a refresh response body.
    ///
    /// # Errors
    /// Returns `PayloadError` if the envelope reports failure, the body is not
    /// an object, or `access_token` is missing.
    pub fn from_payload(payload: Value) -> Result<Self, PayloadError> {
        let data = unwrap_envelope(payload)?;
        let object = data.as_object().ok_or(PayloadError::NotAnObject)?;

        Ok(Self {
            access_token: required_string(object, "access_token")?,
            refresh_token: optional_string(object, "refresh_token"),
        })
    }
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("rotated", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Reasons a backend payload was unusable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    #[error("payload is missing `{0}`")]
    MissingField(&'static str),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Strip a `{ success, data }` envelope.
///
/// Bodies without a `success` flag are returned unchanged. An envelope with
/// `success: true` but no `data` is returned as-is.
///
/// # Errors
/// Returns `PayloadError::Rejected` when the envelope carries `success: false`.
pub fn unwrap_envelope(payload: Value) -> Result<Value, PayloadError> {
    let Value::Object(mut object) = payload else {
        return Ok(payload);
    };

    match object.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let message = object
                .get("message")
                .or_else(|| object.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("success flag was false")
                .to_string();
            Err(PayloadError::Rejected(message))
        }
        Some(true) => match object.remove("data") {
            Some(data) => Ok(data),
            None => Ok(Value::Object(object)),
        },
        None => Ok(Value::Object(object)),
    }
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, PayloadError> {
    optional_string(object, field).ok_or(PayloadError::MissingField(field))
}

fn required_value(object: &Map<String, Value>, field: &'static str) -> Result<Value, PayloadError> {
    object.get(field).filter(|v| !v.is_null()).cloned().ok_or(PayloadError::MissingField(field))
}

fn optional_string(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

// Company ids arrive as either strings or numbers
fn id_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
