//! Request descriptors and buffered responses
//!
//! A request is kept as plain data so it can be replayed after a token
//! refresh; the response body is read once and kept in memory.

use adminhub_common::auth::unwrap_envelope;
use adminhub_common::PayloadError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::errors::ApiError;

/// A replayable API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("Failed to serialize body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {e}")))?
            .to_vec();
        Ok(Self { status, headers, body })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the bare body. Empty bodies decode from `null`.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.value()?).map_err(|e| {
            ApiError::Decode(format!(
                "Failed to parse response ({}): {}",
                self.status.as_u16(),
                e
            ))
        })
    }

    /// Decode the `data` of a `{ success, data }` envelope, or the bare body.
    ///
    /// # Errors
    /// Returns `ApiError::Decode` if the envelope reports failure or the data
    /// does not match `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let data = unwrap_envelope(self.value()?).map_err(|e| match e {
            PayloadError::Rejected(message) => {
                ApiError::Decode(format!("Backend reported failure: {message}"))
            }
            other => ApiError::Decode(other.to_string()),
        })?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response data: {e}")))
    }

    pub(crate) fn value(&self) -> Result<Value, ApiError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Decode(format!("Response is not JSON: {e}")))
    }

    /// Convert a non-success status into `ApiError::Http`.
    pub(crate) fn error_for_status(self) -> Result<Self, ApiError> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(ApiError::Http { status: self.status.as_u16(), message: self.error_message() })
    }

    /// Best-effort human message from an error body.
    pub(crate) fn error_message(&self) -> String {
        let from_body = self.value().ok().and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        });
        from_body.unwrap_or_else(|| {
            self.status.canonical_reason().unwrap_or("unknown status").to_string()
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(status: StatusCode, body: &str) -> Self {
        Self { status, headers: HeaderMap::new(), body: body.as_bytes().to_vec() }
    }
}
