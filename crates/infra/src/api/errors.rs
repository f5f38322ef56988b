//! API-specific error types
//!
//! Every variant is `Clone + PartialEq` so a single refresh outcome can be
//! handed to every request waiting on it.

use std::time::Duration;

use adminhub_common::{PayloadError, StorageError};
use adminhub_domain::AdminHubError;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Session missing, expired or rejected
    Authentication,
    /// Refresh failed; the session has been cleared
    Refresh,
    /// Connection failures and timeouts
    Network,
    /// Non-401 HTTP status from the backend
    Http,
    /// Local input, decoding or configuration problems
    Client,
    /// Local storage failures
    Internal,
}

/// API operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Access token expired locally and there is no refresh token to renew it
    #[error("Session expired: {0}")]
    AuthExpired(String),

    /// Backend answered 401 and the request could not be recovered
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token refresh rejected: {0}")]
    RefreshInvalid(String),

    #[error("Malformed refresh response: {0}")]
    MalformedRefreshResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Any non-401 error status, passed through untouched
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::AuthExpired(_) | Self::Unauthorized(_) | Self::NotAuthenticated => {
                ApiErrorCategory::Authentication
            }
            Self::RefreshInvalid(_) | Self::MalformedRefreshResponse(_) => {
                ApiErrorCategory::Refresh
            }
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Http { .. } => ApiErrorCategory::Http,
            Self::Decode(_) | Self::Config(_) => ApiErrorCategory::Client,
            Self::Storage(_) => ApiErrorCategory::Internal,
        }
    }

    /// Whether this failure ended the session
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthExpired(_) | Self::RefreshInvalid(_) | Self::MalformedRefreshResponse(_)
        )
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub(crate) fn from_refresh_payload(err: PayloadError) -> Self {
        match err {
            PayloadError::Rejected(message) => Self::RefreshInvalid(message),
            other => Self::MalformedRefreshResponse(other.to_string()),
        }
    }

    /// Re-tag an error raised while refreshing. Every refresh failure ends
    /// the session, so it always surfaces as a refresh kind with the
    /// original message kept.
    pub(crate) fn into_refresh_failure(self) -> Self {
        match self {
            Self::RefreshInvalid(_) | Self::MalformedRefreshResponse(_) => self,
            Self::Decode(message) => Self::MalformedRefreshResponse(message),
            other => Self::RefreshInvalid(other.to_string()),
        }
    }
}

impl From<AdminHubError> for ApiError {
    fn from(err: AdminHubError) -> Self {
        match err {
            AdminHubError::Network(msg) => Self::Network(msg),
            AdminHubError::Timeout(msg) => Self::Network(format!("timed out: {msg}")),
            AdminHubError::Auth(msg) => Self::Unauthorized(msg),
            AdminHubError::Storage(msg) => Self::Storage(msg),
            AdminHubError::Config(msg) => Self::Config(msg),
            AdminHubError::InvalidInput(msg) | AdminHubError::Internal(msg) => Self::Decode(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<ApiError> for AdminHubError {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err.category() {
            ApiErrorCategory::Authentication | ApiErrorCategory::Refresh => Self::Auth(message),
            ApiErrorCategory::Network => match err {
                ApiError::Timeout(_) => Self::Timeout(message),
                _ => Self::Network(message),
            },
            ApiErrorCategory::Http => Self::Network(message),
            ApiErrorCategory::Client => match err {
                ApiError::Config(_) => Self::Config(message),
                _ => Self::InvalidInput(message),
            },
            ApiErrorCategory::Internal => Self::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ApiError::AuthExpired("test".to_string()).category(),
            ApiErrorCategory::Authentication
        );
        assert_eq!(
            ApiError::MalformedRefreshResponse("test".to_string()).category(),
            ApiErrorCategory::Refresh
        );
        assert_eq!(ApiError::Timeout(Duration::from_secs(10)).category(), ApiErrorCategory::Network);
        assert_eq!(
            ApiError::Http { status: 500, message: "boom".to_string() }.category(),
            ApiErrorCategory::Http
        );
    }

    #[test]
    fn test_session_terminal_errors() {
        assert!(ApiError::RefreshInvalid("revoked".to_string()).is_session_terminal());
        assert!(ApiError::AuthExpired("expired".to_string()).is_session_terminal());
        assert!(!ApiError::Network("down".to_string()).is_session_terminal());
        assert!(!ApiError::Http { status: 403, message: String::new() }.is_session_terminal());
    }

    #[test]
    fn test_refresh_payload_mapping() {
        assert_eq!(
            ApiError::from_refresh_payload(PayloadError::Rejected("revoked".to_string())),
            ApiError::RefreshInvalid("revoked".to_string())
        );
        assert!(matches!(
            ApiError::from_refresh_payload(PayloadError::MissingField("access_token")),
            ApiError::MalformedRefreshResponse(_)
        ));
    }

    #[test]
    fn test_refresh_failures_keep_message_and_end_session() {
        let server = ApiError::Http { status: 502, message: "Bad Gateway".to_string() };
        assert_eq!(
            server.into_refresh_failure(),
            ApiError::RefreshInvalid("HTTP 502: Bad Gateway".to_string())
        );

        let timeout = ApiError::Timeout(Duration::from_secs(10)).into_refresh_failure();
        assert!(matches!(&timeout, ApiError::RefreshInvalid(m) if m.contains("Timeout")));

        let body = ApiError::Decode("expected value at line 1".to_string()).into_refresh_failure();
        assert_eq!(body, ApiError::MalformedRefreshResponse("expected value at line 1".to_string()));

        for err in [timeout, body, ApiError::Network("refused".to_string()).into_refresh_failure()] {
            assert!(err.is_session_terminal(), "{err:?} should be terminal");
            assert_eq!(err.category(), ApiErrorCategory::Refresh);
        }
    }

    #[test]
    fn test_domain_round_trip_keeps_kind() {
        let domain: AdminHubError = ApiError::Timeout(Duration::from_secs(10)).into();
        assert!(matches!(domain, AdminHubError::Timeout(_)));

        let api: ApiError = AdminHubError::Network("refused".to_string()).into();
        assert_eq!(api, ApiError::Network("refused".to_string()));
    }
}
