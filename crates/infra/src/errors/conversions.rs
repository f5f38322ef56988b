//! Conversions from external infrastructure errors into domain errors.

use adminhub_common::StorageError;
use adminhub_domain::AdminHubError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AdminHubError);

impl From<InfraError> for AdminHubError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AdminHubError> for InfraError {
    fn from(value: AdminHubError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAdminHubError {
    fn into_adminhub(self) -> AdminHubError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AdminHubError */
/* -------------------------------------------------------------------------- */

impl IntoAdminHubError for HttpError {
    fn into_adminhub(self) -> AdminHubError {
        if self.is_timeout() {
            return AdminHubError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return AdminHubError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return AdminHubError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => AdminHubError::Auth(message),
                400..=499 => AdminHubError::InvalidInput(message),
                _ => AdminHubError::Network(message),
            };
        }

        AdminHubError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_adminhub())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → AdminHubError */
/* -------------------------------------------------------------------------- */

impl IntoAdminHubError for std::io::Error {
    fn into_adminhub(self) -> AdminHubError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => AdminHubError::Config(format!("file not found: {self}")),
            ErrorKind::PermissionDenied => {
                AdminHubError::Storage(format!("permission denied: {self}"))
            }
            ErrorKind::TimedOut => AdminHubError::Timeout(self.to_string()),
            _ => AdminHubError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_adminhub())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → AdminHubError */
/* -------------------------------------------------------------------------- */

impl IntoAdminHubError for StorageError {
    fn into_adminhub(self) -> AdminHubError {
        AdminHubError::Storage(self.to_string())
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_adminhub())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: AdminHubError = InfraError::from(error).into();
        match mapped {
            AdminHubError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn refused_connection_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: AdminHubError = InfraError::from(error).into();
        assert!(matches!(mapped, AdminHubError::Network(_)), "got {mapped:?}");
    }

    #[test]
    fn io_errors_map_by_kind() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let mapped: AdminHubError = InfraError::from(missing).into();
        assert!(matches!(mapped, AdminHubError::Config(_)));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let mapped: AdminHubError = InfraError::from(other).into();
        assert!(matches!(mapped, AdminHubError::Storage(_)));
    }

    #[test]
    fn storage_errors_map_to_storage() {
        let mapped: AdminHubError = InfraError::from(StorageError::Corrupt("bad".into())).into();
        assert_eq!(mapped, AdminHubError::Storage("storage contents are corrupt: bad".into()));
    }
}
