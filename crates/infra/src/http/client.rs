use std::time::Duration;

use adminhub_domain::AdminHubError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Single-shot JSON HTTP client with a per-request timeout.
///
/// Requests are never retried here; retry decisions belong to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, AdminHubError> {
        Self::builder().build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, AdminHubError> {
        let request = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            AdminHubError::from(infra)
        })?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, path = url.path(), "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                debug!(%method, path = url.path(), %status, "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, path = url.path(), error = %err, "HTTP request failed");
                let infra: InfraError = err.into();
                Err(AdminHubError::from(infra))
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(adminhub_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Extra headers sent with every request, on top of the JSON defaults.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient, AdminHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(extra) = self.default_headers {
            headers.extend(extra);
        }

        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).default_headers(headers).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            AdminHubError::from(infra)
        })?;

        Ok(HttpClient { client, timeout: self.timeout })
    }
}
