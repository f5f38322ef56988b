//! Authenticated API client
//!
//! Attaches the bearer token to every request and recovers from 401
//! responses by refreshing the access token once and replaying the request.
//! Concurrent 401s share a single refresh through [`RefreshCoordinator`].

use std::sync::Arc;
use std::time::Duration;

use adminhub_common::{
    is_token_expired, LocalStorage, LoginCredentials, MemoryStorage, PayloadError,
    RefreshedTokens, Session, SessionStore,
};
use adminhub_domain::constants::{LOGIN_PATH, REFRESH_TOKEN_PATH};
use adminhub_domain::{AdminHubError, ApiConfig};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::errors::ApiError;
use super::monitor::{ExpiryCheck, ExpiryCheckOutcome};
use super::refresh::{RefreshCoordinator, RefreshOutcome};
use super::request::{ApiRequest, ApiResponse};
use super::session::{AuthSession, AuthState, LogoutReason, SessionEvent};
use crate::http::HttpClient;

struct Inner {
    http: HttpClient,
    config: ApiConfig,
    session: AuthSession,
    coordinator: Arc<RefreshCoordinator>,
}

/// HTTP client bound to one admin session
///
/// Cheap to clone; clones share the session and the refresh coordinator.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<Inner>,
}

impl AuthenticatedClient {
    /// Create a client and restore any session persisted in `storage`.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the HTTP client cannot be built.
    pub fn new(config: ApiConfig, storage: Arc<dyn LocalStorage>) -> Result<Self, ApiError> {
        Self::builder().config(config).storage(storage).build()
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> AuthenticatedClientBuilder {
        AuthenticatedClientBuilder::default()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Current session, including an expired one awaiting refresh
    pub fn session(&self) -> Option<Session> {
        self.inner.session.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// Authenticated and the access token has not expired locally
    pub fn has_valid_session(&self) -> bool {
        self.inner.session.access_token().is_some_and(|token| !is_token_expired(&token))
    }

    pub fn auth_state(&self) -> AuthState {
        if !self.inner.session.is_authenticated() {
            AuthState::LoggedOut
        } else if self.inner.coordinator.is_in_flight() {
            AuthState::Refreshing
        } else {
            AuthState::Authenticated
        }
    }

    /// Session transitions. `LoggedOut` is the signal to send the user back
    /// to sign-in.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.session.subscribe()
    }

    /// Log in with email and password.
    ///
    /// Login responses bypass the refresh logic: a 401 here is a wrong
    /// password and comes back as `ApiError::Http`.
    ///
    /// # Errors
    /// Returns the transport or HTTP error, `ApiError::Decode` for an unusable
    /// payload, or `ApiError::Storage` if the session cannot be persisted.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?;
        let response = self.execute(&request, None).await?.error_for_status()?;
        let status = response.status().as_u16();

        let session = Session::from_login_payload(response.value()?).map_err(|e| match e {
            PayloadError::Rejected(message) => ApiError::Http { status, message },
            other => ApiError::Decode(format!("Invalid login response: {other}")),
        })?;

        self.inner.session.establish(session.clone()).await?;
        info!(company_id = ?session.company_id, "login successful");
        Ok(session)
    }

    /// End the session locally. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if !self.inner.session.end(LogoutReason::UserRequested).await {
            debug!("logout requested without an active session");
        }
    }

    /// Refresh the access token now.
    ///
    /// Joins an in-flight refresh instead of starting a second one.
    ///
    /// # Errors
    /// Returns the refresh error; the session has been cleared in that case.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        self.refresh_shared().await
    }

    /// Validate the session when the application becomes active.
    ///
    /// An expired access token is refreshed proactively. Without any refresh
    /// token the session is ended immediately.
    ///
    /// # Errors
    /// `ApiError::NotAuthenticated` without a session, `ApiError::AuthExpired`
    /// when it cannot be renewed, or the refresh error.
    #[instrument(skip(self))]
    pub async fn validate_session(&self) -> Result<(), ApiError> {
        let Some(token) = self.inner.session.access_token() else {
            return Err(ApiError::NotAuthenticated);
        };
        if !is_token_expired(&token) {
            return Ok(());
        }

        if self.inner.session.refresh_token().is_none() {
            warn!("access token expired and no refresh token is stored");
            self.inner.session.end(LogoutReason::MissingRefreshToken).await;
            return Err(ApiError::AuthExpired(
                "access token expired and no refresh token is stored".to_string(),
            ));
        }

        info!("access token expired; refreshing before use");
        self.refresh_shared().await.map(|_| ())
    }

    /// Send a request with the bearer token attached.
    ///
    /// A 401 triggers one shared refresh and one replay. Every other status
    /// outside 2xx comes back as `ApiError::Http`.
    ///
    /// # Errors
    /// Returns the transport error, the HTTP error, the refresh error, or
    /// `ApiError::Unauthorized` when the replay is rejected again.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.inner.session.access_token();
        let response = self.execute(&request, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return response.error_for_status();
        }

        if is_refresh_path(request.path()) {
            warn!("refresh token rejected");
            self.inner.session.end(LogoutReason::RefreshRejected).await;
            return Err(ApiError::RefreshInvalid(response.error_message()));
        }

        let current = self.inner.session.access_token();
        let replay_token = if current.is_some() && current != token {
            debug!("token changed while request was in flight; replaying");
            current
        } else {
            debug!("received 401; refreshing access token");
            Some(self.refresh_shared().await?)
        };

        let replay = self.execute(&request, replay_token.as_deref()).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!("request rejected again after token refresh");
            return Err(ApiError::Unauthorized(replay.error_message()));
        }
        replay.error_for_status()
    }

    /// Execute a GET request and decode the response data.
    ///
    /// # Errors
    /// See [`send`](Self::send); also `ApiError::Decode`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.data()
    }

    /// Execute a POST request and decode the response data.
    ///
    /// # Errors
    /// See [`send`](Self::send); also `ApiError::Decode`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.data()
    }

    /// Execute a PUT request and decode the response data.
    ///
    /// # Errors
    /// See [`send`](Self::send); also `ApiError::Decode`.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await?.data()
    }

    /// Execute a PATCH request and decode the response data.
    ///
    /// # Errors
    /// See [`send`](Self::send); also `ApiError::Decode`.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.data()
    }

    /// Execute a DELETE request and decode the response data.
    ///
    /// # Errors
    /// See [`send`](Self::send); also `ApiError::Decode`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path)).await?.data()
    }

    /// Join or lead the shared refresh and wait for its outcome.
    ///
    /// The refresh itself runs in a spawned task so a caller that stops
    /// waiting cannot strand the others.
    async fn refresh_shared(&self) -> RefreshOutcome {
        let epoch = self.inner.session.epoch();
        let (flight, outcome) = self.inner.coordinator.join();

        if let Some(flight) = flight {
            let client = self.clone();
            tokio::spawn(async move {
                let outcome = client.perform_refresh(epoch).await;
                flight.settle(outcome);
            });
        }

        outcome.await.map_err(|_| {
            ApiError::RefreshInvalid("refresh task ended without a result".to_string())
        })?
    }

    /// Run one refresh for the session at `epoch`.
    ///
    /// Every failure ends that session and comes back as `RefreshInvalid` or
    /// `MalformedRefreshResponse`.
    async fn perform_refresh(&self, epoch: u64) -> RefreshOutcome {
        let session = &self.inner.session;

        let Some(refresh_token) = session.refresh_token() else {
            warn!("no usable refresh token; ending session");
            session.end_at(epoch, LogoutReason::MissingRefreshToken).await;
            return Err(ApiError::RefreshInvalid("no refresh token available".to_string()));
        };

        let tokens = match self.request_tokens(refresh_token).await {
            Ok(tokens) => tokens,
            Err((reason, err)) => {
                warn!(error = %err, ?reason, "token refresh failed");
                session.end_at(epoch, reason).await;
                return Err(err.into_refresh_failure());
            }
        };

        match session.apply_refresh(epoch, &tokens).await {
            Ok(true) => Ok(tokens.access_token),
            Ok(false) => Err(ApiError::RefreshInvalid("session ended during refresh".to_string())),
            Err(err) => {
                warn!(error = %err, "failed to persist refreshed tokens");
                session.end_at(epoch, LogoutReason::RefreshFailed).await;
                Err(err.into_refresh_failure())
            }
        }
    }

    /// POST the refresh token. A failure carries the logout reason it implies.
    async fn request_tokens(
        &self,
        refresh_token: String,
    ) -> Result<RefreshedTokens, (LogoutReason, ApiError)> {
        let request =
            ApiRequest::post(REFRESH_TOKEN_PATH).with_body(json!({ "refresh_token": refresh_token }));

        let response = self
            .execute(&request, None)
            .await
            .map_err(|err| (LogoutReason::RefreshFailed, err))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let err = ApiError::RefreshInvalid(response.error_message());
            return Err((LogoutReason::RefreshRejected, err));
        }

        let payload = response
            .error_for_status()
            .and_then(|response| response.value())
            .map_err(|err| (LogoutReason::RefreshFailed, err))?;

        RefreshedTokens::from_payload(payload).map_err(|err| {
            let reason = match err {
                PayloadError::Rejected(_) => LogoutReason::RefreshRejected,
                _ => LogoutReason::RefreshFailed,
            };
            (reason, ApiError::from_refresh_payload(err))
        })
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.inner.config.url_for(&request.path);
        let http = &self.inner.http;

        let mut builder = http.request(request.method.clone(), &url).headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let timeout = http.timeout();
        let response = match tokio::time::timeout(timeout, http.send(builder)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(Self::map_transport_error(err, timeout)),
            Err(_) => return Err(ApiError::Timeout(timeout)),
        };

        match tokio::time::timeout(timeout, ApiResponse::read(response)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    fn map_transport_error(err: AdminHubError, timeout: Duration) -> ApiError {
        match err {
            AdminHubError::Timeout(_) => ApiError::Timeout(timeout),
            other => ApiError::from(other),
        }
    }
}

#[async_trait]
impl ExpiryCheck for AuthenticatedClient {
    async fn check_session_expiry(&self) -> Result<ExpiryCheckOutcome, ApiError> {
        let Some(token) = self.inner.session.access_token() else {
            return Ok(ExpiryCheckOutcome::NoSession);
        };
        if !is_token_expired(&token) {
            return Ok(ExpiryCheckOutcome::Valid);
        }

        info!("access token expired; refreshing proactively");
        let epoch = self.inner.session.epoch();
        match self.refresh_shared().await {
            Ok(_) => Ok(ExpiryCheckOutcome::Refreshed),
            Err(err) => {
                self.inner.session.end_at(epoch, LogoutReason::RefreshFailed).await;
                Err(err)
            }
        }
    }
}

fn is_refresh_path(path: &str) -> bool {
    path.split('?').next().is_some_and(|p| p.trim_end_matches('/').ends_with(REFRESH_TOKEN_PATH))
}

/// Builder for [`AuthenticatedClient`]
#[derive(Default)]
pub struct AuthenticatedClientBuilder {
    config: Option<ApiConfig>,
    storage: Option<Arc<dyn LocalStorage>>,
    http: Option<HttpClient>,
    timeout: Option<Duration>,
}

impl AuthenticatedClientBuilder {
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.base_url = base_url.into();
        self.config = Some(config);
        self
    }

    /// Per-request timeout, kept exactly. The config records it rounded up
    /// to whole seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        let whole_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        config.timeout_secs = whole_secs.max(1);
        self.config = Some(config);
        self.timeout = Some(timeout);
        self
    }

    /// Durable storage for the session. Defaults to in-memory storage.
    pub fn storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use a preconfigured transport instead of one built from the config.
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client and restore the persisted session.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the HTTP client cannot be built.
    pub fn build(self) -> Result<AuthenticatedClient, ApiError> {
        let config = self.config.unwrap_or_default();

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .timeout(self.timeout.unwrap_or_else(|| config.timeout()))
                .user_agent(concat!("adminhub/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?,
        };

        let storage = self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let session = AuthSession::restore(SessionStore::new(storage));

        Ok(AuthenticatedClient {
            inner: Arc::new(Inner { http, config, session, coordinator: RefreshCoordinator::new() }),
        })
    }
}
