use std::sync::{Arc, Once};
use std::time::Duration;

use adminhub_common::auth::keys;
use adminhub_common::testing::MockStorage;
use adminhub_domain::constants::REFRESH_TOKEN_PATH;
use adminhub_infra::{AuthenticatedClient, SessionEvent};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Delay applied to refresh responses so concurrent 401s overlap the refresh
pub const REFRESH_DELAY: Duration = Duration::from_millis(200);

/// Install a test subscriber once per binary; `RUST_LOG` controls output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A mock backend plus a client whose session lives in mock storage.
pub struct Harness {
    pub server: MockServer,
    pub storage: MockStorage,
    pub client: AuthenticatedClient,
}

impl Harness {
    /// Start a backend and restore a client from the given stored tokens.
    pub async fn start(access_token: &str, refresh_token: Option<&str>) -> Self {
        init_tracing();
        let server = MockServer::start().await;

        let mut storage = MockStorage::new().with_item(keys::ACCESS_TOKEN, access_token);
        if let Some(refresh_token) = refresh_token {
            storage = storage.with_item(keys::REFRESH_TOKEN, refresh_token);
        }

        let client = AuthenticatedClient::builder()
            .base_url(server.uri())
            .storage(Arc::new(storage.clone()))
            .build()
            .expect("client should build");

        Self { server, storage, client }
    }

    /// `GET {route}` answers 200 for `Bearer {valid_token}` and 401 otherwise.
    pub async fn protect(&self, route: &str, valid_token: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", format!("Bearer {valid_token}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": { "route": route } })),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })),
            )
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// Refresh endpoint expecting `refresh_token`, answering `response`.
    pub async fn refresh_responds(
        &self,
        refresh_token: &str,
        response: ResponseTemplate,
        expected_calls: u64,
    ) {
        Mock::given(method("POST"))
            .and(path(REFRESH_TOKEN_PATH))
            .and(body_json(json!({ "refresh_token": refresh_token })))
            .respond_with(response.set_delay(REFRESH_DELAY))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Refresh endpoint that must never be called.
    pub async fn refresh_forbidden(&self) {
        Mock::given(method("POST"))
            .and(path(REFRESH_TOKEN_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Requests the backend received on the refresh endpoint so far.
    pub async fn refresh_calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == REFRESH_TOKEN_PATH)
            .count()
    }
}

pub fn tokens(access_token: &str, refresh_token: Option<&str>) -> ResponseTemplate {
    let mut data = json!({ "access_token": access_token });
    if let Some(refresh_token) = refresh_token {
        data["refresh_token"] = Value::from(refresh_token);
    }
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

/// Every event received so far.
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
