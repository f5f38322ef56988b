//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use adminhub_common::LocalStorage;
use adminhub_domain::{AdminHubError, Config, Result};
use adminhub_infra::{
    config, ApiError, AuthenticatedClient, ExpiryCheck, FileStorage, InfraError, MonitorConfig,
    SessionExpiryMonitor,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Application context - holds the session client and its background monitor
pub struct AppContext {
    pub config: Config,
    pub client: AuthenticatedClient,
    pub storage: Arc<FileStorage>,

    // None when the expiry check is disabled
    monitor: Mutex<Option<SessionExpiryMonitor>>,
}

impl AppContext {
    /// Build the context from the standard config sources
    ///
    /// # Errors
    /// Returns `AdminHubError::Config` for invalid configuration, or the
    /// storage or client construction error.
    pub fn new() -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config)
    }

    /// Build the context from an explicit configuration
    ///
    /// The persisted session is restored here; nothing touches the network
    /// until [`start`](Self::start).
    ///
    /// # Errors
    /// Returns the storage error if the session file cannot be opened, or
    /// `AdminHubError::Config` if the client cannot be built.
    pub fn new_with_config(config: Config) -> Result<Self> {
        let storage = Arc::new(
            FileStorage::open(&config.session.storage_path)
                .map_err(|e| AdminHubError::from(InfraError::from(e)))?,
        );
        let local: Arc<dyn LocalStorage> = storage.clone();

        let client = AuthenticatedClient::builder()
            .config(config.api.clone())
            .storage(local)
            .build()
            .map_err(AdminHubError::from)?;

        let monitor = config.session.expiry_check_enabled.then(|| {
            let target: Arc<dyn ExpiryCheck> = Arc::new(client.clone());
            SessionExpiryMonitor::new(
                target,
                MonitorConfig { interval: config.session.expiry_check_interval() },
            )
        });

        info!(
            base_url = %config.api.base_url,
            session_file = %storage.path().display(),
            authenticated = client.is_authenticated(),
            "application context created"
        );

        Ok(Self { config, client, storage, monitor: Mutex::new(monitor) })
    }

    /// Validate the restored session and start the expiry monitor
    ///
    /// A session that cannot be renewed is not an error here: it has already
    /// been cleared and a `LoggedOut` event sent to subscribers.
    ///
    /// # Errors
    /// Returns `AdminHubError::Internal` if the monitor fails to start.
    pub async fn start(&self) -> Result<()> {
        match self.client.validate_session().await {
            Ok(()) => info!("restored session is valid"),
            Err(ApiError::NotAuthenticated) => info!("no stored session; sign-in required"),
            Err(err) => warn!(error = %err, "stored session could not be renewed"),
        }

        let mut monitor = self.monitor.lock().await;
        if let Some(monitor) = monitor.as_mut() {
            let start_timeout = Duration::from_secs(10);
            tokio::time::timeout(start_timeout, monitor.start())
                .await
                .map_err(|_| {
                    AdminHubError::Internal("expiry monitor start timed out after 10s".into())
                })?
                .map_err(|err| {
                    tracing::error!(error = %err, "failed to start expiry monitor");
                    AdminHubError::Internal(format!("failed to start expiry monitor: {err}"))
                })?;
        } else {
            info!("session expiry check disabled");
        }

        Ok(())
    }

    /// Whether the expiry monitor task is running
    pub async fn monitor_running(&self) -> bool {
        match self.monitor.lock().await.as_ref() {
            Some(monitor) => monitor.is_running().await,
            None => false,
        }
    }

    /// Stop background work
    ///
    /// The session itself is left in storage so the next start restores it.
    ///
    /// # Errors
    /// Returns `AdminHubError::Internal` if the monitor task did not stop
    /// cleanly.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutdown called on AppContext");

        let mut monitor = self.monitor.lock().await;
        if let Some(monitor) = monitor.as_mut() {
            if monitor.is_running().await {
                monitor.stop().await.map_err(AdminHubError::Internal)?;
            }
        }

        Ok(())
    }
}
