//! Periodic session expiry monitor
//!
//! Wakes on a fixed interval and asks the client to check the access token.
//! An expired token is refreshed through the same coordinator as the 401
//! path, so a tick can never start a second concurrent refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::ApiError;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// What a single expiry check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheckOutcome {
    NoSession,
    Valid,
    Refreshed,
}

/// Something whose session can be checked for expiry
#[async_trait]
pub trait ExpiryCheck: Send + Sync {
    /// Refresh the session if its access token has expired.
    ///
    /// # Errors
    /// Returns the refresh error after the session has been ended.
    async fn check_session_expiry(&self) -> Result<ExpiryCheckOutcome, ApiError>;
}

/// Configuration for the expiry monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Check interval
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900), // 15 minutes
        }
    }
}

/// Background task running [`ExpiryCheck`] on an interval
pub struct SessionExpiryMonitor {
    target: Arc<dyn ExpiryCheck>,
    config: MonitorConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SessionExpiryMonitor {
    pub fn new(target: Arc<dyn ExpiryCheck>, config: MonitorConfig) -> Self {
        Self {
            target,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Start the monitor
    ///
    /// # Errors
    ///
    /// Returns error if the monitor is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), String> {
        if self.is_running().await {
            return Err("Expiry monitor already running".to_string());
        }

        // Fresh token so the monitor can restart after stop
        self.cancellation_token = CancellationToken::new();

        let target = Arc::clone(&self.target);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::check_loop(target, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(interval_secs = interval.as_secs(), "session expiry monitor started");

        Ok(())
    }

    /// Stop the monitor and wait for the task to finish
    ///
    /// # Errors
    ///
    /// Returns error if the monitor is not running or its task did not end
    /// cleanly
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running().await {
            return Err("Expiry monitor not running".to_string());
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Expiry monitor task panicked: {}", e);
                    return Err("Expiry monitor task panicked".to_string());
                }
                Err(_) => {
                    warn!("Expiry monitor task did not complete within timeout");
                    return Err("Expiry monitor task timeout".to_string());
                }
            }
        }

        info!("session expiry monitor stopped");

        Ok(())
    }

    /// A monitor is running while it holds a task handle
    pub async fn is_running(&self) -> bool {
        self.task_handle.lock().await.is_some()
    }

    async fn check_loop(
        target: Arc<dyn ExpiryCheck>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Expiry check loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match target.check_session_expiry().await {
                        Ok(outcome) => debug!(?outcome, "session expiry check"),
                        Err(err) => warn!(error = %err, "proactive refresh failed; session ended"),
                    }
                }
            }
        }
    }
}

impl Drop for SessionExpiryMonitor {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            debug!("SessionExpiryMonitor dropped; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingCheck {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExpiryCheck for CountingCheck {
        async fn check_session_expiry(&self) -> Result<ExpiryCheckOutcome, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExpiryCheckOutcome::Valid)
        }
    }

    fn monitor(check: Arc<CountingCheck>, interval: Duration) -> SessionExpiryMonitor {
        SessionExpiryMonitor::new(check, MonitorConfig { interval })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_monitor_lifecycle() {
        let check = Arc::new(CountingCheck::default());
        let mut monitor = monitor(check, Duration::from_secs(60));

        assert!(!monitor.is_running().await);
        monitor.start().await.unwrap();
        assert!(monitor.is_running().await);

        assert!(monitor.start().await.is_err(), "double start must be refused");

        monitor.stop().await.unwrap();
        assert!(!monitor.is_running().await);
        assert!(monitor.stop().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_monitor_restarts_after_stop() {
        let check = Arc::new(CountingCheck::default());
        let mut monitor = monitor(check, Duration::from_secs(60));

        monitor.start().await.unwrap();
        monitor.stop().await.unwrap();
        monitor.start().await.unwrap();
        assert!(monitor.is_running().await);
        monitor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_checks_on_interval() {
        let check = Arc::new(CountingCheck::default());
        let mut monitor = monitor(Arc::clone(&check), Duration::from_secs(900));
        monitor.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(899)).await;
        assert_eq!(check.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2 * 900)).await;
        assert_eq!(check.calls.load(Ordering::SeqCst), 2);

        monitor.stop().await.unwrap();
    }
}
