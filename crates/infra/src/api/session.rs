//! In-memory session state and its durable mirror
//!
//! Mutations are serialized by an async write gate; the in-memory slot lock is
//! only held for the swap, never across storage I/O, which runs on the
//! blocking pool. Login and logout bump the session epoch, so a refresh that
//! started under an older epoch cannot write its tokens back.

use adminhub_common::{RefreshedTokens, Session, SessionStore, StorageError, StorageResult};
use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::errors::ApiError;

const EVENT_CAPACITY: usize = 16;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit logout
    UserRequested,
    /// The refresh endpoint rejected the refresh token
    RefreshRejected,
    /// The refresh call failed or returned an unusable payload
    RefreshFailed,
    /// The access token expired and no refresh token was stored
    MissingRefreshToken,
}

/// Session transitions observable by the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    TokenRefreshed,
    /// The user must sign in again
    LoggedOut { reason: LogoutReason },
}

/// Coarse client state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    Authenticated,
    Refreshing,
}

struct SessionSlot {
    session: Option<Session>,
    epoch: u64,
}

/// The session owned by one client
pub struct AuthSession {
    slot: RwLock<SessionSlot>,
    writes: Mutex<()>,
    store: SessionStore,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthSession {
    /// Load whatever the store holds, expired or not.
    ///
    /// A store that cannot be read starts the client logged out.
    pub fn restore(store: SessionStore) -> Self {
        let session = match store.load() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "failed to restore session; starting logged out");
                None
            }
        };
        if session.is_some() {
            info!("restored persisted session");
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slot: RwLock::new(SessionSlot { session, epoch: 0 }),
            writes: Mutex::new(()),
            store,
            events,
        }
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.slot.read().session.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.slot
            .read()
            .session
            .as_ref()
            .filter(|s| s.is_authenticated())
            .map(|s| s.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.slot.read().session.as_ref().is_some_and(Session::is_authenticated)
    }

    pub fn epoch(&self) -> u64 {
        self.slot.read().epoch
    }

    /// The refresh token as currently persisted.
    ///
    /// Falls back to the in-memory copy when storage cannot be read.
    pub fn refresh_token(&self) -> Option<String> {
        match self.store.refresh_token() {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "failed to read stored refresh token; using in-memory copy");
                let slot = self.slot.read();
                adminhub_common::normalize_stored_token(
                    slot.session.as_ref().and_then(|s| s.refresh_token.clone()),
                )
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Install a freshly logged-in session.
    pub async fn establish(&self, session: Session) -> Result<(), ApiError> {
        let _writing = self.writes.lock().await;
        let session = self.persist(move |store| store.save(&session).map(|()| session)).await?;
        {
            let mut slot = self.slot.write();
            slot.session = Some(session);
            slot.epoch += 1;
        }
        info!("session established");
        self.emit(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Write refreshed tokens if the session is still the one the refresh
    /// started under. Returns `false` when the refresh went stale.
    pub async fn apply_refresh(
        &self,
        epoch: u64,
        tokens: &RefreshedTokens,
    ) -> Result<bool, ApiError> {
        let _writing = self.writes.lock().await;
        let current = self.epoch();
        if current != epoch {
            debug!(started = epoch, current, "discarding stale refresh result");
            return Ok(false);
        }

        let stored = tokens.clone();
        let refresh_token = self
            .persist(move |store| {
                store.store_tokens(&stored)?;
                store.refresh_token()
            })
            .await?;
        {
            let mut slot = self.slot.write();
            match slot.session.as_mut() {
                Some(session) => session.apply_refresh(tokens),
                None => {
                    slot.session = Some(Session::new(tokens.access_token.clone(), refresh_token));
                }
            }
        }
        info!(rotated = tokens.refresh_token.is_some(), "access token refreshed");
        self.emit(SessionEvent::TokenRefreshed);
        Ok(true)
    }

    /// Clear memory and storage. Emits `LoggedOut` only when a session
    /// existed, so repeated calls signal once.
    pub async fn end(&self, reason: LogoutReason) -> bool {
        let _writing = self.writes.lock().await;
        self.end_current(reason).await
    }

    /// `end`, but only if no login or logout happened since `epoch`.
    pub async fn end_at(&self, epoch: u64, reason: LogoutReason) -> bool {
        let _writing = self.writes.lock().await;
        if self.epoch() != epoch {
            return false;
        }
        self.end_current(reason).await
    }

    // Caller holds `writes`. Memory is cleared before the store so requests
    // stop using the token right away.
    async fn end_current(&self, reason: LogoutReason) -> bool {
        let existed = {
            let mut slot = self.slot.write();
            slot.epoch += 1;
            slot.session.take().is_some()
        };
        if let Err(err) = self.persist(|store| store.clear()).await {
            warn!(error = %err, "failed to clear persisted session");
        }

        if existed {
            info!(?reason, "session ended");
            self.emit(SessionEvent::LoggedOut { reason });
        }
        existed
    }

    /// Run a store operation on the blocking pool.
    async fn persist<T, F>(&self, operation: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SessionStore) -> StorageResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || operation(&store))
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {e}")))?
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
