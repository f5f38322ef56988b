//! AdminHub - admin session client
//!
//! Restores the stored admin session, keeps it fresh in the background and
//! reports when the user has to sign in again.

use adminhub_infra::SessionEvent;
use adminhub_lib::utils::logging;
use adminhub_lib::AppContext;
use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before logging so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();
    logging::init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env file loaded"),
    }

    let ctx = AppContext::new().context("failed to initialize application context")?;

    let mut events = ctx.client.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::LoggedOut { reason }) => {
                    warn!(?reason, "session ended; redirecting to sign-in");
                }
                Ok(event) => info!(?event, "session event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "session events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    ctx.start().await.context("failed to start application context")?;

    if !ctx.client.is_authenticated() {
        info!("not signed in; redirecting to sign-in");
    }

    info!("AdminHub running; press Ctrl-C to exit");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;

    ctx.shutdown().await.context("failed to shut down cleanly")?;
    watcher.abort();

    Ok(())
}
