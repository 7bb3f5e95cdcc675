//! Bot-side settings synchronisation
//!
//! The bot holds a privileged bridge session that listens for
//! `settings_changed` in every tenant it manages and persists the latest
//! document, so settings edited in the dashboard survive restarts. Events
//! are written one at a time, in arrival order, by a single writer task.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::db::{DbPool, SettingsRepository};
use crate::models::{events, SettingsChanged};
use crate::services::bridge::{BridgeHub, BridgeSession, LocalTransport, ReconnectPolicy};
use crate::utils::AppResult;

/// Open the bot's session and start persisting settings broadcasts
pub async fn start_bot_sync(
    hub: Arc<BridgeHub>,
    pool: DbPool,
    policy: ReconnectPolicy,
) -> AppResult<BridgeSession<LocalTransport>> {
    let session = BridgeSession::new(LocalTransport::privileged(hub), policy);
    let (tx, rx) = mpsc::channel(PENDING_WRITES);
    tokio::spawn(persist_settings(SettingsRepository::new(pool), rx));

    session.subscribe(events::SETTINGS_CHANGED, move |data: Value| {
        let changed: SettingsChanged = match serde_json::from_value(data) {
            Ok(changed) => changed,
            Err(e) => {
                warn!("Ignoring malformed settings_changed event: {}", e);
                return;
            }
        };
        if let Err(TrySendError::Full(changed)) = tx.try_send(changed) {
            warn!(tenant_id = %changed.tenant_id, "Settings writer is behind, event dropped");
        }
    });

    session.connect().await?;
    Ok(session)
}

/// Settings events waiting for the writer
const PENDING_WRITES: usize = 256;

async fn persist_settings(repo: SettingsRepository, mut rx: mpsc::Receiver<SettingsChanged>) {
    while let Some(changed) = rx.recv().await {
        match repo
            .put(&changed.tenant_id, &changed.settings, changed.timestamp)
            .await
        {
            Ok(true) => debug!(tenant_id = %changed.tenant_id, "Persisted settings from bridge"),
            Ok(false) => debug!(tenant_id = %changed.tenant_id, "Stored settings already current"),
            Err(e) => error!(tenant_id = %changed.tenant_id, "Failed to persist settings: {}", e),
        }
    }
}
