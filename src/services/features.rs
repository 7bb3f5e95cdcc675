//! Feature flag read model
//!
//! A per-tenant snapshot of feature gates. The command adapter only reads it;
//! the snapshot is swapped wholesale by the refresher task or by
//! administrative tooling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::FeaturesConfig;

/// tenant id -> feature name -> enabled
pub type FlagSnapshot = HashMap<String, HashMap<String, bool>>;

#[derive(Debug)]
pub struct FeatureFlags {
    default_enabled: bool,
    snapshot: RwLock<FlagSnapshot>,
}

impl FeatureFlags {
    pub fn new(default_enabled: bool, snapshot: FlagSnapshot) -> Self {
        Self {
            default_enabled,
            snapshot: RwLock::new(snapshot),
        }
    }

    pub fn from_config(config: &FeaturesConfig) -> Self {
        Self::new(config.default_enabled, config.tenants.clone())
    }

    /// Whether `feature` may run in `tenant_id`; unknown flags use the default
    pub fn is_enabled(&self, tenant_id: &str, feature: &str) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .and_then(|flags| flags.get(feature))
            .copied()
            .unwrap_or(self.default_enabled)
    }

    /// Swap in a complete new snapshot
    pub fn replace(&self, snapshot: FlagSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn set(&self, tenant_id: &str, feature: &str, enabled: bool) {
        self.snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tenant_id.to_string())
            .or_default()
            .insert(feature.to_string(), enabled);
    }
}

/// Read a flag snapshot file (same shape as `features.tenants`)
pub fn load_snapshot(path: &Path) -> Result<FlagSnapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature flag file: {:?}", path))?;
    serde_norway::from_str(&contents)
        .with_context(|| format!("Failed to parse feature flag file: {:?}", path))
}

/// State of the background flag refresher
#[derive(Clone)]
pub struct FlagRefresherState {
    running: Arc<tokio::sync::RwLock<bool>>,
}

impl FlagRefresherState {
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
        info!("Feature flag refresher stop requested");
    }
}

/// Periodically reload `path` into `flags`.
///
/// Returns `None` for a zero interval.
pub fn start_flag_refresher(flags: Arc<FeatureFlags>, path: PathBuf, every: Duration) -> Option<FlagRefresherState> {
    if every.is_zero() {
        warn!("Feature flag refresh interval is 0, {:?} will not be reloaded", path);
        return None;
    }

    let state = FlagRefresherState {
        running: Arc::new(tokio::sync::RwLock::new(true)),
    };
    let task_state = state.clone();

    tokio::spawn(async move {
        let mut interval_timer = interval(every);
        info!(
            "Feature flag refresher started for {:?} (interval: {}s)",
            path,
            every.as_secs()
        );

        loop {
            interval_timer.tick().await;

            if !task_state.is_running().await {
                info!("Feature flag refresher stopping");
                break;
            }

            match load_snapshot(&path) {
                Ok(snapshot) => {
                    debug!("Reloaded feature flags for {} tenant(s)", snapshot.len());
                    flags.replace(snapshot);
                }
                Err(e) => error!("Failed to refresh feature flags: {:#}", e),
            }
        }
    });

    Some(state)
}
