//! Background audit retention
//!
//! Periodically deletes audit entries older than the configured retention
//! window. The sweep is never triggered by users.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::config::AuditConfig;
use crate::services::audit::AuditStore;

/// Scheduler state for the retention sweep
#[derive(Clone)]
pub struct RetentionSchedulerState {
    /// Whether the scheduler is running
    running: Arc<RwLock<bool>>,
    audit: Arc<AuditStore>,
    retention_days: u32,
}

impl RetentionSchedulerState {
    pub fn new(audit: Arc<AuditStore>, retention_days: u32) -> Self {
        Self {
            running: Arc::new(RwLock::new(true)),
            audit,
            retention_days,
        }
    }

    /// Check if the scheduler is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Audit retention scheduler stop requested");
    }

    /// Run one sweep now
    pub async fn sweep(&self) -> u64 {
        debug!("Running audit retention sweep");
        match self.audit.purge_older_than(self.retention_days).await {
            Ok(count) => {
                if count > 0 {
                    info!("Purged {} audit entries older than {} days", count, self.retention_days);
                }
                count
            }
            Err(e) => {
                error!("Failed to purge audit log: {}", e);
                0
            }
        }
    }
}

/// Start the background retention sweep.
///
/// Returns `None` when `purge_interval_secs` is 0.
pub fn start_retention_scheduler(audit: Arc<AuditStore>, config: &AuditConfig) -> Option<RetentionSchedulerState> {
    if config.purge_interval_secs == 0 {
        info!("Audit retention sweep disabled");
        return None;
    }

    let state = RetentionSchedulerState::new(audit, config.retention_days);
    let every = Duration::from_secs(config.purge_interval_secs);

    let task_state = state.clone();
    tokio::spawn(async move {
        retention_task(task_state, every).await;
    });

    info!(
        "Audit retention scheduler started (retention: {} days, interval: {}s)",
        config.retention_days, config.purge_interval_secs
    );
    Some(state)
}

async fn retention_task(state: RetentionSchedulerState, every: Duration) {
    let mut interval_timer = interval(every);

    loop {
        interval_timer.tick().await;

        if !state.is_running().await {
            info!("Audit retention task stopping");
            break;
        }

        state.sweep().await;
    }
}
