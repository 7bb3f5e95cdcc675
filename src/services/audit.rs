//! Audit store
//!
//! Append-only record of privileged actions. Appends are serialized per
//! tenant so that an entry's position in the log always matches the order in
//! which its invocation completed; tenants never wait on each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::db::{AuditRepository, DbPool};
use crate::models::{AuditEntry, AuditPage, AuditQuery, AuditStats, NewAuditEntry, Pagination};
use crate::utils::{now_ms, AppError, AppResult};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub struct AuditStore {
    pool: DbPool,
    max_page_size: u32,
    tenant_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AuditStore {
    pub fn new(pool: DbPool, config: &AuditConfig) -> Self {
        Self {
            pool,
            max_page_size: config.max_page_size,
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.tenant_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(tenant_id.to_string())
            .or_default()
            .clone()
    }

    /// Persist an entry, assigning a time-ordered id and timestamp if absent
    pub async fn append(&self, entry: NewAuditEntry) -> AppResult<AuditEntry> {
        let lock = self.tenant_lock(&entry.tenant_id);
        let _guard = lock.lock().await;

        let entry = AuditEntry {
            id: entry.id.unwrap_or_else(Uuid::now_v7),
            tenant_id: entry.tenant_id,
            action: entry.action,
            executor: entry.executor,
            target: entry.target,
            changes: entry.changes,
            reason: entry.reason,
            metadata: entry.metadata,
            timestamp_ms: entry.timestamp_ms.unwrap_or_else(now_ms),
        };

        AuditRepository::new(&self.pool).insert(&entry).await?;

        debug!(
            tenant_id = %entry.tenant_id,
            action = %entry.action,
            id = %entry.id,
            "Audit entry appended"
        );

        Ok(entry)
    }

    /// One page of a tenant's entries, newest first
    pub async fn query(&self, tenant_id: &str, mut query: AuditQuery) -> AppResult<AuditPage> {
        if query.page_size == 0 {
            return Err(AppError::invalid("page size must be greater than 0"));
        }
        if query.page == 0 {
            return Err(AppError::invalid("page must be 1 or greater"));
        }
        if let (Some(start), Some(end)) = (query.start_time, query.end_time) {
            if start > end {
                return Err(AppError::invalid("start time must not be after end time"));
            }
        }
        query.page_size = query.page_size.min(self.max_page_size);

        let repo = AuditRepository::new(&self.pool);
        let total = repo.count(tenant_id, &query).await?;
        let entries = repo.list(tenant_id, &query).await?;

        Ok(AuditPage {
            entries,
            pagination: Pagination::new(query.page, query.page_size, total),
        })
    }

    /// Delete everything older than `retention_days` before now
    pub async fn purge_older_than(&self, retention_days: u32) -> AppResult<u64> {
        self.purge_older_than_at(retention_days, now_ms()).await
    }

    /// Delete every entry with `timestamp < now_ms - retention_days`.
    /// An entry exactly at the cutoff is kept.
    pub async fn purge_older_than_at(&self, retention_days: u32, now_ms: i64) -> AppResult<u64> {
        let cutoff = now_ms - i64::from(retention_days) * DAY_MS;
        let deleted = AuditRepository::new(&self.pool).delete_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, retention_days, "Purged expired audit entries");
        }
        Ok(deleted)
    }

    pub async fn stats_by_action(&self, tenant_id: &str) -> AppResult<AuditStats> {
        let counts = AuditRepository::new(&self.pool).count_by_action(tenant_id).await?;
        let by_action: BTreeMap<String, i64> = counts.into_iter().collect();
        Ok(AuditStats {
            total: by_action.values().sum(),
            by_action,
        })
    }
}
