//! Audit log repository

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    AuditAction, AuditEntry, AuditExecutor, AuditQuery, AuditTarget, TargetType,
};
use crate::utils::AppError;

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    tenant_id: String,
    action: String,
    executor_id: String,
    executor_name: String,
    executor_automated: bool,
    target_id: Option<String>,
    target_name: Option<String>,
    target_type: Option<String>,
    changes: String,
    reason: Option<String>,
    metadata: String,
    timestamp_ms: i64,
}

const SELECT_COLUMNS: &str = "SELECT id, tenant_id, action, executor_id, executor_name, executor_automated, \
     target_id, target_name, target_type, changes, reason, metadata, timestamp_ms FROM audit_log";

pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &AuditEntry) -> Result<(), AppError> {
        let (target_id, target_name, target_type) = match &entry.target {
            Some(target) => (
                Some(target.id.as_str()),
                Some(target.display_name.as_str()),
                Some(target.target_type.as_str()),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO audit_log (id, tenant_id, action, executor_id, executor_name, executor_automated,
                                   target_id, target_name, target_type, changes, reason, metadata, timestamp_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.tenant_id)
        .bind(entry.action.as_str())
        .bind(&entry.executor.id)
        .bind(&entry.executor.display_name)
        .bind(entry.executor.is_automated)
        .bind(target_id)
        .bind(target_name)
        .bind(target_type)
        .bind(entry.changes.to_string())
        .bind(entry.reason.as_deref())
        .bind(Value::Object(entry.metadata.clone()).to_string())
        .bind(entry.timestamp_ms)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// One page of entries, newest first; ties on timestamp fall back to
    /// insertion order so the sequence stays strictly reverse-chronological.
    pub async fn list(&self, tenant_id: &str, query: &AuditQuery) -> Result<Vec<AuditEntry>, AppError> {
        let mut sql = String::from(SELECT_COLUMNS);
        sql.push_str(&where_clause(query));
        sql.push_str(" ORDER BY timestamp_ms DESC, seq DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, AuditRow>(&sql).bind(tenant_id);
        if let Some(action) = query.action {
            q = q.bind(action.as_str());
        }
        if let Some(ref actor_id) = query.actor_id {
            q = q.bind(actor_id);
        }
        if let Some(start) = query.start_time {
            q = q.bind(start);
        }
        if let Some(end) = query.end_time {
            q = q.bind(end);
        }
        q = q.bind(i64::from(query.page_size)).bind(query.offset());

        let rows = q.fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }

    /// Number of entries matching the filters of `query` (paging ignored)
    pub async fn count(&self, tenant_id: &str, query: &AuditQuery) -> Result<i64, AppError> {
        let mut sql = String::from("SELECT COUNT(*) FROM audit_log");
        sql.push_str(&where_clause(query));

        let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(tenant_id);
        if let Some(action) = query.action {
            q = q.bind(action.as_str());
        }
        if let Some(ref actor_id) = query.actor_id {
            q = q.bind(actor_id);
        }
        if let Some(start) = query.start_time {
            q = q.bind(start);
        }
        if let Some(end) = query.end_time {
            q = q.bind(end);
        }

        Ok(q.fetch_one(self.pool).await?)
    }

    /// Delete every entry strictly older than `cutoff_ms`
    pub async fn delete_before(&self, cutoff_ms: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM audit_log WHERE timestamp_ms < ?")
            .bind(cutoff_ms)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_by_action(&self, tenant_id: &str) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT action, COUNT(*) FROM audit_log
            WHERE tenant_id = ?
            GROUP BY action
            ORDER BY action
            "#,
        )
        .bind(tenant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

fn where_clause(query: &AuditQuery) -> String {
    let mut clause = String::from(" WHERE tenant_id = ?");
    if query.action.is_some() {
        clause.push_str(" AND action = ?");
    }
    if query.actor_id.is_some() {
        clause.push_str(" AND executor_id = ?");
    }
    if query.start_time.is_some() {
        clause.push_str(" AND timestamp_ms >= ?");
    }
    if query.end_time.is_some() {
        clause.push_str(" AND timestamp_ms <= ?");
    }
    clause
}

fn row_to_entry(row: AuditRow) -> AuditEntry {
    let target = match (row.target_id, row.target_type) {
        (Some(id), Some(kind)) => Some(AuditTarget {
            display_name: row.target_name.unwrap_or_else(|| id.clone()),
            id,
            target_type: TargetType::parse(&kind),
        }),
        _ => None,
    };

    AuditEntry {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        tenant_id: row.tenant_id,
        action: row.action.parse().unwrap_or(AuditAction::Other),
        executor: AuditExecutor {
            id: row.executor_id,
            display_name: row.executor_name,
            is_automated: row.executor_automated,
        },
        target,
        changes: serde_json::from_str(&row.changes).unwrap_or_else(|_| Value::Object(Map::new())),
        reason: row.reason,
        metadata: serde_json::from_str(&row.metadata).unwrap_or_default(),
        timestamp_ms: row.timestamp_ms,
    }
}
