//! Tenant settings repository - latest dashboard settings document per tenant

use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::utils::AppError;

/// Stored settings document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSettings {
    pub tenant_id: String,
    pub settings: Value,
    pub updated_at_ms: i64,
}

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Sqlite>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Get the settings document for a tenant
    pub async fn get(&self, tenant_id: &str) -> Result<Option<StoredSettings>, AppError> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            r#"
            SELECT tenant_id, settings, updated_at_ms
            FROM tenant_settings
            WHERE tenant_id = ?
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(tenant_id, settings, updated_at_ms)| {
            Ok(StoredSettings {
                tenant_id,
                settings: serde_json::from_str(&settings)
                    .map_err(|e| AppError::Storage(format!("corrupt settings row: {}", e)))?,
                updated_at_ms,
            })
        })
        .transpose()
    }

    /// Store a settings document unless a newer one is already stored.
    ///
    /// Returns `false` when the stored row was left untouched: it is newer,
    /// or it holds the same document with the same timestamp.
    pub async fn put(&self, tenant_id: &str, settings: &Value, updated_at_ms: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_settings (tenant_id, settings, updated_at_ms)
            VALUES (?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                settings = excluded.settings,
                updated_at_ms = excluded.updated_at_ms
            WHERE excluded.updated_at_ms > tenant_settings.updated_at_ms
               OR (excluded.updated_at_ms = tenant_settings.updated_at_ms
                   AND excluded.settings <> tenant_settings.settings)
            "#,
        )
        .bind(tenant_id)
        .bind(settings.to_string())
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
