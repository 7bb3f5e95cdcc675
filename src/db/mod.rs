//! Database layer
//!
//! This module handles database operations for local storage of:
//! - The append-only audit trail
//! - Latest dashboard settings per tenant
//! - Economy ledger balances

pub mod audit_repository;
pub mod economy_repository;
pub mod settings_repository;

pub use audit_repository::AuditRepository;
pub use economy_repository::EconomyRepository;
pub use settings_repository::SettingsRepository;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    ensure_parent_dir(&config.url)?;

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&with_create_mode(&config.url))
        .await
        .with_context(|| format!("Failed to connect to database: {}", config.url))?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check that the database answers queries
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// SQLite refuses to open a missing file unless asked to create it
fn with_create_mode(url: &str) -> String {
    if url.contains(":memory:") || url.contains("mode=") {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&mode=rwc", url)
    } else {
        format!("{}?mode=rwc", url)
    }
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }
    Ok(())
}
