//! Test factories for generating test data
//!
//! Factories create unique test data, useful when a test needs many
//! distinct audit entries or invocation requests.

use std::sync::atomic::{AtomicU64, Ordering};

use guild_bridge::models::{AuditAction, AuditExecutor, InvocationRequest, NewAuditEntry};

use super::fixtures::ids;

/// Factory for audit entries with deterministic, increasing timestamps
pub struct AuditEntryFactory {
    counter: AtomicU64,
    base_ms: i64,
}

impl AuditEntryFactory {
    /// Entries start at `base_ms` and move forward one second per entry
    pub fn starting_at(base_ms: i64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            base_ms,
        }
    }

    pub fn create(&self, tenant_id: &str, action: AuditAction, actor_id: &str) -> NewAuditEntry {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) as i64;
        NewAuditEntry::new(tenant_id, action, executor(actor_id))
            .with_reason(format!("entry {}", n))
            .with_timestamp(self.base_ms + n * 1_000)
    }
}

/// Executor with a display name derived from the id
pub fn executor(actor_id: &str) -> AuditExecutor {
    AuditExecutor {
        id: actor_id.to_string(),
        display_name: format!("user {}", actor_id),
        is_automated: false,
    }
}

/// Request builders for the built-in actions
pub struct InvocationFactory;

impl InvocationFactory {
    pub fn ping() -> InvocationRequest {
        InvocationRequest::new("ping", ids::TENANT, ids::SENDER)
    }

    pub fn transfer(to: &str, amount: i64) -> InvocationRequest {
        InvocationRequest::new("economy", ids::TENANT, ids::SENDER)
            .with_subaction("transfer")
            .with_param("to", to)
            .with_param("amount", amount.to_string())
    }

    pub fn ban(user: &str, reason: &str) -> InvocationRequest {
        InvocationRequest::new("moderation", ids::TENANT, ids::SENDER)
            .with_subaction("ban")
            .with_param("user", user)
            .with_param("reason", reason)
    }

    pub fn settings_update(settings: serde_json::Value) -> InvocationRequest {
        InvocationRequest::new("settings", ids::TENANT, ids::SENDER)
            .with_subaction("update")
            .with_param("settings", settings.to_string())
    }
}
