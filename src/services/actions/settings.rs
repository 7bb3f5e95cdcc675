//! Settings action: replace the dashboard settings document of a tenant

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{ActionHandler, ActionOutcome};
use crate::db::{DbPool, SettingsRepository};
use crate::models::{events, AuditAction, AuditTarget, Changes, Envelope, SettingsChanged, TargetType};
use crate::services::bridge::BridgeHub;
use crate::services::context::InvocationContext;
use crate::utils::{now_ms, AppError, AppResult};

pub struct SettingsAction {
    settings: SettingsRepository,
    hub: Arc<BridgeHub>,
}

impl SettingsAction {
    pub fn new(pool: DbPool, hub: Arc<BridgeHub>) -> Self {
        Self {
            settings: SettingsRepository::new(pool),
            hub,
        }
    }
}

#[async_trait]
impl ActionHandler for SettingsAction {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn description(&self) -> &'static str {
        "Update the bot configuration of a server"
    }

    fn subactions(&self) -> &'static [&'static str] {
        &["update"]
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let raw = ctx.require_string("settings")?;
        let new_settings = match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => return Err(AppError::invalid("settings must be a JSON object")),
        };

        let tenant = ctx.tenant();
        let old_settings = match self.settings.get(&tenant.id).await? {
            Some(stored) => match stored.settings {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };

        let timestamp = now_ms();
        let document = Value::Object(new_settings.clone());
        self.settings.put(&tenant.id, &document, timestamp).await?;

        let changed = SettingsChanged {
            tenant_id: tenant.id.clone(),
            settings: document,
            timestamp,
        };
        let delivered = self.hub.broadcast(
            &tenant.id,
            Envelope::new(events::SETTINGS_CHANGED, serde_json::to_value(&changed)?),
        );
        debug!(tenant_id = %tenant.id, delivered, "Settings change emitted");

        let message = "Settings updated".to_string();
        ctx.reply(&message, true).await?;

        Ok(ActionOutcome::new(AuditAction::SettingsUpdate, message)
            .with_target(AuditTarget::new(tenant.id.clone(), tenant.name.clone(), TargetType::Guild))
            .with_changes(diff(&old_settings, &new_settings)))
    }
}

/// Field-level diff of two top-level settings objects
fn diff(old: &Map<String, Value>, new: &Map<String, Value>) -> Value {
    let mut changes = Changes::new();
    for (key, value) in new {
        let previous = old.get(key).cloned().unwrap_or(Value::Null);
        if &previous != value {
            changes = changes.field(key.clone(), previous, value.clone());
        }
    }
    for (key, value) in old {
        if !new.contains_key(key) {
            changes = changes.field(key.clone(), value.clone(), Value::Null);
        }
    }
    changes.into_value()
}
