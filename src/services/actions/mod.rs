//! Action handlers and their registry
//!
//! An action is a named unit of bot functionality (economy, moderation, ...)
//! optionally split into subactions. Handlers run against an
//! [`InvocationContext`] and describe what they did in an [`ActionOutcome`],
//! which the command adapter turns into the audit entry.

mod economy;
mod moderation;
mod ping;
mod role;
mod settings;

pub use economy::EconomyAction;
pub use moderation::ModerationAction;
pub use ping::PingAction;
pub use role::RoleAction;
pub use settings::SettingsAction;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::db::DbPool;
use crate::models::{AuditAction, AuditTarget, CommandInfo};
use crate::services::bridge::BridgeHub;
use crate::services::context::InvocationContext;
use crate::services::gateway::PlatformGateway;
use crate::utils::{AppError, AppResult};

/// What a successful handler run did
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Human-readable result returned to the caller
    pub message: String,
    pub audit_action: AuditAction,
    pub target: Option<AuditTarget>,
    pub changes: Value,
    pub reason: Option<String>,
    pub metadata: Map<String, Value>,
}

impl ActionOutcome {
    pub fn new(audit_action: AuditAction, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            audit_action,
            target: None,
            changes: Value::Object(Map::new()),
            reason: None,
            metadata: Map::new(),
        }
    }

    pub fn with_target(mut self, target: AuditTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_changes(mut self, changes: Value) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Feature flag gating this action; `None` means always available
    fn feature(&self) -> Option<&'static str> {
        None
    }

    fn subactions(&self) -> &'static [&'static str] {
        &[]
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome>;
}

/// Collaborators the built-in actions need
pub struct BuiltinDeps {
    pub pool: DbPool,
    pub gateway: Arc<dyn PlatformGateway>,
    pub hub: Arc<BridgeHub>,
    pub opening_balance: i64,
}

#[derive(Default)]
pub struct ActionRegistry {
    handlers: BTreeMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in action
    pub fn with_builtins(deps: BuiltinDeps) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EconomyAction::new(deps.pool.clone(), deps.opening_balance)));
        registry.register(Arc::new(ModerationAction::new(deps.gateway.clone())));
        registry.register(Arc::new(RoleAction::new(deps.gateway)));
        registry.register(Arc::new(SettingsAction::new(deps.pool, deps.hub)));
        registry.register(Arc::new(PingAction));
        registry
    }

    /// Add a handler, replacing any handler of the same name
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Resolve an action name and optional subaction to a handler.
    ///
    /// Without an explicit subaction, `economy-transfer` resolves to the
    /// `economy` handler with subaction `transfer`.
    pub fn resolve(
        &self,
        name: &str,
        subaction: Option<&str>,
    ) -> AppResult<(Arc<dyn ActionHandler>, Option<String>)> {
        if let Some(handler) = self.get(name) {
            let subaction = check_subaction(handler.as_ref(), subaction)?;
            return Ok((handler, subaction));
        }

        if subaction.is_none() {
            if let Some((prefix, suffix)) = name.split_once('-') {
                if let Some(handler) = self.get(prefix) {
                    if handler.subactions().contains(&suffix) {
                        return Ok((handler, Some(suffix.to_string())));
                    }
                }
            }
        }

        Err(AppError::UnknownAction(name.to_string()))
    }

    pub fn list(&self) -> Vec<CommandInfo> {
        self.handlers
            .values()
            .map(|handler| CommandInfo {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                feature: handler.feature().map(str::to_string),
                subactions: handler.subactions().iter().map(|s| s.to_string()).collect(),
            })
            .collect()
    }

    /// Distinct feature names owned by registered actions
    pub fn features(&self) -> Vec<String> {
        self.handlers
            .values()
            .filter_map(|handler| handler.feature())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn check_subaction(handler: &dyn ActionHandler, subaction: Option<&str>) -> AppResult<Option<String>> {
    let declared = handler.subactions();
    match subaction {
        None if declared.is_empty() => Ok(None),
        None => Err(AppError::invalid(format!(
            "action '{}' requires a subaction ({})",
            handler.name(),
            declared.join(", ")
        ))),
        Some(sub) if declared.contains(&sub) => Ok(Some(sub.to_string())),
        Some(sub) => Err(AppError::invalid(format!(
            "action '{}' has no subaction '{}'",
            handler.name(),
            sub
        ))),
    }
}
