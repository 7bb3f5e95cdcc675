//! Role action: create and delete server roles

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{ActionHandler, ActionOutcome};
use crate::models::{AuditAction, AuditTarget, Changes, TargetType};
use crate::services::context::InvocationContext;
use crate::services::gateway::PlatformGateway;
use crate::utils::{AppError, AppResult};

pub struct RoleAction {
    gateway: Arc<dyn PlatformGateway>,
}

impl RoleAction {
    pub fn new(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { gateway }
    }

    async fn create(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let name = ctx.require_string("name")?.trim().to_string();
        if name.is_empty() || name.len() > 100 {
            return Err(AppError::invalid("role name must be 1-100 characters"));
        }
        let color = match ctx.get_integer("color")? {
            Some(c) if (0..=0xFF_FFFF).contains(&c) => Some(c as u32),
            Some(_) => return Err(AppError::invalid("color must be between 0 and 16777215")),
            None => None,
        };

        let role = self.gateway.create_role(&ctx.tenant().id, &name, color).await?;

        let message = format!("Created role {}", role.name);
        ctx.reply(&message, false).await?;

        Ok(ActionOutcome::new(AuditAction::RoleCreate, message)
            .with_target(AuditTarget::new(role.id.clone(), role.name.clone(), TargetType::Role))
            .with_changes(
                Changes::new()
                    .field("name", Value::Null, role.name)
                    .field("color", Value::Null, role.color)
                    .into_value(),
            )
            .with_reason(ctx.get_string("reason").map(str::to_string)))
    }

    async fn delete(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let role = ctx
            .get_role("role")
            .await?
            .ok_or_else(|| AppError::invalid("missing parameter 'role'"))?;

        self.gateway.delete_role(&ctx.tenant().id, &role.id).await?;

        let message = format!("Deleted role {}", role.name);
        ctx.reply(&message, false).await?;

        Ok(ActionOutcome::new(AuditAction::RoleDelete, message)
            .with_target(AuditTarget::new(role.id, role.name.clone(), TargetType::Role))
            .with_changes(Changes::new().field("name", role.name, Value::Null).into_value())
            .with_reason(ctx.get_string("reason").map(str::to_string)))
    }
}

#[async_trait]
impl ActionHandler for RoleAction {
    fn name(&self) -> &'static str {
        "role"
    }

    fn description(&self) -> &'static str {
        "Manage server roles"
    }

    fn feature(&self) -> Option<&'static str> {
        Some("roles")
    }

    fn subactions(&self) -> &'static [&'static str] {
        &["create", "delete"]
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        match ctx.subaction() {
            Some("create") => self.create(ctx).await,
            Some("delete") => self.delete(ctx).await,
            other => Err(AppError::invalid(format!(
                "unsupported role subaction: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}
