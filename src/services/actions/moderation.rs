//! Moderation action: ban and kick members

use std::sync::Arc;

use async_trait::async_trait;

use super::{ActionHandler, ActionOutcome};
use crate::models::{AuditAction, AuditTarget, Changes, TargetType};
use crate::services::context::InvocationContext;
use crate::services::gateway::PlatformGateway;
use crate::utils::{AppError, AppResult};

pub struct ModerationAction {
    gateway: Arc<dyn PlatformGateway>,
}

impl ModerationAction {
    pub fn new(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ActionHandler for ModerationAction {
    fn name(&self) -> &'static str {
        "moderation"
    }

    fn description(&self) -> &'static str {
        "Remove members from the server"
    }

    fn feature(&self) -> Option<&'static str> {
        Some("moderation")
    }

    fn subactions(&self) -> &'static [&'static str] {
        &["ban", "kick"]
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let ban = match ctx.subaction() {
            Some("ban") => true,
            Some("kick") => false,
            other => {
                return Err(AppError::invalid(format!(
                    "unsupported moderation subaction: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        let member = ctx
            .get_user("user")
            .await?
            .ok_or_else(|| AppError::invalid("missing parameter 'user'"))?;
        if member.id == ctx.actor().id {
            return Err(AppError::Handler("You cannot moderate yourself".to_string()));
        }
        let reason = ctx.get_string("reason").map(str::to_string);
        let tenant_id = &ctx.tenant().id;

        let (audit_action, verb, state) = if ban {
            self.gateway
                .ban_member(tenant_id, &member.id, reason.as_deref())
                .await?;
            (AuditAction::ModerationBan, "Banned", "banned")
        } else {
            self.gateway
                .kick_member(tenant_id, &member.id, reason.as_deref())
                .await?;
            (AuditAction::ModerationKick, "Kicked", "removed")
        };

        let message = format!("{} {}", verb, member.display_name);
        ctx.reply(&message, false).await?;

        Ok(ActionOutcome::new(audit_action, message)
            .with_target(AuditTarget::new(member.id, member.display_name, TargetType::User))
            .with_changes(Changes::new().field("membership", "member", state).into_value())
            .with_reason(reason))
    }
}
