use async_trait::async_trait;

use super::{ActionHandler, ActionOutcome};
use crate::models::AuditAction;
use crate::services::context::InvocationContext;
use crate::utils::AppResult;

/// Liveness check
pub struct PingAction;

#[async_trait]
impl ActionHandler for PingAction {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "Check that the bot is responsive"
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        ctx.reply("Pong!", false).await?;
        Ok(ActionOutcome::new(AuditAction::CommandExecute, "Pong!")
            .with_metadata("origin", ctx.origin().as_str()))
    }
}
