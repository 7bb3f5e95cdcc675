//! Economy action: coin transfers between members and balance lookups

use async_trait::async_trait;
use serde_json::json;

use super::{ActionHandler, ActionOutcome};
use crate::db::economy_repository::TransferRefusal;
use crate::db::{DbPool, EconomyRepository};
use crate::models::{AuditAction, AuditTarget, TargetType};
use crate::services::context::InvocationContext;
use crate::utils::{AppError, AppResult};

pub struct EconomyAction {
    pool: DbPool,
    opening_balance: i64,
}

impl EconomyAction {
    pub fn new(pool: DbPool, opening_balance: i64) -> Self {
        Self { pool, opening_balance }
    }

    fn ledger(&self) -> EconomyRepository<'_> {
        EconomyRepository::new(&self.pool).with_opening_balance(self.opening_balance)
    }

    async fn transfer(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let recipient = ctx
            .get_user("to")
            .await?
            .ok_or_else(|| AppError::invalid("missing parameter 'to'"))?;
        let amount = ctx.require_integer("amount")?;
        if amount <= 0 {
            return Err(AppError::invalid("amount must be a positive number"));
        }
        let sender = ctx.actor();
        if recipient.id == sender.id {
            return Err(AppError::Handler("You cannot transfer coins to yourself".to_string()));
        }

        let tenant_id = &ctx.tenant().id;
        let receipt = match self
            .ledger()
            .transfer(tenant_id, &sender.id, &recipient.id, amount)
            .await?
        {
            Ok(receipt) => receipt,
            Err(TransferRefusal::InsufficientFunds { balance, requested }) => {
                return Err(AppError::Handler(format!(
                    "Insufficient funds: balance is {}, tried to send {}",
                    balance, requested
                )))
            }
        };

        let message = format!("Transferred {} coins to {}", amount, recipient.display_name);
        ctx.reply(&message, false).await?;

        Ok(ActionOutcome::new(AuditAction::EconomyTransfer, message)
            .with_target(AuditTarget::new(
                recipient.id.clone(),
                recipient.display_name.clone(),
                TargetType::User,
            ))
            .with_changes(json!({
                "amount": amount,
                "senderBalance": { "old": receipt.from_before, "new": receipt.from_after },
                "recipientBalance": { "old": receipt.to_before, "new": receipt.to_after },
            }))
            .with_reason(ctx.get_string("reason").map(str::to_string)))
    }

    async fn balance(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        let user = match ctx.get_user("user").await? {
            Some(user) => user,
            None => ctx.actor().clone(),
        };
        let balance = self.ledger().balance(&ctx.tenant().id, &user.id).await?;

        let message = format!("{} has {} coins", user.display_name, balance);
        ctx.reply(&message, true).await?;

        Ok(ActionOutcome::new(AuditAction::CommandExecute, message)
            .with_target(AuditTarget::new(user.id, user.display_name, TargetType::User))
            .with_metadata("balance", balance))
    }
}

#[async_trait]
impl ActionHandler for EconomyAction {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn description(&self) -> &'static str {
        "Server currency: transfer coins and check balances"
    }

    fn feature(&self) -> Option<&'static str> {
        Some("economy")
    }

    fn subactions(&self) -> &'static [&'static str] {
        &["transfer", "balance"]
    }

    async fn execute(&self, ctx: &dyn InvocationContext) -> AppResult<ActionOutcome> {
        match ctx.subaction() {
            Some("transfer") => self.transfer(ctx).await,
            Some("balance") => self.balance(ctx).await,
            other => Err(AppError::invalid(format!(
                "unsupported economy subaction: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}
