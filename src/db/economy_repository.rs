//! Economy ledger repository

use sqlx::SqlitePool;

use crate::utils::AppError;

/// Balances of both parties after a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_before: i64,
    pub from_after: i64,
    pub to_before: i64,
    pub to_after: i64,
}

/// Reasons a transfer is refused without touching the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRefusal {
    InsufficientFunds { balance: i64, requested: i64 },
}

pub struct EconomyRepository<'a> {
    pool: &'a SqlitePool,
    opening_balance: i64,
}

impl<'a> EconomyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            opening_balance: 0,
        }
    }

    /// Balance credited to users the ledger has not seen yet
    pub fn with_opening_balance(mut self, opening_balance: i64) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    /// Current balance, the opening balance for users without a ledger row
    pub async fn balance(&self, tenant_id: &str, user_id: &str) -> Result<i64, AppError> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT balance FROM economy_balances WHERE tenant_id = ? AND user_id = ?",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(balance.unwrap_or(self.opening_balance))
    }

    /// Set a balance outright (seeding and administration)
    pub async fn set_balance(&self, tenant_id: &str, user_id: &str, balance: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO economy_balances (tenant_id, user_id, balance)
            VALUES (?, ?, ?)
            ON CONFLICT(tenant_id, user_id) DO UPDATE SET balance = excluded.balance
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(balance)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Move `amount` from one user to another inside a single transaction
    pub async fn transfer(
        &self,
        tenant_id: &str,
        from: &str,
        to: &str,
        amount: i64,
    ) -> Result<Result<TransferReceipt, TransferRefusal>, AppError> {
        let mut tx = self.pool.begin().await?;

        let from_before = sqlx::query_scalar::<_, i64>(
            "SELECT balance FROM economy_balances WHERE tenant_id = ? AND user_id = ?",
        )
        .bind(tenant_id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(self.opening_balance);

        if from_before < amount {
            tx.rollback().await?;
            return Ok(Err(TransferRefusal::InsufficientFunds {
                balance: from_before,
                requested: amount,
            }));
        }

        let to_before = sqlx::query_scalar::<_, i64>(
            "SELECT balance FROM economy_balances WHERE tenant_id = ? AND user_id = ?",
        )
        .bind(tenant_id)
        .bind(to)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(self.opening_balance);

        for (user, balance) in [(from, from_before - amount), (to, to_before + amount)] {
            sqlx::query(
                r#"
                INSERT INTO economy_balances (tenant_id, user_id, balance)
                VALUES (?, ?, ?)
                ON CONFLICT(tenant_id, user_id) DO UPDATE SET balance = excluded.balance
                "#,
            )
            .bind(tenant_id)
            .bind(user)
            .bind(balance)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Ok(TransferReceipt {
            from_before,
            from_after: from_before - amount,
            to_before,
            to_after: to_before + amount,
        }))
    }
}
