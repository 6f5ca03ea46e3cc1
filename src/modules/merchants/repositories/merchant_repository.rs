use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::Result;
use crate::modules::merchants::models::Merchant;

/// Merchant lookups plus the audit trail for manual billing actions.
#[async_trait]
pub trait MerchantRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Merchant>>;

    /// Reverse lookup from the gateway's connected sub-account id, used when
    /// consuming account-level gateway events.
    async fn find_by_gateway_account(&self, account_id: &str) -> Result<Option<Merchant>>;

    async fn set_gateway_connected(&self, id: i64, connected: bool) -> Result<()>;

    /// Append an audit line for a manual action on this merchant's data.
    async fn record_audit(&self, merchant_id: i64, action: &str, at: DateTime<Utc>) -> Result<()>;
}

pub struct PgMerchantRepository {
    pool: PgPool,
}

impl PgMerchantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MerchantRepository for PgMerchantRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            SELECT id, username, email, gateway_account_id, gateway_connected
            FROM merchants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(merchant)
    }

    async fn find_by_gateway_account(&self, account_id: &str) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(
            r#"
            SELECT id, username, email, gateway_account_id, gateway_connected
            FROM merchants
            WHERE gateway_account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(merchant)
    }

    async fn set_gateway_connected(&self, id: i64, connected: bool) -> Result<()> {
        sqlx::query("UPDATE merchants SET gateway_connected = $1 WHERE id = $2")
            .bind(connected)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn record_audit(&self, merchant_id: i64, action: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (merchant_id, action, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(merchant_id)
        .bind(action)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
