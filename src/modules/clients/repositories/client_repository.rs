use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::Result;
use crate::modules::clients::models::Client;

/// Read-side access to clients.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>>;
}

pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, owner_id, name, email, address, currency, language,
                   status, is_deleted
            FROM clients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }
}
