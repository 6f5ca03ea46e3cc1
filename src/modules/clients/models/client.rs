use serde::{Deserialize, Serialize};

/// A billed party owned by a merchant. Clients are managed elsewhere; the
/// billing engine only reads them to address notifications.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub currency: String,
    pub language: String,
    pub status: String,
    pub is_deleted: bool,
}
