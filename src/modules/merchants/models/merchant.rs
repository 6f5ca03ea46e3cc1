use serde::{Deserialize, Serialize};

/// The owning account for clients, subscriptions, and invoices.
///
/// `gateway_account_id` is the merchant's connected sub-account on the
/// payment gateway; every gateway call for this merchant's invoices is
/// scoped to it. `gateway_connected` caches whether the sub-account has
/// completed onboarding and can take card payments.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub gateway_account_id: Option<String>,
    pub gateway_connected: bool,
}
