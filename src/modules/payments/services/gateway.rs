use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::{AppError, Result};
use crate::modules::payments::models::{
    CheckoutSession, CheckoutSessionRequest, ManualSettlementRequest, SettlementView,
};

/// Payment gateway boundary.
///
/// Every call is scoped to one merchant's connected sub-account through
/// the required `account_id`; no call can touch another tenant's gateway
/// data.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout page for an invoice.
    async fn create_checkout_session(
        &self,
        account_id: &str,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession>;

    /// Record a settlement for a payment collected outside the gateway.
    async fn create_manual_settlement(
        &self,
        account_id: &str,
        request: ManualSettlementRequest,
    ) -> Result<()>;

    /// Settlements correlated to one invoice, created at or after
    /// `created_since` (unix seconds).
    async fn list_settlements(
        &self,
        account_id: &str,
        invoice_reference: &str,
        created_since: i64,
    ) -> Result<Vec<SettlementView>>;
}

/// Convert a two-decimal major-unit amount to the gateway's integer minor
/// units.
pub fn minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| AppError::internal(format!("Amount {} out of range", amount)))
}
