use rust_decimal::Decimal;
use serde::Serialize;

/// Hosted checkout page created for an invoice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Amount in the currency's minor units
    pub amount_minor: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    pub product_name: String,
    /// Correlation key stored in session metadata
    pub invoice_reference: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Parameters for the bookkeeping settlement recorded when an invoice is
/// marked paid outside the gateway.
#[derive(Debug, Clone)]
pub struct ManualSettlementRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub invoice_reference: String,
    pub description: String,
}

/// A settlement as presented to the merchant: either a captured payment
/// intent or a completed checkout session without one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementView {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    /// Unix timestamp reported by the gateway
    pub created: i64,
    pub payment_method: String,
}
