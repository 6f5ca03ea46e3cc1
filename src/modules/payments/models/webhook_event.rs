use serde::Deserialize;

/// Envelope for a gateway webhook delivery. Only the fields reconciliation
/// acts on are modeled; the rest of the payload stays untouched.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    /// Connected account the event originated from, when scoped
    pub account: Option<String>,

    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Id of the object the event describes (session id, account id, ...).
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }

    /// Correlation key carried in checkout session metadata.
    pub fn invoice_reference(&self) -> Option<&str> {
        self.data
            .object
            .get("metadata")
            .and_then(|m| m.get("invoiceId"))
            .and_then(|v| v.as_str())
    }
}

/// Capability snapshot reported by `account.updated`.
#[derive(Debug, Deserialize)]
pub struct GatewayAccount {
    pub id: String,

    #[serde(default)]
    pub details_submitted: bool,

    #[serde(default)]
    pub charges_enabled: bool,

    #[serde(default)]
    pub payouts_enabled: bool,

    #[serde(default)]
    pub capabilities: AccountCapabilities,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountCapabilities {
    #[serde(default)]
    pub card_payments: Option<String>,
}

impl GatewayAccount {
    /// An account can take card payments only once every capability flag
    /// has landed.
    pub fn is_fully_connected(&self) -> bool {
        self.details_submitted
            && self.charges_enabled
            && self.payouts_enabled
            && self.capabilities.card_payments.as_deref() == Some("active")
    }
}
