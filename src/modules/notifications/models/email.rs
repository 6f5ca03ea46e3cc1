use serde::Serialize;

/// A rendered email ready for the delivery provider.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgement for a delivered message.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    /// Provider-side message id, when the provider reports one
    pub provider_id: Option<String>,
}
