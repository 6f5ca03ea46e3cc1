use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::config::StripeConfig;
use crate::core::{AppError, Result};
use crate::modules::payments::models::{
    CheckoutSession, CheckoutSessionRequest, ManualSettlementRequest, SettlementView,
};
use crate::modules::payments::services::gateway::PaymentGateway;

/// Stripe Connect client. All requests carry the `Stripe-Account` header
/// so they execute against one merchant's connected sub-account.
pub struct StripeGateway {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "Stripe API error {}: {}",
                status, error_body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        account_id: &str,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession> {
        #[derive(Deserialize)]
        struct SessionResponse {
            id: String,
            url: Option<String>,
        }

        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let form: Vec<(&str, String)> = vec![
            ("payment_method_types[0]", "card".to_string()),
            ("mode", "payment".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[invoiceId]", request.invoice_reference.clone()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Stripe API error: {}", e)))?;

        let response = Self::check_response(response).await?;
        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Failed to parse Stripe response: {}", e)))?;

        let checkout_url = session
            .url
            .ok_or_else(|| AppError::external("Stripe session created without a URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
        })
    }

    async fn create_manual_settlement(
        &self,
        account_id: &str,
        request: ManualSettlementRequest,
    ) -> Result<()> {
        #[derive(Deserialize)]
        struct IntentResponse {
            id: String,
        }

        let create_url = format!("{}/v1/payment_intents", self.base_url);
        let form: Vec<(&str, String)> = vec![
            ("amount", request.amount_minor.to_string()),
            ("currency", request.currency.clone()),
            ("description", request.description.clone()),
            ("metadata[invoiceId]", request.invoice_reference.clone()),
            ("metadata[paymentType]", "Cash".to_string()),
            ("metadata[manuallyMarkedAsPaid]", "true".to_string()),
        ];

        let response = self
            .client
            .post(&create_url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Stripe API error: {}", e)))?;

        let response = Self::check_response(response).await?;
        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Failed to parse Stripe response: {}", e)))?;

        // Settle the intent immediately with the test card payment method so
        // the books show a captured payment.
        let confirm_url = format!("{}/v1/payment_intents/{}/confirm", self.base_url, intent.id);
        let response = self
            .client
            .post(&confirm_url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .form(&[("payment_method", "pm_card_visa")])
            .send()
            .await
            .map_err(|e| AppError::external(format!("Stripe API error: {}", e)))?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn list_settlements(
        &self,
        account_id: &str,
        invoice_reference: &str,
        created_since: i64,
    ) -> Result<Vec<SettlementView>> {
        #[derive(Deserialize)]
        struct SessionList {
            data: Vec<SessionObject>,
        }

        #[derive(Deserialize)]
        struct SessionObject {
            id: String,
            status: Option<String>,
            amount_total: Option<i64>,
            currency: Option<String>,
            created: i64,
            #[serde(default)]
            metadata: HashMap<String, String>,
            payment_intent: Option<String>,
        }

        #[derive(Deserialize)]
        struct IntentObject {
            id: String,
            amount: i64,
            currency: String,
            status: String,
            created: i64,
            #[serde(default)]
            payment_method_types: Vec<String>,
        }

        let url = format!("{}/v1/checkout/sessions", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Account", account_id)
            .query(&[
                ("limit", "100".to_string()),
                ("created[gte]", created_since.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::external(format!("Stripe API error: {}", e)))?;

        let response = Self::check_response(response).await?;
        let sessions: SessionList = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Failed to parse Stripe response: {}", e)))?;

        // The sessions API cannot filter by metadata server-side.
        let relevant = sessions
            .data
            .into_iter()
            .filter(|s| s.metadata.get("invoiceId").map(String::as_str) == Some(invoice_reference));

        let mut settlements = Vec::new();
        for session in relevant {
            if let Some(intent_id) = &session.payment_intent {
                let intent_url = format!("{}/v1/payment_intents/{}", self.base_url, intent_id);
                let lookup = self
                    .client
                    .get(&intent_url)
                    .bearer_auth(&self.secret_key)
                    .header("Stripe-Account", account_id)
                    .send()
                    .await;

                let intent: Option<IntentObject> = match lookup {
                    Ok(response) if response.status().is_success() => response.json().await.ok(),
                    Ok(response) => {
                        warn!(
                            intent_id,
                            status = %response.status(),
                            "Skipping settlement with unreadable payment intent"
                        );
                        None
                    }
                    Err(e) => {
                        warn!(intent_id, error = %e, "Skipping settlement after intent lookup failure");
                        None
                    }
                };

                if let Some(intent) = intent {
                    let payment_method = if intent.payment_method_types.is_empty() {
                        "card".to_string()
                    } else {
                        intent.payment_method_types.join(", ")
                    };
                    settlements.push(SettlementView {
                        id: intent.id,
                        amount: Decimal::new(intent.amount, 2),
                        currency: intent.currency,
                        status: intent.status,
                        created: intent.created,
                        payment_method,
                    });
                }
            } else if session.status.as_deref() == Some("complete") {
                // Completed session without an intent still represents money
                // collected through hosted checkout.
                settlements.push(SettlementView {
                    id: session.id,
                    amount: Decimal::new(session.amount_total.unwrap_or(0), 2),
                    currency: session.currency.unwrap_or_else(|| "usd".to_string()),
                    status: "succeeded".to_string(),
                    created: session.created,
                    payment_method: "Stripe Checkout".to_string(),
                });
            }
        }

        Ok(settlements)
    }
}
