use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::MailerConfig;
use crate::core::{AppError, Result};
use crate::modules::clients::models::Client as BillingClient;
use crate::modules::invoices::models::Invoice;
use crate::modules::merchants::models::Merchant;
use crate::modules::notifications::models::{DeliveryReceipt, EmailMessage};

/// Transactional email provider boundary.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt>;
}

/// HTTP mail provider client.
pub struct HttpMailer {
    client: Client,
    config: MailerConfig,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationGateway for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt> {
        #[derive(Serialize)]
        struct SendRequest<'a> {
            from: &'a str,
            to: &'a str,
            subject: &'a str,
            html: &'a str,
        }

        #[derive(Deserialize)]
        struct SendResponse {
            id: Option<String>,
        }

        let request = SendRequest {
            from: &self.config.from_address,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Mail provider error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "Mail provider error {}: {}",
                status, error_body
            )));
        }

        let provider_id = response
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|body| body.id);

        Ok(DeliveryReceipt { provider_id })
    }
}

/// Render the invoice email. The reminder flavor reuses the same summary
/// with a nudge about the upcoming due date.
pub fn invoice_email(
    invoice: &Invoice,
    client: &BillingClient,
    merchant: &Merchant,
    base_url: &str,
    reminder: bool,
) -> EmailMessage {
    let subject = if reminder {
        format!("Payment reminder: Invoice #{}", invoice.public_id)
    } else {
        format!("Invoice #{}", invoice.public_id)
    };

    let intro = if reminder {
        "This is a friendly reminder about your invoice from"
    } else {
        "You have received a new invoice from"
    };

    let due_line = invoice
        .payment_due_date
        .map(|due| format!("<p>Payment is due by {}.</p>", due))
        .unwrap_or_default();

    let url = format!(
        "{}/invoices/{}",
        base_url.trim_end_matches('/'),
        invoice.public_id
    );

    let html = format!(
        "<div>\
         <h2>{}</h2>\
         <p>Hi {},</p>\
         <p>{} {}.</p>\
         <p>Amount due: <strong>{} {}</strong></p>\
         {}\
         <p><a href=\"{}\">View invoice</a></p>\
         </div>",
        subject, client.name, intro, merchant.username, invoice.total, invoice.currency, due_line, url
    );

    EmailMessage {
        to: client.email.clone(),
        subject,
        html,
    }
}
