use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Invoice, InvoiceStatus};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::merchants::models::Merchant;
use crate::modules::merchants::repositories::MerchantRepository;
use crate::modules::payments::models::{CheckoutSession, CheckoutSessionRequest, SettlementView};
use crate::modules::payments::services::gateway::{minor_units, PaymentGateway};

/// How far back settlement lookups search the gateway.
const SETTLEMENT_LOOKBACK_SECS: i64 = 30 * 24 * 60 * 60;

/// Hosted checkout sessions and settlement lookups for invoices.
pub struct CheckoutService {
    invoices: Arc<dyn InvoiceRepository>,
    merchants: Arc<dyn MerchantRepository>,
    gateway: Arc<dyn PaymentGateway>,
    base_url: String,
}

impl CheckoutService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        merchants: Arc<dyn MerchantRepository>,
        gateway: Arc<dyn PaymentGateway>,
        base_url: String,
    ) -> Self {
        Self {
            invoices,
            merchants,
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted checkout page for the invoice's stored total.
    /// The session carries the invoice's public id as its correlation key,
    /// which the webhook reconciliation reads back.
    pub async fn create_session(&self, reference: &str) -> Result<CheckoutSession> {
        let invoice = self.resolve_invoice(reference).await?;
        let merchant = self.resolve_merchant(&invoice).await?;
        let account_id = merchant
            .gateway_account_id
            .as_deref()
            .ok_or_else(|| AppError::not_found("Merchant gateway account"))?;

        let request = CheckoutSessionRequest {
            amount_minor: minor_units(invoice.total)?,
            currency: invoice.currency.to_lowercase(),
            product_name: format!("Invoice #{}", invoice.public_id),
            invoice_reference: invoice.public_id.clone(),
            success_url: format!(
                "{}/invoices/{}?status=success",
                self.base_url, invoice.public_id
            ),
            cancel_url: format!(
                "{}/invoices/{}?status=cancelled",
                self.base_url, invoice.public_id
            ),
        };

        let session = self
            .gateway
            .create_checkout_session(account_id, request)
            .await?;
        info!(
            invoice_id = invoice.id,
            session_id = %session.id,
            "Created checkout session"
        );
        Ok(session)
    }

    /// Gateway settlements recorded against a paid invoice. Unpaid invoices
    /// report an empty list without touching the gateway.
    pub async fn list_settlements(
        &self,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SettlementView>> {
        let invoice = self.resolve_invoice(reference).await?;
        if invoice.status != InvoiceStatus::Paid {
            return Ok(Vec::new());
        }

        let merchant = self.resolve_merchant(&invoice).await?;
        let account_id = merchant
            .gateway_account_id
            .as_deref()
            .ok_or_else(|| AppError::not_found("Merchant gateway account"))?;

        let created_since = now.timestamp() - SETTLEMENT_LOOKBACK_SECS;
        self.gateway
            .list_settlements(account_id, &invoice.public_id, created_since)
            .await
    }

    async fn resolve_invoice(&self, reference: &str) -> Result<Invoice> {
        self.invoices
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", reference)))
    }

    async fn resolve_merchant(&self, invoice: &Invoice) -> Result<Merchant> {
        self.merchants
            .find_by_id(invoice.owner_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Merchant {}", invoice.owner_id)))
    }
}
