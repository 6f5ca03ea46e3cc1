// Payment reconciliation: webhook-driven settlement of invoices plus the
// manual mark-paid path. Both funnel into conditional status transitions,
// so a delivery that lost its race is acknowledged rather than retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Invoice, InvoiceStatus};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::merchants::repositories::MerchantRepository;
use crate::modules::payments::models::{GatewayAccount, ManualSettlementRequest, WebhookEvent};
use crate::modules::payments::services::gateway::{minor_units, PaymentGateway};
use crate::modules::payments::services::signature::WebhookVerifier;

/// Result of a manual mark-paid request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    Marked,
    AlreadyPaid,
}

pub struct ReconciliationService {
    invoices: Arc<dyn InvoiceRepository>,
    merchants: Arc<dyn MerchantRepository>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
}

impl ReconciliationService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        merchants: Arc<dyn MerchantRepository>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            invoices,
            merchants,
            gateway,
            verifier,
        }
    }

    /// Authenticate and apply one webhook delivery.
    ///
    /// The signature check runs before the body is even parsed; a rejected
    /// delivery mutates nothing. Recognized events apply conditional
    /// transitions, unknown events are acknowledged untouched so the
    /// gateway stops retrying them.
    pub async fn handle_event(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.verifier.verify(payload, signature_header, now)?;

        let event: WebhookEvent = serde_json::from_slice(payload)?;

        match event.event_type.as_str() {
            "checkout.session.completed" => self.settle_completed_session(&event).await,
            "checkout.session.expired" => self.release_expired_session(&event).await,
            "account.updated" => self.refresh_account_connectivity(&event).await,
            other => {
                info!(event_type = other, "Acknowledged unhandled gateway event");
                Ok(())
            }
        }
    }

    async fn settle_completed_session(&self, event: &WebhookEvent) -> Result<()> {
        let Some(reference) = event.invoice_reference() else {
            warn!("Completed session carries no invoice reference");
            return Ok(());
        };

        let Some(invoice) = self.invoices.find_by_reference(reference).await? else {
            warn!(reference, "Completed session references an unknown invoice");
            return Ok(());
        };
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        let updated = self
            .invoices
            .transition_status(id, &InvoiceStatus::payable(), InvoiceStatus::Paid)
            .await?;

        if updated {
            info!(invoice_id = id, "Invoice paid via checkout session");
        } else {
            // Already Paid or otherwise settled; the event is stale.
            info!(invoice_id = id, "Completed session arrived for a settled invoice");
        }
        Ok(())
    }

    async fn release_expired_session(&self, event: &WebhookEvent) -> Result<()> {
        let Some(reference) = event.invoice_reference() else {
            warn!("Expired session carries no invoice reference");
            return Ok(());
        };

        let Some(invoice) = self.invoices.find_by_reference(reference).await? else {
            warn!(reference, "Expired session references an unknown invoice");
            return Ok(());
        };
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        // Only an open (Sent/Opened) invoice rolls back to Sent; a Paid or
        // Overdue invoice is left exactly as it is.
        let updated = self
            .invoices
            .transition_status(
                id,
                &[InvoiceStatus::Sent, InvoiceStatus::Opened],
                InvoiceStatus::Sent,
            )
            .await?;

        if updated {
            info!(invoice_id = id, "Checkout session expired, invoice reopened for payment");
        } else {
            info!(invoice_id = id, "Expired session ignored for invoice in a later state");
        }
        Ok(())
    }

    async fn refresh_account_connectivity(&self, event: &WebhookEvent) -> Result<()> {
        let account: GatewayAccount = serde_json::from_value(event.data.object.clone())?;

        let Some(merchant) = self.merchants.find_by_gateway_account(&account.id).await? else {
            warn!(account_id = %account.id, "Account update for an unlinked gateway account");
            return Ok(());
        };

        let connected = account.is_fully_connected();
        self.merchants
            .set_gateway_connected(merchant.id, connected)
            .await?;
        info!(
            merchant_id = merchant.id,
            connected, "Refreshed gateway connectivity from account update"
        );
        Ok(())
    }

    /// Merchant-triggered settlement of an invoice paid outside the gateway
    /// (cash, bank transfer). Transitions to Paid, writes an audit line,
    /// and mirrors the payment onto the gateway books best-effort.
    pub async fn mark_paid_manual(
        &self,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<MarkPaidOutcome> {
        let invoice = self
            .invoices
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", reference)))?;
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        if invoice.status == InvoiceStatus::Paid {
            return Ok(MarkPaidOutcome::AlreadyPaid);
        }

        let updated = self
            .invoices
            .transition_status(id, &InvoiceStatus::payable(), InvoiceStatus::Paid)
            .await?;
        if !updated {
            return Err(AppError::state_conflict(format!(
                "Invoice {} cannot be marked paid from status {}",
                invoice.public_id, invoice.status
            )));
        }

        self.merchants
            .record_audit(
                invoice.owner_id,
                &format!("Marked invoice #{} as paid (cash payment)", invoice.public_id),
                now,
            )
            .await?;
        info!(invoice_id = id, "Invoice manually marked as paid");

        self.record_settlement_best_effort(&invoice).await;
        Ok(MarkPaidOutcome::Marked)
    }

    /// Mirror a manual payment onto the gateway. Failures are logged and
    /// swallowed: the invoice is already Paid and that must stand.
    async fn record_settlement_best_effort(&self, invoice: &Invoice) {
        let merchant = match self.merchants.find_by_id(invoice.owner_id).await {
            Ok(Some(merchant)) => merchant,
            Ok(None) => {
                warn!(owner_id = invoice.owner_id, "No merchant for settlement mirroring");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Merchant lookup failed during settlement mirroring");
                return;
            }
        };

        let Some(account_id) = merchant.gateway_account_id.as_deref() else {
            info!(
                merchant_id = merchant.id,
                "Merchant has no gateway account, skipping settlement record"
            );
            return;
        };

        let amount_minor = match minor_units(invoice.total) {
            Ok(amount) => amount,
            Err(e) => {
                warn!(error = %e, "Settlement amount conversion failed");
                return;
            }
        };

        let request = ManualSettlementRequest {
            amount_minor,
            currency: invoice.currency.to_lowercase(),
            invoice_reference: invoice.public_id.clone(),
            description: format!("Manual cash payment for Invoice #{}", invoice.public_id),
        };

        if let Err(e) = self
            .gateway
            .create_manual_settlement(account_id, request)
            .await
        {
            warn!(
                invoice_id = invoice.id,
                error = %e,
                "Best-effort settlement record failed"
            );
        }
    }
}
