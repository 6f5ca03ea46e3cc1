use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::clients::repositories::ClientRepository;
use crate::modules::invoices::models::{Invoice, InvoiceStatus, LineItem, TaxLine};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::merchants::repositories::MerchantRepository;
use crate::modules::notifications::services::{invoice_email, NotificationGateway};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub owner_id: i64,
    pub client_id: i64,
    pub currency: String,
    pub language: String,
    /// Defaults to today when omitted
    pub issue_date: Option<NaiveDate>,
    pub payment_due_date: Option<NaiveDate>,
    pub line_items: Vec<LineItem>,
    pub discount_pct: Option<Decimal>,
    pub tax1: Option<TaxLine>,
    pub tax2: Option<TaxLine>,
    #[serde(default = "default_true")]
    pub accept_card: bool,
    #[serde(default)]
    pub accept_alt: bool,
    pub notes: Option<String>,
    #[serde(default)]
    pub enable_reminders: bool,
    pub reminder_days_before: Option<i32>,
}

fn default_true() -> bool {
    true
}

/// Full replacement of a Draft invoice's editable fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    pub client_id: i64,
    pub currency: String,
    pub language: String,
    pub issue_date: NaiveDate,
    pub payment_due_date: Option<NaiveDate>,
    pub line_items: Vec<LineItem>,
    pub discount_pct: Option<Decimal>,
    pub tax1: Option<TaxLine>,
    pub tax2: Option<TaxLine>,
    #[serde(default = "default_true")]
    pub accept_card: bool,
    #[serde(default)]
    pub accept_alt: bool,
    pub notes: Option<String>,
    #[serde(default)]
    pub enable_reminders: bool,
    pub reminder_days_before: Option<i32>,
}

/// Outcome of a view-tracking call. `opened_at` is present only when the
/// invoice has an open timestamp to report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackOpenReport {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
}

pub struct InvoiceService {
    invoices: Arc<dyn InvoiceRepository>,
    clients: Arc<dyn ClientRepository>,
    merchants: Arc<dyn MerchantRepository>,
    mailer: Arc<dyn NotificationGateway>,
    base_url: String,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        clients: Arc<dyn ClientRepository>,
        merchants: Arc<dyn MerchantRepository>,
        mailer: Arc<dyn NotificationGateway>,
        base_url: String,
    ) -> Self {
        Self {
            invoices,
            clients,
            merchants,
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create(&self, request: CreateInvoiceRequest, today: NaiveDate) -> Result<Invoice> {
        self.clients
            .find_by_id(request.client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Client {}", request.client_id)))?;

        let line_items = validated_line_items(request.line_items)?;

        let invoice = Invoice::new(
            request.owner_id,
            request.client_id,
            request.currency,
            request.language,
            request.issue_date.unwrap_or(today),
            request.payment_due_date,
            line_items,
            request.discount_pct,
            request.tax1,
            request.tax2,
            request.accept_card,
            request.accept_alt,
            request.notes,
            request.enable_reminders,
            request.reminder_days_before,
        )?;

        let created = self.invoices.create(&invoice).await?;
        info!(
            invoice_id = created.id,
            public_id = %created.public_id,
            total = %created.total,
            "Created invoice"
        );
        Ok(created)
    }

    pub async fn get(&self, reference: &str) -> Result<Invoice> {
        self.invoices
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", reference)))
    }

    /// Replace the editable fields of a Draft invoice and recompute its
    /// total. Anything past Draft keeps its stored total and rejects edits.
    pub async fn update_draft(
        &self,
        reference: &str,
        request: UpdateInvoiceRequest,
    ) -> Result<Invoice> {
        let current = self.get(reference).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(AppError::state_conflict(format!(
                "Cannot edit a {} invoice",
                current.status
            )));
        }
        let id = current
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        self.clients
            .find_by_id(request.client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Client {}", request.client_id)))?;

        let line_items = validated_line_items(request.line_items)?;

        // Rebuild through the constructor so field validation and the total
        // recomputation stay in one place, then restore the row identity.
        let mut updated = Invoice::new(
            current.owner_id,
            request.client_id,
            request.currency,
            request.language,
            request.issue_date,
            request.payment_due_date,
            line_items,
            request.discount_pct,
            request.tax1,
            request.tax2,
            request.accept_card,
            request.accept_alt,
            request.notes,
            request.enable_reminders,
            request.reminder_days_before,
        )?;
        updated.id = current.id;
        updated.public_id = current.public_id;
        updated.subscription_id = current.subscription_id;

        // Conditional write: the row may have left Draft since we read it.
        if !self.invoices.update_draft(&updated).await? {
            return Err(AppError::state_conflict(format!(
                "Invoice {} is no longer a draft",
                updated.public_id
            )));
        }

        info!(invoice_id = id, total = %updated.total, "Updated draft invoice");
        self.invoices
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", id)))
    }

    /// Send a Draft invoice to its client. The email goes out first; the
    /// status write happens only after the mail provider accepted it, so a
    /// delivery failure leaves the invoice in Draft.
    pub async fn send(&self, reference: &str, now: DateTime<Utc>) -> Result<Invoice> {
        let invoice = self.get(reference).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(AppError::state_conflict(format!(
                "Cannot send a {} invoice",
                invoice.status
            )));
        }
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        let client = self
            .clients
            .find_by_id(invoice.client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Client {}", invoice.client_id)))?;
        let merchant = self
            .merchants
            .find_by_id(invoice.owner_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Merchant {}", invoice.owner_id)))?;

        let email = invoice_email(&invoice, &client, &merchant, &self.base_url, false);
        self.mailer.send(&email).await?;

        if !self.invoices.mark_sent(id, now).await? {
            return Err(AppError::state_conflict(format!(
                "Invoice {} is no longer a draft",
                invoice.public_id
            )));
        }

        info!(invoice_id = id, public_id = %invoice.public_id, "Sent invoice");
        self.invoices
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", id)))
    }

    /// Record that the client viewed the invoice. Fires the Sent → Opened
    /// transition exactly once; repeat calls and calls against any other
    /// status report without mutating.
    pub async fn track_open(&self, reference: &str, now: DateTime<Utc>) -> Result<TrackOpenReport> {
        let invoice = self.get(reference).await?;

        if let Some(opened_at) = invoice.opened_at {
            return Ok(TrackOpenReport {
                message: "Invoice already tracked",
                opened_at: Some(opened_at),
                status: invoice.status,
            });
        }

        if invoice.status == InvoiceStatus::Sent {
            let id = invoice
                .id
                .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;
            if self.invoices.mark_opened(id, now).await? {
                info!(invoice_id = id, public_id = %invoice.public_id, "Invoice opened");
                return Ok(TrackOpenReport {
                    message: "Invoice marked as opened",
                    opened_at: Some(now),
                    status: InvoiceStatus::Opened,
                });
            }
        }

        Ok(TrackOpenReport {
            message: "Invoice view tracked",
            opened_at: None,
            status: invoice.status,
        })
    }

    /// Tombstone an invoice. The row survives with `is_deleted` set; terminal
    /// states refuse.
    pub async fn delete(&self, reference: &str) -> Result<()> {
        let invoice = self.get(reference).await?;
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Invoice loaded without id"))?;

        if !self.invoices.tombstone(id).await? {
            return Err(AppError::state_conflict(format!(
                "Cannot delete a {} invoice",
                invoice.status
            )));
        }

        info!(invoice_id = id, public_id = %invoice.public_id, "Deleted invoice");
        Ok(())
    }
}

fn validated_line_items(items: Vec<LineItem>) -> Result<Vec<LineItem>> {
    // Deserialization bypasses the validating constructor; rebuild each row.
    items
        .into_iter()
        .map(|item| LineItem::new(item.name, item.amount, item.quantity))
        .collect()
}
