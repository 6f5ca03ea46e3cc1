use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::core::{AppError, Result};
use crate::modules::clients::repositories::ClientRepository;
use crate::modules::invoices::models::Invoice;
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::merchants::repositories::MerchantRepository;
use crate::modules::notifications::services::{invoice_email, NotificationGateway};
use crate::modules::scheduler::services::batch::{BatchReport, RowOutcome};
use crate::modules::subscriptions::models::{ScheduleStep, Subscription};
use crate::modules::subscriptions::repositories::SubscriptionRepository;

/// Daily subscription billing: every Active subscription whose next invoice
/// date has arrived materializes one invoice, gets its email sent, and has
/// its schedule moved forward.
pub struct BillingRunService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    clients: Arc<dyn ClientRepository>,
    merchants: Arc<dyn MerchantRepository>,
    mailer: Arc<dyn NotificationGateway>,
    base_url: String,
}

impl BillingRunService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        clients: Arc<dyn ClientRepository>,
        merchants: Arc<dyn MerchantRepository>,
        mailer: Arc<dyn NotificationGateway>,
        base_url: String,
    ) -> Self {
        Self {
            subscriptions,
            invoices,
            clients,
            merchants,
            mailer,
            base_url,
        }
    }

    /// Process every due subscription. One subscription's failure never
    /// aborts the batch; the report carries each row's outcome.
    pub async fn run(&self, today: NaiveDate) -> Result<BatchReport> {
        let due = self.subscriptions.find_due(today).await?;
        info!(due_count = due.len(), %today, "Starting subscription billing run");

        let mut report = BatchReport::default();
        for subscription in due {
            let Some(id) = subscription.id else {
                warn!("Skipping due subscription loaded without id");
                continue;
            };

            let outcome = match self.bill_subscription(&subscription, today).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(subscription_id = id, error = %e, "Subscription billing failed");
                    RowOutcome::Failed(e.to_string())
                }
            };
            report.record(id, outcome);
        }

        info!(
            succeeded = report.succeeded(),
            partial = report.partial(),
            failed = report.failed(),
            "Subscription billing run complete"
        );
        Ok(report)
    }

    async fn bill_subscription(
        &self,
        subscription: &Subscription,
        today: NaiveDate,
    ) -> Result<RowOutcome> {
        let subscription_id = subscription
            .id
            .ok_or_else(|| AppError::internal("Subscription loaded without id"))?;

        let invoice = subscription.materialize_invoice(today)?;
        let invoice = self.invoices.create(&invoice).await?;
        let invoice_id = invoice
            .id
            .ok_or_else(|| AppError::internal("Created invoice has no id"))?;

        // Email delivery is non-fatal: the invoice already exists in Sent
        // and the schedule must still advance.
        let email_failure = match self.deliver_invoice(&invoice).await {
            Ok(()) => {
                self.invoices.stamp_sent_at(invoice_id, Utc::now()).await?;
                None
            }
            Err(e) => {
                warn!(invoice_id, error = %e, "Invoice email delivery failed");
                Some(e)
            }
        };

        match subscription.next_schedule_step()? {
            ScheduleStep::Advance(next) => {
                self.subscriptions.advance_schedule(subscription_id, next).await?;
                info!(subscription_id, invoice_id, %next, "Billed subscription");
            }
            ScheduleStep::Pause => {
                self.subscriptions.pause_completed(subscription_id).await?;
                info!(subscription_id, invoice_id, "Billed final cycle, subscription paused");
            }
        }

        match email_failure {
            None => Ok(RowOutcome::Succeeded),
            Some(e) => Ok(RowOutcome::Partial(format!("Invoice email failed: {}", e))),
        }
    }

    async fn deliver_invoice(&self, invoice: &Invoice) -> Result<()> {
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

        let message = invoice_email(invoice, &client, &merchant, &self.base_url, false);
        self.mailer.send(&message).await?;
        Ok(())
    }
}
