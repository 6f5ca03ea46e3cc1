use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::core::{AppError, Result};
use crate::modules::clients::repositories::ClientRepository;
use crate::modules::invoices::models::Invoice;
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::merchants::repositories::MerchantRepository;
use crate::modules::notifications::services::{invoice_email, NotificationGateway};
use crate::modules::scheduler::services::batch::{BatchReport, RowOutcome};

/// Daily payment reminders. An invoice gets at most one reminder ever,
/// guarded by the `last_reminder_sent_at` stamp; the send happens first and
/// the stamp second, so a failed send is retried the next day.
pub struct ReminderRunService {
    invoices: Arc<dyn InvoiceRepository>,
    clients: Arc<dyn ClientRepository>,
    merchants: Arc<dyn MerchantRepository>,
    mailer: Arc<dyn NotificationGateway>,
    base_url: String,
}

impl ReminderRunService {
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
            base_url,
        }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<BatchReport> {
        let candidates = self.invoices.find_reminder_candidates().await?;
        info!(
            candidate_count = candidates.len(),
            %today,
            "Starting reminder sweep"
        );

        let mut report = BatchReport::default();
        for invoice in candidates {
            let Some(id) = invoice.id else {
                warn!("Skipping reminder candidate loaded without id");
                continue;
            };

            if !Self::in_reminder_window(&invoice, today) {
                report.record(id, RowOutcome::Skipped("Outside reminder window".to_string()));
                continue;
            }

            let outcome = match self.deliver_reminder(&invoice).await {
                Err(e) => {
                    // Nothing was stamped; tomorrow's run retries this row.
                    error!(invoice_id = id, error = %e, "Reminder delivery failed");
                    RowOutcome::Failed(e.to_string())
                }
                Ok(()) => match self.invoices.stamp_reminder_sent(id, Utc::now()).await {
                    Ok(()) => RowOutcome::Succeeded,
                    Err(e) => {
                        // The reminder went out but the stamp did not land;
                        // the next run may send a duplicate.
                        error!(invoice_id = id, error = %e, "Reminder sent but stamp failed");
                        RowOutcome::Partial(format!("Reminder sent but stamp failed: {}", e))
                    }
                },
            };
            report.record(id, outcome);
        }

        info!(
            sent = report.succeeded(),
            partial = report.partial(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Reminder sweep complete"
        );
        Ok(report)
    }

    /// The window opens `reminder_days_before` days ahead of the due date
    /// and closes on the due date itself.
    fn in_reminder_window(invoice: &Invoice, today: NaiveDate) -> bool {
        let (Some(due), Some(days_before)) = (invoice.payment_due_date, invoice.reminder_days_before)
        else {
            return false;
        };
        if days_before < 0 {
            return false;
        }
        let Some(window_start) = due.checked_sub_days(Days::new(days_before as u64)) else {
            return false;
        };

        window_start <= today && today <= due
    }

    async fn deliver_reminder(&self, invoice: &Invoice) -> Result<()> {
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

        let message = invoice_email(invoice, &client, &merchant, &self.base_url, true);
        self.mailer.send(&message).await?;
        Ok(())
    }
}
