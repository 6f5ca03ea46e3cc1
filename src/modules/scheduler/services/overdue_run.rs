use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::core::Result;
use crate::modules::invoices::repositories::InvoiceRepository;

/// Daily overdue sweep: Sent invoices whose payment due date is today flip
/// to Overdue in one set-based update. Opened invoices are left alone, and a
/// due date that passes while the trigger is down is never revisited.
pub struct OverdueRunService {
    invoices: Arc<dyn InvoiceRepository>,
}

impl OverdueRunService {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    pub async fn run(&self, today: NaiveDate) -> Result<u64> {
        let flipped = self.invoices.sweep_overdue(today).await?;
        info!(flipped, %today, "Overdue sweep complete");
        Ok(flipped)
    }
}
