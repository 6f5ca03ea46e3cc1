// Overdue sweep selectivity: only Sent invoices whose due date is the
// sweep date flip, and a repeated sweep is a no-op.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use billcycle::modules::invoices::models::{Invoice, InvoiceStatus};
use billcycle::modules::scheduler::OverdueRunService;
use chrono::{NaiveDate, Utc};

use helpers::{date, sent_invoice, MemoryInvoiceRepository};

fn due_on(due: NaiveDate) -> Invoice {
    let mut invoice = sent_invoice(1, 10);
    invoice.payment_due_date = Some(due);
    invoice
}

fn harness() -> (Arc<MemoryInvoiceRepository>, OverdueRunService) {
    let invoices = Arc::new(MemoryInvoiceRepository::default());
    let service = OverdueRunService::new(invoices.clone());
    (invoices, service)
}

#[tokio::test]
async fn test_flips_sent_invoices_due_today() {
    let (invoices, service) = harness();
    let today = date(2024, 3, 15);
    let first = invoices.insert(due_on(today));
    let second = invoices.insert(due_on(today));

    let flipped = service.run(today).await.unwrap();

    assert_eq!(flipped, 2);
    assert_eq!(invoices.get(first).status, InvoiceStatus::Overdue);
    assert_eq!(invoices.get(second).status, InvoiceStatus::Overdue);
}

#[tokio::test]
async fn test_opened_invoices_are_left_alone() {
    // Grace for invoices the client has already looked at: only unviewed
    // Sent invoices fall to Overdue automatically.
    let (invoices, service) = harness();
    let today = date(2024, 3, 15);

    let mut opened = due_on(today);
    opened.update_status(InvoiceStatus::Opened).unwrap();
    opened.opened_at = Some(Utc::now());
    let id = invoices.insert(opened);

    let flipped = service.run(today).await.unwrap();

    assert_eq!(flipped, 0);
    assert_eq!(invoices.get(id).status, InvoiceStatus::Opened);
}

#[tokio::test]
async fn test_only_the_exact_due_date_matches() {
    let (invoices, service) = harness();
    let today = date(2024, 3, 15);
    let yesterday = invoices.insert(due_on(date(2024, 3, 14)));
    let tomorrow = invoices.insert(due_on(date(2024, 3, 16)));

    let mut undated = sent_invoice(1, 10);
    undated.payment_due_date = None;
    let no_due_date = invoices.insert(undated);

    let flipped = service.run(today).await.unwrap();

    assert_eq!(flipped, 0);
    assert_eq!(invoices.get(yesterday).status, InvoiceStatus::Sent);
    assert_eq!(invoices.get(tomorrow).status, InvoiceStatus::Sent);
    assert_eq!(invoices.get(no_due_date).status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn test_settled_invoices_are_untouched() {
    let (invoices, service) = harness();
    let today = date(2024, 3, 15);

    let mut paid = due_on(today);
    paid.update_status(InvoiceStatus::Paid).unwrap();
    let id = invoices.insert(paid);

    let flipped = service.run(today).await.unwrap();

    assert_eq!(flipped, 0);
    assert_eq!(invoices.get(id).status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_repeat_sweep_is_a_no_op() {
    let (invoices, service) = harness();
    let today = date(2024, 3, 15);
    let id = invoices.insert(due_on(today));

    assert_eq!(service.run(today).await.unwrap(), 1);
    // The row is Overdue now, so the Sent filter no longer matches it.
    assert_eq!(service.run(today).await.unwrap(), 0);
    assert_eq!(invoices.get(id).status, InvoiceStatus::Overdue);
}
