// Webhook reconciliation and manual settlement, end to end through real
// signed payloads: nothing mutates unless the signature passes, and every
// status write is conditional.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use billcycle::core::AppError;
use billcycle::modules::invoices::models::InvoiceStatus;
use billcycle::modules::payments::services::signature::sign_test_payload;
use billcycle::modules::payments::{MarkPaidOutcome, ReconciliationService, WebhookVerifier};
use chrono::{DateTime, Utc};

use helpers::{
    draft_invoice, merchant, merchant_without_gateway, sent_invoice, MemoryInvoiceRepository,
    MemoryMerchantRepository, ScriptedGateway,
};

const SECRET: &str = "whsec_reconciliation_test";

struct Harness {
    invoices: Arc<MemoryInvoiceRepository>,
    merchants: Arc<MemoryMerchantRepository>,
    gateway: Arc<ScriptedGateway>,
    service: ReconciliationService,
}

fn harness() -> Harness {
    let invoices = Arc::new(MemoryInvoiceRepository::default());
    let merchants = Arc::new(MemoryMerchantRepository::default());
    let gateway = Arc::new(ScriptedGateway::default());

    merchants.insert(merchant(1));

    let service = ReconciliationService::new(
        invoices.clone(),
        merchants.clone(),
        gateway.clone(),
        WebhookVerifier::new(SECRET),
    );

    Harness {
        invoices,
        merchants,
        gateway,
        service,
    }
}

fn signed(payload: &serde_json::Value, now: DateTime<Utc>) -> (Vec<u8>, String) {
    let bytes = serde_json::to_vec(payload).unwrap();
    let header = sign_test_payload(SECRET, now.timestamp(), &bytes);
    (bytes, header)
}

fn session_event(event_type: &str, reference: &str) -> serde_json::Value {
    serde_json::json!({
        "type": event_type,
        "account": "acct_1",
        "data": {
            "object": {
                "id": "cs_test_1",
                "metadata": { "invoiceId": reference }
            }
        }
    })
}

fn account_event(account_id: &str, all_flags: bool) -> serde_json::Value {
    serde_json::json!({
        "type": "account.updated",
        "data": {
            "object": {
                "id": account_id,
                "details_submitted": all_flags,
                "charges_enabled": all_flags,
                "payouts_enabled": true,
                "capabilities": { "card_payments": if all_flags { "active" } else { "pending" } }
            }
        }
    })
}

#[tokio::test]
async fn test_completed_session_settles_the_invoice() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let now = Utc::now();
    let (payload, header) = signed(&session_event("checkout.session.completed", &reference), now);
    h.service.handle_event(&payload, &header, now).await.unwrap();

    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_completed_session_settles_overdue_invoices_too() {
    let h = harness();
    let mut invoice = sent_invoice(1, 10);
    invoice.update_status(InvoiceStatus::Overdue).unwrap();
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let now = Utc::now();
    let (payload, header) = signed(&session_event("checkout.session.completed", &reference), now);
    h.service.handle_event(&payload, &header, now).await.unwrap();

    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_duplicate_completed_session_is_acknowledged() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let now = Utc::now();
    let (payload, header) = signed(&session_event("checkout.session.completed", &reference), now);
    h.service.handle_event(&payload, &header, now).await.unwrap();
    // Gateway retries deliver the same event again.
    h.service.handle_event(&payload, &header, now).await.unwrap();

    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_expired_session_reverts_only_opened_invoices() {
    let h = harness();
    let now = Utc::now();

    let mut opened = sent_invoice(1, 10);
    opened.update_status(InvoiceStatus::Opened).unwrap();
    opened.opened_at = Some(now);
    let opened_ref = opened.public_id.clone();
    let opened_id = h.invoices.insert(opened);

    let mut paid = sent_invoice(1, 10);
    paid.update_status(InvoiceStatus::Paid).unwrap();
    let paid_ref = paid.public_id.clone();
    let paid_id = h.invoices.insert(paid);

    let mut overdue = sent_invoice(1, 10);
    overdue.update_status(InvoiceStatus::Overdue).unwrap();
    let overdue_ref = overdue.public_id.clone();
    let overdue_id = h.invoices.insert(overdue);

    for reference in [&opened_ref, &paid_ref, &overdue_ref] {
        let (payload, header) = signed(&session_event("checkout.session.expired", reference), now);
        h.service.handle_event(&payload, &header, now).await.unwrap();
    }

    assert_eq!(h.invoices.get(opened_id).status, InvoiceStatus::Sent);
    assert_eq!(h.invoices.get(paid_id).status, InvoiceStatus::Paid);
    assert_eq!(h.invoices.get(overdue_id).status, InvoiceStatus::Overdue);
}

#[tokio::test]
async fn test_unknown_reference_is_acknowledged_without_changes() {
    let h = harness();
    let id = h.invoices.insert(sent_invoice(1, 10));

    let now = Utc::now();
    let (payload, header) = signed(
        &session_event("checkout.session.completed", "no-such-invoice"),
        now,
    );

    h.service.handle_event(&payload, &header, now).await.unwrap();
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn test_unhandled_event_type_is_acknowledged() {
    let h = harness();
    let now = Utc::now();
    let event = serde_json::json!({
        "type": "payout.created",
        "data": { "object": { "id": "po_1" } }
    });
    let (payload, header) = signed(&event, now);

    assert!(h.service.handle_event(&payload, &header, now).await.is_ok());
}

#[tokio::test]
async fn test_bad_signature_mutates_nothing() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let now = Utc::now();
    let payload =
        serde_json::to_vec(&session_event("checkout.session.completed", &reference)).unwrap();
    let header = sign_test_payload("wrong_secret", now.timestamp(), &payload);

    let err = h
        .service
        .handle_event(&payload, &header, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Signature(_)));
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn test_stale_delivery_is_rejected() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let now = Utc::now();
    let payload =
        serde_json::to_vec(&session_event("checkout.session.completed", &reference)).unwrap();
    // Signed eleven minutes ago, well past the replay window.
    let header = sign_test_payload(SECRET, now.timestamp() - 660, &payload);

    let err = h
        .service
        .handle_event(&payload, &header, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Signature(_)));
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Sent);
}

#[tokio::test]
async fn test_garbled_body_with_valid_signature_is_an_error() {
    let h = harness();
    let now = Utc::now();
    let payload = b"not json at all";
    let header = sign_test_payload(SECRET, now.timestamp(), payload);

    let err = h.service.handle_event(payload, &header, now).await.unwrap_err();
    assert!(matches!(err, AppError::Json(_)));
}

#[tokio::test]
async fn test_account_update_toggles_connectivity() {
    let h = harness();
    let mut pending = merchant(2);
    pending.gateway_account_id = Some("acct_2".to_string());
    pending.gateway_connected = false;
    h.merchants.insert(pending);

    let now = Utc::now();
    let (payload, header) = signed(&account_event("acct_2", true), now);
    h.service.handle_event(&payload, &header, now).await.unwrap();
    assert!(h.merchants.get(2).gateway_connected);

    // Capability loss flips it back off.
    let (payload, header) = signed(&account_event("acct_2", false), now);
    h.service.handle_event(&payload, &header, now).await.unwrap();
    assert!(!h.merchants.get(2).gateway_connected);
}

#[tokio::test]
async fn test_account_update_for_unlinked_account_is_acknowledged() {
    let h = harness();
    let now = Utc::now();
    let (payload, header) = signed(&account_event("acct_unknown", true), now);

    assert!(h.service.handle_event(&payload, &header, now).await.is_ok());
    assert!(h.merchants.get(1).gateway_connected);
}

#[tokio::test]
async fn test_mark_paid_settles_audits_and_mirrors() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let outcome = h
        .service
        .mark_paid_manual(&reference, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, MarkPaidOutcome::Marked);
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);

    let audit = h.merchants.audit_entries();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].0, 1);
    assert_eq!(
        audit[0].1,
        format!("Marked invoice #{reference} as paid (cash payment)")
    );

    let settlements = h.gateway.settlement_calls();
    assert_eq!(settlements.len(), 1);
    let (account, request) = &settlements[0];
    assert_eq!(account, "acct_1");
    // 2 × 100.00 USD in minor units.
    assert_eq!(request.amount_minor, 20_000);
    assert_eq!(request.currency, "usd");
    assert_eq!(request.invoice_reference, reference);
    assert!(request.description.contains(&reference));
}

#[tokio::test]
async fn test_mark_paid_twice_reports_already_paid() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    h.invoices.insert(invoice);

    let first = h.service.mark_paid_manual(&reference, Utc::now()).await.unwrap();
    let second = h.service.mark_paid_manual(&reference, Utc::now()).await.unwrap();

    assert_eq!(first, MarkPaidOutcome::Marked);
    assert_eq!(second, MarkPaidOutcome::AlreadyPaid);
    // Only the first call audits and mirrors.
    assert_eq!(h.merchants.audit_entries().len(), 1);
    assert_eq!(h.gateway.settlement_calls().len(), 1);
}

#[tokio::test]
async fn test_mark_paid_rejects_draft_invoices() {
    let h = harness();
    let invoice = draft_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let err = h
        .service
        .mark_paid_manual(&reference, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::StateConflict(_)));
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Draft);
    assert!(h.merchants.audit_entries().is_empty());
}

#[tokio::test]
async fn test_mark_paid_unknown_reference_is_not_found() {
    let h = harness();
    let err = h
        .service
        .mark_paid_manual("missing", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_mark_paid_accepts_numeric_references() {
    let h = harness();
    let id = h.invoices.insert(sent_invoice(1, 10));

    let outcome = h
        .service
        .mark_paid_manual(&id.to_string(), Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, MarkPaidOutcome::Marked);
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_settlement_mirror_failure_does_not_unpay() {
    let h = harness();
    let invoice = sent_invoice(1, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);
    h.gateway.fail_settlements();

    let outcome = h
        .service
        .mark_paid_manual(&reference, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, MarkPaidOutcome::Marked);
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
    assert_eq!(h.merchants.audit_entries().len(), 1);
}

#[tokio::test]
async fn test_mark_paid_without_gateway_account_skips_the_mirror() {
    let h = harness();
    h.merchants.insert(merchant_without_gateway(3));
    let invoice = sent_invoice(3, 10);
    let reference = invoice.public_id.clone();
    let id = h.invoices.insert(invoice);

    let outcome = h
        .service
        .mark_paid_manual(&reference, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome, MarkPaidOutcome::Marked);
    assert_eq!(h.invoices.get(id).status, InvoiceStatus::Paid);
    assert!(h.gateway.settlement_calls().is_empty());
}
