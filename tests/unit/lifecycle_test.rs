// Invoice status machine seen from outside: which edges exist, which
// states settle, and how the tombstone interacts with terminal states.

use billcycle::core::AppError;
use billcycle::modules::invoices::models::{Invoice, InvoiceStatus, LineItem};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

const ALL_STATUSES: [InvoiceStatus; 7] = [
    InvoiceStatus::Draft,
    InvoiceStatus::Sent,
    InvoiceStatus::Opened,
    InvoiceStatus::Paid,
    InvoiceStatus::Overdue,
    InvoiceStatus::Refunded,
    InvoiceStatus::Deleted,
];

fn draft() -> Invoice {
    Invoice::new(
        1,
        1,
        "USD".to_string(),
        "en".to_string(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
        vec![LineItem::new("Service".to_string(), dec!(100), 1).unwrap()],
        None,
        None,
        None,
        true,
        false,
        None,
        false,
        None,
    )
    .unwrap()
}

#[test]
fn test_draft_can_only_be_sent_or_deleted() {
    for next in ALL_STATUSES {
        let allowed = matches!(next, InvoiceStatus::Sent | InvoiceStatus::Deleted);
        assert_eq!(
            InvoiceStatus::Draft.can_transition_to(next),
            allowed,
            "Draft -> {next}"
        );
    }
}

#[test]
fn test_refund_is_the_only_exit_from_terminal_states() {
    for status in ALL_STATUSES.into_iter().filter(InvoiceStatus::is_terminal) {
        for next in ALL_STATUSES {
            let allowed = status == InvoiceStatus::Paid && next == InvoiceStatus::Refunded;
            assert_eq!(status.can_transition_to(next), allowed, "{status} -> {next}");
        }
    }
}

#[test]
fn test_expiry_reverts_only_opened() {
    // A lapsed checkout session un-views the invoice; it cannot resurrect
    // an Overdue one or re-send a Sent one.
    assert!(InvoiceStatus::Opened.can_transition_to(InvoiceStatus::Sent));
    assert!(!InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Sent));
    assert!(!InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Sent));
}

#[test]
fn test_payable_states_are_exactly_the_settling_ones() {
    let payable = InvoiceStatus::payable();
    for status in ALL_STATUSES {
        let expected = matches!(
            status,
            InvoiceStatus::Sent | InvoiceStatus::Opened | InvoiceStatus::Overdue
        );
        assert_eq!(payable.contains(&status), expected, "{status}");
        // Every payable state must actually accept the Paid edge.
        if expected {
            assert!(status.can_transition_to(InvoiceStatus::Paid));
        }
    }
}

#[test]
fn test_full_happy_path_walk() {
    let mut invoice = draft();
    for next in [
        InvoiceStatus::Sent,
        InvoiceStatus::Opened,
        InvoiceStatus::Paid,
        InvoiceStatus::Refunded,
    ] {
        invoice.update_status(next).unwrap();
        assert_eq!(invoice.status, next);
    }
}

#[test]
fn test_illegal_transition_is_a_state_conflict() {
    let mut invoice = draft();
    let err = invoice.update_status(InvoiceStatus::Refunded).unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
    assert_eq!(invoice.status, InvoiceStatus::Draft);
}

#[test]
fn test_tombstone_from_overdue() {
    let mut invoice = draft();
    invoice.update_status(InvoiceStatus::Sent).unwrap();
    invoice.update_status(InvoiceStatus::Overdue).unwrap();

    invoice.tombstone().unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Deleted);
    assert!(invoice.is_deleted);
}

#[test]
fn test_tombstone_rejects_refunded() {
    let mut invoice = draft();
    invoice.update_status(InvoiceStatus::Sent).unwrap();
    invoice.update_status(InvoiceStatus::Paid).unwrap();
    invoice.update_status(InvoiceStatus::Refunded).unwrap();

    let err = invoice.tombstone().unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
    assert!(!invoice.is_deleted);
}

#[test]
fn test_status_wire_format() {
    for status in ALL_STATUSES {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{status}\""));
        let parsed: InvoiceStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
