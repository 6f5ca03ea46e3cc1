// An invoice is a payment request against a client, either created directly
// by the merchant or materialized from a subscription by the billing run.
//
// The total is fixed when the invoice leaves Draft: edits to a Draft recompute
// it, everything after Sent keeps the stored value. Lifecycle status and the
// isDeleted tombstone are independent axes; tombstoned rows stay queryable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::line_item::LineItem;
use crate::core::{AppError, Result};

/// Invoice lifecycle status.
///
/// Draft → Sent → Opened → Paid is the happy path; Sent and Opened can fall
/// to Overdue on their due date, and a checkout session expiring reverts an
/// Opened invoice to Sent. Paid and Refunded are terminal for billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "Draft")]
    Draft,

    #[serde(rename = "Sent")]
    Sent,

    #[serde(rename = "Opened")]
    Opened,

    #[serde(rename = "Paid")]
    Paid,

    #[serde(rename = "Overdue")]
    Overdue,

    #[serde(rename = "Refunded")]
    Refunded,

    #[serde(rename = "Deleted")]
    Deleted,
}

impl InvoiceStatus {
    /// Terminal states accept no further billing transitions except
    /// Paid → Refunded.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Paid | InvoiceStatus::Refunded | InvoiceStatus::Deleted
        )
    }

    /// Whether the status machine permits `self` → `next`.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Sent)
                | (InvoiceStatus::Sent, InvoiceStatus::Opened)
                | (InvoiceStatus::Sent, InvoiceStatus::Overdue)
                | (InvoiceStatus::Opened, InvoiceStatus::Overdue)
                | (InvoiceStatus::Sent, InvoiceStatus::Paid)
                | (InvoiceStatus::Opened, InvoiceStatus::Paid)
                | (InvoiceStatus::Overdue, InvoiceStatus::Paid)
                // Checkout-session expiry reverts a viewed invoice.
                | (InvoiceStatus::Opened, InvoiceStatus::Sent)
                | (InvoiceStatus::Paid, InvoiceStatus::Refunded)
                | (InvoiceStatus::Draft, InvoiceStatus::Deleted)
                | (InvoiceStatus::Sent, InvoiceStatus::Deleted)
                | (InvoiceStatus::Opened, InvoiceStatus::Deleted)
                | (InvoiceStatus::Overdue, InvoiceStatus::Deleted)
        )
    }

    /// States a payment event may settle from.
    pub fn payable() -> [InvoiceStatus; 3] {
        [
            InvoiceStatus::Sent,
            InvoiceStatus::Opened,
            InvoiceStatus::Overdue,
        ]
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "Draft"),
            InvoiceStatus::Sent => write!(f, "Sent"),
            InvoiceStatus::Opened => write!(f, "Opened"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Overdue => write!(f, "Overdue"),
            InvoiceStatus::Refunded => write!(f, "Refunded"),
            InvoiceStatus::Deleted => write!(f, "Deleted"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(InvoiceStatus::Draft),
            "Sent" => Ok(InvoiceStatus::Sent),
            "Opened" => Ok(InvoiceStatus::Opened),
            "Paid" => Ok(InvoiceStatus::Paid),
            "Overdue" => Ok(InvoiceStatus::Overdue),
            "Refunded" => Ok(InvoiceStatus::Refunded),
            "Deleted" => Ok(InvoiceStatus::Deleted),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

/// A named percentage tax applied to the discounted subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub name: String,
    pub rate: Decimal,
}

/// A payment request against a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Internal canonical id; None until persisted
    #[serde(skip_deserializing)]
    pub id: Option<i64>,

    /// Public alias used in links and gateway metadata
    pub public_id: String,

    /// Owning merchant
    pub owner_id: i64,

    /// Billed client
    pub client_id: i64,

    /// Back-reference when materialized by the billing run
    pub subscription_id: Option<i64>,

    pub status: InvoiceStatus,

    /// Soft-delete tombstone, independent of lifecycle status
    pub is_deleted: bool,

    pub currency: String,
    pub language: String,

    pub issue_date: NaiveDate,
    pub payment_due_date: Option<NaiveDate>,

    pub sent_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,

    pub line_items: Vec<LineItem>,
    pub discount_pct: Option<Decimal>,
    pub tax1: Option<TaxLine>,
    pub tax2: Option<TaxLine>,

    pub accept_card: bool,
    pub accept_alt: bool,
    pub notes: Option<String>,

    /// Fixed at creation / last Draft save; immutable once Sent
    pub total: Decimal,

    pub enable_reminders: bool,
    pub reminder_days_before: Option<i32>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create a new Draft invoice with validation and a computed total.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: i64,
        client_id: i64,
        currency: String,
        language: String,
        issue_date: NaiveDate,
        payment_due_date: Option<NaiveDate>,
        line_items: Vec<LineItem>,
        discount_pct: Option<Decimal>,
        tax1: Option<TaxLine>,
        tax2: Option<TaxLine>,
        accept_card: bool,
        accept_alt: bool,
        notes: Option<String>,
        enable_reminders: bool,
        reminder_days_before: Option<i32>,
    ) -> Result<Self> {
        Self::validate_currency(&currency)?;
        Self::validate_line_items(&line_items)?;
        Self::validate_discount(discount_pct)?;
        Self::validate_tax(tax1.as_ref())?;
        Self::validate_tax(tax2.as_ref())?;
        Self::validate_reminders(enable_reminders, reminder_days_before)?;

        let total = Self::compute_total(&line_items, discount_pct, tax1.as_ref(), tax2.as_ref());

        Ok(Self {
            id: None,
            public_id: Uuid::new_v4().to_string(),
            owner_id,
            client_id,
            subscription_id: None,
            status: InvoiceStatus::Draft,
            is_deleted: false,
            currency,
            language,
            issue_date,
            payment_due_date,
            sent_at: None,
            opened_at: None,
            line_items,
            discount_pct,
            tax1,
            tax2,
            accept_card,
            accept_alt,
            notes,
            total,
            enable_reminders,
            reminder_days_before,
            last_reminder_sent_at: None,
        })
    }

    /// Invoice total: (Σ amount × quantity) × (1 − discount/100)
    /// × (1 + tax1/100) × (1 + tax2/100), rounded to 2 decimal places.
    pub fn compute_total(
        line_items: &[LineItem],
        discount_pct: Option<Decimal>,
        tax1: Option<&TaxLine>,
        tax2: Option<&TaxLine>,
    ) -> Decimal {
        let subtotal: Decimal = line_items.iter().map(LineItem::subtotal).sum();

        let mut total = subtotal;
        if let Some(discount) = discount_pct {
            total *= Decimal::ONE - discount / Decimal::ONE_HUNDRED;
        }
        if let Some(tax) = tax1 {
            total *= Decimal::ONE + tax.rate / Decimal::ONE_HUNDRED;
        }
        if let Some(tax) = tax2 {
            total *= Decimal::ONE + tax.rate / Decimal::ONE_HUNDRED;
        }

        total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Recompute and store the total. Only valid while the invoice is Draft.
    pub fn recompute_total(&mut self) -> Result<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(AppError::state_conflict(format!(
                "Cannot recompute total of a {} invoice",
                self.status
            )));
        }

        self.total = Self::compute_total(
            &self.line_items,
            self.discount_pct,
            self.tax1.as_ref(),
            self.tax2.as_ref(),
        );
        Ok(())
    }

    /// Apply a status transition, rejecting edges the machine does not allow.
    pub fn update_status(&mut self, new_status: InvoiceStatus) -> Result<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(AppError::state_conflict(format!(
                "Invalid status transition from {} to {}",
                self.status, new_status
            )));
        }

        self.status = new_status;
        Ok(())
    }

    /// Tombstone the invoice. Terminal states cannot be deleted.
    pub fn tombstone(&mut self) -> Result<()> {
        self.update_status(InvoiceStatus::Deleted)?;
        self.is_deleted = true;
        Ok(())
    }

    // Validation methods

    fn validate_currency(currency: &str) -> Result<()> {
        if currency.trim().is_empty() {
            return Err(AppError::validation("Currency cannot be empty"));
        }

        Ok(())
    }

    fn validate_line_items(line_items: &[LineItem]) -> Result<()> {
        if line_items.is_empty() {
            return Err(AppError::validation(
                "Invoice must have at least one line item",
            ));
        }

        Ok(())
    }

    fn validate_discount(discount_pct: Option<Decimal>) -> Result<()> {
        if let Some(discount) = discount_pct {
            if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
                return Err(AppError::validation(
                    "Discount must be between 0 and 100 percent",
                ));
            }
        }

        Ok(())
    }

    fn validate_tax(tax: Option<&TaxLine>) -> Result<()> {
        if let Some(tax) = tax {
            if tax.rate < Decimal::ZERO {
                return Err(AppError::validation("Tax rate cannot be negative"));
            }
        }

        Ok(())
    }

    fn validate_reminders(enable_reminders: bool, reminder_days_before: Option<i32>) -> Result<()> {
        if enable_reminders {
            match reminder_days_before {
                Some(days) if days >= 1 => {}
                Some(_) => {
                    return Err(AppError::validation(
                        "Reminder days before due must be at least 1",
                    ))
                }
                None => {
                    return Err(AppError::validation(
                        "Reminders enabled but reminder days before due not set",
                    ))
                }
            }
        }

        Ok(())
    }
}
