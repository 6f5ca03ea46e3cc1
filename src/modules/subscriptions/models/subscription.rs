// A subscription is an invoice prototype plus a schedule. The billing run
// consumes `next_invoice_date`; the subscription owns the rules for where
// that date goes next (advance by frequency, or pause past the end date).

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{next_occurrence, AppError, Frequency, Result};
use crate::modules::invoices::models::{Invoice, InvoiceStatus, LineItem, TaxLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    #[serde(rename = "Active")]
    Active,

    #[serde(rename = "Paused")]
    Paused,

    #[serde(rename = "Deleted")]
    Deleted,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "Active"),
            SubscriptionStatus::Paused => write!(f, "Paused"),
            SubscriptionStatus::Deleted => write!(f, "Deleted"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Active" => Ok(SubscriptionStatus::Active),
            "Paused" => Ok(SubscriptionStatus::Paused),
            "Deleted" => Ok(SubscriptionStatus::Deleted),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// What the billing run should do with a subscription's schedule after
/// materializing an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStep {
    /// Move `next_invoice_date` forward to this date.
    Advance(NaiveDate),
    /// The next occurrence would pass the end date: pause and clear the
    /// schedule.
    Pause,
}

/// A recurring billing definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Internal canonical id; None until persisted
    #[serde(skip_deserializing)]
    pub id: Option<i64>,

    /// Public alias used in links
    pub public_id: String,

    pub owner_id: i64,
    pub client_id: i64,

    pub status: SubscriptionStatus,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,

    /// Date the next invoice materializes. Null only while not Active or
    /// once the schedule has run past `end_date`.
    pub next_invoice_date: Option<NaiveDate>,

    /// Days between an invoice's issue date and its payment due date
    pub days_to_pay: Option<i32>,

    pub currency: String,
    pub language: String,

    pub line_items: Vec<LineItem>,
    pub discount_pct: Option<Decimal>,
    pub tax1: Option<TaxLine>,
    pub tax2: Option<TaxLine>,

    pub accept_card: bool,
    pub accept_alt: bool,
    pub notes: Option<String>,

    pub enable_reminders: bool,
    pub reminder_days_before: Option<i32>,

    /// Precomputed with the invoice total formula, for display
    pub total: Decimal,

    pub is_deleted: bool,
}

impl Subscription {
    /// Create a new Active subscription with validation, a computed total,
    /// and its initial `next_invoice_date`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: i64,
        client_id: i64,
        currency: String,
        language: String,
        start_date: NaiveDate,
        frequency: Frequency,
        end_date: Option<NaiveDate>,
        days_to_pay: Option<i32>,
        line_items: Vec<LineItem>,
        discount_pct: Option<Decimal>,
        tax1: Option<TaxLine>,
        tax2: Option<TaxLine>,
        accept_card: bool,
        accept_alt: bool,
        notes: Option<String>,
        enable_reminders: bool,
        reminder_days_before: Option<i32>,
        today: NaiveDate,
    ) -> Result<Self> {
        if currency.trim().is_empty() {
            return Err(AppError::validation("Currency cannot be empty"));
        }
        if line_items.is_empty() {
            return Err(AppError::validation(
                "Subscription must have at least one line item",
            ));
        }
        if let Some(end) = end_date {
            if end < start_date {
                return Err(AppError::validation(
                    "End date cannot be before start date",
                ));
            }
        }
        if let Some(days) = days_to_pay {
            if days < 0 {
                return Err(AppError::validation("Days to pay cannot be negative"));
            }
        }
        if let Some(discount) = discount_pct {
            if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
                return Err(AppError::validation(
                    "Discount must be between 0 and 100 percent",
                ));
            }
        }
        if enable_reminders && !matches!(reminder_days_before, Some(d) if d >= 1) {
            return Err(AppError::validation(
                "Reminders enabled but reminder days before due not set",
            ));
        }

        let total = Invoice::compute_total(&line_items, discount_pct, tax1.as_ref(), tax2.as_ref());
        let next_invoice_date = Some(Self::initial_next_invoice(start_date, frequency, today));

        Ok(Self {
            id: None,
            public_id: Uuid::new_v4().to_string(),
            owner_id,
            client_id,
            status: SubscriptionStatus::Active,
            frequency,
            start_date,
            end_date,
            next_invoice_date,
            days_to_pay,
            currency,
            language,
            line_items,
            discount_pct,
            tax1,
            tax2,
            accept_card,
            accept_alt,
            notes,
            enable_reminders,
            reminder_days_before,
            total,
            is_deleted: false,
        })
    }

    /// Where the schedule starts: a subscription starting today has already
    /// had its first billing moment pass, so it begins one cycle out;
    /// otherwise the start date itself is the first occurrence.
    pub fn initial_next_invoice(
        start_date: NaiveDate,
        frequency: Frequency,
        today: NaiveDate,
    ) -> NaiveDate {
        if start_date == today {
            next_occurrence(start_date, frequency)
        } else {
            start_date
        }
    }

    /// Decide the schedule movement after this subscription is billed.
    pub fn next_schedule_step(&self) -> Result<ScheduleStep> {
        let current = self.next_invoice_date.ok_or_else(|| {
            AppError::state_conflict("Subscription has no next invoice date to advance")
        })?;

        let candidate = next_occurrence(current, self.frequency);
        match self.end_date {
            Some(end) if candidate > end => Ok(ScheduleStep::Pause),
            _ => Ok(ScheduleStep::Advance(candidate)),
        }
    }

    /// Build the invoice this subscription produces on `today`.
    ///
    /// The invoice is born in Sent: materialized invoices skip Draft, and
    /// `sent_at` is stamped separately once the email actually goes out.
    pub fn materialize_invoice(&self, today: NaiveDate) -> Result<Invoice> {
        let payment_due_date = self
            .days_to_pay
            .and_then(|days| today.checked_add_days(Days::new(days as u64)));

        let mut invoice = Invoice::new(
            self.owner_id,
            self.client_id,
            self.currency.clone(),
            self.language.clone(),
            today,
            payment_due_date,
            self.line_items.clone(),
            self.discount_pct,
            self.tax1.clone(),
            self.tax2.clone(),
            self.accept_card,
            self.accept_alt,
            self.notes.clone(),
            self.enable_reminders,
            self.reminder_days_before,
        )?;

        invoice.subscription_id = self.id;
        invoice.update_status(InvoiceStatus::Sent)?;
        Ok(invoice)
    }
}
