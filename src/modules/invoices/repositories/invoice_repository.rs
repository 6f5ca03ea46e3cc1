// Invoice persistence. Every status write is a conditional update checking
// the expected current status, so concurrent transitions serialize at the
// database: a write that matches zero rows reports false and the caller
// decides whether that race is benign.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Invoice, InvoiceStatus, LineItem, TaxLine};

/// Storage contract for invoices.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice; returns it with the generated id.
    async fn create(&self, invoice: &Invoice) -> Result<Invoice>;

    /// Persist edits to a Draft invoice. Returns false when the row is no
    /// longer Draft.
    async fn update_draft(&self, invoice: &Invoice) -> Result<bool>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Invoice>>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Invoice>>;

    /// Conditional transition: writes `to` only while the current status is
    /// one of `from`. Returns whether a row was updated.
    async fn transition_status(
        &self,
        id: i64,
        from: &[InvoiceStatus],
        to: InvoiceStatus,
    ) -> Result<bool>;

    /// Draft → Sent, stamping `sent_at`. Returns false when not Draft.
    async fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<bool>;

    /// Sent → Opened, stamping `opened_at`; fires only once per invoice.
    async fn mark_opened(&self, id: i64, opened_at: DateTime<Utc>) -> Result<bool>;

    /// Record the delivery instant on an invoice already in Sent.
    async fn stamp_sent_at(&self, id: i64, sent_at: DateTime<Utc>) -> Result<()>;

    /// Record that the one-and-only reminder went out.
    async fn stamp_reminder_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<()>;

    /// Tombstone a non-terminal invoice. Returns false for terminal states.
    async fn tombstone(&self, id: i64) -> Result<bool>;

    /// Invoices that may still need their reminder: Sent, reminders enabled,
    /// never reminded, with a due date and offset configured. Window
    /// filtering happens in the scheduler.
    async fn find_reminder_candidates(&self) -> Result<Vec<Invoice>>;

    /// Set-based sweep: Sent invoices due exactly `today` become Overdue.
    /// Returns the number of rows flipped.
    async fn sweep_overdue(&self, today: NaiveDate) -> Result<u64>;

    /// Resolve a caller-supplied reference: public id first, then the
    /// internal numeric id. The only place the alias fallback lives.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Invoice>> {
        if let Some(invoice) = self.find_by_public_id(reference).await? {
            return Ok(Some(invoice));
        }

        match reference.parse::<i64>() {
            Ok(id) => self.find_by_id(id).await,
            Err(_) => Ok(None),
        }
    }
}

/// PostgreSQL-backed invoice repository.
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INVOICE_COLUMNS: &str = r#"
    id, public_id, owner_id, client_id, subscription_id, status, is_deleted,
    currency, language, issue_date, payment_due_date, sent_at, opened_at,
    line_items, discount_pct, tax1_name, tax1_rate, tax2_name, tax2_rate,
    accept_card, accept_alt, notes, total, enable_reminders,
    reminder_days_before, last_reminder_sent_at
"#;

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<Invoice> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                public_id, owner_id, client_id, subscription_id, status,
                is_deleted, currency, language, issue_date, payment_due_date,
                sent_at, opened_at, line_items, discount_pct, tax1_name,
                tax1_rate, tax2_name, tax2_rate, accept_card, accept_alt,
                notes, total, enable_reminders, reminder_days_before,
                last_reminder_sent_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            RETURNING id
            "#,
        )
        .bind(&invoice.public_id)
        .bind(invoice.owner_id)
        .bind(invoice.client_id)
        .bind(invoice.subscription_id)
        .bind(invoice.status.to_string())
        .bind(invoice.is_deleted)
        .bind(&invoice.currency)
        .bind(&invoice.language)
        .bind(invoice.issue_date)
        .bind(invoice.payment_due_date)
        .bind(invoice.sent_at)
        .bind(invoice.opened_at)
        .bind(Json(&invoice.line_items))
        .bind(invoice.discount_pct)
        .bind(invoice.tax1.as_ref().map(|t| t.name.clone()))
        .bind(invoice.tax1.as_ref().map(|t| t.rate))
        .bind(invoice.tax2.as_ref().map(|t| t.name.clone()))
        .bind(invoice.tax2.as_ref().map(|t| t.rate))
        .bind(invoice.accept_card)
        .bind(invoice.accept_alt)
        .bind(invoice.notes.as_deref())
        .bind(invoice.total)
        .bind(invoice.enable_reminders)
        .bind(invoice.reminder_days_before)
        .bind(invoice.last_reminder_sent_at)
        .fetch_one(&self.pool)
        .await?;

        let mut created = invoice.clone();
        created.id = Some(id);
        Ok(created)
    }

    async fn update_draft(&self, invoice: &Invoice) -> Result<bool> {
        let id = invoice
            .id
            .ok_or_else(|| AppError::internal("Cannot update an unsaved invoice"))?;

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                client_id = $1, currency = $2, language = $3, issue_date = $4,
                payment_due_date = $5, line_items = $6, discount_pct = $7,
                tax1_name = $8, tax1_rate = $9, tax2_name = $10,
                tax2_rate = $11, accept_card = $12, accept_alt = $13,
                notes = $14, total = $15, enable_reminders = $16,
                reminder_days_before = $17
            WHERE id = $18 AND status = 'Draft'
            "#,
        )
        .bind(invoice.client_id)
        .bind(&invoice.currency)
        .bind(&invoice.language)
        .bind(invoice.issue_date)
        .bind(invoice.payment_due_date)
        .bind(Json(&invoice.line_items))
        .bind(invoice.discount_pct)
        .bind(invoice.tax1.as_ref().map(|t| t.name.clone()))
        .bind(invoice.tax1.as_ref().map(|t| t.rate))
        .bind(invoice.tax2.as_ref().map(|t| t.name.clone()))
        .bind(invoice.tax2.as_ref().map(|t| t.rate))
        .bind(invoice.accept_card)
        .bind(invoice.accept_alt)
        .bind(invoice.notes.as_deref())
        .bind(invoice.total)
        .bind(invoice.enable_reminders)
        .bind(invoice.reminder_days_before)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE public_id = $1",
            INVOICE_COLUMNS
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn transition_status(
        &self,
        id: i64,
        from: &[InvoiceStatus],
        to: InvoiceStatus,
    ) -> Result<bool> {
        let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();

        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = $1
            WHERE id = $2 AND status = ANY($3)
            "#,
        )
        .bind(to.to_string())
        .bind(id)
        .bind(&from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'Sent', sent_at = $1
            WHERE id = $2 AND status = 'Draft'
            "#,
        )
        .bind(sent_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_opened(&self, id: i64, opened_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'Opened', opened_at = $1
            WHERE id = $2 AND status = 'Sent' AND opened_at IS NULL
            "#,
        )
        .bind(opened_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stamp_sent_at(&self, id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE invoices SET sent_at = $1 WHERE id = $2")
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn stamp_reminder_sent(&self, id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE invoices SET last_reminder_sent_at = $1 WHERE id = $2")
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn tombstone(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'Deleted', is_deleted = TRUE
            WHERE id = $1 AND status NOT IN ('Paid', 'Refunded', 'Deleted')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_reminder_candidates(&self) -> Result<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {} FROM invoices
            WHERE status = 'Sent'
              AND enable_reminders = TRUE
              AND last_reminder_sent_at IS NULL
              AND payment_due_date IS NOT NULL
              AND reminder_days_before IS NOT NULL
            ORDER BY id
            "#,
            INVOICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn sweep_overdue(&self, today: NaiveDate) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = 'Overdue'
            WHERE status = 'Sent' AND payment_due_date = $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// Database row mapping

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    public_id: String,
    owner_id: i64,
    client_id: i64,
    subscription_id: Option<i64>,
    status: String,
    is_deleted: bool,
    currency: String,
    language: String,
    issue_date: NaiveDate,
    payment_due_date: Option<NaiveDate>,
    sent_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    line_items: Json<Vec<LineItem>>,
    discount_pct: Option<Decimal>,
    tax1_name: Option<String>,
    tax1_rate: Option<Decimal>,
    tax2_name: Option<String>,
    tax2_rate: Option<Decimal>,
    accept_card: bool,
    accept_alt: bool,
    notes: Option<String>,
    total: Decimal,
    enable_reminders: bool,
    reminder_days_before: Option<i32>,
    last_reminder_sent_at: Option<DateTime<Utc>>,
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<Invoice> {
        let status = self
            .status
            .parse::<InvoiceStatus>()
            .map_err(AppError::internal)?;

        Ok(Invoice {
            id: Some(self.id),
            public_id: self.public_id,
            owner_id: self.owner_id,
            client_id: self.client_id,
            subscription_id: self.subscription_id,
            status,
            is_deleted: self.is_deleted,
            currency: self.currency,
            language: self.language,
            issue_date: self.issue_date,
            payment_due_date: self.payment_due_date,
            sent_at: self.sent_at,
            opened_at: self.opened_at,
            line_items: self.line_items.0,
            discount_pct: self.discount_pct,
            tax1: tax_line(self.tax1_name, self.tax1_rate),
            tax2: tax_line(self.tax2_name, self.tax2_rate),
            accept_card: self.accept_card,
            accept_alt: self.accept_alt,
            notes: self.notes,
            total: self.total,
            enable_reminders: self.enable_reminders,
            reminder_days_before: self.reminder_days_before,
            last_reminder_sent_at: self.last_reminder_sent_at,
        })
    }
}

fn tax_line(name: Option<String>, rate: Option<Decimal>) -> Option<TaxLine> {
    match (name, rate) {
        (Some(name), Some(rate)) => Some(TaxLine { name, rate }),
        _ => None,
    }
}
