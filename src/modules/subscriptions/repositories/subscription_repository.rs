use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::core::{AppError, Frequency, Result};
use crate::modules::invoices::models::{LineItem, TaxLine};
use crate::modules::subscriptions::models::{Subscription, SubscriptionStatus};

/// Persistence boundary for subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Subscription>>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>>;

    /// Active subscriptions whose next invoice date is today or earlier.
    /// The `<=` catches dates missed by an outage, not just today's.
    async fn find_due(&self, today: NaiveDate) -> Result<Vec<Subscription>>;

    /// Move the schedule forward after a successful billing.
    async fn advance_schedule(&self, id: i64, next: NaiveDate) -> Result<()>;

    /// Pause a subscription whose schedule ran past its end date and clear
    /// the next invoice date.
    async fn pause_completed(&self, id: i64) -> Result<()>;

    /// Set the status and replace the next invoice date in one write.
    /// Deleting also flips the tombstone flag.
    async fn set_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
        next_invoice_date: Option<NaiveDate>,
    ) -> Result<()>;

    /// Resolve a path reference: public id first, then internal id.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Subscription>> {
        if let Some(subscription) = self.find_by_public_id(reference).await? {
            return Ok(Some(subscription));
        }
        match reference.parse::<i64>() {
            Ok(id) => self.find_by_id(id).await,
            Err(_) => Ok(None),
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, public_id, owner_id, client_id, status, frequency,
    start_date, end_date, next_invoice_date, days_to_pay,
    currency, language, line_items, discount_pct,
    tax1_name, tax1_rate, tax2_name, tax2_rate,
    accept_card, accept_alt, notes,
    enable_reminders, reminder_days_before, total, is_deleted
"#;

pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<Subscription> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (
                public_id, owner_id, client_id, status, frequency,
                start_date, end_date, next_invoice_date, days_to_pay,
                currency, language, line_items, discount_pct,
                tax1_name, tax1_rate, tax2_name, tax2_rate,
                accept_card, accept_alt, notes,
                enable_reminders, reminder_days_before, total, is_deleted
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
            )
            RETURNING id
            "#,
        )
        .bind(&subscription.public_id)
        .bind(subscription.owner_id)
        .bind(subscription.client_id)
        .bind(subscription.status.to_string())
        .bind(subscription.frequency.to_string())
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.next_invoice_date)
        .bind(subscription.days_to_pay)
        .bind(&subscription.currency)
        .bind(&subscription.language)
        .bind(Json(&subscription.line_items))
        .bind(subscription.discount_pct)
        .bind(subscription.tax1.as_ref().map(|t| t.name.clone()))
        .bind(subscription.tax1.as_ref().map(|t| t.rate))
        .bind(subscription.tax2.as_ref().map(|t| t.name.clone()))
        .bind(subscription.tax2.as_ref().map(|t| t.rate))
        .bind(subscription.accept_card)
        .bind(subscription.accept_alt)
        .bind(&subscription.notes)
        .bind(subscription.enable_reminders)
        .bind(subscription.reminder_days_before)
        .bind(subscription.total)
        .bind(subscription.is_deleted)
        .fetch_one(&self.pool)
        .await?;

        let mut created = subscription.clone();
        created.id = Some(id);
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Subscription>> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SubscriptionRow::into_subscription).transpose()
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<Subscription>> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE public_id = $1",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SubscriptionRow::into_subscription).transpose()
    }

    async fn find_due(&self, today: NaiveDate) -> Result<Vec<Subscription>> {
        let query = format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE status = 'Active'
              AND next_invoice_date IS NOT NULL
              AND next_invoice_date <= $1
            ORDER BY id
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(&query)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(SubscriptionRow::into_subscription)
            .collect()
    }

    async fn advance_schedule(&self, id: i64, next: NaiveDate) -> Result<()> {
        sqlx::query("UPDATE subscriptions SET next_invoice_date = $1 WHERE id = $2")
            .bind(next)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pause_completed(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'Paused', next_invoice_date = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        id: i64,
        status: SubscriptionStatus,
        next_invoice_date: Option<NaiveDate>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1,
                next_invoice_date = $2,
                is_deleted = CASE WHEN $1 = 'Deleted' THEN TRUE ELSE is_deleted END
            WHERE id = $3
            "#,
        )
        .bind(status.to_string())
        .bind(next_invoice_date)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Database row shape; statuses and frequencies live as text columns.
#[derive(FromRow)]
struct SubscriptionRow {
    id: i64,
    public_id: String,
    owner_id: i64,
    client_id: i64,
    status: String,
    frequency: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    next_invoice_date: Option<NaiveDate>,
    days_to_pay: Option<i32>,
    currency: String,
    language: String,
    line_items: Json<Vec<LineItem>>,
    discount_pct: Option<Decimal>,
    tax1_name: Option<String>,
    tax1_rate: Option<Decimal>,
    tax2_name: Option<String>,
    tax2_rate: Option<Decimal>,
    accept_card: bool,
    accept_alt: bool,
    notes: Option<String>,
    enable_reminders: bool,
    reminder_days_before: Option<i32>,
    total: Decimal,
    is_deleted: bool,
}

impl SubscriptionRow {
    fn into_subscription(self) -> Result<Subscription> {
        let status = self
            .status
            .parse::<SubscriptionStatus>()
            .map_err(AppError::internal)?;
        let frequency = self
            .frequency
            .parse::<Frequency>()
            .map_err(AppError::internal)?;

        Ok(Subscription {
            id: Some(self.id),
            public_id: self.public_id,
            owner_id: self.owner_id,
            client_id: self.client_id,
            status,
            frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            next_invoice_date: self.next_invoice_date,
            days_to_pay: self.days_to_pay,
            currency: self.currency,
            language: self.language,
            line_items: self.line_items.0,
            discount_pct: self.discount_pct,
            tax1: tax_line(self.tax1_name, self.tax1_rate),
            tax2: tax_line(self.tax2_name, self.tax2_rate),
            accept_card: self.accept_card,
            accept_alt: self.accept_alt,
            notes: self.notes,
            enable_reminders: self.enable_reminders,
            reminder_days_before: self.reminder_days_before,
            total: self.total,
            is_deleted: self.is_deleted,
        })
    }
}

fn tax_line(name: Option<String>, rate: Option<Decimal>) -> Option<TaxLine> {
    match (name, rate) {
        (Some(name), Some(rate)) => Some(TaxLine { name, rate }),
        _ => None,
    }
}
