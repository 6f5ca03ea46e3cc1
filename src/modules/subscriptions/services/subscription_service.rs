use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::core::{first_occurrence_on_or_after, AppError, Frequency, Result};
use crate::modules::clients::repositories::ClientRepository;
use crate::modules::invoices::models::{LineItem, TaxLine};
use crate::modules::subscriptions::models::{Subscription, SubscriptionStatus};
use crate::modules::subscriptions::repositories::SubscriptionRepository;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub owner_id: i64,
    pub client_id: i64,
    pub currency: String,
    pub language: String,
    pub start_date: NaiveDate,
    pub frequency: Frequency,
    pub end_date: Option<NaiveDate>,
    pub days_to_pay: Option<i32>,
    pub line_items: Vec<LineItem>,
    pub discount_pct: Option<Decimal>,
    pub tax1: Option<TaxLine>,
    pub tax2: Option<TaxLine>,
    #[serde(default = "default_true")]
    pub accept_card: bool,
    #[serde(default)]
    pub accept_alt: bool,
    pub notes: Option<String>,
    #[serde(default)]
    pub enable_reminders: bool,
    pub reminder_days_before: Option<i32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionStatusRequest {
    pub status: SubscriptionStatus,
}

pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        Self {
            subscriptions,
            clients,
        }
    }

    pub async fn create(
        &self,
        request: CreateSubscriptionRequest,
        today: NaiveDate,
    ) -> Result<Subscription> {
        self.clients
            .find_by_id(request.client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Client {}", request.client_id)))?;

        // Rebuild line items through the validating constructor; they arrive
        // straight from deserialization.
        let line_items = request
            .line_items
            .into_iter()
            .map(|item| LineItem::new(item.name, item.amount, item.quantity))
            .collect::<Result<Vec<LineItem>>>()?;

        let subscription = Subscription::new(
            request.owner_id,
            request.client_id,
            request.currency,
            request.language,
            request.start_date,
            request.frequency,
            request.end_date,
            request.days_to_pay,
            line_items,
            request.discount_pct,
            request.tax1,
            request.tax2,
            request.accept_card,
            request.accept_alt,
            request.notes,
            request.enable_reminders,
            request.reminder_days_before,
            today,
        )?;

        let created = self.subscriptions.create(&subscription).await?;
        info!(
            subscription_id = created.id,
            next_invoice_date = %subscription.next_invoice_date.map(|d| d.to_string()).unwrap_or_default(),
            "Created subscription"
        );
        Ok(created)
    }

    pub async fn get(&self, reference: &str) -> Result<Subscription> {
        self.subscriptions
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Subscription {}", reference)))
    }

    /// Change a subscription's status and keep its schedule consistent.
    ///
    /// Activating rebuilds `next_invoice_date` from the start-date anchor:
    /// the first occurrence on or after today. Pausing or deleting clears it
    /// so the billing run never picks the subscription up.
    pub async fn update_status(
        &self,
        reference: &str,
        new_status: SubscriptionStatus,
        today: NaiveDate,
    ) -> Result<Subscription> {
        let subscription = self.get(reference).await?;
        let id = subscription
            .id
            .ok_or_else(|| AppError::internal("Subscription loaded without id"))?;

        let next_invoice_date = match new_status {
            SubscriptionStatus::Active => {
                let next =
                    first_occurrence_on_or_after(subscription.start_date, subscription.frequency, today);
                if let Some(end) = subscription.end_date {
                    if next > end {
                        return Err(AppError::validation(
                            "Cannot activate a subscription past its end date",
                        ));
                    }
                }
                Some(next)
            }
            SubscriptionStatus::Paused | SubscriptionStatus::Deleted => None,
        };

        self.subscriptions
            .set_status(id, new_status, next_invoice_date)
            .await?;
        info!(
            subscription_id = id,
            status = %new_status,
            "Updated subscription status"
        );

        self.subscriptions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Subscription {}", id)))
    }
}
