// Subscriptions module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{ScheduleStep, Subscription, SubscriptionStatus};
pub use repositories::{PgSubscriptionRepository, SubscriptionRepository};
pub use services::SubscriptionService;
