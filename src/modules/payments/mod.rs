// Payments module

pub mod controllers;
pub mod models;
pub mod services;

pub use models::{CheckoutSession, SettlementView, WebhookEvent};
pub use services::{
    CheckoutService, MarkPaidOutcome, PaymentGateway, ReconciliationService, StripeGateway,
    WebhookVerifier,
};
