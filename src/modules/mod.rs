pub mod clients;
pub mod health;
pub mod invoices;
pub mod merchants;
pub mod notifications;
pub mod payments;
pub mod scheduler;
pub mod subscriptions;
