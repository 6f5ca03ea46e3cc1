//! BillCycle recurring billing backend library
//!
//! Subscription-driven invoice generation, lifecycle tracking, and payment
//! reconciliation for multi-tenant merchants.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::invoices;
pub use modules::payments;
pub use modules::scheduler;
pub use modules::subscriptions;
