pub mod checkout_service;
pub mod gateway;
pub mod reconciliation;
pub mod signature;
pub mod stripe_gateway;

pub use checkout_service::CheckoutService;
pub use gateway::{minor_units, PaymentGateway};
pub use reconciliation::{MarkPaidOutcome, ReconciliationService};
pub use signature::{SignatureHeader, WebhookVerifier};
pub use stripe_gateway::StripeGateway;
