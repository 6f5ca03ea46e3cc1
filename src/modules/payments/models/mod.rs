pub mod gateway;
pub mod webhook_event;

pub use gateway::{CheckoutSession, CheckoutSessionRequest, ManualSettlementRequest, SettlementView};
pub use webhook_event::{GatewayAccount, WebhookEvent};
