pub mod email;

pub use email::{DeliveryReceipt, EmailMessage};
