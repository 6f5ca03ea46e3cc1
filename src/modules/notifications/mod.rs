// Notifications module

pub mod models;
pub mod services;

pub use models::{DeliveryReceipt, EmailMessage};
pub use services::{invoice_email, HttpMailer, NotificationGateway};
