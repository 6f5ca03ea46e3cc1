pub mod mailer;

pub use mailer::{invoice_email, HttpMailer, NotificationGateway};
