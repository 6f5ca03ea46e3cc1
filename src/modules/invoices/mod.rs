// Invoices module: the lifecycle model, its persistence, and the HTTP
// surface for direct (non-subscription) invoicing.

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Invoice, InvoiceStatus, LineItem, TaxLine};
pub use repositories::{InvoiceRepository, PgInvoiceRepository};
pub use services::InvoiceService;
