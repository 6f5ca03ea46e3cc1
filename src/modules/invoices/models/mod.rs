mod invoice;
mod line_item;

pub use invoice::{Invoice, InvoiceStatus, TaxLine};
pub use line_item::LineItem;
