pub mod invoice_service;

pub use invoice_service::{
    CreateInvoiceRequest, InvoiceService, TrackOpenReport, UpdateInvoiceRequest,
};
