pub mod invoice_controller;
