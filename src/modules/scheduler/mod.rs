// Scheduler module: the daily batch jobs and their trigger endpoints.

pub mod controllers;
pub mod services;

pub use services::{BatchReport, BillingRunService, OverdueRunService, ReminderRunService, RowOutcome};
