pub mod batch;
pub mod billing_run;
pub mod overdue_run;
pub mod reminder_run;

pub use batch::{BatchReport, RowOutcome};
pub use billing_run::BillingRunService;
pub use overdue_run::OverdueRunService;
pub use reminder_run::ReminderRunService;
