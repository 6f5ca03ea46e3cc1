pub mod dates;
pub mod error;

pub use dates::{first_occurrence_on_or_after, next_occurrence, today_utc, Frequency};
pub use error::{AppError, Result};
