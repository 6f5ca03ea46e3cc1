pub mod subscription;

pub use subscription::{ScheduleStep, Subscription, SubscriptionStatus};
