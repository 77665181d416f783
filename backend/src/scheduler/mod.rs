pub mod scheduler;

pub use scheduler::{BulkScheduler, ScheduleOutcome};
