mod scheduler;

pub use scheduler::{PollScheduler, SchedulerHandle, TickOutcome};
