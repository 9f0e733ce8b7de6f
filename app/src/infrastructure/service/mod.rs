pub mod job_scheduler;
pub mod notifier;
