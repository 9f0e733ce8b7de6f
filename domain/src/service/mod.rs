mod job_scheduler;
mod job_service;
mod notifier;

#[rustfmt::skip]
pub use self::{
    job_scheduler::JobScheduler,
    job_service::JobService,
    notifier::Notifier,
};
