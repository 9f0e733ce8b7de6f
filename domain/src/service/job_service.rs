use std::time::Duration;

use crate::model::entity::Job;
use crate::model::vo::{JobDescriptor, MailPolicy};

#[async_trait::async_trait]
pub trait JobService {
    /// Submit and start following the job.
    async fn submit(&self, descriptor: &JobDescriptor) -> anyhow::Result<Job>;
    /// Follow a job that was submitted elsewhere.
    fn track(&self, job_id: &str, notification: Option<MailPolicy>);
    async fn refresh_all(&self);
    /// Poll every `interval` until the job reaches a terminal state.
    async fn watch(&self, job_id: &str, interval: Duration) -> anyhow::Result<Job>;
}
