use crate::model::entity::Job;
use crate::model::vo::JobDescriptor;

/// A cluster backend: turns descriptors into batch scripts and jobs, and
/// reports on the jobs it started.
#[async_trait::async_trait]
pub trait JobScheduler {
    /// The batch script `submit_job_script` would submit for this descriptor.
    fn render_script(&self, descriptor: &JobDescriptor) -> String;
    /// Whether the backend delivers mail notifications by itself.
    fn notifies_natively(&self) -> bool;
    async fn get_jobs(&self) -> anyhow::Result<Vec<Job>>;
    async fn get_job(&self, id: &str) -> anyhow::Result<Job>;
    /// Writes the rendered script, submits it and returns the assigned job id.
    async fn submit_job_script(&self, descriptor: &JobDescriptor) -> anyhow::Result<String>;
    /// Submits a script already written under the save path.
    async fn submit_job(&self, script_path: &str) -> anyhow::Result<String>;
    async fn delete_job(&self, job_id: &str) -> anyhow::Result<()>;
    async fn pause_job(&self, job_id: &str) -> anyhow::Result<()>;
    async fn continue_job(&self, job_id: &str) -> anyhow::Result<()>;
}
