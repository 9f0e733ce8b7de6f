use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dashmap::DashMap;
use dep_inj::DepInj;
use domain::{
    model::{
        entity::{Job, JobState},
        vo::{JobDescriptor, MailEvent, MailPolicy},
    },
    service::{JobScheduler, JobService, Notifier},
};
use infrastructure::sync::timer;

#[derive(Debug, Clone)]
struct Watched {
    state: JobState,
    notification: Option<MailPolicy>,
}

/// Jobs being followed until they reach a terminal state.
#[derive(DepInj, Default)]
#[target(JobServiceImpl)]
pub struct JobServiceState {
    repo: DashMap<Arc<str>, Watched>,
}

impl JobServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self, job_id: &str) -> bool {
        self.repo.contains_key(job_id)
    }
}

#[async_trait::async_trait]
impl<Deps> JobService for JobServiceImpl<Deps>
where
    Deps: AsRef<JobServiceState> + JobScheduler + Notifier + Send + Sync,
{
    async fn submit(&self, descriptor: &JobDescriptor) -> anyhow::Result<Job> {
        let job_id = self
            .prj_ref()
            .submit_job_script(descriptor)
            .await
            .with_context(|| format!("Unable to submit job {}", descriptor.name))?;
        tracing::info!(job_id = %job_id, name = %descriptor.name, "Submitted batch job");

        // The accounting database may lag behind the submission.
        let job = match self.prj_ref().get_job(&job_id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(job_id = %job_id, "Job not visible yet: {e:#}");
                Job::pending(&job_id, &descriptor.name)
            }
        };

        self.repo.insert(
            Arc::from(job_id.as_str()),
            Watched {
                state: JobState::Queuing,
                notification: descriptor.notification.clone(),
            },
        );
        self.apply(&job_id, job).await
    }

    fn track(&self, job_id: &str, notification: Option<MailPolicy>) {
        self.repo.entry(Arc::from(job_id)).or_insert(Watched {
            state: JobState::Queuing,
            notification,
        });
    }

    async fn refresh_all(&self) {
        tracing::debug!("Refreshing state of jobs");
        let ids: Vec<Arc<str>> = self.repo.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Err(e) = self.refresh(&id).await {
                tracing::error!(job_id = %id, "Unable to refresh job: {e:#}");
            }
        }
    }

    async fn watch(&self, job_id: &str, interval: Duration) -> anyhow::Result<Job> {
        if !self.repo.contains_key(job_id) {
            let job = self.prj_ref().get_job(job_id).await?;
            if job.state.is_terminal() {
                return Ok(job);
            }
            self.track(job_id, None);
        }

        let this = self;
        timer::new(interval, move || async move {
            match this.refresh(job_id).await {
                Ok(job) if job.state.is_terminal() => ControlFlow::Break(Ok(job)),
                Ok(_) => ControlFlow::Continue(()),
                Err(e) if this.repo.contains_key(job_id) => {
                    tracing::warn!(job_id, "Unable to refresh job, retrying: {e:#}");
                    ControlFlow::Continue(())
                }
                Err(e) => ControlFlow::Break(Err(e)),
            }
        })
        .await
    }
}

impl<Deps> JobServiceImpl<Deps>
where
    Deps: AsRef<JobServiceState> + JobScheduler + Notifier + Send + Sync,
{
    async fn refresh(&self, job_id: &str) -> anyhow::Result<Job> {
        anyhow::ensure!(self.repo.contains_key(job_id), "Job {job_id} is not being watched");
        let job = self.prj_ref().get_job(job_id).await?;
        self.apply(job_id, job).await
    }

    /// Records the newly observed state and acts on the transition from the
    /// previous one. Terminal jobs are forgotten, so each terminal transition
    /// is acted on once.
    async fn apply(&self, job_id: &str, job: Job) -> anyhow::Result<Job> {
        let (pre_state, notification) = self
            .repo
            .get(job_id)
            .map(|watched| (watched.state, watched.notification.clone()))
            .context("Job not found")?;
        let notification = notification.as_ref();

        match job.state {
            JobState::Queuing => {
                if pre_state.is_active() {
                    tracing::info!(job_id, "Job requeued");
                    self.notify(notification, MailEvent::Requeue, &job).await;
                }
                self.set_state(job_id, job.state);
            }
            JobState::Running | JobState::Completing => {
                match pre_state {
                    JobState::Queuing => {
                        tracing::info!(job_id, "Job started");
                        self.notify(notification, MailEvent::Begin, &job).await;
                    }
                    JobState::Suspended => tracing::info!(job_id, "Job resumed"),
                    _ => (),
                }
                self.set_state(job_id, job.state);
            }
            JobState::Suspended => {
                if pre_state != JobState::Suspended {
                    tracing::info!(job_id, "Job suspended");
                }
                self.set_state(job_id, job.state);
            }
            JobState::Unknown => {
                tracing::debug!(job_id, "Job state unknown, keeping {pre_state}");
            }
            JobState::Failed => {
                self.repo.remove(job_id);
                tracing::warn!(job_id, exit_code = job.exit_status_code, "Job failed");
                self.notify(notification, MailEvent::Fail, &job).await;
            }
            JobState::Completed => {
                self.repo.remove(job_id);
                tracing::info!(job_id, "Job completed");
                self.notify(notification, MailEvent::End, &job).await;
            }
        }

        Ok(job)
    }

    fn set_state(&self, job_id: &str, state: JobState) {
        if let Some(mut watched) = self.repo.get_mut(job_id) {
            watched.state = state;
        }
    }

    async fn notify(&self, policy: Option<&MailPolicy>, event: MailEvent, job: &Job) {
        let Some(policy) = policy else {
            return;
        };
        if !policy.wants(event) || self.prj_ref().notifies_natively() {
            return;
        }
        if let Err(e) = self.prj_ref().notify(policy, event, job).await {
            tracing::error!(job_id = %job.id, %event, "Unable to send notification: {e:#}");
        }
    }
}
