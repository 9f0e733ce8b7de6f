use std::time::Duration;

use domain::{
    model::{
        entity::Job,
        vo::{JobDescriptor, MailEvent, MailPolicy},
    },
    service::{JobScheduler, JobService, Notifier},
};
use service::prelude::JobServiceImpl;

use super::container::{JobSchedulerState, NotifierState};
use super::Container;
use crate::infrastructure::service::{
    job_scheduler::{LocalClient, SlurmClient},
    notifier::{LogNotifier, MailNotifier},
};

#[async_trait::async_trait]
impl JobScheduler for Container {
    fn render_script(&self, descriptor: &JobDescriptor) -> String {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).render_script(descriptor),
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).render_script(descriptor),
        }
    }

    fn notifies_natively(&self) -> bool {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).notifies_natively(),
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).notifies_natively(),
        }
    }

    async fn get_jobs(&self) -> anyhow::Result<Vec<Job>> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).get_jobs().await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).get_jobs().await,
        }
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Job> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).get_job(id).await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).get_job(id).await,
        }
    }

    async fn submit_job_script(&self, descriptor: &JobDescriptor) -> anyhow::Result<String> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => {
                SlurmClient::inj_ref(self).submit_job_script(descriptor).await
            }
            JobSchedulerState::Local(_) => {
                LocalClient::inj_ref(self).submit_job_script(descriptor).await
            }
        }
    }

    async fn submit_job(&self, script_path: &str) -> anyhow::Result<String> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).submit_job(script_path).await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).submit_job(script_path).await,
        }
    }

    async fn delete_job(&self, job_id: &str) -> anyhow::Result<()> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).delete_job(job_id).await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).delete_job(job_id).await,
        }
    }

    async fn pause_job(&self, job_id: &str) -> anyhow::Result<()> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).pause_job(job_id).await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).pause_job(job_id).await,
        }
    }

    async fn continue_job(&self, job_id: &str) -> anyhow::Result<()> {
        match self.job_scheduler {
            JobSchedulerState::Slurm(_) => SlurmClient::inj_ref(self).continue_job(job_id).await,
            JobSchedulerState::Local(_) => LocalClient::inj_ref(self).continue_job(job_id).await,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for Container {
    async fn notify(&self, policy: &MailPolicy, event: MailEvent, job: &Job) -> anyhow::Result<()> {
        match self.notifier {
            NotifierState::Log(_) => LogNotifier::inj_ref(self).notify(policy, event, job).await,
            NotifierState::Mail(_) => MailNotifier::inj_ref(self).notify(policy, event, job).await,
        }
    }
}

#[async_trait::async_trait]
impl JobService for Container {
    async fn submit(&self, descriptor: &JobDescriptor) -> anyhow::Result<Job> {
        JobServiceImpl::inj_ref(self).submit(descriptor).await
    }

    fn track(&self, job_id: &str, notification: Option<MailPolicy>) {
        JobServiceImpl::inj_ref(self).track(job_id, notification)
    }

    async fn refresh_all(&self) {
        JobServiceImpl::inj_ref(self).refresh_all().await
    }

    async fn watch(&self, job_id: &str, interval: Duration) -> anyhow::Result<Job> {
        JobServiceImpl::inj_ref(self).watch(job_id, interval).await
    }
}
