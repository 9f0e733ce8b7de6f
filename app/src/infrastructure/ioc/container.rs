use service::prelude::JobServiceState;
use typed_builder::TypedBuilder;

use crate::infrastructure::{
    command::SshConfig,
    service::{
        job_scheduler::{LocalClientState, SlurmClientState},
        notifier::{LogNotifierState, MailNotifierState},
    },
};

#[derive(derive_more::AsRef, TypedBuilder)]
pub struct Container {
    #[as_ref]
    pub(super) ssh_config: Option<SshConfig>,

    pub(super) job_scheduler: JobSchedulerState,

    pub(super) notifier: NotifierState,

    #[as_ref]
    pub(super) job: JobServiceState,
}

pub(super) enum JobSchedulerState {
    Slurm(SlurmClientState),
    Local(LocalClientState),
}

pub(super) enum NotifierState {
    Log(LogNotifierState),
    Mail(MailNotifierState),
}

impl AsRef<SlurmClientState> for Container {
    fn as_ref(&self) -> &SlurmClientState {
        match &self.job_scheduler {
            JobSchedulerState::Slurm(client) => client,
            _ => panic!("Not using Slurm"),
        }
    }
}

impl AsRef<LocalClientState> for Container {
    fn as_ref(&self) -> &LocalClientState {
        match &self.job_scheduler {
            JobSchedulerState::Local(client) => client,
            _ => panic!("Not using the local backend"),
        }
    }
}

impl AsRef<LogNotifierState> for Container {
    fn as_ref(&self) -> &LogNotifierState {
        match &self.notifier {
            NotifierState::Log(notifier) => notifier,
            _ => panic!("Not using the log notifier"),
        }
    }
}

impl AsRef<MailNotifierState> for Container {
    fn as_ref(&self) -> &MailNotifierState {
        match &self.notifier {
            NotifierState::Mail(notifier) => notifier,
            _ => panic!("Not using the mail notifier"),
        }
    }
}
