mod boilerplate;
mod container;

use std::path::PathBuf;

use anyhow::Context;
use service::prelude::*;

use crate::{
    config::AppConfig,
    infrastructure::{
        command::SshConfig,
        ioc::container::{JobSchedulerState, NotifierState},
        service::{
            job_scheduler::{LocalClientState, SlurmClientState},
            notifier::{LogNotifierState, MailNotifierState},
        },
    },
};

pub use self::container::Container;

impl Container {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let ssh_config = config.ssh_proxy.as_ref().map(SshConfig::new);

        // Backends change directory before running anything, so scripts are
        // addressed by absolute path.
        let mut save_path = PathBuf::from(&config.save_path);
        if save_path.is_relative() {
            save_path = std::env::current_dir()
                .context("Unable to resolve `save_path`")?
                .join(save_path);
        }

        let job_scheduler = match config.scheduler.r#type.to_lowercase().as_str() {
            "slurm" => JobSchedulerState::Slurm(SlurmClientState::new(save_path)),
            "local" => {
                if ssh_config.is_some() {
                    tracing::warn!("`ssh_proxy` is ignored by the local backend");
                }
                JobSchedulerState::Local(LocalClientState::new(
                    save_path,
                    config.scheduler.shell.clone(),
                ))
            }
            t => {
                anyhow::bail!("Unsupported `scheduler.type`: {t}");
            }
        };

        let notifier = match config.notifier.r#type.to_lowercase().as_str() {
            "log" => NotifierState::Log(LogNotifierState),
            "mail" => NotifierState::Mail(MailNotifierState::new(&config.notifier.mail_program)?),
            t => {
                anyhow::bail!("Unsupported `notifier.type`: {t}");
            }
        };

        let container = Container::builder()
            .ssh_config(ssh_config)
            .job_scheduler(job_scheduler)
            .notifier(notifier)
            .job(JobServiceState::new())
            .build();

        Ok(container)
    }

    pub fn is_local(&self) -> bool {
        matches!(self.job_scheduler, JobSchedulerState::Local(_))
    }
}

#[cfg(test)]
mod tests {
    use domain::service::JobScheduler;

    use super::*;
    use crate::config::build_config;

    #[test]
    fn picks_backend_and_notifier() {
        let mut config = build_config(None).unwrap();
        config.scheduler.r#type = "Local".to_owned();
        config.notifier.r#type = "mail".to_owned();
        let container = Container::new(&config).unwrap();
        assert!(container.is_local());
        assert!(!container.notifies_natively());
        assert!(matches!(container.notifier, NotifierState::Mail(_)));

        config.scheduler.r#type = "pbs".to_owned();
        assert!(Container::new(&config).is_err());
    }
}
