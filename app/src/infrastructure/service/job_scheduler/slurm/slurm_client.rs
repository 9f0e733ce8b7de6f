use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::Context;
use dashmap::DashMap;
use dep_inj::DepInj;
use domain::{
    model::{
        entity::{Job, JobState},
        vo::{launch::quote, JobDescriptor},
    },
    service::JobScheduler,
};
use tokio::process::Command;
use uuid::Uuid;

use super::{parse_job_id, SlurmJob, SACCT_FORMAT};
use crate::infrastructure::command::{upload, MaybeSsh};
use crate::infrastructure::service::job_scheduler::script;

#[derive(DepInj)]
#[target(SlurmClient)]
pub struct SlurmClientState {
    base_path: PathBuf,
    /// Log file of each job submitted through this client.
    logs: DashMap<String, PathBuf>,
}

impl SlurmClientState {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            logs: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl<Deps> JobScheduler for SlurmClient<Deps>
where
    Deps: AsRef<SlurmClientState> + MaybeSsh + Send + Sync,
{
    fn render_script(&self, descriptor: &JobDescriptor) -> String {
        let resources = &descriptor.resources;
        let mut directives = vec![
            directive("job-name", &descriptor.name),
            directive("nodes", resources.nodes),
            directive("ntasks", resources.ntasks),
            directive("cpus-per-task", resources.cpus_per_task),
            directive("mem-per-cpu", resources.mem_per_cpu_value()),
            directive("time", resources.time),
        ];
        if let Some(policy) = descriptor.notification.as_ref().filter(|policy| !policy.is_empty()) {
            directives.push(directive("mail-type", policy.mail_type_value()));
            directives.push(directive("mail-user", &policy.mail_user));
        }
        directives.push(directive("output", descriptor.output.as_str()));

        format!("#!/bin/bash\n{}\n\n{}", directives.join("\n"), script::body(descriptor))
    }

    fn notifies_natively(&self) -> bool {
        true
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Job> {
        tracing::debug!(job_id = id, "Querying sacct");
        let record = self
            .sacct(Some(id))
            .await?
            .into_iter()
            .find(|record| record.job_id == id)
            .with_context(|| format!("No such id: {id}"))?;
        Ok(self.with_log(record.into_job()?).await)
    }

    async fn get_jobs(&self) -> anyhow::Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for record in self.sacct(None).await? {
            jobs.push(self.with_log(record.into_job()?).await);
        }
        Ok(jobs)
    }

    async fn submit_job_script(&self, descriptor: &JobDescriptor) -> anyhow::Result<String> {
        // A fresh directory per submission, so resubmitting never reuses a script or log.
        let relative = PathBuf::from(format!(
            "{}-{}",
            descriptor.file_stem(),
            Uuid::new_v4().simple()
        ))
        .join("run.sh");
        let path = self.base_path.join(&relative);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Unable to create {}", dir.display()))?;
        }
        tokio::fs::write(&path, self.render_script(descriptor))
            .await
            .with_context(|| format!("Unable to write {}", path.display()))?;

        let relative = relative.to_str().context("Script path is not valid UTF-8")?;
        let job_id = self.submit_job(relative).await?;

        let submit_dir = match self.prj_ref().ssh_config() {
            Some(ssh) => ssh.remote_path(relative),
            None => path.clone(),
        };
        if let Some(submit_dir) = submit_dir.parent() {
            let log = descriptor.output.render(&job_id, &descriptor.name);
            self.logs.insert(job_id.clone(), submit_dir.join(log));
        }
        Ok(job_id)
    }

    async fn submit_job(&self, script_path: &str) -> anyhow::Result<String> {
        let path = self.base_path.join(script_path);
        let file_name = path
            .file_name()
            .context("Script path has no file name")?
            .to_string_lossy()
            .into_owned();

        let out = if let Some(ssh) = self.prj_ref().ssh_config() {
            let remote_path = ssh.remote_path(script_path);
            let remote_dir = script::shell_path(remote_path.parent().unwrap_or(Path::new("~")));

            let out = self.prj_ref().shell(&format!("mkdir -p {remote_dir}")).output().await?;
            if !out.status.success() {
                anyhow::bail!(
                    "Unable to create directory {remote_dir} for slurm script. err: {}",
                    String::from_utf8_lossy(&out.stderr)
                )
            }
            let out = upload(ssh, &path, &remote_path).output().await?;
            if !out.status.success() {
                anyhow::bail!(
                    "Exit Status not 0 for scp. real: {}, err: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr)
                )
            }
            self.prj_ref()
                .shell(&format!("cd {remote_dir} && sbatch {}", quote(&file_name)))
                .output()
                .await?
        } else {
            let dir = path.parent().context("Script path has no parent directory")?;
            Command::new("sbatch").arg(&file_name).current_dir(dir).output().await?
        };

        if !out.status.success() {
            anyhow::bail!(
                "Exit Status not 0 for submit_job. real: {}, err: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            )
        }
        parse_job_id(&String::from_utf8_lossy(&out.stdout))
    }

    async fn delete_job(&self, job_id: &str) -> anyhow::Result<()> {
        self.run("scancel", &[job_id]).await
    }

    async fn pause_job(&self, job_id: &str) -> anyhow::Result<()> {
        self.run("scontrol", &["suspend", job_id]).await
    }

    async fn continue_job(&self, job_id: &str) -> anyhow::Result<()> {
        self.run("scontrol", &["resume", job_id]).await
    }
}

impl<Deps> SlurmClient<Deps>
where
    Deps: AsRef<SlurmClientState> + MaybeSsh + Send + Sync,
{
    async fn sacct(&self, id: Option<&str>) -> anyhow::Result<Vec<SlurmJob>> {
        let mut command = self.prj_ref().command("sacct");
        command.args(["-PXo", SACCT_FORMAT]);
        if let Some(id) = id {
            command.args(["-j", id]);
        }
        let out = command.output().await?;
        if !out.status.success() {
            anyhow::bail!(
                "Exit Status not 0 for sacct. real: {}, err: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            )
        }
        SlurmJob::parse(&out.stdout)
    }

    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<()> {
        tracing::debug!(program, ?args, "Running slurm command");
        let out = self.prj_ref().command(program).args(args).output().await?;
        if !out.status.success() {
            anyhow::bail!(
                "Exit Status not 0 for {program}. real: {}, err: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr)
            )
        }
        Ok(())
    }

    /// Fills in the log path of jobs submitted here, and the log tail of
    /// those that failed when the log is readable from this host.
    async fn with_log(&self, mut job: Job) -> Job {
        job.log_path = self.logs.get(&*job.id).map(|path| path.clone());
        if job.state == JobState::Failed && !self.prj_ref().is_ssh() {
            if let Some(path) = &job.log_path {
                job.error_output = script::log_tail(path, 20).await;
            }
        }
        job
    }
}

fn directive(key: &str, value: impl Display) -> String {
    let value = value.to_string();
    if value.contains(char::is_whitespace) {
        format!("#SBATCH --{key}=\"{value}\"")
    } else {
        format!("#SBATCH --{key}={value}")
    }
}
