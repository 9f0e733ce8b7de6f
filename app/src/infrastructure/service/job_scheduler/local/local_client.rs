use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use dashmap::DashMap;
use dep_inj::DepInj;
use domain::{
    model::{
        entity::{Job, JobState},
        vo::{JobDescriptor, OutputTemplate},
    },
    service::JobScheduler,
};
use rustix::process::{kill_process_group, Pid, Signal};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::infrastructure::service::job_scheduler::script;

/// Runs batch scripts on this host, one process group per job.
#[derive(DepInj)]
#[target(LocalClient)]
pub struct LocalClientState {
    base_path: PathBuf,
    shell: String,
    jobs: Arc<DashMap<String, Job>>,
    controls: Arc<DashMap<String, Control>>,
}

#[derive(Clone)]
struct Control {
    pid: Pid,
    cancel: CancellationToken,
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

impl LocalClientState {
    pub fn new(base_path: impl Into<PathBuf>, shell: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            shell: shell.into(),
            jobs: Default::default(),
            controls: Default::default(),
        }
    }
}

#[async_trait::async_trait]
impl<Deps> JobScheduler for LocalClient<Deps>
where
    Deps: AsRef<LocalClientState> + Send + Sync,
{
    fn render_script(&self, descriptor: &JobDescriptor) -> String {
        format!(
            "#!/bin/bash\n# {} on {} task(s), {} CPU(s), wall-clock limit {}\n\n{}",
            descriptor.name,
            descriptor.resources.ntasks,
            descriptor.resources.total_cpus(),
            descriptor.resources.time,
            script::body(descriptor)
        )
    }

    fn notifies_natively(&self) -> bool {
        false
    }

    async fn get_job(&self, id: &str) -> anyhow::Result<Job> {
        self.jobs.get(id).map(|job| job.clone()).with_context(|| format!("No such id: {id}"))
    }

    async fn get_jobs(&self) -> anyhow::Result<Vec<Job>> {
        Ok(self.jobs.iter().map(|job| job.value().clone()).collect())
    }

    async fn submit_job_script(&self, descriptor: &JobDescriptor) -> anyhow::Result<String> {
        let dir = self.base_path.join(format!("{}-{}", descriptor.file_stem(), Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Unable to create {}", dir.display()))?;
        let path = dir.join("run.sh");
        tokio::fs::write(&path, self.render_script(descriptor))
            .await
            .with_context(|| format!("Unable to write {}", path.display()))?;

        let job_id = new_job_id();
        let log = dir.join(descriptor.output.render(&job_id, &descriptor.name));
        let limit = descriptor.resources.time.as_duration();
        self.launch(&job_id, &descriptor.name, &path, log, Some(limit)).await?;
        Ok(job_id)
    }

    async fn submit_job(&self, script_path: &str) -> anyhow::Result<String> {
        let path = self.base_path.join(script_path);
        anyhow::ensure!(path.is_file(), "No script at {}", path.display());
        let dir = path.parent().context("Script path has no parent directory")?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let job_id = new_job_id();
        let log = dir.join(OutputTemplate::default().render(&job_id, &name));
        self.launch(&job_id, &name, &path, log, None).await?;
        Ok(job_id)
    }

    async fn delete_job(&self, job_id: &str) -> anyhow::Result<()> {
        self.control(job_id)?.cancel.cancel();
        Ok(())
    }

    async fn pause_job(&self, job_id: &str) -> anyhow::Result<()> {
        kill_process_group(self.control(job_id)?.pid, Signal::Stop)?;
        self.set_state(job_id, JobState::Suspended);
        Ok(())
    }

    async fn continue_job(&self, job_id: &str) -> anyhow::Result<()> {
        kill_process_group(self.control(job_id)?.pid, Signal::Cont)?;
        self.set_state(job_id, JobState::Running);
        Ok(())
    }
}

impl<Deps> LocalClient<Deps>
where
    Deps: AsRef<LocalClientState> + Send + Sync,
{
    /// Starts `script` in its own process group with stdout and stderr going
    /// to `log`, and leaves a task behind that records how it ended.
    async fn launch(
        &self,
        job_id: &str,
        name: &str,
        script: &Path,
        log: PathBuf,
        limit: Option<Duration>,
    ) -> anyhow::Result<()> {
        if let Some(dir) = log.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let stdout = tokio::fs::File::create(&log)
            .await
            .with_context(|| format!("Unable to create log {}", log.display()))?
            .into_std()
            .await;
        let stderr = stdout.try_clone()?;

        let mut command = Command::new(&self.shell);
        command
            .arg(script)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .process_group(0);
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }
        let child = command
            .spawn()
            .with_context(|| format!("Unable to start {} {}", self.shell, script.display()))?;
        let pid = child
            .id()
            .and_then(|id| Pid::from_raw(id as i32))
            .context("Job exited before it could be tracked")?;

        tracing::info!(job_id, pid = pid.as_raw_nonzero().get(), log = %log.display(), "Started local job");
        self.jobs.insert(
            job_id.to_owned(),
            Job {
                state: JobState::Running,
                owner: std::env::var("USER").unwrap_or_default(),
                log_path: Some(log.clone()),
                ..Job::pending(job_id, name)
            },
        );
        let cancel = CancellationToken::new();
        self.controls.insert(
            job_id.to_owned(),
            Control {
                pid,
                cancel: cancel.clone(),
            },
        );

        let jobs = self.jobs.clone();
        let controls = self.controls.clone();
        let job_id = job_id.to_owned();
        tokio::spawn(async move {
            let start_time = chrono::Utc::now().timestamp();
            let started = Instant::now();
            let (outcome, status) = supervise(child, pid, limit, cancel).await;
            controls.remove(&job_id);

            let (state, error_output) = match outcome {
                Outcome::Exited(status) if status.success() => (JobState::Completed, String::new()),
                Outcome::Exited(_) => (JobState::Failed, script::log_tail(&log, 20).await),
                Outcome::TimedOut => {
                    append(&log, "DUE TO TIME LIMIT").await;
                    (JobState::Failed, "DUE TO TIME LIMIT".to_owned())
                }
                Outcome::Cancelled => {
                    append(&log, "CANCELLED").await;
                    (JobState::Failed, "CANCELLED".to_owned())
                }
            };
            tracing::info!(job_id = %job_id, %state, "Local job ended");

            if let Some(mut job) = jobs.get_mut(&job_id) {
                job.state = state;
                job.exit_status_code = exit_code(status);
                job.error_output = error_output;
                job.resource_used.node = 1;
                job.resource_used.wall_time = started.elapsed().as_secs();
                job.resource_used.start_time = start_time;
                job.resource_used.end_time = chrono::Utc::now().timestamp();
            }
        });
        Ok(())
    }

    fn control(&self, job_id: &str) -> anyhow::Result<Control> {
        self.controls
            .get(job_id)
            .map(|control| control.clone())
            .with_context(|| format!("Job {job_id} is not running"))
    }

    fn set_state(&self, job_id: &str, state: JobState) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            job.state = state;
        }
    }
}

/// Waits for the job to exit, killing its whole process group at the wall
/// clock limit or on cancellation.
async fn supervise(
    mut child: Child,
    pid: Pid,
    limit: Option<Duration>,
    cancel: CancellationToken,
) -> (Outcome, Option<ExitStatus>) {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => return (Outcome::Exited(status), Some(status)),
            Err(e) => {
                tracing::error!(pid = pid.as_raw_nonzero().get(), "Unable to wait for job: {e}");
                Outcome::Cancelled
            }
        },
        _ = deadline => Outcome::TimedOut,
        _ = cancel.cancelled() => Outcome::Cancelled,
    };

    if let Err(e) = kill_process_group(pid, Signal::Kill) {
        tracing::warn!(pid = pid.as_raw_nonzero().get(), "Unable to kill job: {e}");
    }
    let status = child.wait().await.ok();
    (outcome, status)
}

fn new_job_id() -> String {
    format!("local-{}", Uuid::new_v4())
}

fn exit_code(status: Option<ExitStatus>) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match status {
        Some(status) => status.code().or_else(|| status.signal().map(|sig| 128 + sig)).unwrap_or(-1),
        None => -1,
    }
}

async fn append(log: &Path, line: &str) {
    let file = tokio::fs::OpenOptions::new().append(true).create(true).open(log).await;
    let result = match file {
        Ok(mut file) => file.write_all(format!("{line}\n").as_bytes()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(log = %log.display(), "Unable to append to job log: {e}");
    }
}

#[cfg(test)]
mod tests {
    use bytesize::ByteSize;
    use domain::model::vo::{LaunchCommand, Launcher, ResourceRequest, WallTime};

    use super::*;

    fn scratch() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mdbatch-local-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn state(base: &Path) -> LocalClientState {
        LocalClientState::new(base.join("jobs"), "bash")
    }

    fn descriptor(work_dir: &Path, executable: &str, arguments: &[&str], time: WallTime) -> JobDescriptor {
        JobDescriptor::builder()
            .name("local test")
            .resources(ResourceRequest::new(1, 1, 1, ByteSize::mib(100), time).unwrap())
            .work_dir(work_dir)
            .command(LaunchCommand {
                launcher: Launcher::None,
                executable: executable.to_owned(),
                arguments: arguments.iter().map(|arg| arg.to_string()).collect(),
            })
            .build()
    }

    async fn finished(client: &LocalClient<LocalClientState>, id: &str) -> Job {
        tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                let job = client.get_job(id).await.unwrap();
                if job.state.is_terminal() {
                    break job;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .unwrap()
    }

    impl AsRef<LocalClientState> for LocalClientState {
        fn as_ref(&self) -> &LocalClientState {
            self
        }
    }

    #[test]
    fn render() {
        let state = LocalClientState::new("/tmp/jobs", "bash");
        let descriptor = JobDescriptor::builder()
            .name("cag40")
            .resources(ResourceRequest::new(1, 4, 2, ByteSize::gib(1), "01:30:00".parse().unwrap()).unwrap())
            .work_dir("/scratch/md/cag40")
            .command(LaunchCommand {
                launcher: Launcher::Mpirun,
                executable: "lmp".to_owned(),
                arguments: vec!["-in".to_owned(), "in.cag40".to_owned()],
            })
            .build();
        let script = LocalClient::inj_ref(&state).render_script(&descriptor);
        assert!(script.starts_with("#!/bin/bash\n# cag40 on 4 task(s), 8 CPU(s), wall-clock limit 01:30:00\n\n"));
        assert!(script.ends_with("cd /scratch/md/cag40 || exit 1\nmpirun -np 4 lmp -in in.cag40\n"));
    }

    #[tokio::test]
    async fn completes() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let marker = base.join("marker");
        let descriptor = descriptor(&base, "touch", &[marker.to_str().unwrap()], "10".parse().unwrap());

        let id = client.submit_job_script(&descriptor).await.unwrap();
        assert!(id.starts_with("local-"));
        let job = finished(client, &id).await;
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.exit_status_code, 0);
        assert!(marker.exists());
        assert!(job.log_path.unwrap().starts_with(base.join("jobs")));
    }

    #[tokio::test]
    async fn missing_work_dir_fails_before_launch() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let marker = base.join("marker");
        let descriptor = descriptor(
            &base.join("does-not-exist"),
            "touch",
            &[marker.to_str().unwrap()],
            "10".parse().unwrap(),
        );

        let id = client.submit_job_script(&descriptor).await.unwrap();
        let job = finished(client, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_ne!(job.exit_status_code, 0);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_executable() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let descriptor = descriptor(&base, "lmp_mdbatch_missing", &["-in", "in.test"], "10".parse().unwrap());

        let id = client.submit_job_script(&descriptor).await.unwrap();
        let job = finished(client, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error_output.contains("not found"));
        let log = std::fs::read_to_string(job.log_path.unwrap()).unwrap();
        assert!(log.contains("not found"));
    }

    #[tokio::test]
    async fn killed_at_time_limit() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let descriptor = descriptor(&base, "sleep", &["30"], WallTime::from_secs(1).unwrap());

        let started = Instant::now();
        let id = client.submit_job_script(&descriptor).await.unwrap();
        let job = finished(client, &id).await;
        assert!(started.elapsed() < Duration::from_secs(15));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_output, "DUE TO TIME LIMIT");
        let log = std::fs::read_to_string(job.log_path.unwrap()).unwrap();
        assert!(log.ends_with("DUE TO TIME LIMIT\n"));
    }

    #[tokio::test]
    async fn resubmission_gets_new_id_and_log() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let descriptor = descriptor(&base, "true", &[], "10".parse().unwrap());

        let first = client.submit_job_script(&descriptor).await.unwrap();
        let second = client.submit_job_script(&descriptor).await.unwrap();
        assert_ne!(first, second);
        let first = finished(client, &first).await;
        let second = finished(client, &second).await;
        assert_ne!(first.log_path, second.log_path);
        assert_eq!(client.get_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancel() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let descriptor = descriptor(&base, "sleep", &["30"], "10".parse().unwrap());

        let id = client.submit_job_script(&descriptor).await.unwrap();
        client.delete_job(&id).await.unwrap();
        let job = finished(client, &id).await;
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_output, "CANCELLED");
        assert!(client.delete_job(&id).await.is_err());
    }

    #[tokio::test]
    async fn suspend_and_resume() {
        let base = scratch();
        let state = state(&base);
        let client = LocalClient::inj_ref(&state);
        let descriptor = descriptor(&base, "sleep", &["30"], "10".parse().unwrap());

        let id = client.submit_job_script(&descriptor).await.unwrap();
        client.pause_job(&id).await.unwrap();
        assert_eq!(client.get_job(&id).await.unwrap().state, JobState::Suspended);
        client.continue_job(&id).await.unwrap();
        assert_eq!(client.get_job(&id).await.unwrap().state, JobState::Running);

        client.delete_job(&id).await.unwrap();
        assert_eq!(finished(client, &id).await.state, JobState::Failed);
    }
}
