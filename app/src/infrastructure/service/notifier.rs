use std::process::Stdio;

use anyhow::Context;
use dep_inj::DepInj;
use domain::{
    model::{
        entity::Job,
        vo::{MailEvent, MailPolicy},
    },
    service::Notifier,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(DepInj, Default)]
#[target(LogNotifier)]
pub struct LogNotifierState;

#[async_trait::async_trait]
impl<Deps> Notifier for LogNotifier<Deps>
where
    Deps: AsRef<LogNotifierState> + Send + Sync,
{
    async fn notify(&self, policy: &MailPolicy, event: MailEvent, job: &Job) -> anyhow::Result<()> {
        tracing::info!(
            job_id = %job.id,
            %event,
            state = %job.state,
            exit_code = job.exit_status_code,
            mail_user = %policy.mail_user,
            "{}",
            subject(event, job)
        );
        Ok(())
    }
}

/// Hands notifications to a `mail`-compatible program: `<program> -s <subject> <address>`
/// with the message on stdin.
#[derive(DepInj)]
#[target(MailNotifier)]
pub struct MailNotifierState {
    program: String,
    args: Vec<String>,
}

impl MailNotifierState {
    /// `command` is the program followed by any arguments it always takes.
    pub fn new(command: &str) -> anyhow::Result<Self> {
        let mut words = command.split_whitespace().map(str::to_owned);
        let program = words.next().context("Mail program is empty")?;
        Ok(Self::with_args(program, words.collect()))
    }

    pub fn with_args(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait::async_trait]
impl<Deps> Notifier for MailNotifier<Deps>
where
    Deps: AsRef<MailNotifierState> + Send + Sync,
{
    async fn notify(&self, policy: &MailPolicy, event: MailEvent, job: &Job) -> anyhow::Result<()> {
        let subject = subject(event, job);
        tracing::debug!(job_id = %job.id, mail_user = %policy.mail_user, "Sending mail: {subject}");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(["-s", &subject, &policy.mail_user])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Unable to start {}", self.program))?;
        let mut stdin = child.stdin.take().context("Mail program has no stdin")?;
        stdin.write_all(message(job).as_bytes()).await?;
        drop(stdin);

        let out = child.wait_with_output().await?;
        if !out.status.success() {
            anyhow::bail!(
                "Exit Status not 0 for {}. real: {}, err: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr)
            )
        }
        Ok(())
    }
}

fn subject(event: MailEvent, job: &Job) -> String {
    let what = match event {
        MailEvent::Begin => "Began",
        MailEvent::End => "Ended",
        MailEvent::Fail => "Failed",
        MailEvent::Requeue => "Requeued",
        MailEvent::All => "Changed",
    };
    format!(
        "Job_id={} Name={} {what}, {}, ExitCode {}",
        job.id, job.name, job.state, job.exit_status_code
    )
}

fn message(job: &Job) -> String {
    let mut message = format!(
        "Job id:     {}\nName:       {}\nState:      {}\nExit code:  {}\nWall time:  {}s\n",
        job.id, job.name, job.state, job.exit_status_code, job.resource_used.wall_time
    );
    if let Some(log) = &job.log_path {
        message += &format!("Log:        {}\n", log.display());
    }
    if !job.error_output.is_empty() {
        message += &format!("\n{}\n", job.error_output);
    }
    message
}
