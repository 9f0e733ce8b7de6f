use std::sync::Arc;

use bytesize::ByteSize;
use domain::model::entity::{Job, JobResources, JobState};
use serde::Deserialize;

/// Fields requested from `sacct -o`, in the order of [`SlurmJob`].
pub const SACCT_FORMAT: &str =
    "JobID,JobName,User,State,ExitCode,CPUTimeRAW,ElapsedRaw,NCPUS,AveRSS,MaxRSS,NNodes,Start,End";

/// One row of `sacct -P` output.
#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
pub struct SlurmJob {
    #[serde(rename = "JobID")]
    pub job_id: String,
    #[serde(rename = "JobName")]
    pub job_name: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "ExitCode")]
    pub exit_code: String,
    #[serde(rename = "CPUTimeRAW")]
    pub cpu_time: u64,
    #[serde(rename = "ElapsedRaw")]
    pub elapsed: u64,
    #[serde(rename = "NCPUS")]
    pub ncpus: u64,
    #[serde(rename = "AveRSS")]
    pub ave_mem: String,
    #[serde(rename = "MaxRSS")]
    pub mem: String,
    #[serde(rename = "NNodes")]
    pub nnodes: u64,
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
}

impl SlurmJob {
    pub fn parse(stdout: &[u8]) -> anyhow::Result<Vec<Self>> {
        // sacct quotes some job names
        let stdout = stdout.iter().copied().filter(|c| *c != b'\'').collect::<Vec<_>>();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .quoting(false)
            .from_reader(stdout.as_slice());
        Ok(reader.deserialize().collect::<Result<Vec<SlurmJob>, _>>()?)
    }

    pub fn job_state(&self) -> JobState {
        parse_state(&self.state)
    }

    pub fn into_job(self) -> anyhow::Result<Job> {
        let state = self.job_state();
        let exit_status_code = self.exit_code.split(':').next().unwrap_or("0").parse()?;
        Ok(Job {
            id: Arc::from(self.job_id),
            name: self.job_name,
            owner: self.user,
            state,
            exit_status_code,
            error_output: String::default(),
            log_path: None,
            resource_used: JobResources {
                cpu: self.ncpus,
                avg_memory: parse_rss(&self.ave_mem),
                max_memory: parse_rss(&self.mem),
                storage: 0,
                wall_time: self.elapsed,
                cpu_time: self.cpu_time,
                start_time: parse_time(&self.start),
                end_time: parse_time(&self.end),
                node: self.nnodes,
            },
        })
    }
}

/// Maps a sacct state, e.g. `CANCELLED by 1000`, to a job state.
pub fn parse_state(state: &str) -> JobState {
    match state.split_whitespace().next().unwrap_or_default() {
        "BOOT_FAIL" | "FAILED" | "NODE_FAIL" | "OUT_OF_MEMORY" | "TIMEOUT" | "DEADLINE"
        | "PREEMPTED" | "CANCELLED" | "REVOKED" => JobState::Failed,
        "COMPLETED" => JobState::Completed,
        "PENDING" | "REQUEUED" | "REQUEUE_HOLD" | "REQUEUE_FED" | "RESV_DEL_HOLD" => {
            JobState::Queuing
        }
        "COMPLETING" | "STAGE_OUT" => JobState::Completing,
        "RUNNING" | "RESIZING" | "SIGNALING" | "CONFIGURING" => JobState::Running,
        "SUSPENDED" | "STOPPED" => JobState::Suspended,
        _ => JobState::Unknown,
    }
}

/// The id printed by `sbatch`: `Submitted batch job 4242`, or the bare id with `--parsable`.
pub fn parse_job_id(stdout: &str) -> anyhow::Result<String> {
    stdout
        .lines()
        .find_map(|line| {
            let line = line.trim();
            if let Some(id) = line.strip_prefix("Submitted batch job ") {
                return Some(id.trim());
            }
            let id = line.split(';').next().unwrap_or_default();
            (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
        })
        .map(str::to_owned)
        .ok_or_else(|| anyhow::anyhow!("Unable to find job id in sbatch output: {stdout}"))
}

/// sacct memory figures: `1234K`, `12M`, plain bytes or empty.
fn parse_rss(rss: &str) -> u64 {
    let rss = rss.trim();
    if rss.is_empty() {
        return 0;
    }
    let (number, unit) = match rss.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&rss[..idx], c.to_ascii_uppercase()),
        _ => (rss, 'B'),
    };
    let Ok(number) = number.parse::<f64>() else {
        return 0;
    };
    let unit = match unit {
        'K' => ByteSize::kib(1),
        'M' => ByteSize::mib(1),
        'G' => ByteSize::gib(1),
        'T' => ByteSize::tib(1),
        _ => ByteSize::b(1),
    };
    (number * unit.as_u64() as f64) as u64
}

fn parse_time(time: &str) -> i64 {
    if matches!(time, "" | "Unknown" | "UNKNOWN" | "None") {
        return 0;
    }
    match chrono::NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S") {
        Ok(x) => x.and_utc().timestamp(),
        Err(_) => 0,
    }
}
