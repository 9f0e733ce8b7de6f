use std::path::PathBuf;
use std::sync::Arc;

/// A job instance as reported by the cluster backend.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Arc<str>,
    pub name: String,
    pub owner: String,
    pub state: JobState,
    pub exit_status_code: i32,
    pub error_output: String,
    /// Where the combined stdout/stderr of the job lands, when the backend knows it.
    pub log_path: Option<PathBuf>,
    pub resource_used: JobResources,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queuing,
    Running,
    Suspended,
    Completing,
    Completed,
    Failed,
    #[default]
    Unknown,
}

impl JobState {
    /// `Completed` and `Failed` are the only states a job never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Completing)
    }
}

/// Resources consumed by a job
#[derive(Debug, Clone, Default)]
pub struct JobResources {
    /// Allocated cores
    pub cpu: u64,
    pub avg_memory: u64,
    pub max_memory: u64,
    pub storage: u64,
    /// Wall-clock seconds
    pub wall_time: u64,
    /// Core seconds
    pub cpu_time: u64,
    pub node: u64,
    /// Unix timestamp
    pub start_time: i64,
    /// Unix timestamp
    pub end_time: i64,
}

impl Job {
    /// A job the backend accepted but has not reported on yet.
    pub fn pending(id: &str, name: &str) -> Self {
        Self {
            id: Arc::from(id),
            name: name.to_owned(),
            state: JobState::Queuing,
            ..Default::default()
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.owner == other.owner
            && self.state == other.state
    }
}

impl Default for Job {
    fn default() -> Self {
        Self {
            id: Arc::from(String::default()),
            name: String::default(),
            owner: String::default(),
            state: JobState::default(),
            exit_status_code: 0,
            error_output: String::default(),
            log_path: None,
            resource_used: JobResources::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        for state in [
            JobState::Queuing,
            JobState::Running,
            JobState::Suspended,
            JobState::Completing,
            JobState::Unknown,
        ] {
            assert!(!state.is_terminal(), "{state} should not be terminal");
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(JobState::Queuing.to_string(), "QUEUING");
        assert_eq!(JobState::Completed.to_string(), "COMPLETED");
    }
}
