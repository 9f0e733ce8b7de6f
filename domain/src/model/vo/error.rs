use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Job name must not be empty")]
    EmptyName,

    #[error("Resource '{0}' must be at least 1")]
    ZeroResource(&'static str),

    #[error("Memory per CPU must be greater than zero")]
    ZeroMemory,

    #[error("Invalid wall-clock limit '{0}', expected [D-]HH:MM:SS, MM:SS or minutes")]
    InvalidWallTime(String),

    #[error("Wall-clock limit must be greater than zero")]
    ZeroWallTime,

    #[error("Unknown mail event '{0}'")]
    UnknownMailEvent(String),

    #[error("Mail policy has events but no delivery address")]
    EmptyMailUser,

    #[error("Working directory '{0}' must be an absolute path")]
    RelativeWorkDir(String),

    #[error("Executable must not be empty")]
    EmptyExecutable,

    #[error("Output path template must not be empty")]
    EmptyOutput,

    #[error("Field '{0}' must not contain a double quote")]
    Quote(&'static str),
}
