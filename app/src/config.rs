use std::path::Path;

use config::{Config, Environment, File};
use serde::*;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Where generated batch scripts are written.
    #[serde(default = "AppConfig::default_save_path")]
    pub save_path: String,

    #[serde(default = "AppConfig::default_refresh_jobs_interval")]
    pub refresh_jobs_interval: u64,

    #[serde(default = "Default::default")]
    pub scheduler: SchedulerConfig,

    #[serde(default = "Default::default")]
    pub ssh_proxy: Option<SshProxyConfig>,

    #[serde(default = "Default::default")]
    pub notifier: NotifierConfig,

    #[serde(default = "Default::default")]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_type")]
    pub r#type: String,

    /// Interpreter the local backend runs scripts with.
    #[serde(default = "SchedulerConfig::default_shell")]
    pub shell: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshProxyConfig {
    pub host: String,

    pub username: String,

    #[serde(default = "SshProxyConfig::default_port")]
    pub port: u16,

    #[serde(default = "SshProxyConfig::default_home_dir")]
    pub home_dir: String,

    #[serde(default = "SshProxyConfig::default_save_dir")]
    pub save_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// `log` or `mail`
    #[serde(default = "NotifierConfig::default_type")]
    pub r#type: String,

    #[serde(default = "NotifierConfig::default_mail_program")]
    pub mail_program: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_level")]
    pub level: String,
}

/// Reads `path` if given, otherwise `mdbatch.{yaml,toml,json}` from the
/// current directory when present, then `MDBATCH__*` environment variables.
pub fn build_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let file = match path {
        Some(path) => File::from(path),
        None => File::with_name("mdbatch").required(false),
    };
    let config = Config::builder()
        .add_source(file)
        .add_source(Environment::with_prefix("MDBATCH").separator("__"))
        .build()?;
    Ok(config.try_deserialize()?)
}

impl AppConfig {
    pub fn default_save_path() -> String {
        ".".to_owned()
    }

    pub fn default_refresh_jobs_interval() -> u64 {
        60
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            r#type: Self::default_type(),
            shell: Self::default_shell(),
        }
    }
}

impl SchedulerConfig {
    pub fn default_type() -> String {
        "slurm".to_owned()
    }

    pub fn default_shell() -> String {
        "bash".to_owned()
    }
}

impl Default for SshProxyConfig {
    fn default() -> Self {
        Self {
            host: Default::default(),
            username: Default::default(),
            port: Self::default_port(),
            home_dir: Self::default_home_dir(),
            save_dir: Self::default_save_dir(),
        }
    }
}

impl SshProxyConfig {
    pub fn default_port() -> u16 {
        22
    }

    pub fn default_home_dir() -> String {
        "~".to_owned()
    }

    pub fn default_save_dir() -> String {
        "mdbatch/jobs".to_owned()
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            r#type: Self::default_type(),
            mail_program: Self::default_mail_program(),
        }
    }
}

impl NotifierConfig {
    pub fn default_type() -> String {
        "log".to_owned()
    }

    pub fn default_mail_program() -> String {
        "mail".to_owned()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LogConfig {
    pub fn default_level() -> String {
        "info".to_owned()
    }
}
