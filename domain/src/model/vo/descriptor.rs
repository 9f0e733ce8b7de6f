use std::path::PathBuf;

use serde::Deserialize;
use typed_builder::TypedBuilder;

use super::{DescriptorError, LaunchCommand, MailPolicy, OutputTemplate, ResourceRequest};

/// Static declaration of one simulation run: what to reserve, where to log,
/// which modules to load, where to run and what to start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct JobDescriptor {
    #[builder(setter(into))]
    pub name: String,
    pub resources: ResourceRequest,
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub notification: Option<MailPolicy>,
    #[serde(default)]
    #[builder(default)]
    pub output: OutputTemplate,
    /// Loaded in order, after a purge.
    #[serde(default)]
    #[builder(default)]
    pub modules: Vec<String>,
    /// Must exist when the job starts, otherwise the job fails before launching.
    #[builder(setter(into))]
    pub work_dir: PathBuf,
    pub command: LaunchCommand,
}

impl JobDescriptor {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        self.resources.validate()?;
        if let Some(policy) = &self.notification {
            policy.validate()?;
        }
        if self.output.as_str().trim().is_empty() {
            return Err(DescriptorError::EmptyOutput);
        }
        // #SBATCH values are quoted as a whole, with no escaping inside.
        let quoted = [
            ("name", self.name.as_str()),
            ("output", self.output.as_str()),
            ("mail_user", self.notification.as_ref().map_or("", |p| p.mail_user.as_str())),
        ];
        if let Some((field, _)) = quoted.iter().find(|(_, value)| value.contains('"')) {
            return Err(DescriptorError::Quote(*field));
        }
        if !self.work_dir.is_absolute() {
            return Err(DescriptorError::RelativeWorkDir(
                self.work_dir.to_string_lossy().into_owned(),
            ));
        }
        if self.command.executable.trim().is_empty() {
            return Err(DescriptorError::EmptyExecutable);
        }
        Ok(())
    }

    /// The job name reduced to characters safe in a file name.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}
