use std::path::Path;

use anyhow::Context;
use config::{Config, File};
use domain::model::vo::JobDescriptor;

/// Reads a descriptor file, YAML, TOML or JSON by extension, and validates it.
pub fn load_descriptor(path: &Path) -> anyhow::Result<JobDescriptor> {
    let descriptor: JobDescriptor = Config::builder()
        .add_source(File::from(path))
        .build()
        .and_then(Config::try_deserialize)
        .with_context(|| format!("Unable to read descriptor {}", path.display()))?;
    descriptor
        .validate()
        .with_context(|| format!("Invalid descriptor {}", path.display()))?;
    Ok(descriptor)
}
