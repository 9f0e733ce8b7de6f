use std::path::PathBuf;

use serde::Deserialize;

/// Log file path template. `%j` is replaced by the job id, `%x` by the job
/// name and `%%` by a literal `%`. Other `%` sequences are kept as written,
/// so schedulers that know more placeholders can still expand them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct OutputTemplate(String);

impl OutputTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, job_id: &str, job_name: &str) -> PathBuf {
        let mut out = String::with_capacity(self.0.len() + job_id.len());
        let mut chars = self.0.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('j') => out.push_str(job_id),
                Some('x') => out.push_str(job_name),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        PathBuf::from(out)
    }
}

impl Default for OutputTemplate {
    fn default() -> Self {
        Self::new("slurm-%j.out")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_placeholders() {
        let template = OutputTemplate::new("logs/%x-%j.out");
        assert_eq!(template.render("4242", "cag40"), PathBuf::from("logs/cag40-4242.out"));
    }

    #[test]
    fn keeps_unknown_and_escaped() {
        let template = OutputTemplate::new("%N/100%%-%j%");
        assert_eq!(template.render("7", "x"), PathBuf::from("%N/100%-7%"));
    }
}
