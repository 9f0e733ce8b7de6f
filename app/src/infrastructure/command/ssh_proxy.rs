use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::SshProxyConfig;

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub port: String,
    pub username_host: String,
    pub home_dir: String,
    pub save_dir: String,
}

/// An ssh proxy for command. It's transparent if not using ssh.
pub trait MaybeSsh {
    fn command(&self, cmd: &str) -> Command;
    /// A shell snippet, run by `sh -c` here or by the login shell over ssh.
    fn shell(&self, snippet: &str) -> Command;
    fn is_ssh(&self) -> bool;
    fn ssh_config(&self) -> Option<&SshConfig>;
}

impl<Ctx> MaybeSsh for Ctx
where
    Ctx: AsRef<Option<SshConfig>>,
{
    fn command(&self, cmd: &str) -> Command {
        let Some(ssh) = self.as_ref() else {
            return Command::new(cmd);
        };

        let mut command = Command::new("ssh");
        command.args(["-p", &ssh.port, &ssh.username_host, cmd]);
        command
    }

    fn shell(&self, snippet: &str) -> Command {
        match self.as_ref() {
            Some(ssh) => {
                let mut command = Command::new("ssh");
                command.args(["-p", &ssh.port, &ssh.username_host, snippet]);
                command
            }
            None => {
                let mut command = Command::new("sh");
                command.args(["-c", snippet]);
                command
            }
        }
    }

    fn is_ssh(&self) -> bool {
        self.as_ref().is_some()
    }

    fn ssh_config(&self) -> Option<&SshConfig> {
        self.as_ref().as_ref()
    }
}

impl SshConfig {
    pub fn new(config: &SshProxyConfig) -> Self {
        let SshProxyConfig {
            host,
            username,
            port,
            home_dir,
            save_dir,
        } = config;

        Self {
            port: port.to_string(),
            username_host: format!("{username}@{host}"),
            home_dir: home_dir.clone(),
            save_dir: save_dir.clone(),
        }
    }

    /// Where a script saved locally under `relative` is placed on the login node.
    pub fn remote_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        PathBuf::from_iter([Path::new(&self.home_dir), Path::new(&self.save_dir), relative.as_ref()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx(Option<SshConfig>);

    impl AsRef<Option<SshConfig>> for Ctx {
        fn as_ref(&self) -> &Option<SshConfig> {
            &self.0
        }
    }

    fn ssh() -> SshConfig {
        SshConfig::new(&SshProxyConfig {
            host: "login.cluster.example.org".to_owned(),
            username: "md".to_owned(),
            port: 2222,
            ..Default::default()
        })
    }

    fn argv(command: &Command) -> Vec<String> {
        let command = command.as_std();
        std::iter::once(command.get_program())
            .chain(command.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn transparent_without_ssh() {
        let ctx = Ctx(None);
        assert!(!ctx.is_ssh());
        assert_eq!(argv(&ctx.command("sacct")), ["sacct"]);
        assert_eq!(argv(&ctx.shell("cd /tmp && sbatch run.sh")), ["sh", "-c", "cd /tmp && sbatch run.sh"]);
    }

    #[test]
    fn proxied_over_ssh() {
        let ctx = Ctx(Some(ssh()));
        assert!(ctx.is_ssh());
        assert_eq!(
            argv(&ctx.command("scancel")),
            ["ssh", "-p", "2222", "md@login.cluster.example.org", "scancel"]
        );
    }

    #[test]
    fn remote_path() {
        assert_eq!(
            ssh().remote_path("cag40-1/run.sh"),
            PathBuf::from("~/mdbatch/jobs/cag40-1/run.sh")
        );
    }
}
