use std::path::Path;

use tokio::process::Command;

use super::ssh_proxy::SshConfig;

/// `scp` copying `local` to `remote` on the login node.
pub fn upload(ssh: &SshConfig, local: &Path, remote: &Path) -> Command {
    let mut command = Command::new("scp");
    command
        .args(["-q", "-P", &ssh.port])
        .arg(local)
        .arg(format!("{}:{}", ssh.username_host, remote.to_string_lossy()));
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SshProxyConfig;

    #[test]
    fn upload_args() {
        let ssh = SshConfig::new(&SshProxyConfig {
            host: "login.cluster.example.org".to_owned(),
            username: "md".to_owned(),
            port: 22,
            home_dir: "~".to_owned(),
            save_dir: "mdbatch".to_owned(),
        });
        let command = upload(&ssh, Path::new("/tmp/run.sh"), Path::new("~/mdbatch/jobs/run.sh"));
        let args: Vec<_> = command.as_std().get_args().map(|arg| arg.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            ["-q", "-P", "22", "/tmp/run.sh", "md@login.cluster.example.org:~/mdbatch/jobs/run.sh"]
        );
    }
}
