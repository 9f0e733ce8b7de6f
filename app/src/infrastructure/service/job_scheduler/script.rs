use std::path::Path;

use domain::model::vo::{launch::quote, JobDescriptor};

/// The part of a batch script that follows the scheduler directives:
/// environment modules, the working directory and the launcher line.
pub fn body(descriptor: &JobDescriptor) -> String {
    let mut lines = Vec::with_capacity(4);
    if !descriptor.modules.is_empty() {
        let modules: Vec<String> = descriptor.modules.iter().map(|m| quote(m)).collect();
        lines.push("module purge".to_owned());
        lines.push(format!("module load {}", modules.join(" ")));
    }
    lines.push(format!("cd {} || exit 1", quote(&descriptor.work_dir.to_string_lossy())));
    lines.push(descriptor.command.command_line(descriptor.resources.ntasks.get()));
    lines.join("\n") + "\n"
}

/// Quotes a path for a remote shell, leaving a leading `~/` for it to expand.
pub fn shell_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    match path.strip_prefix("~/") {
        Some(rest) => format!("~/{}", quote(rest)),
        None => quote(&path),
    }
}

/// The last `lines` lines of a job log, empty when it cannot be read.
pub async fn log_tail(path: &Path, lines: usize) -> String {
    let Ok(content) = tokio::fs::read(path).await else {
        return String::new();
    };
    let content = String::from_utf8_lossy(&content);
    let all: Vec<&str> = content.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use bytesize::ByteSize;
    use domain::model::vo::{LaunchCommand, Launcher, ResourceRequest};
    use indoc::indoc;

    use super::*;

    fn descriptor(modules: &[&str]) -> JobDescriptor {
        JobDescriptor::builder()
            .name("acag30")
            .resources(ResourceRequest::new(1, 8, 1, ByteSize::gib(1), "30".parse().unwrap()).unwrap())
            .modules(modules.iter().map(|m| m.to_string()).collect())
            .work_dir("/scratch/md/acag 30")
            .command(LaunchCommand {
                launcher: Launcher::Mpirun,
                executable: "lmp".to_owned(),
                arguments: vec!["-in".to_owned(), "in.acag30".to_owned()],
            })
            .build()
    }

    #[test]
    fn body_with_modules() {
        assert_eq!(
            body(&descriptor(&["lammps/2Aug2023"])),
            indoc! {"
                module purge
                module load lammps/2Aug2023
                cd '/scratch/md/acag 30' || exit 1
                mpirun -np 8 lmp -in in.acag30
            "}
        );
    }

    #[test]
    fn body_without_modules() {
        assert_eq!(
            body(&descriptor(&[])),
            "cd '/scratch/md/acag 30' || exit 1\nmpirun -np 8 lmp -in in.acag30\n"
        );
    }

    #[test]
    fn home_relative_paths() {
        assert_eq!(shell_path(Path::new("~/mdbatch/jobs/a b")), "~/'mdbatch/jobs/a b'");
        assert_eq!(shell_path(Path::new("/srv/jobs")), "/srv/jobs");
    }
}
