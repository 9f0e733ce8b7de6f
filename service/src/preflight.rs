use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use domain::model::vo::JobDescriptor;
use thiserror::Error;

/// Something that would make the job fail as soon as it starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    #[error("working directory {0} does not exist")]
    MissingWorkDir(PathBuf),

    #[error("working directory {0} is not a directory")]
    WorkDirNotDirectory(PathBuf),

    #[error("executable {0} not found")]
    ExecutableNotFound(String),

    #[error("input file {0} not found")]
    MissingInput(PathBuf),
}

/// Checks, on this host, what the job expects to find at run time.
pub fn check(descriptor: &JobDescriptor) -> Vec<Problem> {
    check_with_path(descriptor, env::var_os("PATH").as_deref())
}

fn check_with_path(descriptor: &JobDescriptor, search_path: Option<&OsStr>) -> Vec<Problem> {
    let mut problems = Vec::new();
    let work_dir = descriptor.work_dir.as_path();

    if !work_dir.exists() {
        problems.push(Problem::MissingWorkDir(work_dir.to_owned()));
    } else if !work_dir.is_dir() {
        problems.push(Problem::WorkDirNotDirectory(work_dir.to_owned()));
    }

    let executable = descriptor.command.executable.as_str();
    if resolve_executable(executable, work_dir, search_path).is_none() {
        problems.push(Problem::ExecutableNotFound(executable.to_owned()));
    }

    if let Some(input) = descriptor.command.input_file() {
        let input = work_dir.join(input);
        if !input.is_file() {
            problems.push(Problem::MissingInput(input));
        }
    }

    problems
}

/// Bare names are looked up on the search path, anything with a slash is
/// taken relative to the working directory.
fn resolve_executable(
    executable: &str,
    work_dir: &Path,
    search_path: Option<&OsStr>,
) -> Option<PathBuf> {
    if executable.contains('/') {
        let path = work_dir.join(executable);
        return path.is_file().then_some(path);
    }
    env::split_paths(search_path?)
        .map(|dir| dir.join(executable))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use std::ffi::{OsStr, OsString};
    use std::fs;

    use bytesize::ByteSize;
    use domain::model::vo::{LaunchCommand, Launcher, ResourceRequest};

    use super::*;

    fn descriptor(work_dir: &Path, executable: &str) -> JobDescriptor {
        JobDescriptor::builder()
            .name("preflight")
            .resources(ResourceRequest::new(1, 1, 1, ByteSize::mib(100), "10".parse().unwrap()).unwrap())
            .work_dir(work_dir)
            .command(LaunchCommand {
                launcher: Launcher::None,
                executable: executable.to_owned(),
                arguments: vec!["-in".to_owned(), "in.test".to_owned()],
            })
            .build()
    }

    fn scratch() -> PathBuf {
        let dir = env::temp_dir().join(format!("mdbatch-preflight-{}", std::process::id()));
        fs::create_dir_all(dir.join("bin")).unwrap();
        dir
    }

    #[test]
    fn everything_in_place() {
        let dir = scratch().join("ok");
        fs::create_dir_all(dir.join("bin")).unwrap();
        fs::write(dir.join("bin/lmp"), "").unwrap();
        fs::write(dir.join("in.test"), "").unwrap();

        assert!(check_with_path(&descriptor(&dir, "bin/lmp"), None).is_empty());

        let search_path = OsString::from(dir.join("bin"));
        assert!(check_with_path(&descriptor(&dir, "lmp"), Some(search_path.as_os_str())).is_empty());
    }

    #[test]
    fn reports_each_problem() {
        let dir = scratch().join("missing");
        let problems = check_with_path(&descriptor(&dir, "lmp_missing"), Some(OsStr::new("")));
        assert_eq!(
            problems,
            [
                Problem::MissingWorkDir(dir.clone()),
                Problem::ExecutableNotFound("lmp_missing".to_owned()),
                Problem::MissingInput(dir.join("in.test")),
            ]
        );
        assert_eq!(problems[1].to_string(), "executable lmp_missing not found");
    }
}
