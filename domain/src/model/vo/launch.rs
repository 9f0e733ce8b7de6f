use serde::Deserialize;

/// How the parallel copies of the executable are started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Launcher {
    /// The scheduler's own launcher, which takes the task count from the allocation.
    #[default]
    Srun,
    /// An MPI launcher given the task count explicitly.
    Mpirun,
    /// Run the executable once, without a launcher.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaunchCommand {
    #[serde(default)]
    pub launcher: Launcher,
    pub executable: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl LaunchCommand {
    /// The shell line that starts `ntasks` copies of the executable.
    pub fn command_line(&self, ntasks: u32) -> String {
        let mut words = match self.launcher {
            Launcher::Srun => vec!["srun".to_owned()],
            Launcher::Mpirun => vec!["mpirun".to_owned(), "-np".to_owned(), ntasks.to_string()],
            Launcher::None => vec![],
        };
        words.push(quote(&self.executable));
        words.extend(self.arguments.iter().map(|arg| quote(arg)));
        words.join(" ")
    }

    /// The value following `-in`/`-i`, the input script flag of the simulation binary.
    pub fn input_file(&self) -> Option<&str> {
        self.arguments
            .iter()
            .position(|arg| arg == "-in" || arg == "-i")
            .and_then(|idx| self.arguments.get(idx + 1))
            .map(String::as_str)
    }
}

/// Single-quotes a word for a POSIX shell unless it is made of safe characters only.
pub fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word.bytes().all(|b| b.is_ascii_alphanumeric() || b"-_./=:,+@%".contains(&b));
    if safe {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lmp(launcher: Launcher) -> LaunchCommand {
        LaunchCommand {
            launcher,
            executable: "/opt/lammps/bin/lmp_mpi".to_owned(),
            arguments: vec!["-in".to_owned(), "in.cag40".to_owned()],
        }
    }

    #[test]
    fn command_lines() {
        assert_eq!(lmp(Launcher::Srun).command_line(40), "srun /opt/lammps/bin/lmp_mpi -in in.cag40");
        assert_eq!(
            lmp(Launcher::Mpirun).command_line(40),
            "mpirun -np 40 /opt/lammps/bin/lmp_mpi -in in.cag40"
        );
        assert_eq!(lmp(Launcher::None).command_line(40), "/opt/lammps/bin/lmp_mpi -in in.cag40");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("in.lammps"), "in.lammps");
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn input_file() {
        assert_eq!(lmp(Launcher::Srun).input_file(), Some("in.cag40"));
        let mut cmd = lmp(Launcher::Srun);
        cmd.arguments = vec!["-log".to_owned(), "none".to_owned()];
        assert_eq!(cmd.input_file(), None);
    }
}
