use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use service::prelude::Pattern;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Configuration file, instead of `mdbatch.yaml` in the current directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `scheduler.type` from the configuration
    #[arg(short, long, global = true, value_enum)]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Backend {
    Slurm,
    Local,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the batch script for a descriptor
    Render { descriptor: PathBuf },

    /// Check that the working directory, executable and input file are in place
    Check { descriptor: PathBuf },

    /// Submit a descriptor and print the job id
    Submit {
        descriptor: PathBuf,

        /// Follow the job until it ends, exiting non-zero if it fails
        #[arg(short, long)]
        watch: bool,
    },

    /// Print the state of a job
    Status { job_id: String },

    /// Cancel a job
    Cancel { job_id: String },

    /// Rewrite the atom types of a LAMMPS data file for another repeat sequence
    Remap {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Repeat unit, letters from A, C, G, U
        #[arg(short, long, default_value_t = Pattern::default())]
        pattern: Pattern,
    },
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Slurm => "slurm",
            Backend::Local => "local",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse() {
        let args = Args::try_parse_from(["mdbatch", "submit", "cag40.yaml", "--watch", "-b", "local"]).unwrap();
        assert!(matches!(args.backend, Some(Backend::Local)));
        assert!(matches!(args.command, Commands::Submit { watch: true, .. }));

        let args = Args::try_parse_from(["mdbatch", "remap", "-i", "in.data", "-o", "out.data"]).unwrap();
        let Commands::Remap { pattern, .. } = args.command else {
            panic!("expected remap");
        };
        assert_eq!(pattern, Pattern::default());

        assert!(Args::try_parse_from(["mdbatch", "remap", "-i", "a", "-o", "b", "-p", "CAX"]).is_err());
    }
}
