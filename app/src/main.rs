mod cli;
mod config;
mod descriptor;
mod infrastructure;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use domain::{
    model::entity::{Job, JobState},
    service::{JobScheduler, JobService},
};
use service::{data_file, preflight};

use self::cli::{Args, Commands};
use self::config::{build_config, AppConfig};
use self::descriptor::load_descriptor;
use self::infrastructure::ioc::Container;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let mut config =
        build_config(args.config.as_deref()).with_context(|| "Failed to build config".red())?;
    if let Some(backend) = args.backend {
        config.scheduler.r#type = backend.as_str().to_owned();
    }

    logging::init_logging(&config.log).with_context(|| "Failed to initialize logger".red())?;

    match args.command {
        Commands::Render { descriptor } => {
            let descriptor = load_descriptor(&descriptor).with_context(|| "Cannot render".red())?;
            let container = container(&config)?;
            print!("{}", container.render_script(&descriptor));
        }
        Commands::Check { descriptor } => {
            let descriptor = load_descriptor(&descriptor).with_context(|| "Cannot check".red())?;
            let problems = preflight::check(&descriptor);
            if !problems.is_empty() {
                for problem in problems {
                    eprintln!("{}", problem.to_string().red());
                }
                return Ok(ExitCode::FAILURE);
            }
            println!("{}: ready to submit", descriptor.name);
        }
        Commands::Submit { descriptor, watch } => {
            let descriptor = load_descriptor(&descriptor).with_context(|| "Cannot submit".red())?;
            let container = container(&config)?;
            let job = container.submit(&descriptor).await.with_context(|| "Submission failed".red())?;
            println!("{}", job.id);

            // Jobs of the local backend live only as long as this process.
            if watch || container.is_local() {
                let job = follow(&container, &config, &job.id).await?;
                return Ok(report(&job));
            }
        }
        Commands::Status { job_id } => {
            let container = container(&config)?;
            let job = container.get_job(&job_id).await.with_context(|| "Cannot query job".red())?;
            println!("{} {}", job.id, job.state);
            if let Some(log) = &job.log_path {
                println!("log: {}", log.display());
            }
        }
        Commands::Cancel { job_id } => {
            let container = container(&config)?;
            container.delete_job(&job_id).await.with_context(|| "Cannot cancel job".red())?;
            tracing::info!(job_id = %job_id, "Cancelled job");
        }
        Commands::Remap {
            input,
            output,
            pattern,
        } => {
            let data = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Unable to read {}", input.display()).red())?;
            let (remapped, report) = data_file::remap(&data, &pattern)
                .with_context(|| format!("Cannot remap {}", input.display()).red())?;
            tokio::fs::write(&output, remapped)
                .await
                .with_context(|| format!("Unable to write {}", output.display()).red())?;
            tracing::info!(%pattern, output = %output.display(), "Remapped data file");
            println!("{report}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn container(config: &AppConfig) -> anyhow::Result<Container> {
    Container::new(config).with_context(|| "Cannot build IOC container".red())
}

/// Watches the job to its end. On ctrl-c a local job is cancelled and
/// followed to its end, a cluster job is left to the scheduler.
async fn follow(container: &Container, config: &AppConfig, job_id: &str) -> anyhow::Result<Job> {
    let interval = if container.is_local() {
        Duration::from_secs(1)
    } else {
        Duration::from_secs(config.refresh_jobs_interval.max(1))
    };

    tokio::select! {
        job = container.watch(job_id, interval) => job,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopping (ctrl-c handling).");
            if !container.is_local() {
                anyhow::bail!("Stopped watching {job_id}, the job keeps running");
            }
            container.delete_job(job_id).await?;
            container.watch(job_id, interval).await
        }
    }
}

fn report(job: &Job) -> ExitCode {
    println!("{} {}", job.id, job.state);
    if let Some(log) = &job.log_path {
        println!("log: {}", log.display());
    }
    if job.state == JobState::Failed {
        if !job.error_output.is_empty() {
            eprintln!("{}", job.error_output.red());
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
