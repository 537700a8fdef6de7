// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use pacrepack::{
    BatchSummary, CliProgress, Config, Pacman, PlainProgress, ProgressTracker, Reassembler,
    Scheduler, WorkspaceRegistry,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Exit status after an interrupt, as a shell reports SIGINT
const INTERRUPTED_EXIT: i32 = 130;

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Merge command-line overrides into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(output) = &cli.output {
        config.paths.destination = output.clone();
    }
    if let Some(dbpath) = &cli.dbpath {
        config.paths.dbpath = dbpath.clone();
    }
    if let Some(root) = &cli.root {
        config.paths.root = root.clone();
    }
    if let Some(tmpdir) = &cli.tmpdir {
        config.paths.tmpdir = Some(tmpdir.clone());
    }
    if let Some(jobs) = cli.jobs {
        config.build.jobs = jobs;
    }
    if let Some(compression) = &cli.compression {
        config.build.compression = compression.clone();
    }
    if let Some(archiver) = &cli.archiver {
        config.build.archiver = archiver.clone();
    }
    config.validate()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::discover(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli)?;
    debug!("Effective configuration: {:?}", config);

    let settings = config.job_settings(cli.verbose)?;
    std::fs::create_dir_all(&settings.destination).with_context(|| {
        format!(
            "failed to create output directory {}",
            settings.destination.display()
        )
    })?;

    let manager = Arc::new(
        Pacman::new()
            .with_dbpath(&config.paths.dbpath)
            .with_root(&config.paths.root),
    );
    let archiver = config.archiver_kind()?.build();
    let workspaces = WorkspaceRegistry::new();

    // Interrupted runs must not leave workspaces behind
    let cleanup = workspaces.clone();
    ctrlc::set_handler(move || {
        let removed = cleanup.sweep();
        eprintln!();
        eprintln!("==> Interrupted, removed {} workspaces", removed);
        std::process::exit(INTERRUPTED_EXIT);
    })
    .context("failed to set signal handler")?;

    let reassembler = Reassembler::new(settings, manager, archiver, workspaces.clone());
    let scheduler = Scheduler::new(reassembler, config.build.jobs, workspaces);

    let progress: Box<dyn ProgressTracker> = if cli.packages.len() > 1 {
        Box::new(CliProgress::new(cli.packages.len() as u64))
    } else {
        Box::new(PlainProgress::new())
    };

    let results = scheduler.reassemble_all(&cli.packages, progress.as_ref())?;
    let summary = BatchSummary::from_results(&results);
    progress.finish_with_message("done");

    for result in results.iter().filter(|r| r.outcome.is_failed()) {
        warn!("{} did not complete", result.package);
    }

    if results.len() > 1 {
        println!("==> {}", summary);
    }

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
