//! davbackup - Obfuscating directory backup to WebDAV storage
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use davbackup::config::{BackupArgs, BackupConfig, CliArgs, Command, RestoreArgs, RestoreConfig};
use davbackup::error::BackupError;
use davbackup::progress::{print_backup_summary, print_header, print_restore_summary, ProgressReporter};
use davbackup::{prompt, workflow};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            // A missing input path is reported, not treated as a failure
            if let Some(not_found @ BackupError::PathNotFound { .. }) = e.downcast_ref::<BackupError>() {
                println!("{}", not_found);
                return ExitCode::SUCCESS;
            }
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let show_progress = !args.quiet;
    match args.command {
        Command::Backup(backup) => run_backup(backup, show_progress, shutdown),
        Command::Restore(restore) => run_restore(restore, show_progress, shutdown),
    }
}

fn run_backup(mut args: BackupArgs, show_progress: bool, shutdown: Arc<AtomicBool>) -> Result<ExitCode> {
    if args.path.is_none() {
        let path = prompt::read_line("Please enter the path to the target folder: ")?;
        args.path = Some(PathBuf::from(path));
    }
    if args.username.is_none() && !args.no_upload {
        args.username = Some(prompt::read_line("Please enter your WebDAV login: ")?);
    }

    let config = BackupConfig::from_args(args, show_progress).context("Invalid configuration")?;

    if config.show_progress {
        print_header("backup", &config.target.display().to_string(), Some(config.worker_count));
    }

    let progress = config.show_progress.then(ProgressReporter::new);
    let result = workflow::backup(&config, shutdown, progress.as_ref(), || {
        prompt::read_password("Please enter the App password for WebDAV storage: ")
    });

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    let report = result?;
    print_backup_summary(&report);

    if !report.mutate.is_clean() {
        warn!(failed = report.mutate.failures.len(), "Some files were not renamed");
    }
    if !report.upload.is_ok() {
        info!(archive = %report.pack.path.display(), "Archive kept on local disk for a later retry");
    }

    Ok(ExitCode::SUCCESS)
}

fn run_restore(mut args: RestoreArgs, show_progress: bool, shutdown: Arc<AtomicBool>) -> Result<ExitCode> {
    if args.archive.is_none() {
        let archive = prompt::read_line("Please enter the path to the archive file: ")?;
        args.archive = Some(PathBuf::from(archive));
    }

    let config = RestoreConfig::from_args(args, show_progress).context("Invalid configuration")?;

    if config.show_progress {
        print_header("restore", &config.archive.display().to_string(), None);
    }

    let progress = config.show_progress.then(ProgressReporter::new);
    let result = workflow::restore(&config, shutdown, progress.as_ref());

    if let Some(ref p) = progress {
        p.finish_and_clear();
    }

    let report = result?;
    print_restore_summary(&report);

    if report.restore.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            unresolved = report.restore.failures.len(),
            "Restore left files with unrestored names"
        );
        Ok(ExitCode::FAILURE)
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("davbackup=debug,warn")
    } else {
        EnvFilter::new("davbackup=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
