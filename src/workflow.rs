//! Backup and restore flows
//!
//! Backup: mutate extensions, pack the tree, upload the container.
//! Restore: unpack the container, strip the extension digits.
//!
//! Per-file failures and upload failures are carried in the reports rather
//! than returned as errors; only path-level problems abort a flow.

use crate::archive::{self, PackReport, UnpackReport};
use crate::config::{BackupConfig, RestoreConfig};
use crate::error::{BackupError, Result, TransportError};
use crate::obfuscate::{MutateReport, Mutator, RestoreReport, Restorer};
use crate::progress::ProgressReporter;
use crate::transport::{Credentials, UploadReport, WebDavClient};
use chrono::{Local, NaiveDate};
use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// What happened to the container after packing
#[derive(Debug)]
pub enum UploadOutcome {
    /// Stored remotely
    Uploaded(UploadReport),

    /// Upload failed; the container is still on local disk
    Failed(TransportError),

    /// Upload was not requested
    Skipped,
}

impl UploadOutcome {
    /// Returns true unless an upload was attempted and failed
    pub fn is_ok(&self) -> bool {
        !matches!(self, UploadOutcome::Failed(_))
    }
}

/// Result of the backup flow
#[derive(Debug)]
pub struct BackupReport {
    pub mutate: MutateReport,
    pub pack: PackReport,
    pub upload: UploadOutcome,
    pub duration: Duration,
}

/// Result of the restore flow
#[derive(Debug)]
pub struct RestoreFlowReport {
    pub unpack: UnpackReport,
    pub restore: RestoreReport,
    pub duration: Duration,
}

/// Run the backup flow with today's date in the container name.
///
/// `password` is only called if an upload is going to happen.
pub fn backup<F>(
    config: &BackupConfig,
    shutdown: Arc<AtomicBool>,
    progress: Option<&ProgressReporter>,
    password: F,
) -> Result<BackupReport>
where
    F: FnOnce() -> io::Result<String>,
{
    backup_on(config, Local::now().date_naive(), shutdown, progress, password)
}

/// Run the backup flow with an explicit container date
pub fn backup_on<F>(
    config: &BackupConfig,
    date: NaiveDate,
    shutdown: Arc<AtomicBool>,
    progress: Option<&ProgressReporter>,
    password: F,
) -> Result<BackupReport>
where
    F: FnOnce() -> io::Result<String>,
{
    let start = Instant::now();

    if !config.target.exists() {
        return Err(BackupError::PathNotFound {
            path: config.target.clone(),
        });
    }

    set_status(progress, "Renaming files...");
    let mutate = Mutator::new(config.mutate_config())
        .with_shutdown(shutdown)
        .run()?;

    set_status(progress, "Archiving...");
    let pack = archive::pack(&config.target, &config.archive_dir, date)?;

    let upload = match (&config.username, config.upload) {
        (Some(username), true) => {
            // Keep the spinner from drawing over the hidden prompt
            let password = match progress {
                Some(p) => p.suspend(password),
                None => password(),
            }?;
            let credentials = Credentials::new(username.clone(), password);
            set_status(progress, "Uploading...");
            upload_container(config, &pack, &credentials)
        }
        _ => UploadOutcome::Skipped,
    };

    Ok(BackupReport {
        mutate,
        pack,
        upload,
        duration: start.elapsed(),
    })
}

fn upload_container(config: &BackupConfig, pack: &PackReport, credentials: &Credentials) -> UploadOutcome {
    let remote_name = pack
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result = WebDavClient::new(config.remote_url.clone(), config.retries)
        .and_then(|client| client.upload(&pack.path, &remote_name, credentials));

    match result {
        Ok(report) => UploadOutcome::Uploaded(report),
        Err(e) => {
            error!(
                error = %e,
                status = e.status().map(|s| s.to_string()).unwrap_or_else(|| "none".into()),
                archive = %pack.path.display(),
                "Error while uploading; archive kept on local disk"
            );
            UploadOutcome::Failed(e)
        }
    }
}

/// Run the restore flow: unpack next to the container, then strip digits
pub fn restore(
    config: &RestoreConfig,
    shutdown: Arc<AtomicBool>,
    progress: Option<&ProgressReporter>,
) -> Result<RestoreFlowReport> {
    let start = Instant::now();

    if !config.archive.is_file() {
        return Err(BackupError::PathNotFound {
            path: config.archive.clone(),
        });
    }

    set_status(progress, "Unzipping...");
    // The container is renamed away first, so its name is free for the tree
    let dest = config.archive.clone();
    let unpack = archive::unpack(&config.archive, &dest)?;

    set_status(progress, "Restoring file names...");
    let restore = Restorer::new(&unpack.dest).with_shutdown(shutdown).run()?;

    info!(
        dest = %unpack.dest.display(),
        restored = restore.restored,
        failed = restore.failures.len(),
        "Restore finished"
    );

    Ok(RestoreFlowReport {
        unpack,
        restore,
        duration: start.elapsed(),
    })
}

fn set_status(progress: Option<&ProgressReporter>, status: &str) {
    if let Some(p) = progress {
        p.set_status(status);
    }
}
