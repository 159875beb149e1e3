//! Sequential extension restorer
//!
//! Strips exactly one trailing character from every file extension under a
//! root, undoing the mutator. Files whose extension is too short are left
//! untouched and reported as `MalformedExtension`.
//!
//! Shorter names are restored first. A restore target is always one
//! character shorter than its source, so `a.txt3` (from `a.txt`) is moved
//! out of the way before `a.txt35` (from `a.txt3`) needs that name.

use crate::error::{BackupError, FileError, FileFailure, FileOutcome, Result};
use crate::obfuscate::extension::restored_name;
use crate::obfuscate::mutator::collect_files;
use crate::obfuscate::worker::rename_file;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a restoration run
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Regular files found under the root
    pub files_found: u64,

    /// Files renamed back
    pub restored: u64,

    /// Per-file failures
    pub failures: Vec<FileFailure>,

    /// Time taken
    pub duration: Duration,
}

impl RestoreReport {
    /// Returns true if every file was restored
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Files whose extension could not carry a suffix
    pub fn malformed(&self) -> impl Iterator<Item = &FileFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, FileError::MalformedExtension { .. }))
    }
}

/// Restores original file names in a single pass
pub struct Restorer {
    root: PathBuf,
    shutdown: Arc<AtomicBool>,
}

impl Restorer {
    /// Create a restorer for the given root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing shutdown flag
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Strip the obfuscation digit from every file under the root
    pub fn run(&self) -> Result<RestoreReport> {
        let start = Instant::now();

        if !self.root.exists() {
            return Err(BackupError::PathNotFound {
                path: self.root.clone(),
            });
        }

        info!(root = %self.root.display(), "Starting renaming files");

        let (mut files, mut failures) = collect_files(&self.root);
        files.sort_by_cached_key(|path| path.file_name().map_or(0, |name| name.len()));
        let files_found = files.len() as u64;
        let mut restored = 0;

        for path in files {
            if self.shutdown.load(Ordering::Relaxed) {
                warn!("Restore interrupted; tree is partially restored");
                return Err(BackupError::Interrupted);
            }

            match restore_file(&path) {
                FileOutcome::Renamed { to, .. } => {
                    debug!(from = %path.display(), to = %to.display(), "File restored");
                    restored += 1;
                }
                FileOutcome::Skipped { .. } => {}
                FileOutcome::Failed { path, error } => {
                    warn!(path = %path.display(), error = %error, "Restore failed");
                    failures.push(FileFailure { path, error });
                }
            }
        }

        let report = RestoreReport {
            files_found,
            restored,
            failures,
            duration: start.elapsed(),
        };

        if report.is_clean() {
            info!(restored, "All files renamed successfully");
        } else {
            warn!(
                restored,
                failed = report.failures.len(),
                "Restore finished with failures"
            );
        }

        Ok(report)
    }
}

/// Restore the original name of a single file
pub fn restore_file(path: &Path) -> FileOutcome {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return FileOutcome::Failed {
            path: path.to_path_buf(),
            error: FileError::NonUtf8Name {
                path: path.to_path_buf(),
            },
        };
    };

    match restored_name(name) {
        Ok(original) => rename_file(path, &path.with_file_name(original)),
        Err(extension) => FileOutcome::Failed {
            path: path.to_path_buf(),
            error: FileError::MalformedExtension {
                path: path.to_path_buf(),
                extension,
            },
        },
    }
}
