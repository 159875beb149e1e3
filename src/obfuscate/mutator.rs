//! Mutation coordinator - appends a random digit to every extension in a tree
//!
//! The coordinator is responsible for:
//! - Walking the tree and enqueueing one job per file (symlinks to anything
//!   but a directory count as files and are renamed themselves)
//! - Starting the worker pool (skipped entirely for an empty tree)
//! - Blocking on the join barrier until every job is marked done
//! - Shutting workers down and collecting per-file failures

use crate::error::{BackupError, FileError, FileFailure, FileOutcome, Result};
use crate::obfuscate::queue::{JobQueue, JoinStatus};
use crate::obfuscate::worker::{aggregate_stats, Worker};
use crossbeam_channel::unbounded;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Worker count used when nothing else is configured
pub const DEFAULT_WORKERS: usize = 2;

/// Settings for one mutation run
#[derive(Debug, Clone)]
pub struct MutateConfig {
    /// Root of the tree to mutate
    pub root: PathBuf,

    /// Number of worker threads (at least 1)
    pub worker_count: usize,

    /// Give up when no job finishes for this long
    pub stall_timeout: Option<Duration>,
}

impl MutateConfig {
    /// Config with the default worker count and no stall timeout
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            worker_count: DEFAULT_WORKERS,
            stall_timeout: None,
        }
    }
}

/// Result of a completed mutation run
#[derive(Debug, Default)]
pub struct MutateReport {
    /// Regular files found under the root
    pub files_found: u64,

    /// Files renamed
    pub renamed: u64,

    /// Files left untouched on purpose (no extension)
    pub skipped: u64,

    /// Per-file failures, walk errors included
    pub failures: Vec<FileFailure>,

    /// Workers started (0 for an empty tree)
    pub workers_started: usize,

    /// Time taken
    pub duration: Duration,
}

impl MutateReport {
    /// Returns true if every file was renamed or skipped
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Coordinates the parallel extension mutation
pub struct Mutator {
    /// Configuration
    config: MutateConfig,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl Mutator {
    /// Create a new mutator
    pub fn new(config: MutateConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing shutdown flag (e.g. one wired to Ctrl-C)
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Mutate every regular file under the root.
    ///
    /// Returns once every file has been processed exactly once.
    pub fn run(self) -> Result<MutateReport> {
        let start = Instant::now();
        let root = &self.config.root;

        if !root.exists() {
            return Err(BackupError::PathNotFound { path: root.clone() });
        }

        info!(root = %root.display(), workers = self.config.worker_count, "Starting renaming files");

        let (files, mut failures) = collect_files(root);
        let files_found = files.len() as u64;

        if files.is_empty() {
            info!("No files to rename");
            return Ok(MutateReport {
                failures,
                duration: start.elapsed(),
                ..Default::default()
            });
        }

        let mut queue = JobQueue::new();
        for path in files {
            queue.push(path);
        }
        queue.close();

        let (outcome_tx, outcome_rx) = unbounded();
        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count.max(1) {
            match Worker::spawn(
                id,
                queue.receiver(),
                outcome_tx.clone(),
                Arc::clone(&self.shutdown),
            ) {
                Ok(worker) => workers.push(worker),
                Err(e) if !workers.is_empty() => {
                    warn!(error = %e, "Continuing with fewer workers");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }
        drop(outcome_tx);
        let workers_started = workers.len();
        debug!(count = workers_started, "Workers spawned");

        let status = queue.join(self.config.stall_timeout, &self.shutdown);
        let queue_stats = queue.stats();
        debug!(
            dequeued = queue_stats.dequeued(),
            completed = queue_stats.completed(),
            "Join barrier released"
        );

        // Stop anything still waiting on the queue
        if !status.is_drained() {
            self.shutdown.store(true, Ordering::SeqCst);
        }

        let (renamed, skipped, _) = aggregate_stats(&workers);
        match status {
            JoinStatus::Stalled { .. } => workers.into_iter().for_each(Worker::detach),
            _ => {
                for worker in workers {
                    let id = worker.id();
                    if let Err(e) = worker.join() {
                        warn!(worker = id, error = %e, "Worker failed to join cleanly");
                    }
                }
            }
        }

        failures.extend(outcome_rx.try_iter().filter_map(|outcome| match outcome {
            FileOutcome::Failed { path, error } => Some(FileFailure { path, error }),
            _ => None,
        }));

        match status {
            JoinStatus::Drained => {}
            JoinStatus::Interrupted { outstanding } => {
                warn!(outstanding, "Renaming interrupted; tree is partially mutated");
                return Err(BackupError::Interrupted);
            }
            JoinStatus::Stalled { outstanding } => {
                let timeout_secs = self
                    .config
                    .stall_timeout
                    .map(|t| t.as_secs())
                    .unwrap_or_default();
                return Err(BackupError::Stalled {
                    outstanding,
                    timeout_secs,
                });
            }
        }

        let report = MutateReport {
            files_found,
            renamed,
            skipped,
            failures,
            workers_started,
            duration: start.elapsed(),
        };

        if report.is_clean() {
            info!(renamed, skipped, "Renaming succeed");
        } else {
            let rename_failed = report
                .failures
                .iter()
                .filter(|f| f.error.is_rename_failure())
                .count();
            warn!(
                renamed,
                failed = report.failures.len(),
                rename_failed,
                "Renaming finished with failures"
            );
        }

        Ok(report)
    }
}

/// Recursively collect files; unreadable entries become failures.
///
/// Directory symlinks are not descended into. Every other symlink is
/// collected as a file, dangling ones included.
pub(crate) fn collect_files(root: &Path) -> (Vec<PathBuf>, Vec<FileFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        match entry {
            Ok(entry) if is_file_entry(&entry) => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %e, "Failed to read entry");
                failures.push(FileFailure {
                    path,
                    error: FileError::Walk {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    (files, failures)
}

/// Regular files and symlinks that do not resolve to a directory
fn is_file_entry(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && !entry.path().is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(dir: &Path) -> Vec<String> {
        let mut out: Vec<String> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_empty_tree_starts_no_workers() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("empty_sub")).unwrap();

        let report = Mutator::new(MutateConfig::new(dir.path())).run().unwrap();

        assert_eq!(report.files_found, 0);
        assert_eq!(report.workers_started, 0);
        assert!(report.is_clean());
        assert!(dir.path().join("empty_sub").is_dir());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = Mutator::new(MutateConfig::new(&missing)).run().unwrap_err();
        assert!(matches!(err, BackupError::PathNotFound { path } if path == missing));
    }

    #[test]
    fn test_every_file_renamed_once() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("nested").join("deeper");
        fs::create_dir_all(&sub).unwrap();
        for i in 0..40 {
            fs::write(dir.path().join(format!("f{}.txt", i)), b"x").unwrap();
            fs::write(sub.join(format!("g{}.log", i)), b"y").unwrap();
        }

        let mut config = MutateConfig::new(dir.path());
        config.worker_count = 4;
        let report = Mutator::new(config).run().unwrap();

        assert_eq!(report.files_found, 80);
        assert_eq!(report.renamed, 80);
        assert_eq!(report.workers_started, 4);
        assert!(report.is_clean());

        // Directories keep their names
        assert!(sub.is_dir());

        for name in names(dir.path()) {
            let last = name.chars().last().unwrap();
            assert!(('1'..='9').contains(&last), "bad suffix on {}", name);
            let ext = name.rsplit('.').next().unwrap();
            assert_eq!(ext.len(), 4, "renamed more than once: {}", name);
        }
    }

    #[test]
    fn test_single_worker() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("b.log"), b"b").unwrap();

        let mut config = MutateConfig::new(dir.path());
        config.worker_count = 1;
        let report = Mutator::new(config).run().unwrap();

        assert_eq!(report.renamed, 2);
        assert!(!dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.log").exists());
    }

    #[test]
    fn test_extensionless_files_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("LICENSE"), b"mit").unwrap();
        fs::write(dir.path().join("main.rs"), b"fn main() {}").unwrap();

        let report = Mutator::new(MutateConfig::new(dir.path())).run().unwrap();

        assert_eq!(report.renamed, 1);
        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("LICENSE").exists());
    }

    #[test]
    fn test_collisions_reported_not_deadlocked() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        // Every possible target of a.txt is already taken by a directory
        for d in 1..=9 {
            fs::create_dir(dir.path().join(format!("a.txt{}", d))).unwrap();
        }

        let report = Mutator::new(MutateConfig::new(dir.path())).run().unwrap();

        assert_eq!(report.files_found, 1);
        assert_eq!(report.renamed, 0);
        assert!(report
            .failures
            .iter()
            .any(|f| f.path == dir.path().join("a.txt")
                && matches!(f.error, FileError::Collision { .. })));
        assert!(dir.path().join("a.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_symlinks_renamed() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.log"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        symlink(dir.path().join("a.txt"), dir.path().join("link.txt")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("dirlink.d")).unwrap();

        let report = Mutator::new(MutateConfig::new(dir.path())).run().unwrap();

        assert_eq!(report.files_found, 3);
        assert_eq!(report.renamed, 3);
        assert!(report.is_clean());
        assert!(fs::symlink_metadata(dir.path().join("dirlink.d"))
            .unwrap()
            .file_type()
            .is_symlink());

        let links: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_name().to_string_lossy().starts_with("link.txt"))
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].file_type().unwrap().is_symlink());
        assert_eq!(links[0].file_name().len(), "link.txt".len() + 1);
    }

    #[test]
    fn test_interrupted_before_start() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let mutator = Mutator::new(MutateConfig::new(dir.path()));
        mutator.shutdown_flag().store(true, Ordering::SeqCst);

        let err = mutator.run().unwrap_err();
        assert!(matches!(err, BackupError::Interrupted));
    }
}
