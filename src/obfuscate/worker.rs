//! Rename worker threads
//!
//! Each worker:
//! - Pulls jobs from the shared job queue
//! - Appends a random digit to the file's extension and renames it, choosing
//!   among the digits whose target name is still free
//! - Reports a `FileOutcome` for every job, success or not
//! - Marks the job done even when the rename fails
//!
//! Workers exit when the queue is closed and drained, or when the shutdown
//! flag is raised between jobs.

use crate::error::{FileError, FileOutcome, WorkerError};
use crate::obfuscate::extension::{mutated_name, suffixes};
use crate::obfuscate::queue::{Job, JobGuard, JobReceiver, Recv};
use crossbeam_channel::Sender;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long a worker waits on an empty queue before re-checking shutdown
const RECV_TICK: Duration = Duration::from_millis(100);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files renamed
    pub renamed: AtomicU64,

    /// Files left untouched on purpose
    pub skipped: AtomicU64,

    /// Files that failed to rename
    pub errors: AtomicU64,
}

impl WorkerStats {
    fn record(&self, outcome: &FileOutcome) {
        let counter = match outcome {
            FileOutcome::Renamed { .. } => &self.renamed,
            FileOutcome::Skipped { .. } => &self.skipped,
            FileOutcome::Failed { .. } => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread that renames files
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        jobs: JobReceiver,
        outcomes: Sender<FileOutcome>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("mutator-{}", id))
            .spawn(move || worker_loop(id, jobs, outcomes, shutdown, stats_clone))
            .map_err(|e| WorkerError::InitFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| WorkerError::Panicked {
                id: self.id,
                message: "Worker thread panicked".into(),
            }),
            None => Ok(()),
        }
    }

    /// Let the thread run on without waiting for it
    pub fn detach(mut self) {
        if self.handle.take().is_some() {
            warn!(worker = self.id, "Detaching worker that did not finish");
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    jobs: JobReceiver,
    outcomes: Sender<FileOutcome>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");
    let mut rng = rand::thread_rng();

    while !shutdown.load(Ordering::Relaxed) {
        let job = match jobs.recv_timeout(RECV_TICK) {
            Recv::Job(job) => job,
            Recv::Empty => continue,
            Recv::Closed => break,
        };

        // Marks the job done on every path out of this block
        let _guard = JobGuard::new(&jobs);

        let outcome = process_job(&job, &mut rng);
        stats.record(&outcome);

        match &outcome {
            FileOutcome::Renamed { from, to } => {
                trace!(worker = id, from = %from.display(), to = %to.display(), "File renamed");
            }
            FileOutcome::Skipped { path, reason } => {
                debug!(worker = id, path = %path.display(), reason = %reason, "File skipped");
            }
            FileOutcome::Failed { path, error } => {
                warn!(worker = id, path = %path.display(), error = %error, "Rename failed");
            }
        }

        if outcomes.send(outcome).is_err() {
            debug!(worker = id, "Outcome channel closed");
        }
    }

    info!(
        worker = id,
        renamed = stats.renamed.load(Ordering::Relaxed),
        errors = stats.errors.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Mutate a single file, never panicking on filesystem errors.
///
/// Only `x.ext` can ever be renamed to `x.extD`, so a target that is free
/// now stays free until this job renames into it. A collision is reported
/// only when all nine targets are already taken.
pub fn process_job<R: Rng + ?Sized>(job: &Job, rng: &mut R) -> FileOutcome {
    let path = job.path.as_path();

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return FileOutcome::Failed {
            path: path.to_path_buf(),
            error: FileError::NonUtf8Name {
                path: path.to_path_buf(),
            },
        };
    };

    let targets: Vec<PathBuf> = suffixes()
        .filter_map(|suffix| mutated_name(name, suffix))
        .map(|new_name| path.with_file_name(new_name))
        .collect();

    if targets.is_empty() {
        return FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason: "no extension to carry a suffix".into(),
        };
    }

    let free: Vec<&PathBuf> = targets
        .iter()
        .filter(|target| target.symlink_metadata().is_err())
        .collect();

    let to = match free.choose(&mut *rng) {
        Some(to) => *to,
        None => &targets[rng.gen_range(0..targets.len())],
    };

    rename_file(path, to)
}

/// Rename `from` to `to`, refusing to overwrite an existing file
pub fn rename_file(from: &Path, to: &Path) -> FileOutcome {
    if to.symlink_metadata().is_ok() {
        return FileOutcome::Failed {
            path: from.to_path_buf(),
            error: FileError::Collision {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            },
        };
    }

    match std::fs::rename(from, to) {
        Ok(()) => FileOutcome::Renamed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        },
        Err(e) => FileOutcome::Failed {
            path: from.to_path_buf(),
            error: FileError::RenameFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                reason: e.to_string(),
            },
        },
    }
}

/// Aggregate (renamed, skipped, errors) across workers
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64) {
    workers.iter().fold((0, 0, 0), |(r, s, e), w| {
        (
            r + w.stats.renamed.load(Ordering::Relaxed),
            s + w.stats.skipped.load(Ordering::Relaxed),
            e + w.stats.errors.load(Ordering::Relaxed),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use tempfile::tempdir;

    fn job(path: &Path) -> Job {
        Job {
            id: 0,
            path: path.to_path_buf(),
        }
    }

    #[test]
    fn test_process_job_renames() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = process_job(&job(&file), &mut rng);

        let FileOutcome::Renamed { from, to } = outcome else {
            panic!("expected rename, got {:?}", outcome);
        };
        assert_eq!(from, file);
        assert!(!file.exists());
        assert!(to.exists());

        let name = to.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("a.txt"));
        assert_eq!(name.len(), "a.txt".len() + 1);
        assert_eq!(fs::read(&to).unwrap(), b"hello");
    }

    #[test]
    fn test_process_job_skips_extensionless() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Makefile");
        fs::write(&file, b"all:").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = process_job(&job(&file), &mut rng);

        assert!(matches!(outcome, FileOutcome::Skipped { .. }));
        assert!(file.exists());
    }

    #[test]
    fn test_process_job_missing_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.txt");

        let mut rng = StdRng::seed_from_u64(1);
        let outcome = process_job(&job(&file), &mut rng);

        let FileOutcome::Failed { error, .. } = outcome else {
            panic!("expected failure");
        };
        assert!(matches!(error, FileError::RenameFailed { .. }));
    }

    #[test]
    fn test_process_job_avoids_taken_suffixes() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"mine").unwrap();
        for d in 1..=8 {
            fs::write(dir.path().join(format!("a.txt{}", d)), b"sibling").unwrap();
        }

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = process_job(&job(&file), &mut rng);

            let FileOutcome::Renamed { to, .. } = outcome else {
                panic!("expected rename, got {:?}", outcome);
            };
            assert_eq!(to, dir.path().join("a.txt9"));
            assert_eq!(fs::read(&to).unwrap(), b"mine");
            fs::rename(&to, &file).unwrap();
        }
    }

    #[test]
    fn test_process_job_all_suffixes_taken() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"mine").unwrap();
        for d in 1..=9 {
            fs::write(dir.path().join(format!("a.txt{}", d)), b"sibling").unwrap();
        }

        let mut rng = StdRng::seed_from_u64(3);
        let outcome = process_job(&job(&file), &mut rng);

        let FileOutcome::Failed { error, .. } = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert!(matches!(error, FileError::Collision { .. }));
        assert_eq!(fs::read(&file).unwrap(), b"mine");
    }

    #[test]
    fn test_rename_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.txt");
        let to = dir.path().join("a.txt3");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        let outcome = rename_file(&from, &to);
        assert!(matches!(
            outcome,
            FileOutcome::Failed {
                error: FileError::Collision { .. },
                ..
            }
        ));
        assert_eq!(fs::read(&to).unwrap(), b"old");
        assert!(from.exists());
    }

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();
        stats.record(&FileOutcome::Renamed {
            from: "/a".into(),
            to: "/b".into(),
        });
        stats.record(&FileOutcome::Skipped {
            path: "/c".into(),
            reason: "x".into(),
        });

        assert_eq!(stats.renamed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.skipped.load(Ordering::Relaxed), 1);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 0);
    }
}
