//! Job queue with a join barrier
//!
//! An unbounded multi-producer/multi-consumer queue of rename jobs. Every
//! pushed job bumps an outstanding counter; every finished job drops it.
//! `join` blocks until the counter reaches zero, the shutdown flag is set,
//! or no job finishes within the stall timeout.
//!
//! Closing the queue drops the only sender, so workers see a disconnect
//! once the remaining jobs are drained and exit on their own.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often `join` re-checks the shutdown flag
const JOIN_TICK: Duration = Duration::from_millis(100);

/// A regular file awaiting extension mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Sequence number assigned at enqueue time
    pub id: u64,

    /// Path to the file
    pub path: PathBuf,
}

/// Statistics for the job queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total jobs enqueued
    pub enqueued: AtomicU64,

    /// Total jobs handed to a worker
    pub dequeued: AtomicU64,

    /// Total jobs marked done
    pub completed: AtomicU64,
}

impl QueueStats {
    /// Jobs handed out so far
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Jobs marked done so far
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// How a `join` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    /// Every pushed job was marked done
    Drained,

    /// The shutdown flag was raised first
    Interrupted { outstanding: usize },

    /// No job finished within the stall timeout
    Stalled { outstanding: usize },
}

impl JoinStatus {
    /// Returns true if the barrier was reached
    pub fn is_drained(&self) -> bool {
        matches!(self, JoinStatus::Drained)
    }
}

/// Outstanding-job counter shared by the queue and its receivers
#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    changed: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        self.changed.notify_all();
    }

    fn outstanding(&self) -> usize {
        *self.count.lock()
    }
}

/// Unbounded job queue with an outstanding-job counter
pub struct JobQueue {
    /// Sender for adding jobs (`None` once closed)
    sender: Option<Sender<Job>>,

    /// Receiver cloned into each worker
    receiver: Receiver<Job>,

    /// Outstanding jobs
    pending: Arc<Pending>,

    /// Next job id
    next_id: u64,

    /// Queue statistics
    stats: Arc<QueueStats>,
}

impl JobQueue {
    /// Create a new, open job queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender: Some(sender),
            receiver,
            pending: Arc::new(Pending::default()),
            next_id: 0,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Push a file path as a new job.
    ///
    /// Returns `false` if the queue was already closed.
    pub fn push(&mut self, path: PathBuf) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        let job = Job {
            id: self.next_id,
            path,
        };

        // Count before sending so a fast worker can never drive it below zero
        self.pending.add();
        if sender.send(job).is_err() {
            self.pending.done();
            return false;
        }

        self.next_id += 1;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Stop accepting jobs; workers exit once the queue drains
    pub fn close(&mut self) {
        self.sender = None;
    }

    /// Get a receiver for this queue (one per worker)
    pub fn receiver(&self) -> JobReceiver {
        JobReceiver {
            receiver: self.receiver.clone(),
            pending: Arc::clone(&self.pending),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Jobs pushed but not yet marked done
    pub fn outstanding(&self) -> usize {
        self.pending.outstanding()
    }

    /// Jobs waiting for a worker
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if no job is waiting for a worker
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Block until every pushed job is marked done.
    ///
    /// Gives up early when `shutdown` is raised, or when `stall_timeout` is
    /// set and the outstanding count stays flat for that long.
    pub fn join(&self, stall_timeout: Option<Duration>, shutdown: &AtomicBool) -> JoinStatus {
        let mut count = self.pending.count.lock();
        let mut last_seen = *count;
        let mut last_progress = Instant::now();

        while *count > 0 {
            if shutdown.load(Ordering::Relaxed) {
                return JoinStatus::Interrupted {
                    outstanding: *count,
                };
            }

            self.pending.changed.wait_for(&mut count, JOIN_TICK);

            if *count < last_seen {
                last_seen = *count;
                last_progress = Instant::now();
            } else if let Some(limit) = stall_timeout {
                if *count > 0 && last_progress.elapsed() >= limit {
                    return JoinStatus::Stalled {
                        outstanding: *count,
                    };
                }
            }
        }

        JoinStatus::Drained
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// What a worker got when asking for a job
#[derive(Debug)]
pub enum Recv {
    /// A job to process
    Job(Job),

    /// Nothing arrived within the timeout
    Empty,

    /// The queue is closed and drained
    Closed,
}

/// Handle for receiving jobs from the queue
#[derive(Clone)]
pub struct JobReceiver {
    receiver: Receiver<Job>,
    pending: Arc<Pending>,
    stats: Arc<QueueStats>,
}

impl JobReceiver {
    /// Receive a job, waiting at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Recv {
        match self.receiver.recv_timeout(timeout) {
            Ok(job) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Recv::Job(job)
            }
            Err(RecvTimeoutError::Timeout) => Recv::Empty,
            Err(RecvTimeoutError::Disconnected) => Recv::Closed,
        }
    }

    /// Try to receive a job without blocking
    pub fn try_recv(&self) -> Option<Job> {
        let job = self.receiver.try_recv().ok()?;
        self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(job)
    }

    /// Mark one job as done
    pub fn task_done(&self) {
        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        self.pending.done();
    }
}

/// RAII guard that marks a job done when dropped, even on panic
pub struct JobGuard<'a> {
    receiver: &'a JobReceiver,
}

impl<'a> JobGuard<'a> {
    /// Create a guard for a job just received
    pub fn new(receiver: &'a JobReceiver) -> Self {
        Self { receiver }
    }
}

impl<'a> Drop for JobGuard<'a> {
    fn drop(&mut self) {
        self.receiver.task_done();
    }
}
