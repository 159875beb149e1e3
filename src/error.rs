//! Error types for davbackup
//!
//! This module defines the error hierarchy for the backup and restore flows:
//! - Per-file rename errors (recovered locally, collected into reports)
//! - Archive pack/unpack errors
//! - WebDAV transport errors
//! - Configuration and worker thread errors
//!
//! Per-file errors never abort a batch. Path-level and transport-level errors
//! surface to the top-level caller.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for davbackup
#[derive(Error, Debug)]
pub enum BackupError {
    /// The user-supplied root path does not exist
    #[error("Sorry, there is no such file or directory: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Archive errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Upload errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O errors (prompts, directory checks, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,

    /// No job completed within the stall timeout
    #[error("Rename pool stalled: {outstanding} jobs unfinished after {timeout_secs}s without progress")]
    Stalled { outstanding: usize, timeout_secs: u64 },
}

/// Errors for a single file during mutation or restoration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// The filesystem rename failed (permissions, invalid path, ...)
    #[error("Failed to rename '{}' to '{}': {reason}", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    /// The rename target already exists and would be overwritten
    #[error("Refusing to rename '{}': target '{}' already exists", from.display(), to.display())]
    Collision { from: PathBuf, to: PathBuf },

    /// The extension is too short to strip the obfuscation digit
    #[error("Malformed extension '{extension}' on '{}': nothing to strip", path.display())]
    MalformedExtension { path: PathBuf, extension: String },

    /// The file name is not valid UTF-8
    #[error("File name is not valid UTF-8: '{}'", path.display())]
    NonUtf8Name { path: PathBuf },

    /// An entry could not be read during the tree walk
    #[error("Failed to walk entry: {reason}")]
    Walk { reason: String },
}

impl FileError {
    /// Check if this error is a rename failure (as opposed to a naming problem)
    pub fn is_rename_failure(&self) -> bool {
        matches!(
            self,
            FileError::RenameFailed { .. } | FileError::Collision { .. }
        )
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid remote endpoint
    #[error("Invalid remote URL '{url}': {reason}")]
    InvalidRemoteUrl { url: String, reason: String },

    /// Archive output directory problem
    #[error("Invalid archive directory '{}': {reason}", path.display())]
    InvalidArchiveDir { path: PathBuf, reason: String },

    /// A required value was neither passed nor prompted
    #[error("Missing required value: {0}")]
    MissingValue(&'static str),
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },
}

/// Archive pack/unpack errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Source tree could not be walked
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path has no file name to derive a container name from
    #[error("Not a usable container path: '{}'", path.display())]
    InvalidContainer { path: PathBuf },

    /// An entry name could not be encoded as UTF-8
    #[error("Archive entry name is not valid UTF-8: '{}'", path.display())]
    NonUtf8Entry { path: PathBuf },
}

/// WebDAV upload errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with something other than 201 Created
    #[error("Upload to '{url}' rejected with HTTP status {status}")]
    Rejected { url: String, status: u16 },

    /// Network or protocol failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Local archive could not be read
    #[error("Failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    /// Remote name cannot be joined onto the endpoint
    #[error("Invalid remote name '{name}': {reason}")]
    InvalidRemoteName { name: String, reason: String },
}

impl TransportError {
    /// Check if this error is worth a bounded retry
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Rejected { status, .. } => *status >= 500,
            TransportError::Request(e) => e.is_connect() || e.is_timeout(),
            TransportError::Io(_) | TransportError::InvalidRemoteName { .. } => false,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Rejected { status, .. } => Some(*status),
            TransportError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for BackupError
pub type Result<T> = std::result::Result<T, BackupError>;

/// Result type alias for ArchiveError
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for TransportError
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents the outcome of processing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// File renamed
    Renamed { from: PathBuf, to: PathBuf },

    /// Left untouched on purpose
    Skipped { path: PathBuf, reason: String },

    /// Failed with error
    Failed { path: PathBuf, error: FileError },
}

impl FileOutcome {
    /// Returns true if this outcome represents success
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Renamed { .. })
    }

    /// Returns the original path associated with this outcome
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileOutcome::Renamed { from, .. } => from,
            FileOutcome::Skipped { path, .. } => path,
            FileOutcome::Failed { path, .. } => path,
        }
    }
}

/// A per-file failure collected into a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: FileError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_transient() {
        let forbidden = TransportError::Rejected {
            url: "https://dav/x".into(),
            status: 403,
        };
        assert!(!forbidden.is_transient());
        assert_eq!(forbidden.status(), Some(403));

        let unavailable = TransportError::Rejected {
            url: "https://dav/x".into(),
            status: 503,
        };
        assert!(unavailable.is_transient());
    }

    #[test]
    fn test_error_conversion() {
        let cfg = ConfigError::MissingValue("username");
        let err: BackupError = cfg.into();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn test_path_not_found_message() {
        let err = BackupError::PathNotFound {
            path: PathBuf::from("/no/such/dir"),
        };
        assert_eq!(
            err.to_string(),
            "Sorry, there is no such file or directory: /no/such/dir"
        );
    }

    #[test]
    fn test_file_outcome_path() {
        let outcome = FileOutcome::Skipped {
            path: PathBuf::from("/data/README"),
            reason: "no extension".into(),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.path(), std::path::Path::new("/data/README"));

        let collision = FileError::Collision {
            from: "/a.txt".into(),
            to: "/a.txt3".into(),
        };
        assert!(collision.is_rename_failure());
    }
}
