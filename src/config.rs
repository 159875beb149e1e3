//! Configuration types for davbackup
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Validated runtime configuration for the backup and restore flows
//!
//! There is no configuration file and no environment lookup. Values the
//! user leaves out on the command line are prompted for interactively.

use crate::error::ConfigError;
use crate::obfuscate::{MutateConfig, DEFAULT_WORKERS};
use crate::transport::DEFAULT_ENDPOINT;
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 256;

/// Obfuscating directory backup to WebDAV storage
#[derive(Parser, Debug, Clone)]
#[command(
    name = "davbackup",
    version,
    about = "Obfuscating directory backup to WebDAV storage",
    long_about = "Appends a random digit to every file extension in a directory, zips it into a \
                  disguised .kek_zip container and uploads it over WebDAV.\n\n\
                  The restore command reverses this: it unzips a container and strips the digit again.",
    after_help = "EXAMPLES:\n    \
        davbackup backup ~/Documents --username me@yandex.ru\n    \
        davbackup backup data -w 8 --no-upload\n    \
        davbackup restore backup_2024-01-01.kek_zip"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output (show per-file debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Obfuscate, archive and upload a directory
    Backup(BackupArgs),

    /// Unpack a container and restore the original file names
    Restore(RestoreArgs),
}

/// Arguments for the backup flow
#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    /// Directory to back up (prompted if omitted)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// WebDAV username (prompted if omitted)
    #[arg(short = 'u', long, value_name = "LOGIN")]
    pub username: Option<String>,

    /// WebDAV endpoint the container is uploaded to
    #[arg(long, default_value = DEFAULT_ENDPOINT, value_name = "URL")]
    pub remote_url: String,

    /// Number of rename worker threads
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Abort renaming if no file finishes within this many seconds (0 = wait forever)
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub job_timeout: u64,

    /// Directory the container is written to
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub archive_dir: PathBuf,

    /// Retry attempts for transient upload failures
    #[arg(long, default_value = "3", value_name = "NUM")]
    pub retries: u32,

    /// Stop after archiving; do not upload
    #[arg(long)]
    pub no_upload: bool,
}

/// Arguments for the restore flow
#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    /// Container to restore (prompted if omitted)
    #[arg(value_name = "ARCHIVE")]
    pub archive: Option<PathBuf>,
}

/// Validated configuration for the backup flow
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Directory to back up
    pub target: PathBuf,

    /// WebDAV username (`None` when not uploading)
    pub username: Option<String>,

    /// WebDAV endpoint
    pub remote_url: Url,

    /// Number of rename workers
    pub worker_count: usize,

    /// Stall timeout for the rename pool
    pub job_timeout: Option<Duration>,

    /// Directory the container is written to
    pub archive_dir: PathBuf,

    /// Upload retry attempts
    pub retries: u32,

    /// Whether to upload the container
    pub upload: bool,

    /// Show progress indicator
    pub show_progress: bool,
}

impl BackupConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: BackupArgs, show_progress: bool) -> Result<Self, ConfigError> {
        let target = args.path.ok_or(ConfigError::MissingValue("path to the target folder"))?;

        let upload = !args.no_upload;
        let username = match args.username {
            Some(u) if !u.trim().is_empty() => Some(u.trim().to_string()),
            _ if upload => return Err(ConfigError::MissingValue("WebDAV username")),
            _ => None,
        };

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        let remote_url = Url::parse(&args.remote_url).map_err(|e| ConfigError::InvalidRemoteUrl {
            url: args.remote_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(remote_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRemoteUrl {
                url: args.remote_url,
                reason: "scheme must be http or https".into(),
            });
        }

        if !args.archive_dir.is_dir() {
            return Err(ConfigError::InvalidArchiveDir {
                path: args.archive_dir,
                reason: "not an existing directory".into(),
            });
        }

        Ok(Self {
            target,
            username,
            remote_url,
            worker_count: args.workers,
            job_timeout: (args.job_timeout > 0).then(|| Duration::from_secs(args.job_timeout)),
            archive_dir: args.archive_dir,
            retries: args.retries,
            upload,
            show_progress,
        })
    }

    /// Settings for the mutation phase
    pub fn mutate_config(&self) -> MutateConfig {
        MutateConfig {
            root: self.target.clone(),
            worker_count: self.worker_count,
            stall_timeout: self.job_timeout,
        }
    }
}

/// Validated configuration for the restore flow
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Container to restore
    pub archive: PathBuf,

    /// Show progress indicator
    pub show_progress: bool,
}

impl RestoreConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: RestoreArgs, show_progress: bool) -> Result<Self, ConfigError> {
        let archive = args.archive.ok_or(ConfigError::MissingValue("path to the archive file"))?;
        Ok(Self {
            archive,
            show_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup_args() -> BackupArgs {
        BackupArgs {
            path: Some(PathBuf::from("data")),
            username: Some("me@yandex.ru".into()),
            remote_url: DEFAULT_ENDPOINT.into(),
            workers: DEFAULT_WORKERS,
            job_timeout: 30,
            archive_dir: PathBuf::from("."),
            retries: 3,
            no_upload: false,
        }
    }

    #[test]
    fn test_cli_parses_backup() {
        let args = CliArgs::try_parse_from([
            "davbackup", "backup", "docs", "-u", "me", "-w", "4", "--no-upload", "-q",
        ])
        .unwrap();

        assert!(args.quiet);
        let Command::Backup(b) = args.command else {
            panic!("expected backup");
        };
        assert_eq!(b.path, Some(PathBuf::from("docs")));
        assert_eq!(b.workers, 4);
        assert!(b.no_upload);
        assert_eq!(b.remote_url, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_cli_parses_restore() {
        let args = CliArgs::try_parse_from(["davbackup", "restore"]).unwrap();
        assert!(matches!(args.command, Command::Restore(RestoreArgs { archive: None })));
    }

    #[test]
    fn test_default_worker_count() {
        let config = BackupConfig::from_args(backup_args(), false).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.job_timeout, Some(Duration::from_secs(30)));
        assert!(config.upload);
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut args = backup_args();
        args.workers = 0;
        assert!(matches!(
            BackupConfig::from_args(args, false),
            Err(ConfigError::InvalidWorkerCount { count: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_remote_url() {
        let mut args = backup_args();
        args.remote_url = "ftp://dav.example.com".into();
        assert!(matches!(
            BackupConfig::from_args(args, false),
            Err(ConfigError::InvalidRemoteUrl { .. })
        ));

        let mut args = backup_args();
        args.remote_url = "not a url".into();
        assert!(BackupConfig::from_args(args, false).is_err());
    }

    #[test]
    fn test_username_required_only_for_upload() {
        let mut args = backup_args();
        args.username = None;
        assert!(matches!(
            BackupConfig::from_args(args.clone(), false),
            Err(ConfigError::MissingValue(_))
        ));

        args.no_upload = true;
        let config = BackupConfig::from_args(args, false).unwrap();
        assert!(config.username.is_none());
        assert!(!config.upload);
    }

    #[test]
    fn test_zero_timeout_disables_stall_check() {
        let mut args = backup_args();
        args.job_timeout = 0;
        let config = BackupConfig::from_args(args, false).unwrap();
        assert_eq!(config.mutate_config().stall_timeout, None);
    }
}
