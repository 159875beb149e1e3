//! davbackup - Obfuscating directory backup to WebDAV storage
//!
//! Backs a directory up in two phases and restores it with the inverse.
//!
//! # Backup
//!
//! 1. **Mutate**: every file extension in the tree gets one random digit
//!    (1-9) appended, by a fixed pool of rename workers draining a shared
//!    job queue. The call returns only when every file has been handled.
//! 2. **Pack**: the tree is zipped into `backup_<date>.kek_zip`.
//! 3. **Upload**: the container is PUT to a WebDAV endpoint with Basic
//!    authentication; `201 Created` means success.
//!
//! # Restore
//!
//! 1. **Unpack**: the container is renamed to `<name>.zip` and extracted
//!    into a directory that takes over the container's name.
//! 2. **Restore**: one trailing character is stripped from every extension.
//!
//! The extension digit is obfuscation only. It offers no confidentiality.
//!
//! # Architecture
//!
//! ```text
//!  backup                                         restore
//!  ──────                                         ───────
//!  ┌──────────────┐                               ┌──────────────┐
//!  │   Mutator    │  walkdir → JobQueue → N       │   unpack     │
//!  │ (parallel)   │  rename workers               │  (.zip)      │
//!  └──────┬───────┘                               └──────┬───────┘
//!         ▼                                              ▼
//!  ┌──────────────┐                               ┌──────────────┐
//!  │    pack      │  zip → .kek_zip               │   Restorer   │
//!  └──────┬───────┘                               │ (sequential) │
//!         ▼                                       └──────────────┘
//!  ┌──────────────┐
//!  │   upload     │  HTTP PUT + Basic auth
//!  └──────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! davbackup backup ~/Documents -u me@yandex.ru
//! davbackup restore backup_2024-01-01.kek_zip
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod obfuscate;
pub mod progress;
pub mod prompt;
pub mod transport;
pub mod workflow;

pub use config::{BackupConfig, CliArgs, Command, RestoreConfig};
pub use error::{BackupError, Result};
pub use obfuscate::{MutateConfig, Mutator, Restorer};
