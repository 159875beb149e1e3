//! Zip container packing and unpacking
//!
//! The container is an ordinary zip file named `backup_<YYYY-MM-DD>.kek_zip`.
//! Entries are stored under the source directory's own name, so unpacking
//! yields a single top-level folder. Unpacking first renames the container
//! back to a real `.zip` name, then extracts it into a directory that takes
//! over the container's old name.
//!
//! Symlinks to files are stored as regular entries holding the target's
//! contents. Directory symlinks and dangling links cannot be stored that way;
//! they are left out and listed in the report.

use crate::error::{ArchiveError, ArchiveResult};
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Disguised extension of the container
pub const CONTAINER_EXTENSION: &str = "kek_zip";

/// Result of packing a tree
#[derive(Debug, Clone)]
pub struct PackReport {
    /// Path to the container
    pub path: PathBuf,

    /// Files written into the container
    pub files: u64,

    /// Directories written into the container
    pub dirs: u64,

    /// Entries left out of the container
    pub skipped: Vec<PathBuf>,

    /// Container size on disk
    pub size: u64,
}

/// Result of unpacking a container
#[derive(Debug, Clone)]
pub struct UnpackReport {
    /// The container after renaming it to `.zip`
    pub zip_path: PathBuf,

    /// Directory the entries were extracted into
    pub dest: PathBuf,

    /// Number of entries in the container
    pub entries: usize,
}

/// Container file name for a given day
pub fn archive_name(date: NaiveDate) -> String {
    format!("backup_{}.{}", date.format("%Y-%m-%d"), CONTAINER_EXTENSION)
}

/// Real zip path for a container: `<container>.zip`
pub fn zip_path_for(container: &Path) -> ArchiveResult<PathBuf> {
    let name = container
        .file_name()
        .ok_or_else(|| ArchiveError::InvalidContainer {
            path: container.to_path_buf(),
        })?;

    let mut zip_name = name.to_os_string();
    zip_name.push(".zip");
    Ok(container.with_file_name(zip_name))
}

/// Pack `source` into `<out_dir>/backup_<date>.kek_zip`
pub fn pack(source: &Path, out_dir: &Path, date: NaiveDate) -> ArchiveResult<PackReport> {
    let source = source.canonicalize()?;
    let path = out_dir.join(archive_name(date));
    info!(source = %source.display(), archive = %path.display(), "Starting archiving data");

    // Entries are named relative to the source's parent so the root folder
    // name is kept; a filesystem root has no parent and is stored flat.
    let base = source.parent().unwrap_or(&source).to_path_buf();

    let file = File::create(&path)?;
    // Never pack the container into itself
    let container = path.canonicalize()?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let mut zip = ZipWriter::new(file);
    let mut files = 0u64;
    let mut dirs = 0u64;
    let mut skipped = Vec::new();

    for entry in WalkDir::new(&source).follow_links(false) {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path == container {
            continue;
        }

        let Some(name) = entry_name(entry_path, &base)? else {
            continue;
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(name, options)?;
            dirs += 1;
        } else if file_type.is_file() || (file_type.is_symlink() && entry_path.is_file()) {
            zip.start_file(name, options)?;
            io::copy(&mut File::open(entry_path)?, &mut zip)?;
            files += 1;
        } else {
            warn!(path = %entry_path.display(), "Not archiving entry: not a regular file");
            skipped.push(entry_path.to_path_buf());
        }
    }

    zip.finish()?;
    let size = fs::metadata(&path)?.len();

    info!(files, dirs, skipped = skipped.len(), size, "Archiving succeed");
    Ok(PackReport {
        path,
        files,
        dirs,
        skipped,
        size,
    })
}

/// Rename `container` to `<container>.zip` and extract it into `dest`
pub fn unpack(container: &Path, dest: &Path) -> ArchiveResult<UnpackReport> {
    let zip_path = zip_path_for(container)?;
    info!(archive = %container.display(), dest = %dest.display(), "Starting unzipping");

    fs::rename(container, &zip_path)?;
    fs::create_dir_all(dest)?;

    let mut archive = ZipArchive::new(File::open(&zip_path)?)?;
    let entries = archive.len();
    archive.extract(dest)?;

    info!(entries, "Unzipping succeed");
    Ok(UnpackReport {
        zip_path,
        dest: dest.to_path_buf(),
        entries,
    })
}

/// Zip entry name for `path` relative to `base`, `/`-separated.
///
/// Returns `None` for the base itself.
fn entry_name(path: &Path, base: &Path) -> ArchiveResult<Option<String>> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| ArchiveError::InvalidContainer {
            path: path.to_path_buf(),
        })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| ArchiveError::NonUtf8Entry {
                path: path.to_path_buf(),
            })?;
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(parts.join("/")))
}
