//! Progress reporting for the backup and restore flows
//!
//! Provides a spinner with phase messages using indicatif, and styled
//! summaries printed once a flow completes.

use crate::error::FileFailure;
use crate::workflow::{BackupReport, RestoreFlowReport, UploadOutcome};
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// How many per-file failures a summary lists before truncating
const MAX_LISTED_FAILURES: usize = 10;

/// Progress reporter that displays the current phase
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Hide the spinner while `f` runs (e.g. for an interactive prompt)
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn print_failures(failures: &[FileFailure]) {
    if failures.is_empty() {
        return;
    }

    println!(
        "  {} {}",
        style("Failures:").yellow().bold(),
        format_number(failures.len() as u64)
    );
    for failure in failures.iter().take(MAX_LISTED_FAILURES) {
        println!("    {} {}", style("-").dim(), failure.error);
    }
    if failures.len() > MAX_LISTED_FAILURES {
        println!(
            "    {} ... and {} more",
            style("-").dim(),
            failures.len() - MAX_LISTED_FAILURES
        );
    }
}

/// Print a summary of the backup flow
pub fn print_backup_summary(report: &BackupReport) {
    let title = if report.mutate.is_clean()
        && report.pack.skipped.is_empty()
        && report.upload.is_ok()
    {
        style("Backup Complete").green().bold()
    } else {
        style("Backup Finished With Errors").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Files renamed:").bold(),
        format_number(report.mutate.renamed)
    );
    if report.mutate.skipped > 0 {
        println!(
            "  {} {} (no extension)",
            style("Files skipped:").bold(),
            format_number(report.mutate.skipped)
        );
    }
    println!(
        "  {} {} ({})",
        style("Archive:").bold(),
        report.pack.path.display(),
        format_size(report.pack.size, BINARY)
    );
    if !report.pack.skipped.is_empty() {
        println!(
            "  {} {} (not regular files)",
            style("Not archived:").yellow().bold(),
            format_number(report.pack.skipped.len() as u64)
        );
        for path in report.pack.skipped.iter().take(MAX_LISTED_FAILURES) {
            println!("    {} {}", style("-").dim(), path.display());
        }
    }
    match &report.upload {
        UploadOutcome::Uploaded(upload) => {
            println!("  {} {}", style("Uploaded to:").bold(), upload.url);
        }
        UploadOutcome::Failed(e) => {
            println!("  {} {}", style("Upload failed:").red().bold(), e);
        }
        UploadOutcome::Skipped => {
            println!("  {} skipped", style("Upload:").bold());
        }
    }
    print_failures(&report.mutate.failures);
    println!(
        "  {} Done in {:.3} sec.",
        style("Duration:").bold(),
        report.duration.as_secs_f64()
    );
    println!();
}

/// Print a summary of the restore flow
pub fn print_restore_summary(report: &RestoreFlowReport) {
    let title = if report.restore.is_clean() {
        style("Restore Complete").green().bold()
    } else {
        style("Restore Incomplete").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Unpacked to:").bold(),
        report.unpack.dest.display()
    );
    println!(
        "  {} {}",
        style("Files restored:").bold(),
        format_number(report.restore.restored)
    );
    print_failures(&report.restore.failures);
    println!(
        "  {} Done in {:.3} sec.",
        style("Duration:").bold(),
        report.duration.as_secs_f64()
    );
    println!();
}

/// Print a header at the start of a flow
pub fn print_header(action: &str, source: &str, workers: Option<usize>) {
    println!();
    println!(
        "{} {}",
        style("davbackup").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Action:").bold(), action);
    println!("  {} {}", style("Source:").bold(), source);
    if let Some(workers) = workers {
        println!("  {} {}", style("Workers:").bold(), workers);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
