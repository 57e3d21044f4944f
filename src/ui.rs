//! Terminal output: the batch progress bar and the end-of-run summary.
//!
//! Uses `indicatif` for the progress bar and `console` for coloured styling.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::job::{JobStatus, Outcome};
use crate::report::Tally;
use crate::runner::{BatchRun, ProgressObserver};

/// Errors are listed individually only up to this many failures.
const MAX_LISTED_ERRORS: usize = 10;

/// Progress bar for a running batch with live OK/ERR/SKIP counts.
pub struct BatchProgress {
    pb: ProgressBar,
    ok: usize,
    err: usize,
    skip: usize,
}

impl BatchProgress {
    pub fn start(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg} | {per_sec} | ETA: {eta}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message("OK: 0 ERR: 0 SKIP: 0");
        Self {
            pb,
            ok: 0,
            err: 0,
            skip: 0,
        }
    }

    pub fn finish(&self) {
        self.pb.finish();
    }
}

impl ProgressObserver for BatchProgress {
    fn job_finished(&mut self, completed: usize, _total: usize, outcome: &Outcome) {
        match outcome.status {
            JobStatus::Converted => self.ok += 1,
            JobStatus::Failed => self.err += 1,
            JobStatus::Skipped => self.skip += 1,
        }
        self.pb.set_position(completed as u64);
        self.pb.set_message(format!(
            "OK: {} ERR: {} SKIP: {}",
            self.ok, self.err, self.skip
        ));
    }
}

/// Prints the banner shown before the first job starts.
pub fn print_start(total: usize, workers: usize, started_at: DateTime<Utc>) {
    println!("Found {total} files to convert");
    println!();
    println!(
        "Starting conversion at {}",
        started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("Using {workers} parallel workers");
    println!("{}", "-".repeat(60));
}

/// Prints the aggregate tally and, when there are few, the individual errors.
pub fn print_summary(run: &BatchRun, tally: &Tally, validate: bool) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow();

    let elapsed = run.elapsed();
    let total = tally.total.max(1);

    println!();
    println!("{}", "=".repeat(60));
    println!(
        "Conversion complete at {}",
        run.finished_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!("Total time: {}", format_duration(elapsed));
    if elapsed.as_secs_f64() > 0.0 {
        println!(
            "Average speed: {:.2} files/second",
            tally.total as f64 / elapsed.as_secs_f64()
        );
    }
    println!(
        "{} Converted: {}/{} ({})",
        green.apply_to("✓"),
        tally.converted,
        tally.total,
        percent(tally.converted, total)
    );
    if tally.failed > 0 {
        println!(
            "{} Failed: {}/{} ({})",
            red.apply_to("✗"),
            tally.failed,
            tally.total,
            percent(tally.failed, total)
        );
    }
    if tally.skipped > 0 {
        println!(
            "{} Skipped: {}/{} ({})",
            yellow.apply_to("↷"),
            tally.skipped,
            tally.total,
            percent(tally.skipped, total)
        );
    }
    if validate {
        println!(
            "Validation: {}/{} passed, {} failed, {} errors",
            tally.validation_passed,
            tally.validated(),
            tally.validation_failed,
            tally.validation_errors
        );
    }
    if run.interrupted {
        println!("{}", yellow.apply_to("Run interrupted; unstarted files were skipped"));
    }

    let errors: Vec<&Outcome> = run
        .outcomes
        .iter()
        .filter(|o| o.status == JobStatus::Failed)
        .collect();
    if !errors.is_empty() && errors.len() <= MAX_LISTED_ERRORS {
        println!();
        println!("{}", red.apply_to("Errors:"));
        for outcome in errors {
            let message: String = outcome
                .error
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(100)
                .collect();
            println!("  {}: {message}", outcome.file);
        }
    }
}

pub fn print_report_location(path: &Path) {
    println!();
    println!("Detailed results saved to: {}", path.display());
}

/// Formats an elapsed time the way the summary shows it: `12.3 seconds`,
/// `4m 5s` or `1h 2m 3s`.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.1} seconds");
    }
    let whole = elapsed.as_secs();
    let (hours, mins, rem) = (whole / 3600, (whole % 3600) / 60, whole % 60);
    if hours == 0 {
        format!("{mins}m {rem}s")
    } else {
        format!("{hours}h {mins}m {rem}s")
    }
}

fn percent(part: usize, total: usize) -> String {
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}
