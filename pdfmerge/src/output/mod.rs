//! Output formatting and display.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::output::OutputFormatter;
//! use pdfmerge::config::Config;
//!
//! # fn example(config: Config) {
//! let formatter = OutputFormatter::from_config(&config);
//! formatter.info("Starting merge operation");
//! formatter.success("Merge completed successfully");
//! # }
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::{ProgressBar, ProgressStyle};

use crate::merge::MergeStatistics;
use crate::validation::ValidationSummary;

/// Display a validation summary, listing each input in verbose mode.
pub fn display_validation_summary(formatter: &OutputFormatter, summary: &ValidationSummary) {
    if formatter.is_verbose() {
        for (index, result) in summary.results.iter().enumerate() {
            let version = result
                .version
                .map(|(major, minor)| format!("PDF {major}.{minor}"))
                .unwrap_or_else(|| "PDF ?".to_string());
            formatter.list_item(
                index + 1,
                &format!(
                    "{} ({} pages, {}, {} objects)",
                    result.path.display(),
                    result.page_count,
                    version,
                    result.object_count
                ),
            );
        }
    }

    if summary.files_empty > 0 {
        formatter.warning(&format!(
            "{} file(s) have no pages and will be skipped",
            summary.files_empty
        ));
    }

    formatter.info(&format!(
        "Validated {} file(s): {} pages, {}",
        summary.files_validated,
        summary.total_pages,
        summary.format_total_size()
    ));

    if summary.selected_pages != summary.total_pages {
        formatter.info(&format!(
            "Page range selects {} page(s)",
            summary.selected_pages
        ));
    }
}

/// Display merge statistics in verbose mode.
pub fn display_merge_statistics(formatter: &OutputFormatter, stats: &MergeStatistics) {
    if !formatter.is_verbose() {
        return;
    }

    formatter.section("Statistics");
    formatter.detail("Input files", &stats.files_merged.to_string());
    if stats.files_skipped > 0 {
        formatter.detail("Skipped (no pages)", &stats.files_skipped.to_string());
    }
    formatter.detail("Total pages", &stats.total_pages.to_string());
    formatter.detail("Objects copied", &stats.objects_copied.to_string());
    formatter.detail("Input size", &stats.format_input_size());
    formatter.detail("Output size", &stats.format_output_size());
    formatter.detail(
        "Load time",
        &format!("{:.2}s", stats.load_time.as_secs_f64()),
    );
    formatter.detail(
        "Merge time",
        &format!("{:.2}s", stats.merge_time.as_secs_f64()),
    );
}
