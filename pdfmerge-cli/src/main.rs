//! pdfmerge - Merge PDF files page by page into a single document.

mod cli;

use clap::Parser;
use log::debug;
use std::process;
use std::sync::{Arc, Mutex};

use crate::cli::Cli;
use pdfmerge::config::{Config, OverwriteMode};
use pdfmerge::error::MergeError;
use pdfmerge::io::PdfWriter;
use pdfmerge::merge::Merger;
use pdfmerge::output::{
    OutputFormatter, ProgressBar, display_merge_statistics, display_validation_summary,
};
use pdfmerge::validation::Validator;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Route `log` records to stderr; RUST_LOG wins over the verbosity flags.
fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Main application logic.
async fn run(cli: Cli) -> Result<(), MergeError> {
    cli.validate()?;

    let all_inputs = cli.get_all_inputs().await?;
    let config = cli.to_config(all_inputs)?;
    debug!("Resolved {} input(s)", config.inputs.len());

    let formatter = OutputFormatter::from_config(&config);

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfmerge::NAME, pdfmerge::VERSION));
        formatter.blank_line();
    }

    formatter.info("Validating input files...");
    let validator = Validator::new();
    let validation_summary = validator.validate_config(&config).await?;

    if formatter.should_print() {
        display_validation_summary(&formatter, &validation_summary);
        formatter.blank_line();
    }

    if config.dry_run {
        if config.json {
            println!("{}", validation_summary.to_json()?);
            return Ok(());
        }
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", config.output.display()));
        formatter.info("  Run without --dry-run to create the merged PDF");
        return Ok(());
    }

    handle_output_overwrite(&config, &formatter).await?;

    formatter.info("Merging documents...");

    let progress = Arc::new(Mutex::new(if formatter.should_print() {
        ProgressBar::auto(config.inputs.len())
    } else {
        ProgressBar::disabled()
    }));
    let on_progress = {
        let progress = Arc::clone(&progress);
        move |index: usize, _total: usize| {
            if let Ok(mut bar) = progress.lock() {
                bar.update(index);
            }
        }
    };

    let merged = Merger::new().merge_with_progress(&config, on_progress).await;
    if let Ok(mut bar) = progress.lock() {
        if merged.is_ok() {
            bar.finish();
        } else {
            bar.clear();
        }
    }
    let result = merged?;

    if formatter.should_print() {
        formatter.info(&format!(
            "Merged {} file(s) into {} pages in {:.2}s",
            result.statistics.files_merged,
            result.statistics.total_pages,
            result.statistics.merge_time.as_secs_f64()
        ));
    }

    formatter.info(&format!("Writing to: {}", config.output.display()));

    let write_stats = PdfWriter::new()
        .save_with_stats(result.bytes, &config.output)
        .await?;

    if formatter.should_print() {
        formatter.blank_line();
        formatter.success(&format!(
            "Successfully created {} ({})",
            config.output.display(),
            write_stats.format_file_size()
        ));

        if formatter.is_verbose() {
            formatter.blank_line();
            display_merge_statistics(&formatter, &result.statistics);
            formatter.detail(
                "Write time",
                &format!("{:.2}s", write_stats.write_time.as_secs_f64()),
            );
            if !config.metadata.is_empty() {
                formatter.detail("Metadata", "Set");
            }
        }
    }

    Ok(())
}

/// Handle output file overwrite scenarios.
async fn handle_output_overwrite(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(), MergeError> {
    if !tokio::fs::try_exists(&config.output).await.unwrap_or(false) {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(MergeError::output_exists(config.output.clone())),
        OverwriteMode::Prompt => {
            // Nobody to ask in quiet mode.
            if formatter.is_quiet() {
                return Err(MergeError::output_exists(config.output.clone()));
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| MergeError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(MergeError::Cancelled)
            }
        }
    }
}
