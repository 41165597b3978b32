//! Batch command - process every invoice matching a pattern.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    pattern: String,

    /// Skip the spreadsheet append
    #[arg(long)]
    no_sheet: bool,

    /// Leave source files in place afterwards
    #[arg(long)]
    keep: bool,

    /// Continue with the next file when one fails
    #[arg(long)]
    continue_on_error: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("pdf")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.pattern);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Documents are handled strictly one after another
    let mut succeeded = 0usize;
    let mut failed: Vec<(PathBuf, String)> = Vec::new();

    for path in files {
        let result =
            super::process::process_document(&path, None, &config, args.no_sheet).await;

        match result {
            Ok(_) => {
                succeeded += 1;
                if !args.keep {
                    if let Err(err) =
                        super::process::apply_post_action(&path, config.processing.post_action)
                    {
                        warn!("Post-processing failed for {}: {}", path.display(), err);
                    }
                }
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    failed.push((path.clone(), error_msg));
                } else {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    println!();
    println!("{} {} processed", style("✓").green(), succeeded);
    if !failed.is_empty() {
        println!("{} {} failed:", style("✗").red(), failed.len());
        for (path, message) in &failed {
            println!("  {} {}: {}", style("✗").red(), path.display(), message);
        }
    }

    debug!("Total batch time: {:?}", start.elapsed());

    Ok(())
}
