//! Cache command - render a document to text for the fallback path.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::info;

use faktur_core::WhisperClient;
use faktur_core::models::record::DocumentInput;

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output text file (default: input with the fallback extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing rendering
    #[arg(long)]
    force: bool,
}

pub async fn run(args: CacheArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension(&config.processing.fallback_extension));
    if output.exists() && !args.force {
        anyhow::bail!(
            "Rendering already exists at {}. Use --force to overwrite.",
            output.display()
        );
    }

    info!("Rendering {} to text", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Rendering text...");

    let document = DocumentInput::from_path(&args.input)?;
    let whisper = WhisperClient::new(config.whisper.clone());
    let result = whisper.render_text(&document).await;
    pb.finish_and_clear();
    let text = result?;

    fs::write(&output, &text)?;

    println!(
        "{} Text rendering written to {}",
        style("✓").green(),
        output.display()
    );

    Ok(())
}
