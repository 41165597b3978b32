//! Process command - extract one invoice and append it to the sheet.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::{debug, info};

use faktur_core::models::config::{FakturConfig, PostAction};
use faktur_core::models::record::{NormalizedInvoiceRecord, fields};
use faktur_core::{ExtractionRequest, Orchestrator, SheetsClient, WriteOutcome, provider_for};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Fallback text file (default: input with the fallback extension)
    #[arg(long)]
    fallback: Option<PathBuf>,

    /// Skip the spreadsheet append
    #[arg(long)]
    no_sheet: bool,

    /// Print the normalized record as JSON
    #[arg(long)]
    json: bool,

    /// Leave the source file in place afterwards
    #[arg(long)]
    keep: bool,
}

/// What processing one document produced.
pub(crate) struct DocumentOutcome {
    pub record: NormalizedInvoiceRecord,
    pub write: Option<WriteOutcome>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    // Check input file exists and is a PDF
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {}", extension);
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("Extracting fields...");

    let outcome =
        process_document(&args.input, args.fallback.clone(), &config, args.no_sheet).await;
    pb.finish_and_clear();
    let outcome = outcome?;

    // Print the record
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.record)?);
    } else {
        println!("{}", format_record(&outcome.record));
    }

    match outcome.write {
        Some(WriteOutcome::Appended { row, cells }) => {
            println!(
                "{} Appended {} cells at row {}",
                style("✓").green(),
                cells,
                row
            );
        }
        Some(WriteOutcome::NoOp) => {
            println!("{} No mapped values to write", style("ℹ").blue());
        }
        None => {}
    }

    // Source file handling after a successful run
    let action = if args.keep {
        PostAction::Keep
    } else {
        config.processing.post_action
    };
    match apply_post_action(&args.input, action)? {
        Some(target) => println!("{} Archived as {}", style("✓").green(), target.display()),
        None if action == PostAction::Delete => {
            println!("{} Deleted {}", style("✓").green(), args.input.display());
        }
        None => {}
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Extract, normalize and append a single document. Shared with the batch
/// command.
pub(crate) async fn process_document(
    input: &Path,
    fallback: Option<PathBuf>,
    config: &FakturConfig,
    no_sheet: bool,
) -> anyhow::Result<DocumentOutcome> {
    let provider = provider_for(config);
    let orchestrator = Orchestrator::new(provider, config);
    let request = ExtractionRequest::new(input, fallback, &config.processing.fallback_extension);
    let record = orchestrator.run(&request).await?;

    let write = if no_sheet {
        None
    } else {
        let sheet = SheetsClient::new(config.sheets.clone());
        Some(sheet.append(&record, &config.sheets.columns).await?)
    };

    Ok(DocumentOutcome { record, write })
}

/// Delete, archive or keep the source document. Returns the archive target
/// when one was created.
pub(crate) fn apply_post_action(
    input: &Path,
    action: PostAction,
) -> anyhow::Result<Option<PathBuf>> {
    match action {
        PostAction::Keep => Ok(None),
        PostAction::Delete => {
            fs::remove_file(input)?;
            info!("Deleted {}", input.display());
            Ok(None)
        }
        PostAction::Archive => {
            let stamp = chrono::Utc::now().format("%Y%m%d %H%M");
            let filename = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document");
            let target = input.with_file_name(format!("{stamp}_{filename}.bak"));
            fs::rename(input, &target)?;
            info!("Archived {} as {}", input.display(), target.display());
            Ok(Some(target))
        }
    }
}

pub(crate) fn format_record(record: &NormalizedInvoiceRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Invoice: {}\n",
        record.get(fields::INVOICE_NUMBER)
    ));
    if !record.get(fields::REFERENCE_NUMBER).is_empty() {
        output.push_str(&format!(
            "Reference: {}\n",
            record.get(fields::REFERENCE_NUMBER)
        ));
    }
    output.push_str(&format!("Issued:  {}\n", record.get(fields::ISSUE_DATE)));
    if !record.get(fields::SALE_DATE).is_empty() {
        output.push_str(&format!("Sold:    {}\n", record.get(fields::SALE_DATE)));
    }
    if !record.get(fields::DUE_DATE).is_empty() {
        output.push_str(&format!("Due:     {}\n", record.get(fields::DUE_DATE)));
    }
    output.push('\n');

    output.push_str("Seller:\n");
    output.push_str(&format!("  {}\n", record.get(fields::SELLER_NAME)));
    if !record.get(fields::SELLER_NIP).is_empty() {
        output.push_str(&format!("  NIP: {}\n", record.get(fields::SELLER_NIP)));
    }
    output.push_str("Buyer:\n");
    output.push_str(&format!("  {}\n", record.get(fields::BUYER_NAME)));
    if !record.get(fields::BUYER_NIP).is_empty() {
        output.push_str(&format!("  NIP: {}\n", record.get(fields::BUYER_NIP)));
    }
    output.push('\n');

    output.push_str("Amounts:\n");
    output.push_str(&format!(
        "  Total: {} {}\n",
        record.get(fields::TOTAL_AMOUNT),
        record.get(fields::CURRENCY)
    ));
    if !record.get(fields::PAID_AMOUNT).is_empty() {
        output.push_str(&format!(
            "  Paid:  {} {}\n",
            record.get(fields::PAID_AMOUNT),
            record.get(fields::CURRENCY)
        ));
    }
    if !record.get(fields::LEFT_TO_PAY).is_empty() {
        output.push_str(&format!(
            "  Left:  {} {}\n",
            record.get(fields::LEFT_TO_PAY),
            record.get(fields::CURRENCY)
        ));
    }
    if !record.get(fields::PAYMENT_METHOD).is_empty() {
        output.push_str(&format!("  Via:   {}\n", record.get(fields::PAYMENT_METHOD)));
    }
    if !record.get(fields::IBAN).is_empty() {
        output.push_str(&format!("  IBAN:  {}\n", record.get(fields::IBAN)));
    }

    if !record.get(fields::DOCUMENT_LINK).is_empty() {
        output.push_str(&format!(
            "\nDocument: {}\n",
            record.get(fields::DOCUMENT_LINK)
        ));
    }

    output
}
