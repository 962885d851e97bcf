//! `harvest attachments` command implementation
//!
//! Collects attachment metadata, classifies filenames into sensitivity buckets,
//! writes `metadata.csv` and `summary.json`, and optionally downloads every
//! accessible file.

use crate::classify::{AttachmentScan, Classifier, ScanReport, StorageMarker};
use crate::collect::Collector;
use crate::config::HarvestConfig;
use crate::download::{DownloadStatus, Downloader};
use crate::error::Result;
use crate::export;
use crate::progress::{self, format_bytes};
use chrono::Utc;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use tracing::{info, warn};

/// Default attachment endpoint
pub const DEFAULT_ENDPOINT: &str = "/attachments";

/// Options for one `attachments` run
#[derive(Debug, Clone)]
pub struct AttachmentsArgs {
    pub endpoint: String,
    pub storage_marker: Option<String>,
    /// Replaces the default spreadsheet skip-list when non-empty
    pub skip_mimes: Vec<String>,
    pub download: bool,
}

/// Run the attachments command
pub async fn run(config: &HarvestConfig, args: AttachmentsArgs) -> Result<()> {
    config.validate()?;

    if args.storage_marker.is_none() {
        warn!("No storage marker given; every attachment is tagged restricted");
    }

    println!("{} Collecting {}...", "→".cyan(), args.endpoint);
    let collector = Collector::from_config(config)?;
    let bar = progress::create_collect_progress(&args.endpoint);
    let collection = collector
        .collect(&args.endpoint, |p| bar.update(p))
        .await?;
    bar.finish(format!("Collected {}", args.endpoint));
    super::report_collection("attachments", &collection);

    let marker = StorageMarker::new(args.storage_marker.clone().unwrap_or_default());
    let mut scan = AttachmentScan::new(Classifier::default(), marker);
    if !args.skip_mimes.is_empty() {
        scan = scan.with_skip_mimes(&args.skip_mimes);
    }
    scan.observe_all(&collection.records);
    let report = scan.finish(Utc::now());

    let out_dir = config.output_dir.join("attachments");
    let csv_path = out_dir.join("metadata.csv");
    let rows = export::write_attachment_rows(&csv_path, &report.rows)?;
    println!("{} Wrote {} ({} rows)", "✓".green(), csv_path.display(), rows);

    let summary_path = out_dir.join("summary.json");
    export::write_summary(&summary_path, &report.summary)?;
    println!("{} Wrote {}", "✓".green(), summary_path.display());

    print_breakdown(&report);

    if args.download {
        download(config, &report, &out_dir).await?;
    }

    Ok(())
}

fn print_breakdown(report: &ScanReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "Attachment Breakdown:".cyan().bold());
    println!("  Classified:  {}", summary.total_files);
    println!("  Accessible:  {}", summary.accessible_count.to_string().green());
    println!("  Restricted:  {}", summary.restricted_count.to_string().yellow());
    println!("  Skipped:     {}", summary.skipped_count);
    println!("  Sensitive:   {}", summary.sensitive_count().to_string().red());
    println!();

    if summary.categories.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Category"),
            Cell::new("Files"),
            Cell::new("Accessible"),
            Cell::new("Restricted"),
            Cell::new("Size"),
        ]);

    for (category, bucket) in summary.categories_by_count() {
        table.add_row(vec![
            Cell::new(category),
            Cell::new(bucket.count),
            Cell::new(bucket.accessible),
            Cell::new(bucket.restricted),
            Cell::new(format_bytes(bucket.total_size_bytes)),
        ]);
    }

    println!("{}", table);
}

async fn download(
    config: &HarvestConfig,
    report: &ScanReport,
    out_dir: &std::path::Path,
) -> Result<()> {
    let queued = report.accessible_rows().count() as u64;
    if queued == 0 {
        println!("{} No accessible files to download", "ℹ".cyan());
        return Ok(());
    }

    println!();
    println!("{} Downloading {} accessible file(s)...", "↓".cyan(), queued);

    let downloader = Downloader::new(out_dir.join("downloads"), config.download_timeout())?;
    let bar = progress::create_progress_bar(queued, "Downloading attachments");
    let tally = downloader
        .download_all(report.accessible_rows(), |row, status| {
            if let DownloadStatus::Failed { reason } = status {
                bar.println(format!("  {} {} ({})", "✗".red(), row.filename, reason));
            }
            bar.inc(1);
        })
        .await?;
    bar.finish_and_clear();

    println!("  Downloaded:       {}", tally.downloaded.to_string().green());
    println!("  Already present:  {}", tally.already_present);
    println!("  Total size:       {}", format_bytes(tally.total_bytes));
    if tally.failed > 0 {
        println!("  Failed:           {}", tally.failed.to_string().red());
    }

    info!(
        queued = tally.queued,
        downloaded = tally.downloaded,
        already_present = tally.already_present,
        failed = tally.failed,
        bytes = tally.total_bytes,
        "Attachment downloads finished"
    );

    Ok(())
}
