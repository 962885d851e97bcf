//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function taking the resolved
//! [`HarvestConfig`](crate::config::HarvestConfig).

pub mod attachments;
pub mod config;
pub mod fetch;

use crate::collect::Collection;
use colored::Colorize;

/// Print the totals line and any short-count or skipped-page warnings
pub(crate) fn report_collection(label: &str, collection: &Collection) {
    println!(
        "{} {}: {} of {} record(s)",
        "✓".green(),
        label,
        collection.fetched(),
        collection.total
    );

    if !collection.is_complete() {
        println!(
            "{} Short count: the server declared {} record(s) but only {} arrived",
            "⚠".yellow(),
            collection.total,
            collection.fetched()
        );
    }

    if !collection.skipped_offsets.is_empty() {
        let offsets: Vec<String> = collection
            .skipped_offsets
            .iter()
            .map(|o| o.to_string())
            .collect();
        println!(
            "{} Skipped malformed page(s) at offset {}",
            "⚠".yellow(),
            offsets.join(", ")
        );
    }
}
