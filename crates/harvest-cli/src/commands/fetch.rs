//! `harvest fetch` command implementation
//!
//! Collects every record behind one endpoint and writes the dataset manifest and
//! the flattened CSV.

use crate::collect::Collector;
use crate::config::HarvestConfig;
use crate::error::Result;
use crate::export::{self, DatasetManifest};
use crate::progress;
use chrono::Utc;
use colored::Colorize;
use tracing::info;

/// Options for one `fetch` run
#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub endpoint: String,
    pub name: Option<String>,
    pub id_field: String,
    pub write_csv: bool,
}

/// Artifact name derived from an endpoint path: `/v1/users?x=1` becomes `v1_users`
pub fn dataset_name(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or_default();
    let name = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if name.is_empty() {
        "dataset".to_string()
    } else {
        name
    }
}

/// Run the fetch command
pub async fn run(config: &HarvestConfig, args: FetchArgs) -> Result<()> {
    config.validate()?;

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| dataset_name(&args.endpoint));

    println!("{} Collecting {}...", "→".cyan(), args.endpoint);

    let collector = Collector::from_config(config)?;
    let bar = progress::create_collect_progress(&args.endpoint);
    let collection = collector
        .collect(&args.endpoint, |p| bar.update(p))
        .await?;
    bar.finish(format!("Collected {}", args.endpoint));

    super::report_collection(&name, &collection);

    let json_path = config.output_dir.join(format!("{}.json", name));
    export::write_manifest(&json_path, &DatasetManifest::new(&collection, Utc::now()))?;
    println!("{} Wrote {}", "✓".green(), json_path.display());

    if args.write_csv {
        let csv_path = config.output_dir.join(format!("{}.csv", name));
        let rows = export::write_flat_csv(&csv_path, &collection.records, &args.id_field)?;
        println!("{} Wrote {} ({} rows)", "✓".green(), csv_path.display(), rows);
    }

    info!(
        endpoint = %args.endpoint,
        fetched = collection.fetched(),
        total = collection.total,
        complete = collection.is_complete(),
        "Fetch finished"
    );

    Ok(())
}
