//! `harvest config` command implementation

use crate::config::HarvestConfig;
use crate::error::Result;
use colored::Colorize;

/// Show the resolved configuration with the token masked
pub async fn show(config: &HarvestConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(&config.redacted())
        .map_err(|e| crate::error::CliError::config(format!("cannot render config: {}", e)))?;

    println!("{}", "Harvest Configuration:".cyan().bold());
    println!();
    print!("{}", rendered);
    println!();
    println!("{}", "Environment Variables:".cyan());
    println!("  HARVEST_ENDPOINT_BASE  - API base URL");
    println!("  HARVEST_AUTH_TOKEN     - Bearer token");
    println!("  HARVEST_OUTPUT_DIR     - Artifact directory");
    println!("  HARVEST_PAGE_SIZE, HARVEST_MAX_RETRIES, HARVEST_RETRY_BASE_DELAY_MS,");
    println!("  HARVEST_PACING_DELAY_MS, HARVEST_RETRY_ON, HARVEST_LIMIT_PARAM, HARVEST_SKIP_PARAM");

    Ok(())
}
