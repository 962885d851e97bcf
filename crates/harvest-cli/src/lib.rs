//! Harvest CLI Library
//!
//! Bulk collector for offset-paginated JSON APIs.
//!
//! # Overview
//!
//! - **Collection**: walk an endpoint page by page with retry and pacing (`harvest fetch`)
//! - **Classification**: bucket attachment filenames by sensitivity (`harvest attachments`)
//! - **Download**: fetch every accessible attachment (`harvest attachments --download`)
//! - **Configuration**: inspect the resolved settings (`harvest config show`)

pub mod api;
pub mod classify;
pub mod collect;
pub mod commands;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod progress;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use config::ConfigOverrides;
use std::path::PathBuf;

/// Harvest - paginated API collector
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./harvest.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "HARVEST_ENDPOINT_BASE", global = true)]
    pub base_url: Option<String>,

    /// Bearer token
    #[arg(long, env = "HARVEST_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Directory for produced artifacts
    #[arg(short, long, env = "HARVEST_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Records requested per page
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Print the command reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

impl Cli {
    /// Resolve configuration: file, then environment, then flags
    pub fn resolve_config(&self) -> Result<HarvestConfig> {
        let config = HarvestConfig::discover(self.config.as_deref())?.with_env()?;
        Ok(config.apply(ConfigOverrides {
            endpoint_base: self.base_url.clone(),
            auth_token: self.token.clone(),
            output_dir: self.output_dir.clone(),
            page_size: self.page_size,
        }))
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect every record behind an endpoint
    Fetch {
        /// Endpoint path relative to the base URL (e.g. /users)
        endpoint: String,

        /// Artifact name (defaults to the endpoint path)
        #[arg(short, long)]
        name: Option<String>,

        /// Column placed first in the CSV
        #[arg(long, default_value = export::DEFAULT_ID_FIELD)]
        id_field: String,

        /// Skip the flattened CSV
        #[arg(long)]
        no_csv: bool,
    },

    /// Classify attachment metadata and optionally download accessible files
    Attachments {
        /// Attachment endpoint path
        #[arg(long, default_value = commands::attachments::DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Host fragment marking directly downloadable URLs
        #[arg(long)]
        storage_marker: Option<String>,

        /// MIME type to skip; repeatable, replaces the spreadsheet defaults
        #[arg(long = "skip-mime")]
        skip_mime: Vec<String>,

        /// Download every accessible file
        #[arg(long)]
        download: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "harvest",
            "--base-url",
            "http://localhost:9",
            "fetch",
            "/orders",
            "--no-csv",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Fetch {
                endpoint,
                id_field,
                no_csv,
                ..
            }) => {
                assert_eq!(endpoint, "/orders");
                assert_eq!(id_field, "_id");
                assert!(no_csv);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeated_skip_mime() {
        let cli = Cli::try_parse_from([
            "harvest",
            "attachments",
            "--skip-mime",
            "text/csv",
            "--skip-mime",
            "application/zip",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Attachments {
                endpoint, skip_mime, ..
            }) => {
                assert_eq!(endpoint, "/attachments");
                assert_eq!(skip_mime, vec!["text/csv", "application/zip"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
