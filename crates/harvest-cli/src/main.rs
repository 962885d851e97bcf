//! Harvest CLI - Main entry point

use clap::Parser;
use harvest_cli::commands::{attachments::AttachmentsArgs, fetch::FetchArgs};
use harvest_cli::{Cli, Commands, ConfigCommand};
use harvest_common::logging::{init_logging, LogConfig};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Values from .env feed the HARVEST_* lookups below
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command.as_ref() else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::for_cli(cli.verbose);

    // Environment variables take precedence; a bad value keeps the flag-based setup
    let log_config = log_config.clone().with_env().unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli, command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, command: &Commands) -> harvest_cli::Result<()> {
    let config = cli.resolve_config()?;

    match command {
        Commands::Fetch {
            endpoint,
            name,
            id_field,
            no_csv,
        } => {
            harvest_cli::commands::fetch::run(
                &config,
                FetchArgs {
                    endpoint: endpoint.clone(),
                    name: name.clone(),
                    id_field: id_field.clone(),
                    write_csv: !no_csv,
                },
            )
            .await
        }

        Commands::Attachments {
            endpoint,
            storage_marker,
            skip_mime,
            download,
        } => {
            harvest_cli::commands::attachments::run(
                &config,
                AttachmentsArgs {
                    endpoint: endpoint.clone(),
                    storage_marker: storage_marker.clone(),
                    skip_mimes: skip_mime.clone(),
                    download: *download,
                },
            )
            .await
        }

        Commands::Config { command } => match command {
            ConfigCommand::Show => harvest_cli::commands::config::show(&config).await,
        },
    }
}
