use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use infopoint::{
    config::PortalConfig, presentation, requests::RequestClient,
    scraping_context::ScrapingContext, validate_credentials,
};
use log::{LevelFilter, error, info, warn};

/// Scrapes grades and absences from a Home.InfoPoint school portal.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the configured credentials are accepted.
    Check,
    /// Fetch once and print the result as JSON.
    Fetch,
    /// Refresh on schedule, printing the published values after each refresh.
    Watch,
}

async fn check(config: PortalConfig) -> anyhow::Result<ExitCode> {
    let transport = RequestClient::new(&config.transport)?;
    match validate_credentials(config.credentials, transport).await {
        Ok(title) => {
            info!("Credentials accepted for {title}");
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{e}");
            println!("{}", e.form_error_key());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn fetch(mut ctx: ScrapingContext) -> anyhow::Result<ExitCode> {
    let result = ctx.client.get_data().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

async fn watch(ctx: ScrapingContext) -> anyhow::Result<ExitCode> {
    ctx.into_coordinator()
        .run(|state| {
            if let Some(e) = &state.last_error {
                warn!("Keeping previous data: {e}");
            }
            match serde_json::to_string(&presentation::sensors(state)) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Could not serialise values: {e}"),
            }
        })
        .await;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = PortalConfig::new()?;
    match cli.command.unwrap_or(Command::Watch) {
        Command::Check => check(config).await,
        Command::Fetch => fetch(ScrapingContext::new(config)?).await,
        Command::Watch => watch(ScrapingContext::new(config)?).await,
    }
}
