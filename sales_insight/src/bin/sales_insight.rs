use clap::{Parser, Subcommand};
use sales_insight::config::AppConfig;
use sales_insight::service::{ErrorResponse, ForecastRequest, SalesInsightService};
use sales_insight::{logging, InsightError, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "sales-insight")]
#[command(about = "Forecast store/product sales and cluster store/category totals")]
#[command(version)]
struct Cli {
    /// TOML configuration file; defaults to $SALES_INSIGHT_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the dataset path from the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Actual and predicted sales of one product at one store
    Forecast {
        store_id: String,
        product_name: String,
        start_date: String,
        end_date: String,
    },
    /// Cluster every (category, store) sales total
    Cluster,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let pretty = cli.pretty;

    match run(cli) {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (status, payload) = ErrorResponse::from_error(&err);
            error!(status, error = %err, "request failed");
            match to_json(&payload, pretty) {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("{err}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.data {
        config.dataset.path = path;
    }
    logging::init(&config.logging)?;

    let service = SalesInsightService::from_config(&config)?;

    match cli.command {
        Commands::Forecast {
            store_id,
            product_name,
            start_date,
            end_date,
        } => {
            let request = ForecastRequest {
                store_id,
                product_name,
                start_date,
                end_date,
            };
            to_json(&service.handle_forecast(&request)?, cli.pretty)
        }
        Commands::Cluster => to_json(&service.handle_clustering()?, cli.pretty),
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| InsightError::DataError(format!("cannot serialize response: {e}")))
}
