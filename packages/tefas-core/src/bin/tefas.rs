//! TEFAS CLI - Download fund prices and compute performance statistics.
//!
//! Prints JSON (or CSV for `download --format csv`) on stdout; logs go to stderr.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tefas_core::{
    popular_funds, ApiResponse, StatisticsEngine, Tefas, TefasConfig, TefasFetcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "tefas")]
#[command(about = "TEFAS fund analyzer - price history and performance statistics")]
#[command(version)]
struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily prices for a fund
    Download {
        /// Fund code (e.g. CPU)
        fund_code: String,
        /// First date, YYYY-MM-DD (default: five years before end)
        #[arg(long)]
        start: Option<String>,
        /// Last date, YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Compute total return, volatility, CAGR and Sharpe ratio for a fund
    Stats {
        /// Fund code (e.g. CPU)
        fund_code: String,
        /// First date, YYYY-MM-DD (default: five years before end)
        #[arg(long)]
        start: Option<String>,
        /// Last date, YYYY-MM-DD (default: today)
        #[arg(long)]
        end: Option<String>,
        /// Annual risk-free rate for the Sharpe ratio (0.15 = 15%)
        #[arg(long, default_value = "0")]
        risk_free_rate: f64,
    },
    /// List well-known fund codes
    Popular,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Download {
            fund_code,
            start,
            end,
            format,
        } => handle_download(&fund_code, start.as_deref(), end.as_deref(), format),
        Commands::Stats {
            fund_code,
            start,
            end,
            risk_free_rate,
        } => handle_stats(&fund_code, start.as_deref(), end.as_deref(), risk_free_rate),
        Commands::Popular => handle_popular(),
    };

    match outcome {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{}", e);
            println!("{}", to_json(&ApiResponse::<()>::err(e.to_string()))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,tefas_core=debug,tefas=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn client() -> tefas_core::Result<Tefas<TefasFetcher>> {
    Ok(Tefas::new(TefasFetcher::new(TefasConfig::from_env())?))
}

fn handle_download(
    fund_code: &str,
    start: Option<&str>,
    end: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let series = client()?.download(fund_code, start, end)?;

    match format {
        OutputFormat::Csv => Ok(series.to_csv().trim_end().to_string()),
        OutputFormat::Json => to_json(&ApiResponse::ok(json!({
            "fund_code": fund_code.trim().to_uppercase(),
            "count": series.len(),
            "prices": series,
        }))),
    }
}

fn handle_stats(
    fund_code: &str,
    start: Option<&str>,
    end: Option<&str>,
    risk_free_rate: f64,
) -> Result<String> {
    let tefas = client()?.with_engine(StatisticsEngine::new().with_risk_free_rate(risk_free_rate));
    let series = tefas.download(fund_code, start, end)?;
    let stats = tefas.get_statistics(&series, &fund_code.trim().to_uppercase())?;
    to_json(&ApiResponse::ok(stats))
}

fn handle_popular() -> Result<String> {
    let funds: Vec<_> = popular_funds()
        .iter()
        .map(|(code, name)| json!({ "code": code, "name": name }))
        .collect();
    to_json(&ApiResponse::ok(json!({ "funds": funds })))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
