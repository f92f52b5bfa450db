use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod corpus;
mod error;
mod metrics;
mod models;
mod output;
mod parse;
mod predictor;
mod prompts;
mod runner;

use crate::config::RunConfig;
use crate::output::OutputFormat;
use crate::predictor::ChatPredictor;
use crate::runner::Runner;

/// Review rating evaluation CLI - compare prompt variants for predicting
/// star ratings from review text
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file
    run_file: PathBuf,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - show progress for each predictor request
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunConfig::from_file(&args.run_file)?;
    let predictor = ChatPredictor::new(&config.predictor)?;
    let runner = Runner::new(config, predictor, args.verbose);

    let report = runner.run().await?;

    output::print_report(&report, args.output);

    Ok(())
}
