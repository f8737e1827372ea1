mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser as _;
use command_dispatch_core::Token;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{DEFAULT_CONFIG_FILE, DispatchConfig};

#[derive(Debug, clap::Parser)]
#[command(name = "dispatch")]
#[command(about = "Run host-probing commands through a schema-driven dispatcher")]
// `-h`/`--help` belong to the dispatcher, which answers them with its own help.
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// YAML configuration file (log level, timeouts, scan inventory).
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Print the registered command schemas as JSON and exit.
    #[arg(long)]
    describe: bool,
    /// Command tokens, e.g. `gather-info lab 3 --host example.com --port 443`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = DispatchConfig::load_or_default(&cli.config)?;
    init_tracing(&config.log_level);

    let parser = commands::build_parser(config)?;
    if cli.describe {
        println!("{}", parser.to_json()?);
        return Ok(());
    }

    let tokens = Token::from_args(&cli.tokens);
    debug!(tokens = tokens.len(), "dispatching invocation");
    if let Some(outcome) = parser.parse(&tokens).await? {
        println!("{}", outcome.render());
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
