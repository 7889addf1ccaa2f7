use clap::Parser;
use hookrouter::cli::{run_cli, Cli};
use hookrouter::otel::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging_with_config(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
