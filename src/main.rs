use anyhow::Result;
use clap::Parser;
use tracing::debug;

use bono::cli::{Cli, Commands};
use bono::commands::{handle_config, handle_tools};
use bono::config::{Env, apply_env_overrides, load_config_or_default};
use bono::logging::init_logging;
use bono::session::run_session;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_file = init_logging(cli.verbose);
    debug!(log_file = ?log_file, "logging initialized");

    let env = Env::load()?;
    let mut cfg = load_config_or_default()?;
    apply_env_overrides(&mut cfg, &env);
    cli.run.apply_to(&mut cfg);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_session(&cfg, &env).await?,
        Commands::Config { command } => handle_config(command)?,
        Commands::Tools => handle_tools(&cfg)?,
    }

    Ok(())
}
