use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{CancelPolicy, Config};

#[derive(Parser, Debug)]
#[command(
    name = "bono",
    version,
    about = "Terminal coding agent that asks before it touches anything"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    /// Debug-level logging to the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Per-run overrides; they win over env vars and the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Model identifier sent to the backend
    #[arg(long)]
    pub model: Option<String>,
    /// API root, e.g. https://openrouter.ai/api/v1
    #[arg(long)]
    pub base_url: Option<String>,
    /// Tool catalog JSON file
    #[arg(long)]
    pub tools: Option<PathBuf>,
    /// System prompt text file
    #[arg(long)]
    pub system_prompt: Option<PathBuf>,
    /// Behavior after a cancelled tool call
    #[arg(long, value_enum)]
    pub on_cancel: Option<CancelPolicy>,
}

impl RunArgs {
    pub fn apply_to(&self, cfg: &mut Config) {
        if let Some(v) = &self.model {
            cfg.model = v.clone();
        }
        if let Some(v) = &self.base_url {
            cfg.base_url = v.clone();
        }
        if let Some(v) = &self.tools {
            cfg.tools_path = v.clone();
        }
        if let Some(v) = &self.system_prompt {
            cfg.system_prompt_path = v.clone();
        }
        if let Some(v) = self.on_cancel {
            cfg.on_cancel = v;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive agent session (default)
    Chat,
    /// Manage settings in ~/.bono/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show the tool catalog sent to the model
    Tools,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default config
    Init,
    /// Show current config
    Show,
    /// Print config and log file locations
    Path,
    /// Set config fields
    Set {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        api_key_env: Option<String>,
        /// Stored API key; pass an empty string to clear it
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        tools_path: Option<PathBuf>,
        #[arg(long)]
        system_prompt_path: Option<PathBuf>,
        #[arg(long, value_enum)]
        on_cancel: Option<CancelPolicy>,
        /// Backend request timeout; 0 disables it
        #[arg(long)]
        request_timeout_secs: Option<u64>,
    },
}
