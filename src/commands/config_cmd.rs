use anyhow::Result;

use crate::cli::ConfigCommand;
use crate::config::{Config, config_path, load_config_or_default, save_config};
use crate::logging::log_dir;

pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let cfg = Config::default();
            save_config(&cfg)?;
            println!("Initialized config at {}", config_path()?.display());
        }
        ConfigCommand::Show => {
            let mut cfg = load_config_or_default()?;
            if cfg.api_key.is_some() {
                cfg.api_key = Some("********".to_string());
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
            println!("Config path: {}", config_path()?.display());
            println!(
                "Note: BASE_URL, MODEL and {} in the environment or .env take precedence.",
                cfg.api_key_env
            );
        }
        ConfigCommand::Path => {
            println!("config: {}", config_path()?.display());
            println!("logs:   {}", log_dir().join("bono.log").display());
        }
        ConfigCommand::Set {
            base_url,
            model,
            api_key_env,
            api_key,
            tools_path,
            system_prompt_path,
            on_cancel,
            request_timeout_secs,
        } => {
            let mut cfg = load_config_or_default()?;
            if let Some(v) = base_url {
                cfg.base_url = v;
            }
            if let Some(v) = model {
                cfg.model = v;
            }
            if let Some(v) = api_key_env {
                cfg.api_key_env = v;
            }
            if let Some(v) = api_key {
                if v.trim().is_empty() {
                    cfg.api_key = None;
                } else {
                    cfg.api_key = Some(v);
                }
            }
            if let Some(v) = tools_path {
                cfg.tools_path = v;
            }
            if let Some(v) = system_prompt_path {
                cfg.system_prompt_path = v;
            }
            if let Some(v) = on_cancel {
                cfg.on_cancel = v;
            }
            if let Some(v) = request_timeout_secs {
                cfg.request_timeout_secs = if v == 0 { None } else { Some(v) };
            }
            save_config(&cfg)?;
            println!("Config updated: {}", config_path()?.display());
        }
    }

    Ok(())
}
