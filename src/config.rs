use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-opus-4.5";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding agent working in the user's current \
directory. Use the tools to inspect and change files and to run commands. Read files before \
editing them, prefer edit_file over rewriting whole files, and keep commands short. Every \
action except read_file is shown to the user, who may decline it; when that happens, continue \
without it. Finish with a concise summary of what you did.";

/// What happens after the user cancels a tool call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelPolicy {
    /// Roll back the batch and ask the model again.
    #[default]
    Resend,
    /// Roll back the batch and return to the user prompt.
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_tools_path")]
    pub tools_path: PathBuf,
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: PathBuf,
    #[serde(default)]
    pub on_cancel: CancelPolicy,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            tools_path: default_tools_path(),
            system_prompt_path: default_system_prompt_path(),
            on_cancel: CancelPolicy::Resend,
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_tools_path() -> PathBuf {
    PathBuf::from("tools.json")
}

fn default_system_prompt_path() -> PathBuf {
    PathBuf::from("system_prompt.txt")
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot resolve home directory")?;
    Ok(home.join(".bono"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_config_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        save_config_to(&path, &cfg)?;
        return Ok(cfg);
    }
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&text).with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    save_config_to(&config_path()?, cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(cfg)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Variable lookup over the process environment with a `.env` file behind it.
#[derive(Debug, Clone, Default)]
pub struct Env {
    file: BTreeMap<String, String>,
    use_process: bool,
}

impl Env {
    /// Process environment plus `.env` from the working directory.
    pub fn load() -> Result<Self> {
        let file = read_dotenv(Path::new(".env"))?;
        if !file.is_empty() {
            debug!(vars = file.len(), "loaded .env");
        }
        Ok(Self {
            file,
            use_process: true,
        })
    }

    /// Only the given pairs; the process environment is ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            file: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            use_process: false,
        }
    }

    pub fn var(&self, key: &str) -> Option<String> {
        if self.use_process
            && let Ok(v) = env::var(key)
            && !v.trim().is_empty()
        {
            return Some(v);
        }
        self.file
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

pub fn read_dotenv(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_dotenv(&text))
}

pub fn parse_dotenv(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        out.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    out
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// `BASE_URL` and `MODEL` override the config file.
pub fn apply_env_overrides(cfg: &mut Config, env: &Env) {
    if let Some(v) = env.var("BASE_URL") {
        cfg.base_url = v;
    }
    if let Some(v) = env.var("MODEL") {
        cfg.model = v;
    }
}

pub fn resolve_api_key(cfg: &Config, env: &Env) -> Result<String> {
    if let Some(v) = env.var(&cfg.api_key_env) {
        return Ok(v);
    }
    if let Some(v) = &cfg.api_key {
        if !v.trim().is_empty() {
            return Ok(v.clone());
        }
    }
    bail!(
        "Missing API key for model {}. Set env var {} (or put it in .env), or run `bono config set --api-key`.",
        cfg.model,
        cfg.api_key_env
    )
}

pub fn load_system_prompt(path: &Path) -> Result<String> {
    if !path.exists() {
        debug!(path = %path.display(), "system prompt file not found, using built-in prompt");
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
