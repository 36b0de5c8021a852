//! Interactive terminal coding agent.
//!
//! A chat-completions model drives the session and may ask for four tools:
//! `read_file`, `write_file`, `edit_file` and `run_command`. Reads run
//! straight away; every other action is printed and waits for one keystroke
//! (Escape cancels, anything else runs it). Cancelling a call drops the whole
//! tool-call batch from the conversation and the model is asked again.
//!
//! Settings come from `~/.bono/config.toml`, then `.env` / the environment
//! (`BASE_URL`, `MODEL`, the API key variable), then command-line flags.

pub mod actions;
pub mod agent;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod dispatch;
pub mod history;
pub mod llm;
pub mod logging;
pub mod session;
pub mod util;
