use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::agent::{Agent, TurnEnd};
use crate::catalog::ToolCatalog;
use crate::config::{Config, Env, load_system_prompt};
use crate::confirm::{ConfirmGate, KeySource, TerminalKeys};
use crate::dispatch::Dispatcher;
use crate::llm::{ChatBackend, OpenAiClient};
use crate::util::ask_or_eof;

pub const FAREWELL: &str = "See you later, alligator!";
pub const INPUT_PROMPT: &str = "> ";

/// Where user turns come from.
pub trait InputSource {
    /// Shows `label` and returns the next line, or `None` at end of input.
    fn next_line(&mut self, label: &str) -> Result<Option<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdinInput;

impl InputSource for StdinInput {
    fn next_line(&mut self, label: &str) -> Result<Option<String>> {
        ask_or_eof(label)
    }
}

pub async fn run_session(cfg: &Config, env: &Env) -> Result<()> {
    let catalog = ToolCatalog::load_or_builtin(&cfg.tools_path)?;
    let system_prompt = load_system_prompt(&cfg.system_prompt_path)?;
    let backend = OpenAiClient::from_config(cfg, env)?;
    info!(
        model = backend.model(),
        endpoint = backend.endpoint(),
        tools = catalog.len(),
        on_cancel = ?cfg.on_cancel,
        "session started"
    );

    let dispatcher = Dispatcher::new(ConfirmGate::new(TerminalKeys, io::stdout()));
    let mut agent =
        Agent::new(backend, catalog, system_prompt, dispatcher).with_cancel_policy(cfg.on_cancel);

    spawn_interrupt_handler();
    drive(&mut agent, &mut StdinInput, &mut io::stdout()).await
}

/// Ctrl+C outside a confirmation prompt ends the process with the farewell.
/// During a prompt the terminal is raw, so the key arrives as a keystroke instead.
fn spawn_interrupt_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, exiting");
            println!("\n{FAREWELL}");
            std::process::exit(0);
        }
    });
}

/// Read-prompt, run-turn, print-answer until input ends.
pub async fn drive<B, K, W, I, O>(
    agent: &mut Agent<B, K, W>,
    input: &mut I,
    out: &mut O,
) -> Result<()>
where
    B: ChatBackend,
    K: KeySource,
    W: Write,
    I: InputSource,
    O: Write,
{
    loop {
        let Some(line) = input.next_line(INPUT_PROMPT)? else {
            writeln!(out, "\n{FAREWELL}")?;
            out.flush()?;
            info!("input closed, exiting");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = agent.run_turn(&line).await?;
        info!(round_trips = outcome.round_trips, "turn finished");
        match outcome.end {
            TurnEnd::Answer(Some(text)) => writeln!(out, "{text}")?,
            TurnEnd::Answer(None) => {}
            TurnEnd::Cancelled => writeln!(out, "(cancelled)")?,
            TurnEnd::BackendFailed(err) => writeln!(out, "Error: {err:#}")?,
        }
        out.flush()?;
    }
}
