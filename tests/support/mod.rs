#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Result, anyhow};
use bono::agent::Agent;
use bono::catalog::ToolCatalog;
use bono::confirm::{ConfirmGate, KeySource};
use bono::dispatch::Dispatcher;
use bono::llm::{ChatBackend, ChatMessage, ToolCall};
use bono::session::InputSource;
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "test system prompt";

/// Replays canned replies and records every history it was sent.
pub struct ScriptedBackend {
    replies: RefCell<VecDeque<Result<ChatMessage>>>,
    requests: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ChatMessage>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(replies: Vec<Result<ChatMessage>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.borrow().clone()
    }
}

impl ChatBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage], _tools: &ToolCatalog) -> Result<ChatMessage> {
        self.requests.borrow_mut().push(messages.to_vec());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("backend script exhausted")))
    }
}

pub struct ScriptedKeys {
    keys: VecDeque<u8>,
    pub reads: usize,
}

impl ScriptedKeys {
    pub fn new(keys: &[u8]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
            reads: 0,
        }
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> Result<u8> {
        self.reads += 1;
        self.keys
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted keystroke left"))
    }
}

pub struct ScriptedInput(pub VecDeque<String>);

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl InputSource for ScriptedInput {
    fn next_line(&mut self, _label: &str) -> Result<Option<String>> {
        Ok(self.0.pop_front())
    }
}

pub type TestAgent = Agent<ScriptedBackend, ScriptedKeys, Vec<u8>>;

pub fn agent(backend: ScriptedBackend, keys: &[u8]) -> TestAgent {
    let gate = ConfirmGate::new(ScriptedKeys::new(keys), Vec::new());
    Agent::new(
        backend,
        ToolCatalog::builtin(),
        SYSTEM_PROMPT,
        Dispatcher::new(gate),
    )
}

pub fn call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall::new(id, name, args.to_string())
}

pub fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

pub fn terminal_output(agent: &TestAgent) -> String {
    String::from_utf8_lossy(agent.dispatcher().gate().output()).into_owned()
}
