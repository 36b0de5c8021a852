//! Conversation history with batch checkpoints and rollback.

use anyhow::{Result, bail};

use crate::llm::{ChatMessage, Role};

/// Saved history length to roll a tool-call batch back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    pub fn position(self) -> usize {
        self.0
    }
}

/// Ordered conversation log. Index 0 is always the system prompt.
///
/// Messages are only appended, except for [`History::rollback`], which drops
/// everything from a checkpoint onward. A `tool` message is accepted only as
/// the answer to a still-unanswered call of the latest assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Never zero: the system prompt survives every rollback.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, mut message: ChatMessage) {
        message.role = Role::Assistant;
        message.tool_call_id = None;
        self.messages.push(message);
    }

    pub fn push_tool_result(&mut self, tool_call_id: &str, content: impl Into<String>) -> Result<()> {
        let Some(anchor) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            bail!("tool result {tool_call_id} has no assistant turn to answer");
        };
        let answered = &self.messages[anchor + 1..];
        if answered.iter().any(|m| m.role != Role::Tool) {
            bail!("tool result {tool_call_id} arrived after the assistant turn was closed");
        }
        if !self.messages[anchor]
            .tool_calls
            .iter()
            .any(|c| c.id == tool_call_id)
        {
            bail!("tool result {tool_call_id} does not match a call of the current assistant turn");
        }
        if answered
            .iter()
            .any(|m| m.tool_call_id.as_deref() == Some(tool_call_id))
        {
            bail!("tool call {tool_call_id} already answered");
        }
        self.messages
            .push(ChatMessage::tool_result(tool_call_id, content));
        Ok(())
    }

    /// The current length, to roll back to later.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.messages.len())
    }

    /// Position of the most recent message, i.e. the assistant turn that
    /// opened the current batch.
    pub fn checkpoint_before_last(&self) -> Checkpoint {
        Checkpoint(self.messages.len().saturating_sub(1).max(1))
    }

    /// Truncates to `checkpoint`, never past the system prompt. Returns how
    /// many messages were dropped.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> usize {
        let keep = checkpoint.0.max(1);
        let removed = self.messages.len().saturating_sub(keep);
        self.messages.truncate(keep);
        removed
    }
}
