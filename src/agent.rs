//! The conversation loop: send history, run requested tools, repeat until
//! the model answers without tool calls.
//!
//! Each assistant message that requests tools opens a batch. Calls run in
//! order through the [`Dispatcher`]; their results are appended as `tool`
//! messages. If the user cancels any call, the whole batch (the assistant
//! message and every result already appended for it) is removed from the
//! history. Effects of calls that already ran stay on disk.
//!
//! A failed backend request, or a reply that reuses a tool-call id, ends the
//! turn with [`TurnEnd::BackendFailed`] and removes the whole turn (user
//! message included) so the next turn starts from a clean history.

use std::io::Write;

use std::collections::HashSet;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::catalog::ToolCatalog;
use crate::config::CancelPolicy;
use crate::confirm::KeySource;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::history::History;
use crate::llm::{ChatBackend, ToolCall};
use crate::util::truncate_preview;

#[derive(Debug)]
pub enum TurnEnd {
    /// Final assistant reply without tool calls.
    Answer(Option<String>),
    /// A tool call was cancelled and the policy is [`CancelPolicy::Return`].
    Cancelled,
    /// The backend request failed or sent an unusable reply; history is
    /// restored to what it was before the turn.
    BackendFailed(anyhow::Error),
}

#[derive(Debug)]
pub struct TurnOutcome {
    pub end: TurnEnd,
    /// Backend requests made during the turn.
    pub round_trips: usize,
}

enum Batch {
    Completed,
    RolledBack,
}

pub struct Agent<B, K, W> {
    backend: B,
    catalog: ToolCatalog,
    history: History,
    dispatcher: Dispatcher<K, W>,
    on_cancel: CancelPolicy,
}

impl<B: ChatBackend, K: KeySource, W: Write> Agent<B, K, W> {
    pub fn new(
        backend: B,
        catalog: ToolCatalog,
        system_prompt: impl Into<String>,
        dispatcher: Dispatcher<K, W>,
    ) -> Self {
        Self {
            backend,
            catalog,
            history: History::new(system_prompt),
            dispatcher,
            on_cancel: CancelPolicy::default(),
        }
    }

    pub fn with_cancel_policy(mut self, on_cancel: CancelPolicy) -> Self {
        self.on_cancel = on_cancel;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn dispatcher(&self) -> &Dispatcher<K, W> {
        &self.dispatcher
    }

    /// Runs one user turn to completion.
    ///
    /// Errors are local failures (terminal I/O); backend failures are
    /// reported through [`TurnEnd::BackendFailed`].
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        let turn_start = self.history.checkpoint();
        self.history.push_user(input);
        let mut round_trips = 0usize;
        loop {
            round_trips += 1;
            debug!(round_trips, messages = self.history.len(), "requesting completion");
            let reply = self
                .backend
                .complete(self.history.messages(), &self.catalog)
                .await
                .and_then(|reply| {
                    if let Some(id) = duplicate_call_id(&reply.tool_calls) {
                        return Err(anyhow!("reply reuses tool call id '{id}'"));
                    }
                    Ok(reply)
                });
            let reply = match reply {
                Ok(reply) => reply,
                Err(err) => {
                    let removed = self.history.rollback(turn_start);
                    warn!(error = %format!("{err:#}"), removed, "backend request failed");
                    return Ok(TurnOutcome {
                        end: TurnEnd::BackendFailed(err),
                        round_trips,
                    });
                }
            };

            let calls = reply.tool_calls.clone();
            let answer = reply.content.clone();
            self.history.push_assistant(reply);

            if calls.is_empty() {
                debug!(
                    answer = %truncate_preview(answer.as_deref().unwrap_or_default(), 120),
                    "turn answered"
                );
                return Ok(TurnOutcome {
                    end: TurnEnd::Answer(answer),
                    round_trips,
                });
            }

            match self.run_batch(&calls)? {
                Batch::Completed => {}
                Batch::RolledBack if self.on_cancel == CancelPolicy::Return => {
                    return Ok(TurnOutcome {
                        end: TurnEnd::Cancelled,
                        round_trips,
                    });
                }
                Batch::RolledBack => {}
            }
        }
    }

    fn run_batch(&mut self, calls: &[ToolCall]) -> Result<Batch> {
        let checkpoint = self.history.checkpoint_before_last();
        debug!(calls = calls.len(), checkpoint = checkpoint.position(), "running tool batch");

        for call in calls {
            let step = self
                .dispatcher
                .dispatch(&call.function.name, &call.function.arguments)
                .and_then(|dispatched| match dispatched {
                    Dispatch::Executed(payload) => self
                        .history
                        .push_tool_result(&call.id, payload)
                        .map(|()| true),
                    Dispatch::Cancelled => Ok(false),
                });

            match step {
                Ok(true) => {}
                Ok(false) => {
                    let removed = self.history.rollback(checkpoint);
                    info!(call = %call.id, removed, "batch rolled back after cancellation");
                    return Ok(Batch::RolledBack);
                }
                Err(err) => {
                    self.history.rollback(checkpoint);
                    return Err(err);
                }
            }
        }
        Ok(Batch::Completed)
    }
}

fn duplicate_call_id(calls: &[ToolCall]) -> Option<&str> {
    let mut seen = HashSet::new();
    calls
        .iter()
        .map(|c| c.id.as_str())
        .find(|id| !seen.insert(*id))
}
