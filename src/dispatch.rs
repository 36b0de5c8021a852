use std::io::Write;

use anyhow::Result;
use tracing::{info, warn};

use crate::actions::{Action, MARKER, Outcome};
use crate::confirm::{ConfirmGate, Decision, KeySource};
use crate::util::truncate_preview;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The action ran (possibly with a `fail` status); payload goes to the model.
    Executed(String),
    /// The user declined; nothing was touched.
    Cancelled,
}

/// Confirm-then-execute for one tool call at a time.
pub struct Dispatcher<K, W> {
    gate: ConfirmGate<K, W>,
}

impl<K: KeySource, W: Write> Dispatcher<K, W> {
    pub fn new(gate: ConfirmGate<K, W>) -> Self {
        Self { gate }
    }

    pub fn dispatch(&mut self, name: &str, raw_args: &str) -> Result<Dispatch> {
        let action = match Action::parse(name, raw_args) {
            Ok(action) => action,
            Err(err) => {
                warn!(
                    tool = name,
                    args = %truncate_preview(raw_args, 200),
                    error = %format!("{err:#}"),
                    "rejected tool call"
                );
                let outcome = Outcome::fail(format!("{err:#}"));
                self.gate.settle(&format!("{MARKER}{name}(?)"), &outcome.status)?;
                return Ok(Dispatch::Executed(outcome.payload));
            }
        };

        let prompt = action.describe();
        if self.gate.request(&prompt, action.safety())? == Decision::Cancelled {
            info!(tool = action.name(), "tool call cancelled by user");
            return Ok(Dispatch::Cancelled);
        }

        let outcome = action.execute();
        if outcome.is_failure() {
            warn!(tool = action.name(), status = %outcome.status, "tool call failed");
        } else {
            info!(tool = action.name(), status = %outcome.status, "tool call executed");
        }
        self.gate.settle(&prompt, &outcome.status)?;
        Ok(Dispatch::Executed(outcome.payload))
    }

    pub fn gate(&self) -> &ConfirmGate<K, W> {
        &self.gate
    }
}
