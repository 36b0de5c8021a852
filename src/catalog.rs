use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub parameters: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Tool definitions sent with every backend request. Never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ToolCatalog {
    specs: Vec<ToolSpec>,
}

impl ToolCatalog {
    pub fn new(specs: Vec<ToolSpec>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for spec in &specs {
            let name = spec.function.name.trim();
            if name.is_empty() {
                bail!("tool definition without a name");
            }
            if !seen.insert(name.to_string()) {
                bail!("duplicate tool name in catalog: {name}");
            }
        }
        Ok(Self { specs })
    }

    /// The four tools the dispatcher knows how to run.
    pub fn builtin() -> Self {
        Self {
            specs: vec![
                spec(
                    "read_file",
                    "Read the full text content of a file.",
                    json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string", "description": "Path of the file to read"}
                        },
                        "required": ["path"]
                    }),
                ),
                spec(
                    "write_file",
                    "Create or overwrite a file with the given content.",
                    json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string", "description": "Path of the file to write"},
                            "content": {"type": "string", "description": "Full new file content"}
                        },
                        "required": ["path", "content"]
                    }),
                ),
                spec(
                    "edit_file",
                    "Replace an exact string in a file. Fails if the string is missing, or if it \
                     occurs more than once and replace_all is not set.",
                    json!({
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "old_string": {"type": "string", "description": "Exact text to replace"},
                            "new_string": {"type": "string", "description": "Replacement text"},
                            "replace_all": {"type": "boolean", "description": "Replace every occurrence"}
                        },
                        "required": ["path", "old_string", "new_string"]
                    }),
                ),
                spec(
                    "run_command",
                    "Run a shell command and return its combined stdout and stderr.",
                    json!({
                        "type": "object",
                        "properties": {
                            "command": {"type": "string"},
                            "description": {"type": "string", "description": "What the command does"},
                            "safety": {"type": "string", "enum": ["read-only", "modify"]}
                        },
                        "required": ["command"]
                    }),
                ),
            ],
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let specs: Vec<ToolSpec> =
            serde_json::from_str(text).context("tool catalog must be a JSON list of tools")?;
        Self::new(specs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid tool catalog: {}", path.display()))
    }

    /// Loads `path` when it exists, the built-in catalog otherwise.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            let catalog = Self::load(path)?;
            info!(path = %path.display(), tools = catalog.len(), "loaded tool catalog");
            return Ok(catalog);
        }
        info!(path = %path.display(), "tool catalog not found, using built-in tools");
        Ok(Self::builtin())
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.function.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.function.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn spec(name: &str, description: &str, parameters: Value) -> ToolSpec {
    ToolSpec {
        kind: function_kind(),
        function: ToolFunction {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Names of the `required` parameters in a tool schema.
pub fn required_params(spec: &ToolSpec) -> Vec<&str> {
    spec.function
        .parameters
        .get("required")
        .and_then(|r| r.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default()
}
