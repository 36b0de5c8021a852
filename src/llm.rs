use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::catalog::ToolCatalog;
use crate::config::{Config, Env, resolve_api_key};
use crate::util::WorkingStatus;

const REFERER: &str = "http://localhost";
const TITLE: &str = "bono";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

fn default_role() -> Role {
    Role::Assistant
}

/// One entry of the conversation, in chat-completions wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(
        default,
        deserialize_with = "deserialize_content",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Assistant turn that only requests tools.
    pub fn assistant_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, None)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, Some(content.into()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub kind: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

fn default_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: String,
}

fn deserialize_content<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(content_text))
}

// Some providers send arguments as an object instead of encoded JSON text.
fn deserialize_arguments<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items {
                if item.get("type").and_then(|t| t.as_str()) == Some("text")
                    && let Some(t) = item.get("text").and_then(|t| t.as_str())
                {
                    out.push_str(t);
                }
            }
            if out.is_empty() { None } else { Some(out) }
        }
        _ => None,
    }
}

/// A chat-completions style model backend.
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    /// Sends the whole history plus the tool catalog and returns the
    /// assistant reply.
    async fn complete(&self, messages: &[ChatMessage], tools: &ToolCatalog) -> Result<ChatMessage>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a ToolCatalog,
}

fn no_tools(tools: &&ToolCatalog) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// `ChatBackend` over an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    show_progress: bool,
}

impl OpenAiClient {
    pub fn from_config(cfg: &Config, env: &Env) -> Result<Self> {
        let api_key = resolve_api_key(cfg, env)?;
        Self::new(&cfg.base_url, api_key, &cfg.model, cfg.request_timeout_secs)
    }

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs.filter(|s| *s > 0) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: chat_completions_url(base_url),
            api_key: api_key.into(),
            model: model.into(),
            show_progress: true,
        })
    }

    /// Toggles the "(working ...)" indicator printed while a request is in flight.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatBackend for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &ToolCatalog) -> Result<ChatMessage> {
        let working = if self.show_progress {
            Some(WorkingStatus::start("waiting response"))
        } else {
            None
        };
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
        };
        debug!(
            endpoint = %self.endpoint,
            messages = messages.len(),
            tools = tools.len(),
            "posting chat completion"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", self.endpoint))?;

        let status = resp.status();
        let text = resp.text().await.context("Failed to read response body")?;
        if !status.is_success() {
            bail!("API error {}: {}", status, text);
        }
        let message = parse_completion(&text)?;

        if let Some(working) = working {
            working.finish();
        }
        debug!(tool_calls = message.tool_calls.len(), "chat completion received");
        Ok(message)
    }
}

pub fn chat_completions_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    format!("{trimmed}/chat/completions")
}

fn parse_completion(text: &str) -> Result<ChatMessage> {
    let parsed: ChatResponse = serde_json::from_str(text).context("Invalid JSON response")?;
    let Some(choice) = parsed.choices.into_iter().next() else {
        bail!("no choices in response");
    };
    Ok(choice.message)
}
