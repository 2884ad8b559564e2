use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use taskmate_core::config::LlmConfig;
use thiserror::Error;
use tracing::{debug, info};

use crate::history::{Message, Role};
use crate::llm::{ChatCompleter, ChatCompletion, PendingToolCall};
use crate::tools::ToolSchema;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Chat completions over any OpenAI-compatible endpoint (Groq, OpenAI, Ollama).
pub struct OpenAiChatCompleter {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiChatCompleter {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CompletionError::Client)?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(config.resolved_base_url()),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatCompleter for OpenAiChatCompleter {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatCompletion> {
        let body = request_body(&self.model, messages, tools);
        info!(
            event_name = "agent.llm.request",
            model = %self.model,
            messages = messages.len(),
            tools = tools.map_or(0, |tools| tools.len()),
            "calling chat completions"
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.context("chat completion request failed")?;
        let status = response.status();
        let text = response.text().await.context("failed to read chat completion body")?;

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: truncate(&text, ERROR_BODY_LIMIT).to_string(),
            }
            .into());
        }

        debug!(event_name = "agent.llm.response", body = %truncate(&text, 2000), "chat completion received");
        parse_completion(&text)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Map<String, Value>,
}

fn request_body<'a>(
    model: &'a str,
    messages: &'a [Message],
    tools: Option<&'a [ToolSchema]>,
) -> CompletionRequest<'a> {
    CompletionRequest {
        model,
        messages: messages
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: &message.content,
                name: match message.role {
                    Role::Function => message.tool_name.as_deref(),
                    _ => None,
                },
            })
            .collect(),
        tools: tools.map(|schemas| {
            schemas
                .iter()
                .map(|schema| WireTool {
                    kind: "function",
                    function: WireFunction {
                        name: &schema.name,
                        description: &schema.description,
                        parameters: &schema.parameters,
                    },
                })
                .collect()
        }),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

/// A response without choices is an empty completion rather than an error.
fn parse_completion(body: &str) -> Result<ChatCompletion> {
    let response: CompletionResponse =
        serde_json::from_str(body).context("malformed chat completion response")?;
    let Some(choice) = response.choices.into_iter().next() else {
        return Ok(ChatCompletion::default());
    };

    Ok(ChatCompletion {
        text: choice.message.content,
        tool_calls: choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| PendingToolCall {
                name: call.function.name,
                raw_arguments: call.function.arguments.unwrap_or_default(),
            })
            .collect(),
    })
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
