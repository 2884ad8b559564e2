//! Agent Runtime - tool-augmented conversation orchestration
//!
//! This crate turns a user utterance into model decisions, tool executions
//! against an external session, and a final natural-language reply:
//! - Normalizes externally declared tool descriptors into model-facing schemas
//! - Extracts task fields from free text without the model (heuristic auto-call)
//! - Owns conversation history across turns
//! - Dispatches model-requested tool calls strictly in order
//!
//! # Architecture
//!
//! One turn follows a bounded loop:
//! 1. **Field Extraction** (`conversation`) - Pattern-match task id, name, description
//! 2. **Decision Call** (`llm`) - Model sees history plus every tool schema
//! 3. **Tool Dispatch** (`tools`, `guardrails`) - Sequential calls through `ToolInvoker`
//! 4. **Follow-up Call** - Tool-less completion that forces a plain-text answer
//! 5. **Auto-call** - Bypass `add_todo` when all three fields were extracted
//!
//! # Key Types
//!
//! - `AgentRuntime` - The conversation orchestrator (see `runtime` module)
//! - `ChatCompleter` - Pluggable model capability; `openai` ships an HTTP client
//! - `ToolInvoker` - Boundary to the external tool session
//! - `SessionHandle` - Actor wrapper that gives each session its own task

pub mod conversation;
pub mod guardrails;
pub mod history;
pub mod llm;
pub mod openai;
pub mod runtime;
pub mod session;
pub mod tools;

use thiserror::Error;

use taskmate_core::errors::ApplicationError;

pub use conversation::{ExtractedFields, TaskFieldExtractor};
pub use history::{ConversationState, Message, Role};
pub use llm::{ChatCompleter, ChatCompletion, PendingToolCall};
pub use openai::{CompletionError, OpenAiChatCompleter};
pub use runtime::{AgentRuntime, DispatchedCall, TurnReport, NO_RESPONSE, SYSTEM_PROMPT};
pub use session::SessionHandle;
pub use tools::{
    ToolContent, ToolDescriptor, ToolInvoker, ToolRegistry, ToolResult, ToolSchema, ToolSchemaAdapter,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("no tools loaded from the tool session")]
    NoToolsLoaded,
    #[error("tool `{0}` is declared more than once")]
    DuplicateTool(String),
    #[error("session actor is no longer running")]
    SessionClosed,
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::NoToolsLoaded | AgentError::DuplicateTool(_) => {
                Self::Configuration(value.to_string())
            }
            AgentError::SessionClosed => Self::Integration(value.to_string()),
        }
    }
}
