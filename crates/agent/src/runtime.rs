use std::sync::Arc;

use serde_json::{Map, Value};
use taskmate_core::domain::todo::TodoCommand;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversation::TaskFieldExtractor;
use crate::guardrails::{ArgumentGuard, GuardrailDecision};
use crate::history::{ConversationState, Message};
use crate::llm::{ChatCompleter, PendingToolCall};
use crate::tools::{parse_arguments, ToolDescriptor, ToolInvoker, ToolRegistry, ToolSchema};
use crate::AgentError;

pub const SYSTEM_PROMPT: &str = "You are a ToDo assistant. You can use MCP tools: add_todo, \
delete_todo, update_todo, update_status, get_todo, get_todos. Keep track of all previous tasks. \
Ask only for missing info. Always respond concisely.";

pub const NO_RESPONSE: &str = "No response";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub output: String,
    pub failed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub correlation_id: String,
    pub reply: Option<String>,
    pub dispatched: Vec<DispatchedCall>,
    pub auto_call: Option<DispatchedCall>,
    /// Set when a completion request failed; the failure is never appended to history.
    pub model_error: Option<String>,
}

impl TurnReport {
    fn new(correlation_id: String) -> Self {
        Self { correlation_id, reply: None, dispatched: Vec::new(), auto_call: None, model_error: None }
    }

    /// Best-effort text for the caller: the reply, else the model failure, else a fixed marker.
    pub fn outcome_text(&self) -> &str {
        self.reply.as_deref().or(self.model_error.as_deref()).unwrap_or(NO_RESPONSE)
    }
}

/// Conversation orchestrator for a single session. Owns the history; callers
/// needing concurrent access go through [`crate::SessionHandle`].
pub struct AgentRuntime {
    completer: Arc<dyn ChatCompleter>,
    invoker: Arc<dyn ToolInvoker>,
    conversation: ConversationState,
    tools: ToolRegistry,
    extractor: TaskFieldExtractor,
    guard: ArgumentGuard,
}

impl AgentRuntime {
    pub fn new(completer: Arc<dyn ChatCompleter>, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self::with_system_prompt(completer, invoker, SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(
        completer: Arc<dyn ChatCompleter>,
        invoker: Arc<dyn ToolInvoker>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            completer,
            invoker,
            conversation: ConversationState::new(system_prompt),
            tools: ToolRegistry::default(),
            extractor: TaskFieldExtractor::new(),
            guard: ArgumentGuard,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn tool_schemas(&self) -> &[ToolSchema] {
        self.tools.schemas()
    }

    pub fn load_tools(&mut self, descriptors: &[ToolDescriptor]) -> Result<(), AgentError> {
        for descriptor in descriptors {
            debug!(
                event_name = "agent.tools.descriptor",
                tool = %descriptor.name,
                description = %descriptor.description,
                input_schema = ?descriptor.parameter_schema,
                "raw tool descriptor"
            );
        }

        self.tools.register(descriptors)?;
        info!(
            event_name = "agent.tools.loaded",
            tool_count = self.tools.len(),
            "tool schemas registered for session"
        );
        Ok(())
    }

    /// Runs one turn. Only a session without registered tools is an error;
    /// model and tool failures are folded into the report.
    pub async fn process_query(&mut self, text: &str) -> Result<TurnReport, AgentError> {
        if self.tools.is_empty() {
            return Err(AgentError::NoToolsLoaded);
        }

        let mut report = TurnReport::new(Uuid::new_v4().to_string());
        let auto_call = self.extractor.extract(text).into_add_command();
        self.conversation.push(Message::user(text));

        info!(
            event_name = "agent.turn.start",
            correlation_id = %report.correlation_id,
            auto_call = auto_call.is_some(),
            "processing query"
        );

        match self.completer.complete(self.conversation.messages(), Some(self.tools.schemas())).await {
            Ok(decision) if decision.tool_calls.is_empty() => {
                report.reply = decision.reply_text();
            }
            Ok(decision) => {
                for call in decision.tool_calls {
                    let dispatched = self.dispatch(call, &report.correlation_id).await;
                    report.dispatched.push(dispatched);
                }

                match self.completer.complete(self.conversation.messages(), None).await {
                    Ok(followup) => report.reply = followup.reply_text(),
                    Err(error) => {
                        report.model_error = Some(model_failure(&report.correlation_id, &error))
                    }
                }
            }
            Err(error) => report.model_error = Some(model_failure(&report.correlation_id, &error)),
        }

        if let Some(reply) = &report.reply {
            self.conversation.push(Message::assistant(reply.clone()));
        }

        if let Some(command) = auto_call {
            report.auto_call = Some(self.run_auto_call(command, &report.correlation_id).await);
        }

        info!(
            event_name = "agent.turn.complete",
            correlation_id = %report.correlation_id,
            tool_calls = report.dispatched.len(),
            has_reply = report.reply.is_some(),
            "query processed"
        );
        Ok(report)
    }

    async fn dispatch(&mut self, call: PendingToolCall, correlation_id: &str) -> DispatchedCall {
        let arguments = parse_arguments(&call.raw_arguments);
        if let GuardrailDecision::Degrade { reason_code, detail } =
            self.guard.evaluate(self.tools.get(&call.name), &arguments)
        {
            warn!(
                event_name = "agent.turn.arguments_degraded",
                correlation_id,
                tool = %call.name,
                reason_code,
                detail = %detail,
                "dispatching tool call despite argument check"
            );
        }

        info!(
            event_name = "agent.turn.tool_dispatched",
            correlation_id,
            tool = %call.name,
            arguments = %call.raw_arguments,
            "calling tool"
        );
        self.invoke_and_record(call.name, arguments, correlation_id).await
    }

    /// Bypass creation from extracted fields. Runs even if the model already
    /// created the same task this turn.
    async fn run_auto_call(&mut self, command: TodoCommand, correlation_id: &str) -> DispatchedCall {
        info!(
            event_name = "agent.turn.auto_call",
            correlation_id,
            tool = command.tool_name(),
            "issuing heuristic tool call"
        );
        self.invoke_and_record(command.tool_name().to_string(), command.to_arguments(), correlation_id)
            .await
    }

    async fn invoke_and_record(
        &mut self,
        name: String,
        arguments: Map<String, Value>,
        correlation_id: &str,
    ) -> DispatchedCall {
        let (output, failed) = match self.invoker.invoke(&name, arguments.clone()).await {
            Ok(result) => (result.text(), result.is_error),
            Err(error) => {
                warn!(
                    event_name = "agent.turn.tool_failed",
                    correlation_id,
                    tool = %name,
                    error = %error,
                    "tool invocation failed"
                );
                (format!("Error calling tool {name}: {error}"), true)
            }
        };

        self.conversation.push(Message::function(name.clone(), output.clone()));
        DispatchedCall { name, arguments, output, failed }
    }
}

fn model_failure(correlation_id: &str, error: &anyhow::Error) -> String {
    warn!(
        event_name = "agent.turn.model_failed",
        correlation_id,
        error = %error,
        "completion request failed"
    );
    format!("Model request failed: {error}")
}
