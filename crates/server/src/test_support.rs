use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use taskmate_agent::{
    AgentRuntime, ChatCompleter, ChatCompletion, Message, SessionHandle, ToolDescriptor,
    ToolInvoker, ToolResult, ToolSchema,
};

struct ScriptedCompleter {
    replies: Mutex<VecDeque<ChatCompletion>>,
}

#[async_trait]
impl ChatCompleter for ScriptedCompleter {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: Option<&[ToolSchema]>,
    ) -> Result<ChatCompletion> {
        let mut replies = self.replies.lock().map_err(|_| anyhow!("script lock poisoned"))?;
        Ok(replies.pop_front().unwrap_or_default())
    }
}

struct EchoInvoker;

#[async_trait]
impl ToolInvoker for EchoInvoker {
    async fn invoke(&self, name: &str, _arguments: Map<String, Value>) -> Result<ToolResult> {
        Ok(ToolResult::from_text(format!("{name} ok")))
    }
}

/// Spawns a session over scripted model replies. Returns the handle and the
/// number of registered tools.
pub fn session_with_replies(replies: Vec<ChatCompletion>, with_tools: bool) -> (SessionHandle, usize) {
    let completer = Arc::new(ScriptedCompleter { replies: Mutex::new(replies.into()) });
    let mut runtime = AgentRuntime::new(completer, Arc::new(EchoInvoker));

    if with_tools {
        let descriptors = vec![ToolDescriptor {
            name: "get_todos".to_string(),
            description: "List every todo".to_string(),
            parameter_schema: None,
        }];
        if runtime.load_tools(&descriptors).is_err() {
            return (SessionHandle::spawn(runtime), 0);
        }
    }

    let tool_count = runtime.tool_schemas().len();
    (SessionHandle::spawn(runtime), tool_count)
}
