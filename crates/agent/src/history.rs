use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_name: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_name: None }
    }

    pub fn function(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: Role::Function, content: content.into(), tool_name: Some(tool_name.into()) }
    }
}

/// Append-only model context for one session. Seeded with a single system
/// message; entries are never reordered or removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { messages: vec![Message::system(system_prompt)] }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|message| message.role == Role::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationState, Message, Role};

    #[test]
    fn state_is_seeded_with_one_system_message() {
        let state = ConversationState::new("be brief");
        assert_eq!(state.len(), 1);
        assert_eq!(state.messages()[0], Message::system("be brief"));
    }

    #[test]
    fn last_assistant_skips_function_results() {
        let mut state = ConversationState::new("be brief");
        state.push(Message::user("add a task"));
        state.push(Message::assistant("Done."));
        state.push(Message::function("add_todo", "{\"task_id\":1}"));

        let last = state.last_assistant().map(|message| message.content.as_str());
        assert_eq!(last, Some("Done."));
        assert_eq!(state.messages()[3].role, Role::Function);
        assert_eq!(state.messages()[3].tool_name.as_deref(), Some("add_todo"));
    }
}
