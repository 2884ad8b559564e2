use anyhow::Result;
use async_trait::async_trait;

use crate::history::Message;
use crate::tools::ToolSchema;

/// A tool call as the model returned it; arguments are still the raw JSON text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingToolCall {
    pub name: String,
    pub raw_arguments: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatCompletion {
    pub text: Option<String>,
    pub tool_calls: Vec<PendingToolCall>,
}

impl ChatCompletion {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), tool_calls: Vec::new() }
    }

    pub fn tool_calls(tool_calls: Vec<PendingToolCall>) -> Self {
        Self { text: None, tool_calls }
    }

    /// Trimmed text, or `None` when the model produced nothing readable.
    pub fn reply_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// `tools` is `None` for the follow-up call, which must not offer tools.
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatCompletion>;
}

#[cfg(test)]
mod tests {
    use super::ChatCompletion;

    #[test]
    fn reply_text_trims_and_drops_blank_text() {
        assert_eq!(ChatCompletion::text("  Added it.\n").reply_text().as_deref(), Some("Added it."));
        assert_eq!(ChatCompletion::text("   ").reply_text(), None);
        assert_eq!(ChatCompletion::default().reply_text(), None);
    }
}
