use std::io::Write;
use std::sync::Arc;

use taskmate_agent::{AgentRuntime, OpenAiChatCompleter};
use taskmate_core::config::{AppConfig, LoadOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::Level;

use super::{block_on, connect_tool_session, CommandResult, EXIT_CONFIG, EXIT_RUNTIME, EXIT_TOOL_SESSION};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("chat", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };
    init_logging(&config);

    match block_on(interactive(config)) {
        Ok(result) => result,
        Err(error) => CommandResult::failure(
            "chat",
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        ),
    }
}

async fn interactive(config: AppConfig) -> CommandResult {
    let completer = match OpenAiChatCompleter::from_config(&config.llm) {
        Ok(completer) => completer,
        Err(error) => return CommandResult::failure("chat", "llm_client", error.to_string(), EXIT_RUNTIME),
    };

    let session = match connect_tool_session(&config).await {
        Ok(session) => Arc::new(session),
        Err(error) => {
            return CommandResult::failure("chat", "tool_session", error.to_string(), EXIT_TOOL_SESSION)
        }
    };

    let mut agent = AgentRuntime::new(Arc::new(completer), session.clone());
    let loaded = match session.list_tools().await {
        Ok(descriptors) => agent.load_tools(&descriptors).map_err(|error| error.to_string()),
        Err(error) => Err(error.to_string()),
    };
    if let Err(message) = loaded {
        session.close("chat.load_tools").await;
        return CommandResult::failure("chat", "tool_session", message, EXIT_TOOL_SESSION);
    }

    let mut stdout = std::io::stdout();
    let outcome = chat_loop(&mut agent, BufReader::new(tokio::io::stdin()), &mut stdout).await;
    session.close("chat.exit").await;

    match outcome {
        Ok(turns) => CommandResult::success("chat", format!("chat ended after {turns} turns")),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), EXIT_RUNTIME),
    }
}

/// Reads queries line by line until `exit`/`quit` or end of input. Turn
/// errors are printed and the loop keeps going. Returns the number of
/// answered turns.
pub async fn chat_loop<R, W>(
    agent: &mut AgentRuntime,
    input: R,
    output: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "Taskmate chat started. Type 'exit' or 'quit' to leave.")?;
    let mut lines = input.lines();
    let mut turns = 0;

    loop {
        write!(output, "\nQuery: ")?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit(query) {
            break;
        }

        match agent.process_query(query).await {
            Ok(report) => {
                turns += 1;
                writeln!(output, "\n{}", report.outcome_text())?;
            }
            Err(error) => writeln!(output, "\nError: {error}")?,
        }
    }

    Ok(turns)
}

fn is_exit(query: &str) -> bool {
    query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit")
}

// Replies go to stdout, so diagnostics stay on stderr.
fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use taskmate_agent::{
        AgentRuntime, ChatCompleter, ChatCompletion, Message, ToolDescriptor, ToolInvoker,
        ToolResult, ToolSchema,
    };

    use super::{chat_loop, is_exit};

    struct Scripted(Mutex<VecDeque<ChatCompletion>>);

    #[async_trait]
    impl ChatCompleter for Scripted {
        async fn complete(&self, _: &[Message], _: Option<&[ToolSchema]>) -> Result<ChatCompletion> {
            Ok(self.0.lock().map_err(|_| anyhow!("poisoned"))?.pop_front().unwrap_or_default())
        }
    }

    struct Echo;

    #[async_trait]
    impl ToolInvoker for Echo {
        async fn invoke(&self, name: &str, _: Map<String, Value>) -> Result<ToolResult> {
            Ok(ToolResult::from_text(format!("{name} ok")))
        }
    }

    fn agent(replies: Vec<ChatCompletion>, with_tools: bool) -> Result<AgentRuntime> {
        let mut agent =
            AgentRuntime::new(Arc::new(Scripted(Mutex::new(replies.into()))), Arc::new(Echo));
        if with_tools {
            agent.load_tools(&[ToolDescriptor {
                name: "get_todos".to_string(),
                description: "List every todo".to_string(),
                parameter_schema: None,
            }])?;
        }
        Ok(agent)
    }

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("Exit"));
        assert!(!is_exit("exit now"));
    }

    #[tokio::test]
    async fn loop_prints_each_reply_and_stops_at_quit() -> Result<()> {
        let mut agent = agent(
            vec![ChatCompletion::text("No tasks yet."), ChatCompletion::text("Never printed.")],
            true,
        )?;
        let mut output = Vec::new();

        let turns =
            chat_loop(&mut agent, &b"list tasks\n\nQuit\nlist again\n"[..], &mut output).await?;

        let printed = String::from_utf8(output)?;
        assert_eq!(turns, 1);
        assert!(printed.contains("No tasks yet."));
        assert!(!printed.contains("Never printed."));
        Ok(())
    }

    #[tokio::test]
    async fn turn_errors_are_printed_and_the_loop_continues() -> Result<()> {
        let mut agent = agent(Vec::new(), false)?;
        let mut output = Vec::new();

        let turns = chat_loop(&mut agent, &b"first\nsecond\n"[..], &mut output).await?;

        let printed = String::from_utf8(output)?;
        assert_eq!(turns, 0);
        assert_eq!(printed.matches("Error: no tools loaded").count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn end_of_input_ends_the_loop() -> Result<()> {
        let mut agent = agent(vec![ChatCompletion::text("Done.")], true)?;
        let mut output = Vec::new();

        let turns = chat_loop(&mut agent, &b"mark task 1 done"[..], &mut output).await?;

        assert_eq!(turns, 1);
        Ok(())
    }
}
