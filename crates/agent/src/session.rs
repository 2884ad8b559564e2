use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::runtime::{AgentRuntime, TurnReport};
use crate::AgentError;

const QUEUE_DEPTH: usize = 16;

struct TurnRequest {
    query: String,
    reply: oneshot::Sender<Result<TurnReport, AgentError>>,
}

/// Cloneable handle to a runtime running on its own task. Queries from any
/// number of handles are served strictly one at a time.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<TurnRequest>,
}

impl SessionHandle {
    pub fn spawn(runtime: AgentRuntime) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run_session(runtime, receiver));
        Self { sender }
    }

    pub async fn ask(&self, query: impl Into<String>) -> Result<TurnReport, AgentError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(TurnRequest { query: query.into(), reply })
            .await
            .map_err(|_| AgentError::SessionClosed)?;
        response.await.map_err(|_| AgentError::SessionClosed)?
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

async fn run_session(mut runtime: AgentRuntime, mut receiver: mpsc::Receiver<TurnRequest>) {
    info!(event_name = "agent.session.started", "session actor running");
    while let Some(request) = receiver.recv().await {
        let outcome = runtime.process_query(&request.query).await;
        if request.reply.send(outcome).is_err() {
            debug!(event_name = "agent.session.caller_gone", "turn finished after caller dropped");
        }
    }
    info!(
        event_name = "agent.session.stopped",
        messages = runtime.conversation().len(),
        "all session handles dropped"
    );
}
