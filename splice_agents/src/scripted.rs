use std::collections::VecDeque;
use std::sync::Mutex;

use splice_agent_api::{
    AgentGateway, AgentRequest, AgentResponse, GatewayCapabilities, GatewayError, GatewayResult,
};
use splice_api::EditEncoding;

/// Offline gateway that replays canned responses in order.
///
/// Every prompt it receives is recorded so callers can inspect what would have
/// been sent to a real agent.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    /// Gateway answering with `responses`, first to last.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response.into());
    }

    /// Prompts received so far, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of responses not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl AgentGateway for ScriptedGateway {
    fn id(&self) -> &'static str {
        "scripted"
    }

    fn label(&self) -> &'static str {
        "Scripted replay"
    }

    fn capabilities(&self) -> GatewayCapabilities {
        GatewayCapabilities::new(true, true, EditEncoding::Structured)
    }

    fn complete(&self, request: &AgentRequest) -> GatewayResult<AgentResponse> {
        self.prompts
            .lock()
            .map_err(|_| GatewayError::message("scripted prompt log poisoned"))?
            .push(request.flattened());

        let next = self
            .responses
            .lock()
            .map_err(|_| GatewayError::message("scripted response queue poisoned"))?
            .pop_front();

        next.map(|text| AgentResponse::new(self.id(), text))
            .ok_or_else(|| GatewayError::Exhausted {
                gateway: self.id().to_string(),
            })
    }
}
