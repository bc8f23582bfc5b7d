use serde::{Deserialize, Serialize};

use splice_api::EditEncoding;

/// Capabilities advertised by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GatewayCapabilities {
    /// Whether the gateway forwards a separate system prompt.
    pub supports_system_prompt: bool,
    /// Whether the gateway works without network or external processes.
    pub offline: bool,
    /// Edit encoding the agent is best at producing.
    pub preferred_encoding: EditEncoding,
}

impl GatewayCapabilities {
    /// Construct a capabilities struct with explicit flags.
    #[must_use]
    pub const fn new(
        supports_system_prompt: bool,
        offline: bool,
        preferred_encoding: EditEncoding,
    ) -> Self {
        Self {
            supports_system_prompt,
            offline,
            preferred_encoding,
        }
    }
}

/// Summary information about a registered gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySummary {
    /// Stable identifier for the gateway.
    pub id: String,
    /// Human-friendly label for display.
    pub label: String,
    /// Capability flags.
    pub capabilities: GatewayCapabilities,
}

/// Prompt sent to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentRequest {
    /// Optional system / instruction preamble.
    #[serde(default)]
    pub system: Option<String>,
    /// Prompt body.
    pub prompt: String,
    /// File the request concerns, for logging.
    #[serde(default)]
    pub file_path: Option<String>,
}

impl AgentRequest {
    /// Create a request with only a prompt body.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Attach a system preamble.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach the target file path.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// System preamble and prompt joined for transports with a single channel.
    #[must_use]
    pub fn flattened(&self) -> String {
        match &self.system {
            Some(system) if !system.trim().is_empty() => {
                format!("{}\n\n{}", system.trim_end(), self.prompt)
            }
            _ => self.prompt.clone(),
        }
    }
}

/// Raw response returned by an agent. Never trusted as structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Identifier of the gateway that produced the response.
    pub gateway_id: String,
    /// Response text exactly as received.
    pub text: String,
}

impl AgentResponse {
    /// Construct a response.
    pub fn new(gateway_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            text: text.into(),
        }
    }
}

/// Errors surfaced by gateway integrations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The agent did not answer within the configured time.
    #[error("agent did not respond within {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },
    /// A scripted gateway ran out of responses.
    #[error("gateway '{gateway}' has no responses left")]
    Exhausted {
        /// Gateway identifier.
        gateway: String,
    },
    /// Generic failure surfaced by the gateway.
    #[error("{message}")]
    Failure {
        /// Human-readable error message.
        message: String,
    },
}

impl GatewayError {
    /// Helper to construct a failure from any displayable message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
