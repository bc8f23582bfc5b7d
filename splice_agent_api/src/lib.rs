//! Contract between splice and the text-generating agents it talks to.
//!
//! The core treats every response as untrusted text; gateways only move
//! prompts out and raw text back.

mod registry;
mod types;

pub use registry::GatewayRegistry;
pub use types::{
    AgentRequest, AgentResponse, GatewayCapabilities, GatewayError, GatewayResult, GatewaySummary,
};

/// Trait implemented by agent integrations (CLI wrappers, scripted replays, ...).
pub trait AgentGateway: Send + Sync {
    /// Stable identifier used for lookup and logging.
    fn id(&self) -> &'static str;

    /// Human-friendly label for UI surfaces.
    fn label(&self) -> &'static str;

    /// Capabilities advertised by the gateway.
    fn capabilities(&self) -> GatewayCapabilities;

    /// Send a prompt and wait for the agent's raw response text.
    ///
    /// # Errors
    ///
    /// Implementors should surface transport, process, or timeout failures.
    fn complete(&self, request: &AgentRequest) -> GatewayResult<AgentResponse>;
}
