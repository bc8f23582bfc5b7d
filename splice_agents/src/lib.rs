//! Built-in agent gateways.

mod command;
mod scripted;

pub use command::CommandGateway;
pub use scripted::ScriptedGateway;

use splice_agent_api::GatewayRegistry;

/// Build a gateway registry populated with splice's default integrations.
///
/// The command gateway is only registered when `SPLICE_AGENT_CMD` is set.
#[must_use]
pub fn default_registry() -> GatewayRegistry {
    let mut registry = GatewayRegistry::new();
    registry.register(ScriptedGateway::default());
    if let Some(gateway) = CommandGateway::from_env() {
        registry.register(gateway);
    }
    registry
}
