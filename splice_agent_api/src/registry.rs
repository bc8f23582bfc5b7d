//! Registry keeps track of available agent gateways.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{AgentGateway, GatewayCapabilities, GatewaySummary};

/// In-memory registry for agent gateways.
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: BTreeMap<&'static str, Arc<dyn AgentGateway>>,
}

impl GatewayRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway keyed by its `AgentGateway::id`, replacing any previous entry.
    pub fn register<G>(&mut self, gateway: G)
    where
        G: AgentGateway + 'static,
    {
        self.register_arc(Arc::new(gateway));
    }

    /// Register an already shared gateway.
    pub fn register_arc(&mut self, gateway: Arc<dyn AgentGateway>) {
        self.gateways.insert(gateway.id(), gateway);
    }

    /// Retrieve a gateway by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn AgentGateway>> {
        self.gateways.get(id).cloned()
    }

    /// Capabilities of a registered gateway.
    #[must_use]
    pub fn capabilities(&self, id: &str) -> Option<GatewayCapabilities> {
        self.gateways.get(id).map(|gateway| gateway.capabilities())
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.gateways.keys().copied()
    }

    /// Summaries for every registered gateway.
    #[must_use]
    pub fn summaries(&self) -> Vec<GatewaySummary> {
        self.gateways
            .values()
            .map(|gateway| GatewaySummary {
                id: gateway.id().to_string(),
                label: gateway.label().to_string(),
                capabilities: gateway.capabilities(),
            })
            .collect()
    }

    /// Number of registered gateways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    /// Whether no gateway is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

impl fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("gateways", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}
