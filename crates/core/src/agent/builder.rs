use std::sync::Arc;

use taskloom_model::CompletionGateway;

use super::{Agent, AgentConfig};
use crate::gateway_client::GatewayClient;
use crate::tool::{CredentialStore, ToolRegistry, UserContext};

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) gateway: GatewayClient,
    pub(crate) registry: Option<Arc<dyn ToolRegistry>>,
    pub(crate) credentials: Option<Arc<dyn CredentialStore>>,
    pub(crate) user: Option<UserContext>,
    pub(crate) tools: Vec<String>,
    pub(crate) config: Option<AgentConfig>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified completion gateway.
    #[inline]
    pub fn with_gateway<G: CompletionGateway + 'static>(gateway: G) -> Self {
        Self {
            gateway: GatewayClient::new(gateway),
            registry: None,
            credentials: None,
            user: None,
            tools: vec![],
            config: None,
        }
    }

    /// Attaches a tool registry. Defaults to a static catalog holding
    /// only the fallback tool.
    #[inline]
    pub fn with_tool_registry<R: ToolRegistry + 'static>(
        mut self,
        registry: R,
    ) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Attaches a credential store. Defaults to an empty store.
    #[inline]
    pub fn with_credential_store<C: CredentialStore + 'static>(
        mut self,
        credentials: C,
    ) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Sets the user the runs are performed on behalf of.
    #[inline]
    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }

    /// Requests a tool by name. The registry still decides whether the
    /// user may actually use it.
    #[inline]
    pub fn with_tool<S: Into<String>>(mut self, name: S) -> Self {
        self.tools.push(name.into());
        self
    }

    /// Overrides the default per-phase limits.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
