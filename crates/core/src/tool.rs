//! Tool catalogs and the credential surface they resolve against.
//!
//! Tools never execute here; the catalog only decides which tool
//! names a given user may pick from during task analysis, and how a
//! chosen tool is displayed to the caller.

use async_trait::async_trait;

use crate::parse::DEFAULT_TOOL;

/// The user a run is performed on behalf of.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserContext {
    /// An opaque user identifier.
    pub id: String,
    /// An optional display name.
    pub name: Option<String>,
}

/// A tool entry as exposed to the analysis phase and the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// The identifier the model picks the tool by.
    pub name: String,
    /// The human-readable name shown to the caller.
    pub display_name: String,
}

/// Read-only access to per-user third-party credentials.
///
/// Registries consult this to decide whether a credential-gated tool
/// is available for a user.
pub trait CredentialStore: Send + Sync {
    /// Returns the user's access token for `provider`, if any.
    fn access_token(&self, user: &UserContext, provider: &str)
    -> Option<String>;
}

/// A credential store with no credentials in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    #[inline]
    fn access_token(&self, _: &UserContext, _: &str) -> Option<String> {
        None
    }
}

/// A catalog of tools the analysis phase may choose from.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Resolves the requested tool names into the subset this user may
    /// actually use, in catalog order. Unknown names are dropped
    /// silently.
    async fn resolve_tools(
        &self,
        names: &[String],
        user: &UserContext,
        credentials: &dyn CredentialStore,
    ) -> Vec<ToolDescriptor>;

    /// The human-readable name for a tool identifier. Defaults to the
    /// identifier itself.
    fn display_name(&self, tool: &str) -> String {
        tool.to_owned()
    }
}

/// A registry backed by a fixed tool list, with no per-user gating.
pub struct StaticToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl StaticToolRegistry {
    /// Creates a registry offering exactly the given tool names, each
    /// displayed as its own identifier.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tools = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                ToolDescriptor {
                    display_name: name.clone(),
                    name,
                }
            })
            .collect();
        Self { tools }
    }
}

impl Default for StaticToolRegistry {
    /// A catalog holding only the fallback tool.
    fn default() -> Self {
        Self::new([DEFAULT_TOOL])
    }
}

#[async_trait]
impl ToolRegistry for StaticToolRegistry {
    async fn resolve_tools(
        &self,
        names: &[String],
        _user: &UserContext,
        _credentials: &dyn CredentialStore,
    ) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter(|tool| names.iter().any(|name| *name == tool.name))
            .cloned()
            .collect()
    }

    fn display_name(&self, tool: &str) -> String {
        self.tools
            .iter()
            .find(|t| t.name == tool)
            .map(|t| t.display_name.clone())
            .unwrap_or_else(|| tool.to_owned())
    }
}
