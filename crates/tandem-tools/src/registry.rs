//! Name → tool lookup for dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tandem_core::tools::ToolDefinition;
use tracing::warn;

use crate::traits::AgentTool;

/// Registry of tools available to the loop.
///
/// Re-registering a name overwrites the previous tool (last registration
/// wins) with a warning. Lookups on unknown names return `None`; the
/// dispatcher turns that into an error tool result rather than failing
/// the turn.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn AgentTool>>>,
}

impl ToolRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register(&self, tool: Arc<dyn AgentTool>) {
        let name = tool.name().to_string();
        if self.tools.write().insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "tool re-registered, previous registration replaced");
        }
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.read().get(name).cloned()
    }

    /// Definitions for the model request, sorted by name for a stable
    /// prompt.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .read()
            .values()
            .map(|t| t.definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::EchoTool;

    #[test]
    fn lookup_finds_registered_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::named("echo")));

        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn last_registration_wins() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::with_description("echo", "first")));
        registry.register(Arc::new(EchoTool::with_description("echo", "second")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().description(), "second");
    }

    #[test]
    fn definitions_sorted_by_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::named("zeta")));
        registry.register(Arc::new(EchoTool::named("alpha")));

        let names: Vec<String> = registry
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
