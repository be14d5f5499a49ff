//! Tool trait and registry

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use tripcraft_error::{Error, Result};
use tripcraft_llm::{ToolCall, ToolDefinition};

/// A function the model may ask to have executed.
///
/// `invoke` receives the raw JSON argument string from the tool call and
/// returns the text handed back to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn invoke(&self, arguments: &str) -> Result<String>;
}

/// Decode tool arguments, reporting bad JSON as an invalid argument
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| {
        Error::invalid_argument(format!("bad arguments for '{}': {}", tool, e))
            .with_operation("tool::parse_arguments")
            .with_context("tool", tool.to_string())
            .set_source(e)
    })
}

/// Named set of tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under the name its definition declares
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
        self
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    /// Definitions to advertise to the model, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute one tool call
    pub async fn call(&self, call: &ToolCall) -> Result<String> {
        let tool = self.get(&call.name).ok_or_else(|| {
            Error::tool_unknown(&call.name).with_operation("registry::call")
        })?;

        info!(tool = %call.name, "executing tool");
        debug!(tool = %call.name, arguments = %call.arguments, "tool arguments");

        let output = tool
            .invoke(&call.arguments)
            .await
            .map_err(|e| e.with_operation("registry::call").with_context("call_id", call.id.clone()))?;

        debug!(tool = %call.name, chars = output.len(), "tool finished");
        Ok(output)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;
    use tripcraft_error::ErrorKind;

    pub(crate) struct Echo;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Repeat the text")
        }

        async fn invoke(&self, arguments: &str) -> Result<String> {
            let args: EchoArgs = parse_arguments("echo", arguments)?;
            Ok(args.text)
        }
    }

    #[tokio::test]
    async fn test_call_registered_tool() {
        let registry = ToolRegistry::new().with(Arc::new(Echo));
        let out = registry
            .call(&ToolCall::new("1", "echo", r#"{"text":"bonjour"}"#))
            .await
            .unwrap();
        assert_eq!(out, "bonjour");
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = tokio_test::block_on(registry.call(&ToolCall::new("1", "nope", "{}"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolUnknown);
    }

    #[tokio::test]
    async fn test_bad_arguments() {
        let registry = ToolRegistry::new().with(Arc::new(Echo));
        let err = registry
            .call(&ToolCall::new("7", "echo", "not json"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.context_value("call_id"), Some("7"));
    }
}
