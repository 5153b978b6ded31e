//! Tool registry
//!
//! Tools are named asynchronous operations the server executes on behalf of
//! `executeTool` requests. Each is described by a [`ToolDescriptor`]: a name,
//! a description, a parameter schema, and a [`ToolHandler`]. Descriptors are
//! immutable once registered; registering the same name again swaps in the
//! new descriptor at the old one's enumeration position.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Executes one tool invocation.
///
/// Failures are reported to the requesting client as the `error.message` of
/// the reply, using the error's display text.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with the `parameters` object of the request.
    ///
    /// # Errors
    ///
    /// Returns any failure raised by the tool.
    async fn call(&self, parameters: Value) -> Result<Value>;
}

/// [`ToolHandler`] backed by an async closure.
///
/// # Examples
///
/// ```
/// use docrelay::server::registry::{FnHandler, ToolDescriptor};
///
/// let echo = ToolDescriptor::new("echo", "Echo parameters back", FnHandler::new(
///     |params| async move { Ok(params) },
/// ));
/// assert_eq!(echo.name(), "echo");
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Wrap `f` as a tool handler.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, parameters: Value) -> Result<Value> {
        (self.f)(parameters).await
    }
}

/// Declared type and meaning of one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// JSON type name, e.g. `string`.
    #[serde(rename = "type")]
    pub kind: String,
    /// What the parameter controls.
    pub description: String,
}

impl ParameterSpec {
    /// Shorthand for a `string` parameter.
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            kind: "string".to_string(),
            description: description.into(),
        }
    }
}

/// Serializable view of a tool, as returned by `listTools`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Parameter schema keyed by parameter name.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
}

/// A registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Describe a tool with no parameters; add them with [`Self::with_parameter`].
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: description.into(),
                parameters: BTreeMap::new(),
            },
            handler: Arc::new(handler),
        }
    }

    /// Declare a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.definition.parameters.insert(name.into(), spec);
        self
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Name, description, and parameter schema.
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Shared handle to the handler.
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Name-indexed set of tools that remembers registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, or replace the tool already registered under its name.
    ///
    /// Returns the replaced descriptor, if any.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Option<ToolDescriptor> {
        match self.index.get(descriptor.name()) {
            Some(&slot) => {
                tracing::debug!("Replacing tool {}", descriptor.name());
                Some(std::mem::replace(&mut self.tools[slot], descriptor))
            }
            None => {
                self.index
                    .insert(descriptor.name().to_string(), self.tools.len());
                self.tools.push(descriptor);
                None
            }
        }
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    /// Registered tools in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Definitions of every tool in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(name: &str, value: Value) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            format!("returns {value}"),
            FnHandler::new(move |_| {
                let value = value.clone();
                async move { Ok(value) }
            }),
        )
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(constant("b", json!(1)));
        registry.register(constant("a", json!(2)));
        registry.register(constant("c", json!(3)));

        let names: Vec<&str> = registry.list().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_register_replaces_existing_tool_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(constant("first", json!("old")));
        registry.register(constant("second", json!(0)));

        let replaced = registry.register(constant("first", json!("new")));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list()[0].name(), "first");

        let handler = registry.lookup("first").unwrap().handler();
        assert_eq!(handler.call(Value::Null).await.unwrap(), json!("new"));
    }

    #[test]
    fn test_lookup_missing_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.lookup("nope").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_definition_serializes_parameter_schema() {
        let tool = constant("searchDocs", json!(null))
            .with_parameter("query", ParameterSpec::string("Search query"));
        let val = serde_json::to_value(tool.definition()).unwrap();
        assert_eq!(val["name"], "searchDocs");
        assert_eq!(
            val["parameters"]["query"],
            json!({"type": "string", "description": "Search query"})
        );
    }
}
