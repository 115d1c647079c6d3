//! Runtime registries for tools, resources and prompts.
//!
//! A [`Registry`] is assembled once at startup, handed to the server behind
//! an `Arc`, and read-only from then on. Iteration order matches
//! registration order, which is what `tools/list` and friends report.
//!
//! Handlers are opaque async callables. [`Registry::execute`] runs them on
//! their own task so a panicking handler surfaces as an execution error
//! instead of tearing down the dispatcher.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::protocol::{PromptArgument, PromptDefinition, ResourceDefinition, ToolDefinition};

/// Boxed future returned by tool handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>;

/// Tool handler function type.
///
/// Handlers receive the (coerced) argument object and return a JSON value.
/// Blocking bodies should hop through `tokio::task::spawn_blocking`.
pub type ToolHandler = Arc<dyn Fn(Map<String, Value>) -> ToolFuture + Send + Sync>;

/// Resource provider function type, invoked lazily on every read.
pub type ResourceProvider = Arc<dyn Fn() -> Result<String, ToolError> + Send + Sync>;

/// A registered tool: wire-visible contract plus the handler behind it.
pub struct RegisteredTool {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Optional display title.
    pub title: Option<String>,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
    /// JSON Schema for the tool's return value, when it declares one.
    ///
    /// Declaring one makes `tools/call` responses carry the raw value as
    /// structured content alongside the text encoding.
    pub output_schema: Option<Value>,
    /// Module the tool was registered from, for error attribution.
    pub module: Option<String>,
    /// The callable.
    pub handler: ToolHandler,
}

impl RegisteredTool {
    /// Starts building a tool registration.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name)
    }

    /// The wire-visible definition served by `tools/list`.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
        }
    }
}

/// A registered resource with a lazy body provider.
pub struct RegisteredResource {
    /// Unique resource URI.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the body.
    pub mime_type: String,
    /// Produces the body on each read.
    pub provider: ResourceProvider,
}

impl RegisteredResource {
    /// Starts building a resource registration.
    #[must_use]
    pub fn builder(uri: impl Into<String>, name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(uri, name)
    }

    /// The wire-visible definition served by `resources/list`.
    #[must_use]
    pub fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// A registered prompt template.
pub struct RegisteredPrompt {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared arguments, for discovery only.
    pub arguments: Vec<PromptArgument>,
    /// Template text with `{name}` placeholders.
    pub template: String,
}

impl RegisteredPrompt {
    /// Starts building a prompt registration.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PromptBuilder {
        PromptBuilder::new(name)
    }

    /// The wire-visible definition served by `prompts/list`.
    #[must_use]
    pub fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Renders the template with literal `{name}` substitution.
    ///
    /// Single pass, no escaping: replacement text is inserted as-is and
    /// never re-scanned for further placeholders. Placeholders without a
    /// matching argument stay verbatim. Non-string argument values
    /// substitute as their JSON encoding.
    #[must_use]
    pub fn render(&self, args: &Map<String, Value>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            let Some(close) = rest.find('}') else {
                break;
            };
            match args.get(&rest[1..close]) {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => out.push_str(&rest[..=close]),
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// The registry handed to the server at startup.
#[derive(Default)]
pub struct Registry {
    tools: IndexMap<String, RegisteredTool>,
    resources: IndexMap<String, RegisteredResource>,
    prompts: IndexMap<String, RegisteredPrompt>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Re-registering a name replaces the previous entry.
    pub fn register(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Removes a tool. Returns whether the name was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.shift_remove(name).is_some()
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Registered tool names in registration order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Registered tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Registers a resource. Re-registering a URI replaces the previous entry.
    pub fn register_resource(&mut self, resource: RegisteredResource) {
        self.resources.insert(resource.uri.clone(), resource);
    }

    /// Looks up a resource by URI.
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&RegisteredResource> {
        self.resources.get(uri)
    }

    /// Registered resources in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &RegisteredResource> {
        self.resources.values()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Registers a prompt. Re-registering a name replaces the previous entry.
    pub fn register_prompt(&mut self, prompt: RegisteredPrompt) {
        self.prompts.insert(prompt.name.clone(), prompt);
    }

    /// Looks up a prompt by name.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&RegisteredPrompt> {
        self.prompts.get(name)
    }

    /// Registered prompts in registration order.
    pub fn prompts(&self) -> impl Iterator<Item = &RegisteredPrompt> {
        self.prompts.values()
    }

    /// Number of registered prompts.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    /// Runs a tool handler to completion on its own task.
    ///
    /// A handler panic is caught at the join boundary and converted into an
    /// execution error; it never propagates. Dropping the returned future
    /// abandons the wait but leaves the spawned handler running.
    ///
    /// # Errors
    ///
    /// Returns the handler's own error, an execution error for a panic, or
    /// a not-found error for an unknown name.
    pub async fn execute(&self, name: &str, args: Map<String, Value>) -> Result<Value, ToolError> {
        let Some(tool) = self.tools.get(name) else {
            return Err(ToolError::not_found(name));
        };

        let handler = Arc::clone(&tool.handler);
        let module = tool.module.clone();
        let handle = tokio::spawn(async move { handler(args).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) if join_error.is_panic() => Err(ToolError::execution(
                name,
                "tool handler panicked",
                module,
                None,
            )),
            Err(join_error) => Err(ToolError::execution(
                name,
                format!("tool task failed: {join_error}"),
                module,
                None,
            )),
        }
    }
}

/// Builder for a tool registration.
pub struct ToolBuilder {
    name: String,
    description: String,
    title: Option<String>,
    input_schema: Value,
    output_schema: Option<Value>,
    module: Option<String>,
}

impl ToolBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            title: None,
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            output_schema: None,
            module: None,
        }
    }

    /// Sets the description served by `tools/list`.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets an optional display title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the argument schema. Defaults to an empty object schema.
    #[must_use]
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Declares a return-value schema, enabling structured content.
    #[must_use]
    pub fn output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Tags the source module for error attribution.
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Finishes the registration with the given handler.
    pub fn build<F, Fut>(self, handler: F) -> RegisteredTool
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        RegisteredTool {
            name: self.name,
            description: self.description,
            title: self.title,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            module: self.module,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

/// Builder for a resource registration.
pub struct ResourceBuilder {
    uri: String,
    name: String,
    description: String,
    mime_type: String,
}

impl ResourceBuilder {
    fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: String::new(),
            mime_type: "text/plain".to_string(),
        }
    }

    /// Sets the description served by `resources/list`.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the body MIME type. Defaults to `text/plain`.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Finishes the registration with the given provider.
    pub fn build<F>(self, provider: F) -> RegisteredResource
    where
        F: Fn() -> Result<String, ToolError> + Send + Sync + 'static,
    {
        RegisteredResource {
            uri: self.uri,
            name: self.name,
            description: self.description,
            mime_type: self.mime_type,
            provider: Arc::new(provider),
        }
    }
}

/// Builder for a prompt registration.
pub struct PromptBuilder {
    name: String,
    description: String,
    arguments: Vec<PromptArgument>,
    template: String,
}

impl PromptBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            arguments: Vec::new(),
            template: String::new(),
        }
    }

    /// Sets the description served by `prompts/list`.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares an argument.
    #[must_use]
    pub fn argument(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.arguments.push(PromptArgument {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }

    /// Sets the template text.
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Finishes the registration.
    #[must_use]
    pub fn build(self) -> RegisteredPrompt {
        RegisteredPrompt {
            name: self.name,
            description: self.description,
            arguments: self.arguments,
            template: self.template,
        }
    }
}
