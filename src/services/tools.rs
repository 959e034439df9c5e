//! Tool invocation layer: the `Tool` trait, the process-wide registry, and
//! the built-in tools agents are wired with.
//!
//! Tools run in-process and see the shared context through [`ToolCtx`];
//! effects are visible to other tools and agents immediately. Whether an
//! agent may call a tool at all is the dispatcher's allowlist check, not the
//! registry's.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::domain::errors::ToolError;
use crate::domain::ports::{Connector, ToolSchema};
use crate::services::context::ContextStore;

/// Name of the built-in date tool.
pub const TOOL_TODAY: &str = "today";
/// Name of the built-in context-save tool.
pub const TOOL_CONTEXT_SAVE: &str = "context_save";
/// Name of the built-in context-fetch tool.
pub const TOOL_CONTEXT_FETCH: &str = "context_fetch";
/// Name of the built-in question-budget tool.
pub const TOOL_TRACK_QUESTION: &str = "track_question";
/// Name of the built-in routine-document tool.
pub const TOOL_USER_ROUTINE: &str = "user_routine";
/// Name of the calendar connector proxy tool.
pub const TOOL_CALENDAR: &str = "calendar";

/// Context key counting clarifying questions asked so far.
pub const KEY_QUESTIONS_ASKED: &str = "questions_asked";
/// Context key holding the clarifying-question budget.
pub const KEY_MAX_QUESTIONS: &str = "max_questions";

/// Execution context handed to every tool invocation.
#[derive(Clone)]
pub struct ToolCtx {
    /// Name of the invoking agent.
    pub agent: String,

    /// Shared context store.
    pub context: ContextStore,
}

/// One callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name the model requests it by.
    fn name(&self) -> &str;

    /// One-line description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    /// Run the tool.
    async fn invoke(&self, arguments: Value, ctx: &ToolCtx) -> Result<Value, ToolError>;
}

/// Registry of tools by name. Cloning is cheap and shares state.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "replaced existing tool registration");
        }
    }

    /// Look up a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Schemas for the named tools, in allowlist order.
    ///
    /// Names without a registered tool are skipped with a warning; the model
    /// is never offered a tool the registry cannot execute.
    pub async fn schemas(&self, allowlist: &[String]) -> Vec<ToolSchema> {
        let guard = self.tools.read().await;
        let mut schemas = Vec::with_capacity(allowlist.len());
        for name in allowlist {
            match guard.get(name) {
                Some(tool) => schemas.push(ToolSchema {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters(),
                }),
                None => warn!(tool = %name, "allowlisted tool is not registered"),
            }
        }
        schemas
    }

    /// Invoke a tool by name.
    ///
    /// # Errors
    /// - `ToolError::UnknownTool` when no tool has that name
    /// - whatever the tool itself raises
    #[instrument(skip(self, arguments, ctx), fields(agent = %ctx.agent), err)]
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        ctx: &ToolCtx,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .await
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let output = tool.invoke(arguments, ctx).await?;
        debug!(tool = %name, "tool invocation completed");
        Ok(output)
    }
}

/// Deserialize tool arguments, mapping failures to `InvalidArguments`.
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn no_args_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Current date in `YYYY-MM-DD`.
pub struct TodayTool;

#[async_trait]
impl Tool for TodayTool {
    fn name(&self) -> &str {
        TOOL_TODAY
    }

    fn description(&self) -> &str {
        "Get today's date in YYYY-MM-DD format."
    }

    fn parameters(&self) -> Value {
        no_args_schema()
    }

    async fn invoke(&self, _arguments: Value, _ctx: &ToolCtx) -> Result<Value, ToolError> {
        Ok(Value::String(Local::now().format("%Y-%m-%d").to_string()))
    }
}

#[derive(Deserialize)]
struct ContextSaveArgs {
    key: String,
    value: Value,
}

/// Store a value in the shared context.
pub struct ContextSaveTool;

#[async_trait]
impl Tool for ContextSaveTool {
    fn name(&self) -> &str {
        TOOL_CONTEXT_SAVE
    }

    fn description(&self) -> &str {
        "Save a value under a key in the shared planning context."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "key": { "type": "string" },
                "value": {},
            }),
            &["key", "value"],
        )
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolCtx) -> Result<Value, ToolError> {
        let args: ContextSaveArgs = parse_args(TOOL_CONTEXT_SAVE, arguments)?;
        ctx.context.save(args.key.clone(), args.value).await;
        Ok(Value::String(format!("Saved {}", args.key)))
    }
}

#[derive(Deserialize)]
struct ContextFetchArgs {
    key: String,
}

/// Fetch a value from the shared context.
pub struct ContextFetchTool;

#[async_trait]
impl Tool for ContextFetchTool {
    fn name(&self) -> &str {
        TOOL_CONTEXT_FETCH
    }

    fn description(&self) -> &str {
        "Fetch the value stored under a key in the shared planning context."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "key": { "type": "string" } }), &["key"])
    }

    async fn invoke(&self, arguments: Value, ctx: &ToolCtx) -> Result<Value, ToolError> {
        let args: ContextFetchArgs = parse_args(TOOL_CONTEXT_FETCH, arguments)?;
        Ok(ctx.context.get(&args.key).await.unwrap_or(Value::Null))
    }
}

/// Count a clarifying question against the shared budget.
pub struct TrackQuestionTool;

#[async_trait]
impl Tool for TrackQuestionTool {
    fn name(&self) -> &str {
        TOOL_TRACK_QUESTION
    }

    fn description(&self) -> &str {
        "Record that a clarifying question was asked and report the budget."
    }

    fn parameters(&self) -> Value {
        no_args_schema()
    }

    async fn invoke(&self, _arguments: Value, ctx: &ToolCtx) -> Result<Value, ToolError> {
        let asked = ctx.context.increment(KEY_QUESTIONS_ASKED).await;
        let budget = ctx
            .context
            .get(KEY_MAX_QUESTIONS)
            .await
            .and_then(|v| v.as_i64())
            .unwrap_or(3);
        Ok(json!({
            KEY_QUESTIONS_ASKED: asked,
            KEY_MAX_QUESTIONS: budget,
        }))
    }
}

/// The user's routine and preferences document.
pub struct UserRoutineTool {
    document: String,
}

impl UserRoutineTool {
    /// Tool returning the given routine document.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

#[async_trait]
impl Tool for UserRoutineTool {
    fn name(&self) -> &str {
        TOOL_USER_ROUTINE
    }

    fn description(&self) -> &str {
        "Get the user's weekly routine and standing preferences."
    }

    fn parameters(&self) -> Value {
        no_args_schema()
    }

    async fn invoke(&self, _arguments: Value, _ctx: &ToolCtx) -> Result<Value, ToolError> {
        Ok(Value::String(self.document.clone()))
    }
}

#[derive(Deserialize)]
struct CalendarArgs {
    operation: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Proxy calendar operations to the calendar connector.
pub struct CalendarTool {
    connector: Arc<dyn Connector>,
}

impl CalendarTool {
    /// Tool proxying to the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for CalendarTool {
    fn name(&self) -> &str {
        TOOL_CALENDAR
    }

    fn description(&self) -> &str {
        "Run a calendar operation: list-events, create-event, update-event or delete-event."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "operation": {
                    "type": "string",
                    "enum": ["list-events", "create-event", "update-event", "delete-event"],
                },
                "arguments": { "type": "object" },
            }),
            &["operation"],
        )
    }

    async fn invoke(&self, arguments: Value, _ctx: &ToolCtx) -> Result<Value, ToolError> {
        let args: CalendarArgs = parse_args(TOOL_CALENDAR, arguments)?;
        self.connector
            .invoke(&args.operation, args.arguments.unwrap_or_else(|| json!({})))
            .await
            .map_err(|e| ToolError::ExecutionFailure {
                tool: TOOL_CALENDAR.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Register every connector-free built-in tool.
pub async fn register_builtins(registry: &ToolRegistry, routine_document: impl Into<String>) {
    registry.register(Arc::new(TodayTool)).await;
    registry.register(Arc::new(ContextSaveTool)).await;
    registry.register(Arc::new(ContextFetchTool)).await;
    registry.register(Arc::new(TrackQuestionTool)).await;
    registry
        .register(Arc::new(UserRoutineTool::new(routine_document)))
        .await;
}
