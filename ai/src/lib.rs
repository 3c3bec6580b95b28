//! Hosted-model side of sqlchat.
//!
//! Provides a chat-completions client for Groq's OpenAI-compatible API and a
//! SQL agent that lets the model inspect and query a [`db::Database`] through
//! tool calls before it answers.

pub mod agent;
pub mod client;
pub mod tools;

use async_trait::async_trait;
use db::{Database, DatabaseResult};
use serde::{Deserialize, Serialize};

// Re-export types that consumers will need to create and use tools
pub use agent::SqlAgent;
pub use client::{ChatClient, Completion, GroqClient};
pub use serde_json::{Value, json};
pub use std::collections::HashMap;

/// Something that can answer a question about a database.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Answer `query` using `database`. Intermediate steps are passed to
    /// `observer` as they happen; only the final text is returned.
    async fn answer(
        &self,
        query: &str,
        database: &dyn Database,
        observer: &mut (dyn FnMut(AgentEvent) + Send),
    ) -> Result<String, AiError>;
}

/// Information about a tool call from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallInfo {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as sent by the model.
    pub arguments: String,
}

/// Intermediate agent activity, forwarded for display only.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Text the model produced alongside a tool call
    Thought(String),
    /// A tool call request from the model
    ToolCall(ToolCallInfo),
    /// What a tool call returned
    ToolResult {
        name: String,
        output: String,
        rows: Option<DatabaseResult>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallInfo>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCallInfo>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(Role::Tool, content)
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Helper function to create a tool with the given name, description, and parameters
///
/// # Example
/// ```rust
/// use ai::{create_tool, json, HashMap, Value};
///
/// let parameters: HashMap<String, Value> = serde_json::from_value(json!({
///     "type": "object",
///     "properties": {
///         "query": {
///             "type": "string",
///             "description": "The SQL query to execute",
///         },
///     },
///     "required": ["query"],
/// })).unwrap();
///
/// let tool = create_tool(
///     "query_database",
///     "Execute a SQL query against the database",
///     parameters,
/// );
/// assert_eq!(tool.name, "query_database");
/// ```
pub fn create_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: HashMap<String, Value>,
) -> Tool {
    Tool {
        name: name.into(),
        description: description.into(),
        parameters: Value::Object(parameters.into_iter().collect()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Agent stopped after {0} tool rounds without an answer")]
    MaxRounds(u32),
    #[error("Database unavailable: {0}")]
    Database(db::DbError),
}
