//! Chat-completions client for Groq's OpenAI-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use config::{AIConfig, Credential};
use serde_json::{Value, json};
use tracing::debug;

use crate::{AiError, ChatMessage, Tool, ToolCallInfo};

/// One model turn: optional text plus any tool calls it asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallInfo>,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], tools: &[Tool]) -> Result<Completion, AiError>;
}

#[derive(Debug)]
pub struct GroqClient {
    credential: Credential,
    model: String,
    url: String,
    temperature: f32,
    http: reqwest::Client,
}

impl GroqClient {
    pub fn new(credential: Credential, config: &AIConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            credential,
            model: config.model.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.url)
    }

    pub(crate) fn build_request_body(&self, messages: &[ChatMessage], tools: &[Tool]) -> Value {
        let messages: Vec<Value> = messages.iter().map(message_to_json).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": false,
        });

        if !tools.is_empty() {
            body["tools"] = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

fn message_to_json(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if !message.tool_calls.is_empty() {
        value["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect();
    }

    if let Some(ref id) = message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }

    value
}

/// Reads the first choice of a chat-completions response.
pub(crate) fn parse_response(json: &Value) -> Result<Completion, AiError> {
    let message = json["choices"]
        .get(0)
        .map(|choice| &choice["message"])
        .ok_or_else(|| AiError::Parse("response has no choices".to_string()))?;

    let content = message["content"].as_str().map(String::from);

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .map(|call| ToolCallInfo {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: call["function"]["name"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    arguments: match &call["function"]["arguments"] {
                        Value::String(s) => s.clone(),
                        Value::Null => "{}".to_string(),
                        other => other.to_string(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Completion {
        content,
        tool_calls,
    })
}

#[async_trait]
impl ChatClient for GroqClient {
    async fn complete(&self, messages: &[ChatMessage], tools: &[Tool]) -> Result<Completion, AiError> {
        let body = self.build_request_body(messages, tools);

        debug!(model = %self.model, messages = messages.len(), "chat completion request");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(AiError::Api(format!("HTTP {status}: {text}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        parse_response(&json)
    }
}
