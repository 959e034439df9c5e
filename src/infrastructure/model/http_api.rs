//! HTTP model client implementation.
//!
//! Makes direct HTTP calls to an OpenAI-style chat-completions endpoint.
//! Handoffs are surfaced to the model as synthetic `transfer_to_<agent>`
//! tools, so one wire protocol carries tool calls, handoffs, and messages.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::models::{ModelConfig, TurnRole, TurnSignal};
use crate::domain::ports::{ModelClient, ModelError, ModelRequest, ModelTurn, TurnAction};
use crate::infrastructure::model::retry::RetryPolicy;

/// Prefix for the synthetic tools that carry handoff directives.
const TRANSFER_PREFIX: &str = "transfer_to_";

/// Chat message on the wire.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OutboundToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool call echoed back to the model as part of an exchange replay.
#[derive(Debug, Serialize)]
struct OutboundToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: OutboundFunction,
}

#[derive(Debug, Serialize)]
struct OutboundFunction {
    name: String,
    /// JSON-encoded argument object, per the wire format.
    arguments: String,
}

/// Tool definition offered to the model.
#[derive(Debug, Serialize)]
struct ToolDef {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionDef,
}

#[derive(Debug, Serialize)]
struct FunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

/// Request to the chat-completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDef>,
}

/// Response from the chat-completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<InboundToolCall>,
}

#[derive(Debug, Deserialize)]
struct InboundToolCall {
    function: InboundFunction,
}

#[derive(Debug, Deserialize)]
struct InboundFunction {
    name: String,
    arguments: String,
}

/// Structured final-message envelope for signal-contracted agents.
#[derive(Debug, Deserialize)]
struct SignalEnvelope {
    text: String,
    signal: String,
    #[serde(default)]
    feedback: Option<String>,
}

/// Model client speaking the chat-completions wire protocol.
pub struct HttpModelClient {
    client: Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    retry: RetryPolicy,
}

impl HttpModelClient {
    /// Create a new HTTP model client.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Http` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ModelConfig, retry: RetryPolicy) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: config.name.clone(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
            retry,
        })
    }

    /// API key from config or environment, resolved at call time.
    fn resolve_api_key(&self) -> Result<String, ModelError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .ok_or_else(|| ModelError::MissingApiKey(self.api_key_env.clone()))
    }

    /// System prompt: instructions plus the handoff and signal directives.
    fn build_system_prompt(request: &ModelRequest) -> String {
        let mut prompt = request.instructions.clone();

        if !request.handoffs.is_empty() {
            prompt.push_str(
                "\n\nTo transfer the conversation to another agent, call the matching \
                 transfer tool. Available transfers: ",
            );
            let transfers: Vec<String> = request
                .handoffs
                .iter()
                .map(|target| format!("{TRANSFER_PREFIX}{target}"))
                .collect();
            prompt.push_str(&transfers.join(", "));
            prompt.push('.');
        }

        if request.expects_signal {
            prompt.push_str(
                "\n\nWhen you respond with a message, respond with exactly one JSON object \
                 and nothing else: {\"text\": <your message>, \"signal\": \"continue\" | \
                 \"done\" | \"approved\" | \"changes_requested\", \"feedback\": <what to \
                 change; required when signal is changes_requested>}.",
            );
        }

        prompt
    }

    /// Conversation payload: system prompt, history, input, tool exchanges.
    fn build_messages(request: &ModelRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::text(
            "system",
            Self::build_system_prompt(request),
        )];

        for turn in &request.history {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Agent(_) => "assistant",
            };
            messages.push(ChatMessage::text(role, turn.text.clone()));
        }

        messages.push(ChatMessage::text("user", request.input.clone()));

        for (index, exchange) in request.exchanges.iter().enumerate() {
            let call_id = format!("call_{index}");
            messages.push(ChatMessage {
                role: "assistant",
                content: None,
                tool_calls: Some(vec![OutboundToolCall {
                    id: call_id.clone(),
                    call_type: "function",
                    function: OutboundFunction {
                        name: exchange.tool.clone(),
                        arguments: exchange.arguments.to_string(),
                    },
                }]),
                tool_call_id: None,
            });
            messages.push(ChatMessage {
                role: "tool",
                content: Some(exchange.output.to_string()),
                tool_calls: None,
                tool_call_id: Some(call_id),
            });
        }

        messages
    }

    /// Tool definitions: the agent's allowlisted tools plus one synthetic
    /// transfer tool per declared handoff target.
    fn build_tools(request: &ModelRequest) -> Vec<ToolDef> {
        let mut tools: Vec<ToolDef> = request
            .tools
            .iter()
            .map(|schema| ToolDef {
                tool_type: "function",
                function: FunctionDef {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.parameters.clone(),
                },
            })
            .collect();

        for target in &request.handoffs {
            tools.push(ToolDef {
                tool_type: "function",
                function: FunctionDef {
                    name: format!("{TRANSFER_PREFIX}{target}"),
                    description: format!("Transfer the conversation to the {target} agent."),
                    parameters: serde_json::json!({
                        "type": "object",
                        "properties": {},
                        "additionalProperties": false
                    }),
                },
            });
        }

        tools
    }

    /// Parse a signal-contracted final message.
    fn parse_signal_message(content: &str) -> Result<(String, TurnSignal), ModelError> {
        let envelope: SignalEnvelope = serde_json::from_str(content.trim()).map_err(|e| {
            ModelError::SchemaViolation(format!("expected signal envelope, got invalid JSON: {e}"))
        })?;

        let signal = match envelope.signal.as_str() {
            "continue" => TurnSignal::Continue,
            "done" => TurnSignal::Done,
            "approved" => TurnSignal::Approved,
            "changes_requested" => {
                TurnSignal::ChangesRequested(envelope.feedback.unwrap_or_default())
            }
            other => {
                return Err(ModelError::SchemaViolation(format!(
                    "unknown signal value: {other}"
                )))
            }
        };

        Ok((envelope.text, signal))
    }

    /// Translate one wire response into turn actions.
    fn parse_actions(
        message: ResponseMessage,
        expects_signal: bool,
    ) -> Result<ModelTurn, ModelError> {
        let mut actions = Vec::new();

        for call in message.tool_calls {
            if let Some(target) = call.function.name.strip_prefix(TRANSFER_PREFIX) {
                actions.push(TurnAction::Handoff {
                    target: target.to_string(),
                });
            } else {
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        ModelError::SchemaViolation(format!(
                            "tool {} arguments are not valid JSON: {e}",
                            call.function.name
                        ))
                    })?;
                actions.push(TurnAction::ToolInvocation {
                    tool: call.function.name,
                    arguments,
                });
            }
        }

        // Content alongside tool calls is commentary; the final message is
        // only the one the model sends without pending calls.
        if actions.is_empty() {
            let content = message
                .content
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| {
                    ModelError::SchemaViolation(
                        "model returned neither content nor tool calls".to_string(),
                    )
                })?;

            let (text, signal) = if expects_signal {
                Self::parse_signal_message(&content)?
            } else {
                (content, TurnSignal::Continue)
            };
            actions.push(TurnAction::Message { text, signal });
        }

        Ok(ModelTurn::new(actions))
    }

    /// One HTTP round, no retries.
    async fn request_once(&self, request: &ModelRequest) -> Result<ModelTurn, ModelError> {
        let api_key = self.resolve_api_key()?;

        let body = ChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(request),
            tools: Self::build_tools(request),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ModelError::Transient(format!("request failed: {e}"))
                } else {
                    ModelError::Http(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Transient(format!("API error {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http(format!("API error {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Http(format!("failed to parse response: {e}")))?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ModelError::SchemaViolation("response carried no choices".to_string())
        })?;

        let turn = Self::parse_actions(choice.message, request.expects_signal)?;
        debug!(
            agent = %request.agent,
            actions = turn.actions.len(),
            "model turn parsed"
        );
        Ok(turn)
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelTurn, ModelError> {
        self.retry
            .execute(|| self.request_once(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Turn;
    use crate::domain::ports::{ToolExchange, ToolSchema};
    use serde_json::json;

    fn request() -> ModelRequest {
        ModelRequest {
            agent: "planner".to_string(),
            instructions: "Plan events.".to_string(),
            tools: vec![ToolSchema {
                name: "today".to_string(),
                description: "Current date.".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
            handoffs: vec!["reviewer".to_string()],
            history: vec![Turn::user("hi")],
            input: "plan dinner".to_string(),
            exchanges: vec![],
            expects_signal: false,
        }
    }

    #[test]
    fn test_system_prompt_lists_transfers() {
        let prompt = HttpModelClient::build_system_prompt(&request());
        assert!(prompt.starts_with("Plan events."));
        assert!(prompt.contains("transfer_to_reviewer"));
        assert!(!prompt.contains("signal"));
    }

    #[test]
    fn test_no_transfer_surface_without_handoffs() {
        let mut req = request();
        req.handoffs.clear();

        let prompt = HttpModelClient::build_system_prompt(&req);
        assert!(!prompt.contains("transfer"));

        let tools = HttpModelClient::build_tools(&req);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "today");
    }

    #[test]
    fn test_system_prompt_signal_directive() {
        let mut req = request();
        req.expects_signal = true;
        let prompt = HttpModelClient::build_system_prompt(&req);
        assert!(prompt.contains("changes_requested"));
    }

    #[test]
    fn test_build_messages_order() {
        let mut req = request();
        req.exchanges.push(ToolExchange {
            tool: "today".to_string(),
            arguments: json!({}),
            output: json!("2026-08-23"),
        });

        let messages = HttpModelClient::build_messages(&req);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content.as_deref(), Some("plan dinner"));
        assert_eq!(messages[3].role, "assistant");
        assert!(messages[3].tool_calls.is_some());
        assert_eq!(messages[4].role, "tool");
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn test_build_tools_appends_transfers() {
        let tools = HttpModelClient::build_tools(&request());
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].function.name, "today");
        assert_eq!(tools[1].function.name, "transfer_to_reviewer");
    }

    #[test]
    fn test_parse_actions_plain_message() {
        let message = ResponseMessage {
            content: Some("Here is the plan.".to_string()),
            tool_calls: vec![],
        };
        let turn = HttpModelClient::parse_actions(message, false).unwrap();
        assert_eq!(
            turn.actions,
            vec![TurnAction::Message {
                text: "Here is the plan.".to_string(),
                signal: TurnSignal::Continue,
            }]
        );
    }

    #[test]
    fn test_parse_actions_tool_and_transfer() {
        let message = ResponseMessage {
            content: Some("thinking out loud".to_string()),
            tool_calls: vec![
                InboundToolCall {
                    function: InboundFunction {
                        name: "today".to_string(),
                        arguments: "{}".to_string(),
                    },
                },
                InboundToolCall {
                    function: InboundFunction {
                        name: "transfer_to_reviewer".to_string(),
                        arguments: "{}".to_string(),
                    },
                },
            ],
        };
        let turn = HttpModelClient::parse_actions(message, false).unwrap();
        assert_eq!(turn.actions.len(), 2);
        assert!(matches!(
            &turn.actions[0],
            TurnAction::ToolInvocation { tool, .. } if tool == "today"
        ));
        assert!(matches!(
            &turn.actions[1],
            TurnAction::Handoff { target } if target == "reviewer"
        ));
    }

    #[test]
    fn test_parse_actions_rejects_empty_turn() {
        let message = ResponseMessage {
            content: Some("   ".to_string()),
            tool_calls: vec![],
        };
        let err = HttpModelClient::parse_actions(message, false).unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(_)));
    }

    #[test]
    fn test_parse_actions_bad_tool_arguments() {
        let message = ResponseMessage {
            content: None,
            tool_calls: vec![InboundToolCall {
                function: InboundFunction {
                    name: "today".to_string(),
                    arguments: "not json".to_string(),
                },
            }],
        };
        let err = HttpModelClient::parse_actions(message, false).unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(msg) if msg.contains("today")));
    }

    #[test]
    fn test_parse_signal_envelope() {
        let (text, signal) = HttpModelClient::parse_signal_message(
            r#"{"text": "Booked.", "signal": "done"}"#,
        )
        .unwrap();
        assert_eq!(text, "Booked.");
        assert_eq!(signal, TurnSignal::Done);
    }

    #[test]
    fn test_parse_signal_envelope_changes_requested() {
        let (_, signal) = HttpModelClient::parse_signal_message(
            r#"{"text": "Not yet.", "signal": "changes_requested", "feedback": "move it to Friday"}"#,
        )
        .unwrap();
        assert_eq!(
            signal,
            TurnSignal::ChangesRequested("move it to Friday".to_string())
        );
    }

    #[test]
    fn test_parse_signal_envelope_rejects_prose() {
        let err = HttpModelClient::parse_signal_message("All done, thanks!").unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(_)));
    }

    #[test]
    fn test_parse_signal_envelope_rejects_unknown_signal() {
        let err = HttpModelClient::parse_signal_message(
            r#"{"text": "?", "signal": "maybe"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(msg) if msg.contains("maybe")));
    }

    #[test]
    fn test_signal_message_applied_when_contracted() {
        let message = ResponseMessage {
            content: Some(r#"{"text": "Event created.", "signal": "done"}"#.to_string()),
            tool_calls: vec![],
        };
        let turn = HttpModelClient::parse_actions(message, true).unwrap();
        assert_eq!(
            turn.actions,
            vec![TurnAction::Message {
                text: "Event created.".to_string(),
                signal: TurnSignal::Done,
            }]
        );
    }
}
