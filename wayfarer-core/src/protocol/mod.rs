//! Message envelope codec for inter-agent traffic.
//!
//! Requests travel as `{"message": {...}}` envelopes carrying the message,
//! task and context identifiers plus ordered content parts. Identifiers are
//! opaque strings and are only ever compared for equality.

mod types;
pub use types::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Path on which agents publish their card.
pub const DISCOVERY_PATH: &str = "/.well-known/agent.json";
/// Path accepting envelope-protocol messages.
pub const MESSAGE_PATH: &str = "/a2a/message";
/// Path of the plain chat fallback.
pub const CHAT_PATH: &str = "/chat";
/// Liveness probe path.
pub const HEALTH_PATH: &str = "/health";

const PART_SEPARATOR: &str = " ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Agent => f.write_str("agent"),
        }
    }
}

/// A recognized content part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
}

/// A decoded or freshly encoded message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    pub task_id: String,
    pub context_id: String,
}

impl Envelope {
    /// Concatenated text of all parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR)
    }

    /// Wire form: the envelope wrapped under a `message` key.
    pub fn to_request(&self) -> MessageRequest {
        MessageRequest {
            message: self.clone(),
        }
    }
}

/// Body POSTed to the message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: Envelope,
}

/// Creates a new envelope with a fresh message id.
pub fn encode(
    role: Role,
    text: impl Into<String>,
    task_id: impl Into<String>,
    context_id: impl Into<String>,
) -> Envelope {
    Envelope {
        role,
        parts: vec![Part::Text { text: text.into() }],
        message_id: Uuid::new_v4().to_string(),
        task_id: task_id.into(),
        context_id: context_id.into(),
    }
}

/// Decodes raw request bytes into an envelope.
pub fn decode(raw: &[u8]) -> Result<Envelope> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| Error::malformed(format!("body is not JSON: {}", e)))?;
    decode_value(&value)
}

/// Decodes an already parsed JSON document. Both the wrapped
/// `{"message": {...}}` form and a bare envelope object are accepted.
pub fn decode_value(value: &Value) -> Result<Envelope> {
    let message = match value.get("message") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };
    if !message.is_object() {
        return Err(Error::malformed("envelope must be a JSON object"));
    }

    let field = |name: &str| -> Result<String> {
        message
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::malformed(format!("missing required field `{}`", name)))
    };

    let role = match field("role")?.as_str() {
        "user" => Role::User,
        "agent" => Role::Agent,
        other => return Err(Error::malformed(format!("unknown role `{}`", other))),
    };
    let message_id = field("messageId")?;
    let task_id = field("taskId")?;
    let context_id = field("contextId")?;

    let raw_parts = message
        .get("parts")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::malformed("missing required field `parts`"))?;
    if raw_parts.is_empty() {
        return Err(Error::malformed("`parts` must not be empty"));
    }

    let mut parts = Vec::with_capacity(raw_parts.len());
    for raw in raw_parts {
        let kind = raw
            .get("type")
            .or_else(|| raw.get("kind"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        match kind {
            "text" => {
                let text = raw
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::malformed("text part without `text`"))?;
                parts.push(Part::Text {
                    text: text.to_string(),
                });
            }
            other => debug!(kind = other, "ignoring unrecognized envelope part"),
        }
    }
    if parts.is_empty() {
        return Err(Error::malformed("no recognized text parts"));
    }

    Ok(Envelope {
        role,
        parts,
        message_id,
        task_id,
        context_id,
    })
}

/// Payload of a successful message-endpoint answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    #[serde(default)]
    pub metadata: Value,
}

/// Body returned by the message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub status: String,
    pub result: ResponseResult,
}

impl MessageResponse {
    pub fn success(request_id: impl Into<String>, content: Value, metadata: Value) -> Self {
        Self {
            id: request_id.into(),
            status: "success".to_string(),
            result: ResponseResult {
                kind: "text".to_string(),
                content,
                metadata,
            },
        }
    }
}

/// Validates a message-endpoint answer against the request it replies to.
pub fn decode_response(raw: &[u8], expected_id: &str) -> Result<MessageResponse> {
    let response: MessageResponse = serde_json::from_slice(raw)
        .map_err(|e| Error::malformed(format!("response does not match envelope shape: {}", e)))?;

    if response.status != "success" {
        return Err(Error::malformed(format!(
            "response status is `{}`",
            response.status
        )));
    }
    if response.id != expected_id {
        return Err(Error::malformed(format!(
            "response id `{}` does not echo message id `{}`",
            response.id, expected_id
        )));
    }
    if response.result.content.is_null() {
        return Err(Error::malformed("response carries no content"));
    }
    Ok(response)
}

/// Body of the plain chat fallback request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Body of the plain chat fallback answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: Value,
}
