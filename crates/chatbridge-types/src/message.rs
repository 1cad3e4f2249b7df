use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A message as returned by the agent server: metadata plus ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub info: MessageInfo,
    #[serde(default, deserialize_with = "deserialize_parts")]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "sessionID", alias = "sessionId", default)]
    pub session_id: String,
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<MessageTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    #[serde(other)]
    Other,
}

/// One typed fragment of a message.
///
/// Variants the bridge does not render (`step-start`, `reasoning`, ...)
/// collapse into [`Part::Unknown`]. Parts that fail to decode become
/// [`Part::Malformed`], so one bad part never poisons its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        text: String,
    },
    Tool {
        tool: String,
        #[serde(rename = "callID", alias = "callId", default)]
        call_id: String,
        state: ToolState,
    },
    File {
        #[serde(default)]
        filename: String,
        #[serde(default)]
        mime: String,
        #[serde(default)]
        url: String,
    },
    Snapshot {
        snapshot: String,
    },
    Patch {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
        #[serde(default)]
        files: Vec<String>,
    },
    /// A part whose payload did not match its declared shape. `in_flight`
    /// records whether the raw part was a pending or running tool.
    #[serde(skip_deserializing)]
    Malformed { in_flight: bool },
    #[serde(other)]
    Unknown,
}

/// Lifecycle of a tool invocation. Transitions only move forward:
/// `Pending -> Running -> Completed | Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolState {
    Pending,
    Running {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ToolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolState::Completed { .. } | ToolState::Error { .. })
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            ToolState::Pending => "pending",
            ToolState::Running { .. } => "running",
            ToolState::Completed { .. } => "completed",
            ToolState::Error { .. } => "error",
        }
    }
}

impl Part {
    /// Decodes a raw part, falling back to [`Part::Malformed`] when the
    /// payload does not match its declared shape.
    pub fn from_value(value: Value) -> Self {
        let in_flight = raw_tool_in_flight(&value);
        serde_json::from_value(value).unwrap_or(Part::Malformed { in_flight })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn tool(tool: impl Into<String>, call_id: impl Into<String>, state: ToolState) -> Self {
        Part::Tool {
            tool: tool.into(),
            call_id: call_id.into(),
            state,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Part::Tool {
                state: ToolState::Pending | ToolState::Running { .. },
                ..
            } | Part::Malformed { in_flight: true }
        )
    }
}

fn raw_tool_in_flight(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("tool")
        && matches!(
            value.pointer("/state/status").and_then(Value::as_str),
            Some("pending" | "running")
        )
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        role: MessageRole,
        parts: Vec<Part>,
    ) -> Self {
        Self {
            info: MessageInfo {
                id: id.into(),
                session_id: session_id.into(),
                role,
                status: None,
                time: None,
                error: None,
            },
            parts,
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn role(&self) -> MessageRole {
        self.info.role
    }

    /// A message is settled once none of its tool parts is still pending or
    /// running.
    pub fn is_settled(&self) -> bool {
        !self.parts.iter().any(Part::is_in_flight)
    }

    pub fn get_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

fn deserialize_parts<'de, D>(deserializer: D) -> Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Part::from_value)
        .collect())
}
