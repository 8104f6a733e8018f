use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visual tag of a terminal line. Unrecognized tags coming from the server
/// map to `Info` through [`LineKind::from_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Success,
    Output,
    Command,
    #[serde(rename = "frontend-error")]
    FrontendError,
    Message,
    System,
    Error,
    Warning,
    Info,
    PlusOne,
    MinusOne,
    Sword,
    Join,
    None,
}

impl LineKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "success" => Self::Success,
            "output" => Self::Output,
            "command" => Self::Command,
            "frontend-error" => Self::FrontendError,
            "message" => Self::Message,
            "system" => Self::System,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "plusone" => Self::PlusOne,
            "minusone" => Self::MinusOne,
            "sword" => Self::Sword,
            "join" => Self::Join,
            "none" => Self::None,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineContent {
    Text(String),
    Structured(StructuredContent),
}

/// Content that is rendered from data instead of a fixed string. The tag
/// selects the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rehydrate_type", content = "rehydrate_data", rename_all = "snake_case")]
pub enum StructuredContent {
    #[serde(rename = "user_message_data")]
    UserMessage(UserMessage),
    ChannelCommand(ChannelCommandEcho),
    #[serde(rename = "joined_channels_data")]
    JoinedChannels(Vec<JoinedChannel>),
    #[serde(rename = "channel_joined_data")]
    ChannelJoined(ChannelPresence),
    #[serde(rename = "channel_exited_data")]
    ChannelExited(ChannelPresence),
    HelpListing(Vec<HelpEntry>),
    StateDump(Value),
}

impl StructuredContent {
    /// Text stored instead of content that only makes sense for the current
    /// session.
    pub fn storage_placeholder(&self) -> Option<&'static str> {
        match self {
            Self::HelpListing(_) => Some("[Component Output]"),
            Self::StateDump(_) => Some("[Dynamic Output]"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub user: String,
    pub channel: String,
    #[serde(default)]
    pub formatted_time: String,
    pub message_part: String,
    #[serde(default)]
    pub channel_color: Option<String>,
    #[serde(default)]
    pub user_color: Option<String>,
    #[serde(default)]
    pub tags: MessageTags,
}

impl UserMessage {
    pub fn display_name(&self) -> &str {
        self.tags
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.user)
    }

    pub fn name_color(&self) -> Option<&str> {
        self.tags
            .color
            .as_deref()
            .filter(|color| !color.is_empty())
            .or(self.user_color.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTags {
    #[serde(rename = "display-name", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "room-id", default)]
    pub room_id: Option<String>,
    #[serde(rename = "source-room-id", default)]
    pub source_room_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCommandEcho {
    pub platform: String,
    pub command: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedChannel {
    pub channel: String,
    #[serde(rename = "isLive", default)]
    pub is_live: String,
}

impl JoinedChannel {
    pub fn live(&self) -> bool {
        self.is_live.eq_ignore_ascii_case("yes")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPresence {
    pub channel: String,
    pub emote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpEntry {
    pub name: String,
    pub params: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub kind: LineKind,
    pub content: LineContent,
    #[serde(default = "persist_by_default")]
    pub persist: bool,
}

fn persist_by_default() -> bool {
    true
}

impl Line {
    pub fn text(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            content: LineContent::Text(text.into()),
            persist: true,
        }
    }

    pub fn structured(kind: LineKind, content: StructuredContent) -> Self {
        Self {
            kind,
            content: LineContent::Structured(content),
            persist: true,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text(LineKind::System, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::text(LineKind::Error, text)
    }

    /// Marks the line as session-only: it is shown but never written to the
    /// history file.
    pub fn ephemeral(mut self) -> Self {
        self.persist = false;
        self
    }

    #[cfg(test)]
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            LineContent::Text(text) => Some(text),
            LineContent::Structured(_) => None,
        }
    }

    /// The form written to durable storage, or `None` when the line is not
    /// persisted at all.
    pub fn storage_form(&self) -> Option<Line> {
        if !self.persist {
            return None;
        }
        match &self.content {
            LineContent::Structured(structured) => match structured.storage_placeholder() {
                Some(placeholder) => Some(Line::text(self.kind, placeholder)),
                None => Some(self.clone()),
            },
            LineContent::Text(_) => Some(self.clone()),
        }
    }
}
