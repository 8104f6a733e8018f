use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::catalog::{ChannelCommandCatalog, CommandCatalog, CommandSpec, EmoteCatalog, UserData};
use crate::error::ProtocolError;
use crate::line::{
    ChannelCommandEcho, ChannelPresence, JoinedChannel, Line, LineKind, StructuredContent,
    UserMessage,
};
use crate::scroll::ScrollController;
use crate::state::{Action, Store};

pub const JOINED_EMOTE: &str = "peepoClap";
pub const EXITED_EMOTE: &str = "Sadge";

type Handler = fn(&mut Inbound<'_>, Value) -> Result<(), ProtocolError>;

const HANDLERS: [(&str, Handler); 9] = [
    ("user_message", user_message),
    ("join_part", join_part),
    ("available_commands", available_commands),
    ("available_commands_channel", available_commands_channel),
    ("channel_joined", channel_joined),
    ("channel_exited", channel_exited),
    ("available_emotes", available_emotes),
    ("user_data", user_data),
    ("joined_channels", joined_channels),
];

fn handler_for(function: &str) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(name, _)| *name == function)
        .map(|(_, handler)| *handler)
}

/// Applies server frames to the session.
pub struct Inbound<'a> {
    pub store: &'a mut Store,
    pub scroll: &'a mut ScrollController,
}

impl Inbound<'_> {
    fn add_line(&mut self, line: Line) {
        self.scroll.receive_line(self.store, line);
    }

    /// Handles one text frame. Problems with the frame become terminal lines;
    /// nothing here ends the session.
    pub fn handle_text(&mut self, raw: &str) {
        let frame = match serde_json::from_str::<Value>(raw) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "malformed frame");
                let err = ProtocolError::Malformed {
                    raw: raw.to_string(),
                };
                self.add_line(Line::error(err.to_string()));
                return;
            }
        };

        let kind = frame.get("type").and_then(Value::as_str);
        let function = frame
            .get("function")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty());
        match (kind, function) {
            (Some("fncall"), Some(function)) => {
                let function = function.to_string();
                let data = frame.get("data").cloned().unwrap_or(Value::Null);
                self.call(&function, data);
            }
            _ => {
                let kind = LineKind::from_tag(kind.unwrap_or_default());
                self.add_line(Line::text(kind, format!("SERVER -> CLIENT: {frame}")));
            }
        }
    }

    fn call(&mut self, function: &str, data: Value) {
        let Some(handler) = handler_for(function) else {
            tracing::debug!(function, "no handler");
            self.add_line(Line::text(
                LineKind::Warning,
                format!("No handler for function: {function}"),
            ));
            return;
        };
        tracing::trace!(function, "fncall");
        if let Err(err) = handler(self, data) {
            tracing::warn!(%err, "fncall rejected");
            self.add_line(Line::error(err.to_string()));
        }
    }
}

fn decode<T: DeserializeOwned>(function: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidData {
        function: function.to_string(),
        source,
    })
}

fn user_message(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    if data.get("is_channel_command").and_then(Value::as_bool) == Some(true) {
        let echo = ChannelCommandEcho {
            platform: data
                .get("platform")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            command: data.get("command").cloned().unwrap_or(Value::Null),
        };
        inbound.add_line(Line::structured(
            LineKind::Output,
            StructuredContent::ChannelCommand(echo),
        ));
        return Ok(());
    }

    let mut message: UserMessage = decode("user_message", data)?;
    message.message_part = message.message_part.replace('\u{1}', "");
    if let Some(source) = message.tags.source_room_id.as_deref()
        && message.tags.room_id.as_deref() != Some(source)
    {
        tracing::trace!(channel = %message.channel, "dropping shared chat relay");
        return Ok(());
    }
    inbound.add_line(Line::structured(
        LineKind::Output,
        StructuredContent::UserMessage(message),
    ));
    Ok(())
}

#[derive(serde::Deserialize)]
struct JoinPart {
    user: String,
    channel: String,
    #[serde(default)]
    action: String,
}

fn join_part(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let JoinPart {
        user,
        channel,
        action,
    } = decode("join_part", data)?;
    let line = if action == "JOIN" {
        Line::text(LineKind::PlusOne, format!("{user} joined channel {channel}"))
    } else {
        Line::text(LineKind::MinusOne, format!("{user} left channel {channel}"))
    };
    inbound.add_line(line);
    Ok(())
}

fn available_commands(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let described: IndexMap<String, String> = decode("available_commands", data)?;
    let catalog = described
        .into_iter()
        .map(|(name, description)| (name, CommandSpec::new(description)))
        .collect::<CommandCatalog>();
    inbound.store.dispatch(Action::MergeAvailableCommands(catalog));
    Ok(())
}

fn available_commands_channel(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let catalog: ChannelCommandCatalog = decode("available_commands_channel", data)?;
    inbound.store.dispatch(Action::MergeChannelCommands(catalog));
    Ok(())
}

fn channel_joined(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let channel: String = decode("channel_joined", data)?;
    inbound.store.notify(format!("Joined channel {channel}"));
    inbound.add_line(Line::structured(
        LineKind::System,
        StructuredContent::ChannelJoined(ChannelPresence {
            channel,
            emote: JOINED_EMOTE.to_string(),
        }),
    ));
    Ok(())
}

fn channel_exited(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let channel: String = decode("channel_exited", data)?;
    inbound
        .store
        .dispatch(Action::DeleteChannelCommands(channel.clone()));
    inbound.store.dispatch(Action::DeleteUserData(channel.clone()));
    inbound.store.notify(format!("Left channel {channel}"));
    inbound.add_line(Line::structured(
        LineKind::System,
        StructuredContent::ChannelExited(ChannelPresence {
            channel,
            emote: EXITED_EMOTE.to_string(),
        }),
    ));
    Ok(())
}

fn available_emotes(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let emotes: EmoteCatalog = decode("available_emotes", data)?;
    inbound.store.dispatch(Action::MergeEmotes(emotes));
    Ok(())
}

fn user_data(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let users: IndexMap<String, UserData> = decode("user_data", data)?;
    inbound.store.dispatch(Action::MergeUserData(users));
    Ok(())
}

fn joined_channels(inbound: &mut Inbound<'_>, data: Value) -> Result<(), ProtocolError> {
    let roster: Vec<JoinedChannel> = decode("joined_channels", data)?;
    inbound.add_line(Line::structured(
        LineKind::System,
        StructuredContent::JoinedChannels(roster),
    ));
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/protocol_tests.rs"]
mod tests;
