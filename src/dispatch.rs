use serde::{Deserialize, Serialize};

use crate::line::{HelpEntry, Line, LineKind, StructuredContent};
use crate::scroll::ScrollController;
use crate::state::{Action, Store, is_local_command};
use crate::transport::TransportEvent;

/// Longest chat message the server accepts, in characters.
pub const MESSAGE_LIMIT: usize = 500;

/// Frame sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    pub command: String,
    pub payload: String,
}

impl Outbound {
    pub fn new(command: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: payload.into(),
        }
    }
}

/// Connection to the chat backend as seen by the dispatcher.
pub trait Transport {
    fn connect(&mut self);
    fn disconnect(&mut self);
    /// Returns false when the frame could not be handed to an open socket.
    fn send_message(&mut self, message: &Outbound) -> bool;
    fn is_connected(&self) -> bool;
    /// Connection events that arrived since the last call, oldest first.
    fn drain_events(&mut self, max_events: usize) -> Vec<TransportEvent>;
}

/// Work a local command leaves for the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEffect {
    Reload,
    Quit,
}

/// Characters counted against [`MESSAGE_LIMIT`], or `None` when the input
/// is a command that is not limited.
pub fn budgeted_length(input: &str) -> Option<usize> {
    let mut tokens = input.split(' ');
    match tokens.next() {
        Some("/say") => match tokens.next() {
            Some(channel) if channel.starts_with('#') => {
                let prefix = "/say ".len() + channel.len() + 1;
                Some(input.get(prefix..).unwrap_or_default().chars().count())
            }
            _ => Some(input.chars().count()),
        },
        Some(first) if first.starts_with('/') => None,
        _ => Some(input.chars().count()),
    }
}

/// Everything a submitted command may touch.
pub struct CommandContext<'a> {
    pub store: &'a mut Store,
    pub scroll: &'a mut ScrollController,
    pub transport: &'a mut dyn Transport,
}

impl CommandContext<'_> {
    fn add_line(&mut self, line: Line) {
        self.scroll.receive_line(self.store, line);
    }

    /// Validates, echoes and executes one line of user input.
    pub fn submit(&mut self, input: &str) -> Option<LocalEffect> {
        if input.trim().is_empty() {
            return None;
        }
        if let Some(count) = budgeted_length(input)
            && count > MESSAGE_LIMIT
        {
            self.add_line(Line::error(format!(
                "Message exceeds {MESSAGE_LIMIT} characters ({count}/{MESSAGE_LIMIT})"
            )));
            return None;
        }

        self.add_line(Line::text(LineKind::Command, input));
        self.store.dispatch(Action::SetShowSuggestions(false));

        let trimmed = input.trim();
        let mut tokens = trimmed.split(' ');
        let command = tokens.next().unwrap_or_default();
        let args = tokens.collect::<Vec<_>>();
        tracing::debug!(command, args = args.len(), "dispatching input");

        let known = self.store.state().available_commands.contains_key(command);
        let effect = if known && is_local_command(command) {
            self.run_local(command)
        } else {
            self.run_remote(command, &args, input);
            None
        };

        self.store.dispatch(Action::AddToHistory(input.to_string()));
        self.store.dispatch(Action::SetCommand(String::new()));
        effect
    }

    fn run_local(&mut self, command: &str) -> Option<LocalEffect> {
        match command {
            "/help" => {
                let entries = self
                    .store
                    .state()
                    .available_commands
                    .iter()
                    .map(|(name, spec)| HelpEntry {
                        name: name.clone(),
                        params: spec.params.clone(),
                        description: spec.description.clone(),
                    })
                    .collect();
                self.add_line(
                    Line::structured(LineKind::Output, StructuredContent::HelpListing(entries))
                        .ephemeral(),
                );
            }
            "/clear" => {
                self.store.dispatch(Action::ClearLines);
                self.scroll.clear();
                self.add_line(Line::system("Terminal cleared.").ephemeral());
            }
            "/connect" => {
                if self.transport.is_connected() {
                    self.add_line(Line::error("Already connected.").ephemeral());
                } else {
                    self.add_line(Line::system("Connecting to WebSocket...").ephemeral());
                    self.transport.connect();
                }
            }
            "/disconnect" => {
                if self.transport.is_connected() {
                    self.transport.disconnect();
                } else {
                    self.add_line(Line::error("Not connected.").ephemeral());
                }
            }
            "/status" => {
                let status = if self.transport.is_connected() {
                    "Connected"
                } else {
                    "Disconnected"
                };
                self.add_line(Line::system(format!("Connection status: {status}")).ephemeral());
            }
            "/debug" => match serde_json::to_value(self.store.state()) {
                Ok(dump) => self.add_line(
                    Line::structured(LineKind::Output, StructuredContent::StateDump(dump))
                        .ephemeral(),
                ),
                Err(err) => {
                    tracing::warn!(%err, "state dump failed");
                    self.add_line(Line::error(format!("Cannot dump state: {err}")).ephemeral());
                }
            },
            "/refresh" => return Some(LocalEffect::Reload),
            "/quit" => return Some(LocalEffect::Quit),
            other => tracing::warn!(command = other, "local command without handler"),
        }
        None
    }

    fn run_remote(&mut self, command: &str, args: &[&str], text: &str) {
        let active = self.store.state().active_channel.clone();

        if command == "/join"
            && matches!(args.first(), None | Some(&"@"))
            && let Some(channel) = active.as_deref()
        {
            self.add_line(Line::text(LineKind::Join, format!(" -> [{channel}]")));
            self.send_or_report(&Outbound::new("/join", format!("#{channel}")));
            return;
        }

        if command == "/say"
            && let Some(channel) = args.first().and_then(|arg| arg.strip_prefix('#'))
        {
            self.store
                .dispatch(Action::SetActiveChannel(Some(channel.to_string())));
        }

        if !self.transport.is_connected() {
            self.add_line(Line::error(format!(
                "Cannot execute '{command}'. Not connected to a server."
            )));
            return;
        }

        match active {
            Some(channel) if !command.starts_with('/') => {
                let message = Outbound::new("/say", format!("#{channel} {text}"));
                if self.send_or_report(&message) {
                    self.add_line(Line::system(format!("TY -> [{channel}] {text}")));
                }
            }
            _ => {
                self.send_or_report(&Outbound::new(command, args.join(" ")));
            }
        }
    }

    fn send_or_report(&mut self, message: &Outbound) -> bool {
        let sent = self.transport.send_message(message);
        if !sent {
            tracing::warn!(command = %message.command, "send failed, socket not open");
            self.add_line(Line::error("Failed to send command - connection not ready"));
        }
        sent
    }
}

/// Transport double that records every call.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    pub connected: bool,
    pub sent: Vec<Outbound>,
    pub connects: usize,
    pub disconnects: usize,
    pub refuse_sends: bool,
    pub inbox: Vec<TransportEvent>,
}

#[cfg(test)]
impl Transport for RecordingTransport {
    fn connect(&mut self) {
        self.connects += 1;
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn send_message(&mut self, message: &Outbound) -> bool {
        if self.refuse_sends || !self.connected {
            return false;
        }
        self.sent.push(message.clone());
        true
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn drain_events(&mut self, max_events: usize) -> Vec<TransportEvent> {
        let take = max_events.min(self.inbox.len());
        self.inbox.drain(..take).collect()
    }
}

#[cfg(test)]
#[path = "../tests/unit/dispatch_tests.rs"]
mod tests;
