use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::{
    ChannelCommandCatalog, CommandCatalog, CommandSpec, EmoteCatalog, GLOBAL_EMOTE_SCOPE,
    UserData,
};
use crate::history_store::LineHistory;
use crate::line::Line;
use crate::suggest::Suggestion;

/// Lines shown when a session starts; older lines load on upward scroll.
pub const INITIAL_DISPLAY_LINES: usize = 30;

/// Commands handled without a server. Anything else in the global catalog
/// came from the server and is dropped when the connection closes.
pub const LOCAL_COMMANDS: [(&str, &str); 8] = [
    ("/debug", "Shows state Object."),
    ("/help", "Shows this help message."),
    ("/clear", "Clears the terminal screen."),
    ("/connect", "Connects to the mock server."),
    ("/disconnect", "Closes the server connection."),
    ("/status", "Checks the connection status."),
    ("/refresh", "Press da F5!"),
    ("/quit", "Leaves the terminal."),
];

pub fn local_commands() -> CommandCatalog {
    LOCAL_COMMANDS
        .iter()
        .map(|(name, description)| (name.to_string(), CommandSpec::new(*description)))
        .collect()
}

pub fn is_local_command(name: &str) -> bool {
    LOCAL_COMMANDS.iter().any(|(local, _)| *local == name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TerminalState {
    pub lines: Vec<Line>,
    pub displayed_lines: Vec<Line>,
    pub buffered_lines: Vec<Line>,
    /// Start of the last flushed block in `displayed_lines`.
    pub unread_marker: Option<usize>,
    pub is_scrolled_to_bottom: bool,
    pub command: String,
    /// Most recent first.
    pub command_history: Vec<String>,
    pub history_index: Option<usize>,
    pub available_commands: CommandCatalog,
    pub available_commands_channel: ChannelCommandCatalog,
    pub available_emotes: EmoteCatalog,
    pub user_data_by_channel: IndexMap<String, UserData>,
    pub suggestions: Vec<Suggestion>,
    pub active_suggestion_index: usize,
    pub show_suggestions: bool,
    pub active_channel: Option<String>,
    pub notifications: Vec<Notification>,
}

impl Default for TerminalState {
    fn default() -> Self {
        let mut available_emotes = EmoteCatalog::new();
        available_emotes.insert(GLOBAL_EMOTE_SCOPE.to_string(), Vec::new());
        Self {
            lines: Vec::new(),
            displayed_lines: Vec::new(),
            buffered_lines: Vec::new(),
            unread_marker: None,
            is_scrolled_to_bottom: true,
            command: String::new(),
            command_history: Vec::new(),
            history_index: None,
            available_commands: local_commands(),
            available_commands_channel: ChannelCommandCatalog::new(),
            available_emotes,
            user_data_by_channel: IndexMap::new(),
            suggestions: Vec::new(),
            active_suggestion_index: 0,
            show_suggestions: false,
            active_channel: None,
            notifications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    AddLine(Line),
    ClearLines,
    SetDisplayedLines(Vec<Line>),
    AppendDisplayed(Line),
    AddBufferedLine(Line),
    ClearBufferedLines,
    FlushBuffered,
    PrependLines(Vec<Line>),
    SetScrolledToBottom(bool),
    SetCommand(String),
    AddToHistory(String),
    SetHistoryIndex(Option<usize>),
    SetSuggestions(Vec<Suggestion>),
    SetActiveSuggestion(usize),
    SetShowSuggestions(bool),
    SetAvailableCommands(CommandCatalog),
    MergeAvailableCommands(CommandCatalog),
    MergeChannelCommands(ChannelCommandCatalog),
    DeleteChannelCommands(String),
    MergeEmotes(EmoteCatalog),
    MergeUserData(IndexMap<String, UserData>),
    DeleteUserData(String),
    SetActiveChannel(Option<String>),
    AddNotification(Notification),
    RemoveNotification(u64),
}

impl Action {
    fn touches_history(&self) -> bool {
        matches!(self, Self::AddLine(_) | Self::ClearLines)
    }
}

impl TerminalState {
    /// Fresh state over a loaded history, displaying only its newest lines.
    pub fn hydrated(lines: Vec<Line>) -> Self {
        let start = lines.len().saturating_sub(INITIAL_DISPLAY_LINES);
        let window = lines[start..].to_vec();
        reduce(
            Self {
                lines,
                ..Self::default()
            },
            Action::SetDisplayedLines(window),
        )
    }

    /// Lines older than the displayed window that have not been loaded yet.
    /// Buffered lines sit at the tail of `lines` and are not counted.
    pub fn hidden_line_count(&self) -> usize {
        self.lines
            .len()
            .saturating_sub(self.displayed_lines.len() + self.buffered_lines.len())
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::AddLine(line) => self.lines.push(line),
            Action::ClearLines => {
                self.lines.clear();
                self.displayed_lines.clear();
                self.buffered_lines.clear();
                self.unread_marker = None;
            }
            Action::SetDisplayedLines(lines) => {
                self.displayed_lines = lines;
                self.unread_marker = None;
            }
            Action::AppendDisplayed(line) => self.displayed_lines.push(line),
            Action::AddBufferedLine(line) => self.buffered_lines.push(line),
            Action::ClearBufferedLines => self.buffered_lines.clear(),
            Action::FlushBuffered => {
                if !self.buffered_lines.is_empty() {
                    self.unread_marker = Some(self.displayed_lines.len());
                    self.displayed_lines.append(&mut self.buffered_lines);
                }
            }
            Action::PrependLines(mut lines) => {
                let added = lines.len();
                lines.append(&mut self.displayed_lines);
                self.displayed_lines = lines;
                self.unread_marker = self.unread_marker.map(|marker| marker + added);
            }
            Action::SetScrolledToBottom(at_bottom) => self.is_scrolled_to_bottom = at_bottom,
            Action::SetCommand(command) => self.command = command,
            Action::AddToHistory(command) => {
                self.command_history.insert(0, command);
                self.history_index = None;
            }
            Action::SetHistoryIndex(index) => {
                self.history_index = index.filter(|i| *i < self.command_history.len());
            }
            Action::SetSuggestions(suggestions) => {
                self.suggestions = suggestions;
                self.active_suggestion_index = 0;
            }
            Action::SetActiveSuggestion(index) => {
                if index < self.suggestions.len() {
                    self.active_suggestion_index = index;
                }
            }
            Action::SetShowSuggestions(show) => self.show_suggestions = show,
            Action::SetAvailableCommands(commands) => self.available_commands = commands,
            Action::MergeAvailableCommands(commands) => self.available_commands.extend(commands),
            Action::MergeChannelCommands(commands) => {
                self.available_commands_channel.extend(commands)
            }
            Action::DeleteChannelCommands(channel) => {
                self.available_commands_channel.shift_remove(&channel);
            }
            Action::MergeEmotes(emotes) => {
                self.available_emotes.extend(emotes);
                self.available_emotes
                    .entry(GLOBAL_EMOTE_SCOPE.to_string())
                    .or_default();
            }
            Action::MergeUserData(data) => self.user_data_by_channel.extend(data),
            Action::DeleteUserData(channel) => {
                self.user_data_by_channel.shift_remove(&channel);
            }
            Action::SetActiveChannel(channel) => self.active_channel = channel,
            Action::AddNotification(notification) => self.notifications.push(notification),
            Action::RemoveNotification(id) => self.notifications.retain(|n| n.id != id),
        }
    }
}

/// Pure form of [`TerminalState::apply`].
pub fn reduce(mut state: TerminalState, action: Action) -> TerminalState {
    state.apply(action);
    state
}

/// Owns the session state and writes the full history to storage whenever
/// it changes.
#[derive(Debug)]
pub struct Store {
    state: TerminalState,
    history: Box<dyn LineHistory>,
    notification_seq: u64,
}

impl Store {
    pub fn hydrate(history: Box<dyn LineHistory>) -> Self {
        let state = TerminalState::hydrated(history.load());
        tracing::debug!(lines = state.lines.len(), "hydrated terminal history");
        Self {
            state,
            history,
            notification_seq: 0,
        }
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        let persist = action.touches_history();
        self.state.apply(action);
        if persist {
            self.history.save(&self.state.lines);
        }
    }

    /// Queues a notification under a fresh id and returns the id.
    pub fn notify(&mut self, text: impl Into<String>) -> u64 {
        self.notification_seq += 1;
        let id = self.notification_seq;
        self.dispatch(Action::AddNotification(Notification {
            id,
            text: text.into(),
        }));
        id
    }

    /// Discards the session and starts over from storage.
    pub fn rehydrate(&mut self) {
        self.state = TerminalState::hydrated(self.history.load());
    }

    pub fn persist(&mut self) {
        self.history.save(&self.state.lines);
    }
}

#[cfg(test)]
#[path = "../tests/unit/state_tests.rs"]
mod tests;
