use std::time::{Duration, Instant};

use crate::dispatch::{CommandContext, LocalEffect, MESSAGE_LIMIT, Transport, budgeted_length};
use crate::line::{Line, LineKind};
use crate::protocol::Inbound;
use crate::scroll::ScrollController;
use crate::state::{Action, Notification, Store, TerminalState, is_local_command};
use crate::suggest::{apply_suggestion, compute_suggestions};
use crate::transport::TransportEvent;

pub const MAX_TRANSPORT_EVENTS_PER_LOOP: usize = 128;
const WHEEL_ROWS: isize = 3;
const LONG_NOTIFICATION: Duration = Duration::from_secs(5);
const SHORT_NOTIFICATION: Duration = Duration::from_secs(1);
const LONG_NOTIFICATIONS_PER_BURST: usize = 5;

/// Characters of the draft counted against the message limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCount {
    pub current: usize,
    pub max: usize,
}

impl CharCount {
    pub fn exceeded(&self) -> bool {
        self.current > self.max
    }
}

/// Clickable part of a rendered chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    Channel(String),
    User { channel: String, name: String },
}

/// Shows the oldest notification until its time runs out. The first few of
/// a burst stay longer; the burst ends when the queue drains.
#[derive(Debug, Default)]
struct Carousel {
    showing: Option<(u64, Instant)>,
    shown_in_burst: usize,
}

impl Carousel {
    fn advance(&mut self, store: &mut Store, now: Instant) {
        if let Some((id, until)) = self.showing {
            let queued = store.state().notifications.iter().any(|n| n.id == id);
            if !queued {
                self.showing = None;
            } else if now >= until {
                store.dispatch(Action::RemoveNotification(id));
                self.showing = None;
            }
        }
        if self.showing.is_some() {
            return;
        }
        match store.state().notifications.first() {
            Some(front) => {
                let duration = if self.shown_in_burst < LONG_NOTIFICATIONS_PER_BURST {
                    LONG_NOTIFICATION
                } else {
                    SHORT_NOTIFICATION
                };
                self.shown_in_burst += 1;
                self.showing = Some((front.id, now + duration));
            }
            None => self.shown_in_burst = 0,
        }
    }
}

/// Session shell: owns the store, the scroll controller and the transport,
/// and turns input events into actions.
#[derive(Debug)]
pub struct App<T: Transport> {
    pub running: bool,
    store: Store,
    scroll: ScrollController,
    transport: T,
    cursor: usize,
    carousel: Carousel,
    highlight_words: Vec<String>,
    message_scroll: usize,
}

impl<T: Transport> App<T> {
    pub fn new(
        store: Store,
        scroll: ScrollController,
        transport: T,
        highlight_words: Vec<String>,
    ) -> Self {
        Self {
            running: true,
            store,
            scroll,
            transport,
            cursor: 0,
            carousel: Carousel::default(),
            highlight_words,
            message_scroll: 0,
        }
    }

    pub fn state(&self) -> &TerminalState {
        self.store.state()
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn highlight_words(&self) -> &[String] {
        &self.highlight_words
    }

    /// First row of the message pane to paint.
    pub fn message_scroll(&self) -> usize {
        self.message_scroll
    }

    /// Cursor position in chars within the draft.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn quit(&mut self) {
        self.scroll.clear();
        self.running = false;
    }

    /// Applies the launch channel and connects when asked to.
    pub fn start(&mut self, channel: Option<String>, auto_connect: bool) {
        let connect = auto_connect || channel.is_some();
        if let Some(channel) = channel {
            tracing::info!(%channel, "starting with active channel");
            self.store.dispatch(Action::SetActiveChannel(Some(channel)));
        }
        if connect {
            self.receive(Line::system("Connecting to WebSocket...").ephemeral());
            self.transport.connect();
        }
    }

    fn receive(&mut self, line: Line) {
        self.scroll.receive_line(&mut self.store, line);
    }

    pub fn suggestions_visible(&self) -> bool {
        let state = self.store.state();
        state.show_suggestions && !state.suggestions.is_empty()
    }

    pub fn current_notification(&self) -> Option<&Notification> {
        self.store.state().notifications.first()
    }

    pub fn placeholder(&self) -> Option<String> {
        self.store
            .state()
            .active_channel
            .as_ref()
            .map(|channel| format!("Active channel: {channel}"))
    }

    pub fn char_count(&self) -> Option<CharCount> {
        budgeted_length(&self.store.state().command).map(|current| CharCount {
            current,
            max: MESSAGE_LIMIT,
        })
    }

    fn on_input_change(&mut self, value: String) {
        self.store.dispatch(Action::SetCommand(value));
        let suggestions = {
            let state = self.store.state();
            compute_suggestions(&state.command, state)
        };
        match suggestions {
            None => self.store.dispatch(Action::SetShowSuggestions(false)),
            Some(list) => {
                self.store
                    .dispatch(Action::SetShowSuggestions(!list.is_empty()));
                self.store.dispatch(Action::SetSuggestions(list));
            }
        }
    }

    /// Replaces the draft without recomputing suggestions.
    fn replace_command(&mut self, value: String) {
        self.cursor = value.chars().count();
        self.store.dispatch(Action::SetCommand(value));
    }

    pub fn input_char(&mut self, c: char) {
        let mut value = self.store.state().command.clone();
        value.insert(char_to_byte_idx(&value, self.cursor), c);
        self.cursor += 1;
        self.on_input_change(value);
    }

    pub fn backspace_input(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut value = self.store.state().command.clone();
        let start = char_to_byte_idx(&value, self.cursor - 1);
        let end = char_to_byte_idx(&value, self.cursor);
        value.drain(start..end);
        self.cursor -= 1;
        self.on_input_change(value);
    }

    pub fn delete_input(&mut self) {
        let mut value = self.store.state().command.clone();
        if self.cursor >= value.chars().count() {
            return;
        }
        let start = char_to_byte_idx(&value, self.cursor);
        let end = char_to_byte_idx(&value, self.cursor + 1);
        value.drain(start..end);
        self.on_input_change(value);
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        let len = self.store.state().command.chars().count();
        self.cursor = (self.cursor + 1).min(len);
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.store.state().command.chars().count();
    }

    /// Up arrow: previous suggestion while the panel is open, otherwise an
    /// older history entry.
    pub fn move_up(&mut self) {
        if self.suggestions_visible() {
            let state = self.store.state();
            let n = state.suggestions.len();
            let index = (state.active_suggestion_index + n - 1) % n;
            self.store.dispatch(Action::SetActiveSuggestion(index));
            return;
        }
        let state = self.store.state();
        let next = state.history_index.map_or(0, |index| index + 1);
        if let Some(entry) = state.command_history.get(next).cloned() {
            self.store.dispatch(Action::SetHistoryIndex(Some(next)));
            self.replace_command(entry);
        }
    }

    /// Down arrow: next suggestion while the panel is open, otherwise a
    /// newer history entry, ending on an empty draft.
    pub fn move_down(&mut self) {
        if self.suggestions_visible() {
            let state = self.store.state();
            let index = (state.active_suggestion_index + 1) % state.suggestions.len();
            self.store.dispatch(Action::SetActiveSuggestion(index));
            return;
        }
        match self.store.state().history_index {
            Some(index) if index > 0 => {
                let entry = self.store.state().command_history[index - 1].clone();
                self.store.dispatch(Action::SetHistoryIndex(Some(index - 1)));
                self.replace_command(entry);
            }
            _ => {
                self.store.dispatch(Action::SetHistoryIndex(None));
                self.replace_command(String::new());
            }
        }
    }

    pub fn complete(&mut self) {
        if self.suggestions_visible() {
            self.commit_suggestion(self.store.state().active_suggestion_index);
        }
    }

    pub fn dismiss(&mut self) {
        self.store.dispatch(Action::SetShowSuggestions(false));
    }

    /// Replaces the last token of the draft with suggestion `index`.
    pub fn commit_suggestion(&mut self, index: usize) {
        let state = self.store.state();
        let Some(suggestion) = state.suggestions.get(index) else {
            return;
        };
        let value = apply_suggestion(&state.command, &suggestion.token);
        self.replace_command(value);
        self.store.dispatch(Action::SetShowSuggestions(false));
    }

    /// Enter: commits the highlighted suggestion, or submits the draft.
    pub fn submit(&mut self) {
        if self.suggestions_visible() {
            self.complete();
            return;
        }
        let input = self.store.state().command.clone();
        let effect = CommandContext {
            store: &mut self.store,
            scroll: &mut self.scroll,
            transport: &mut self.transport,
        }
        .submit(&input);
        self.cursor = self
            .cursor
            .min(self.store.state().command.chars().count());
        match effect {
            Some(LocalEffect::Reload) => self.reload(),
            Some(LocalEffect::Quit) => self.quit(),
            None => {}
        }
    }

    /// Starts the session over from storage and reopens a live connection.
    pub fn reload(&mut self) {
        let reconnect = self.transport.is_connected();
        tracing::info!(reconnect, "reloading session");
        self.store.rehydrate();
        self.scroll.clear();
        self.carousel = Carousel::default();
        self.cursor = 0;
        if reconnect {
            self.transport.connect();
        }
    }

    pub fn click_message(&mut self, target: MessageTarget) {
        match target {
            MessageTarget::Channel(channel) => {
                self.replace_command(format!("/say #{channel} "));
            }
            MessageTarget::User { channel, name } => {
                let mention = format!("@{name}");
                let command = &self.store.state().command;
                if command.starts_with(&format!("/say #{channel}")) {
                    if !command.contains(&mention) {
                        let value = format!("{command}{mention} ");
                        self.replace_command(value);
                    }
                } else {
                    self.replace_command(format!("/say #{channel} {mention} "));
                }
            }
        }
    }

    pub fn scroll_lines(&mut self, delta: isize, now: Instant) {
        self.scroll.scroll_by(delta, now);
    }

    pub fn wheel_up(&mut self, now: Instant) {
        self.scroll_lines(-WHEEL_ROWS, now);
    }

    pub fn wheel_down(&mut self, now: Instant) {
        self.scroll_lines(WHEEL_ROWS, now);
    }

    fn page_rows(&self) -> isize {
        self.scroll.viewport().client_height.max(1) as isize
    }

    pub fn page_up(&mut self, now: Instant) {
        self.scroll_lines(-self.page_rows(), now);
    }

    pub fn page_down(&mut self, now: Instant) {
        self.scroll_lines(self.page_rows(), now);
    }

    pub fn jump_to_bottom(&mut self, now: Instant) {
        self.scroll.scroll_to_bottom(now);
    }

    /// Layout pass for the message pane, measured in wrapped rows.
    pub fn layout(&mut self, scroll_height: usize, client_height: usize) -> usize {
        let at_bottom = self.store.state().is_scrolled_to_bottom;
        self.message_scroll = self
            .scroll
            .after_layout(scroll_height, client_height, at_bottom);
        self.message_scroll
    }

    /// Runs due timers: scroll evaluation and the notification carousel.
    pub fn tick(&mut self, now: Instant) {
        self.scroll.poll(&mut self.store, now);
        self.carousel.advance(&mut self.store, now);
    }

    /// Handles queued transport events. Returns how many were handled.
    pub fn pump_transport(&mut self) -> usize {
        let events = self.transport.drain_events(MAX_TRANSPORT_EVENTS_PER_LOOP);
        let count = events.len();
        for event in events {
            self.handle_transport_event(event);
        }
        count
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                self.receive(Line::text(
                    LineKind::Success,
                    "WebSocket connection established",
                ));
            }
            TransportEvent::Message(text) => {
                Inbound {
                    store: &mut self.store,
                    scroll: &mut self.scroll,
                }
                .handle_text(&text);
            }
            TransportEvent::Closed { code, reason } => {
                tracing::debug!(code, "connection closed");
                let reason = if reason.is_empty() {
                    "Unknown reason".to_string()
                } else {
                    reason
                };
                self.receive(Line::system(format!("WebSocket connection closed: {reason}")));
                let local = self
                    .state()
                    .available_commands
                    .iter()
                    .filter(|(name, _)| is_local_command(name))
                    .map(|(name, command)| (name.clone(), command.clone()))
                    .collect();
                self.store.dispatch(Action::SetAvailableCommands(local));
            }
            TransportEvent::Error(message) => {
                self.receive(Line::error(format!("WebSocket error: {message}")));
            }
            TransportEvent::Reconnecting { attempt, delay } => {
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                self.receive(
                    Line::text(
                        LineKind::Info,
                        format!(
                            "Reconnecting in {:.1}s (attempt {attempt})",
                            delay.as_secs_f32()
                        ),
                    )
                    .ephemeral(),
                );
            }
        }
    }

    /// Writes the full history once more, for shutdown.
    pub fn persist(&mut self) {
        self.store.persist();
    }
}

fn char_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

#[cfg(test)]
#[path = "../tests/unit/app_tests.rs"]
mod tests;
