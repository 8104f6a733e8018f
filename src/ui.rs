use ratatui::prelude::*;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Clear, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, MessageTarget};
use crate::catalog::{Cooldown, GLOBAL_EMOTE_SCOPE, NormalizedCommand, Platform, PlatformCommand};
use crate::dispatch::Transport;
use crate::line::{
    self as chat, ChannelCommandEcho, ChannelPresence, HelpEntry, JoinedChannel, LineContent,
    StructuredContent, UserMessage,
};
use crate::suggest::{Suggestion, SuggestionProps};
use crate::text_layout::{WrappedText, wrap_spans, wrap_word_with_positions};
use crate::theme::{Theme, kind_color, kind_icon, lighten, parse_color};

const HEADER_HEIGHT: u16 = 1;
const STATUS_HEIGHT: u16 = 1;
const MAX_INPUT_TEXT_LINES: u16 = 5;
const MAX_SUGGESTION_ROWS: u16 = 8;
const TEXT_PADDING: u16 = 1;
const GUTTER_WIDTH: u16 = 2;
const PROMPT: &str = "$ ";
const PROMPT_WIDTH: u16 = 2;
const LIGHTEN_PERCENT: u8 = 40;
const ONLINE_FG: Color = Color::Rgb(74, 222, 128);
const OFFLINE_FG: Color = Color::Rgb(248, 113, 113);
const OVER_LIMIT_FG: Color = Color::Rgb(248, 113, 113);
const DESCRIPTION_FG: Color = Color::Rgb(96, 165, 250);
const SELECTED_FG: Color = Color::Black;
const STATUS_HELP_TEXT: &str =
    "Enter send | Tab complete | Up/Down history | PgUp/PgDn scroll | Ctrl+End latest | Ctrl+C quit";

struct ScreenAreas {
    header: Rect,
    messages: Rect,
    input: Rect,
    status: Rect,
}

fn screen_areas<T: Transport>(screen: Rect, app: &App<T>) -> ScreenAreas {
    let [header, body, status] = Layout::vertical([
        Constraint::Length(HEADER_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(screen);
    let wrapped = wrap_word_with_positions(&app.state().command, input_text_width(body.width));
    let (cursor_line, _) = cursor_line_col(&wrapped, app.cursor());
    let max_input_height = body.height.saturating_sub(1).max(1);
    let (input_height, _) = input_box_metrics(wrapped.line_count, cursor_line, max_input_height);
    let [messages, input] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(body);
    ScreenAreas {
        header,
        messages,
        input,
        status,
    }
}

fn input_text_width(width: u16) -> u16 {
    width
        .saturating_sub(TEXT_PADDING * 2 + PROMPT_WIDTH)
        .max(1)
}

fn message_inner(area: Rect) -> Rect {
    area.inner(Margin {
        horizontal: TEXT_PADDING,
        vertical: 0,
    })
}

/// Content height and visible height of the message pane, in wrapped rows.
pub fn message_viewport<T: Transport>(screen: Rect, app: &App<T>, theme: &Theme) -> (usize, usize) {
    let inner = message_inner(screen_areas(screen, app).messages);
    let rows = message_rows(app, theme, inner.width);
    (rows.len(), usize::from(inner.height))
}

/// Index of the suggestion drawn at (`x`, `y`), if any.
pub fn suggestion_hit_test<T: Transport>(screen: Rect, app: &App<T>, x: u16, y: u16) -> Option<usize> {
    let areas = screen_areas(screen, app);
    let (overlay, start) = suggestion_overlay(app, areas.messages, areas.input)?;
    if !point_in_rect(overlay, x, y) {
        return None;
    }
    Some(start + usize::from(y - overlay.y))
}

/// Channel label or author name drawn at (`x`, `y`), if any.
pub fn message_hit_test<T: Transport>(
    screen: Rect,
    app: &App<T>,
    theme: &Theme,
    x: u16,
    y: u16,
) -> Option<MessageTarget> {
    let inner = message_inner(screen_areas(screen, app).messages);
    if !point_in_rect(inner, x, y) {
        return None;
    }
    let rows = message_rows(app, theme, inner.width);
    let top = visible_top(app, rows.len(), inner.height);
    let row = rows.get(top + usize::from(y - inner.y))?;
    let col = x - inner.x;
    row.links
        .iter()
        .find(|link| link.start <= col && col < link.end)
        .map(|link| link.target.clone())
}

pub fn render<T: Transport>(frame: &mut Frame, app: &App<T>, theme: &Theme) {
    let areas = screen_areas(frame.area(), app);
    render_header(frame, areas.header, app, theme);
    render_messages(frame, areas.messages, app, theme);
    render_input(frame, areas.input, app, theme);
    render_status(frame, areas.status, app, theme);
    render_suggestions(frame, app, areas.messages, areas.input, theme);
    render_notification(frame, app, areas.messages, theme);
}

fn render_header<T: Transport>(frame: &mut Frame, area: Rect, app: &App<T>, theme: &Theme) {
    let state = app.state();
    let muted = Style::default().fg(theme.muted_fg);
    let (dot_fg, status) = if app.is_connected() {
        (ONLINE_FG, "online")
    } else {
        (OFFLINE_FG, "offline")
    };
    let mut spans = vec![
        Span::styled(
            " Twitch Multi Chat",
            Style::default()
                .fg(theme.title_fg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("●", Style::default().fg(dot_fg)),
        Span::styled(format!(" {status}"), muted),
    ];
    if let Some(channel) = &state.active_channel {
        spans.push(Span::styled(
            format!("  #{channel}"),
            Style::default().fg(theme.accent_fg),
        ));
    }
    if !state.buffered_lines.is_empty() {
        spans.push(Span::styled(
            format!("  {} unread", state.buffered_lines.len()),
            Style::default()
                .fg(theme.text_fg)
                .add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.header_bg)),
        area,
    );
}

fn visible_top<T: Transport>(app: &App<T>, row_count: usize, height: u16) -> usize {
    app.message_scroll()
        .min(row_count.saturating_sub(usize::from(height)))
}

fn render_messages<T: Transport>(frame: &mut Frame, area: Rect, app: &App<T>, theme: &Theme) {
    frame.render_widget(Block::default().style(Style::default().bg(theme.app_bg)), area);
    let inner = message_inner(area);
    if inner.width < 1 || inner.height < 1 {
        return;
    }
    let rows = message_rows(app, theme, inner.width);
    let top = visible_top(app, rows.len(), inner.height);
    let lines = rows
        .into_iter()
        .skip(top)
        .take(usize::from(inner.height))
        .map(|row| row.line)
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().bg(theme.app_bg).fg(theme.text_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.app_bg))
                    .padding(Padding::horizontal(TEXT_PADDING)),
            ),
        area,
    );
}

fn render_input<T: Transport>(frame: &mut Frame, area: Rect, app: &App<T>, theme: &Theme) {
    let command = &app.state().command;
    let over_limit = app.char_count().is_some_and(|count| count.exceeded());
    let text_fg = if over_limit {
        OVER_LIMIT_FG
    } else {
        theme.text_fg
    };
    let wrapped = wrap_word_with_positions(command, input_text_width(area.width));
    let (cursor_line, cursor_col) = cursor_line_col(&wrapped, app.cursor());
    let (_, input_scroll) = input_box_metrics(wrapped.line_count, cursor_line, area.height);
    let prompt = Span::styled(
        PROMPT,
        Style::default()
            .fg(theme.prompt_fg)
            .add_modifier(Modifier::BOLD),
    );

    let lines = if command.is_empty() {
        vec![Line::from(vec![
            prompt,
            Span::styled(
                app.placeholder().unwrap_or_default(),
                Style::default().fg(theme.muted_fg),
            ),
        ])]
    } else {
        wrapped
            .rendered
            .split('\n')
            .enumerate()
            .map(|(idx, row)| {
                let lead = if idx == 0 {
                    prompt.clone()
                } else {
                    Span::raw(" ".repeat(usize::from(PROMPT_WIDTH)))
                };
                Line::from(vec![lead, Span::styled(row.to_string(), Style::default().fg(text_fg))])
            })
            .collect()
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .style(Style::default().bg(theme.input_bg))
                    .padding(Padding::uniform(TEXT_PADDING)),
            )
            .style(Style::default().bg(theme.input_bg).fg(theme.text_fg))
            .scroll((input_scroll, 0)),
        area,
    );

    let inner = area.inner(Margin {
        horizontal: TEXT_PADDING,
        vertical: TEXT_PADDING,
    });
    if inner.width > PROMPT_WIDTH && inner.height > 0 {
        let visible_cursor_line = cursor_line.saturating_sub(input_scroll);
        if visible_cursor_line < inner.height {
            let max_col = inner.width - PROMPT_WIDTH - 1;
            frame.set_cursor_position((
                inner.x + PROMPT_WIDTH + cursor_col.min(max_col),
                inner.y + visible_cursor_line,
            ));
        }
    }
}

fn render_status<T: Transport>(frame: &mut Frame, area: Rect, app: &App<T>, theme: &Theme) {
    let status = match app.char_count() {
        Some(count) if count.exceeded() => Span::styled(
            format!(" {}/{} characters", count.current, count.max),
            Style::default()
                .fg(OVER_LIMIT_FG)
                .add_modifier(Modifier::BOLD),
        ),
        _ => Span::styled(
            format!(" {STATUS_HELP_TEXT}"),
            Style::default().fg(theme.muted_fg),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::from(status)).style(Style::default().bg(theme.header_bg)),
        area,
    );
}

/// Overlay rectangle above the input and the index of its first row.
fn suggestion_overlay<T: Transport>(
    app: &App<T>,
    messages: Rect,
    input: Rect,
) -> Option<(Rect, usize)> {
    if !app.suggestions_visible() || messages.height == 0 || input.width == 0 {
        return None;
    }
    let state = app.state();
    let total = state.suggestions.len();
    let rows = MAX_SUGGESTION_ROWS
        .min(messages.height)
        .min(u16::try_from(total).unwrap_or(u16::MAX));
    let visible = usize::from(rows);
    let start = (state.active_suggestion_index + 1).saturating_sub(visible);
    let y = input.y.saturating_sub(rows).max(messages.y);
    Some((Rect::new(input.x, y, input.width, rows), start))
}

fn render_suggestions<T: Transport>(
    frame: &mut Frame,
    app: &App<T>,
    messages: Rect,
    input: Rect,
    theme: &Theme,
) {
    let Some((overlay, start)) = suggestion_overlay(app, messages, input) else {
        return;
    };
    let state = app.state();
    let lines = state
        .suggestions
        .iter()
        .enumerate()
        .skip(start)
        .take(usize::from(overlay.height))
        .map(|(idx, suggestion)| {
            suggestion_line(
                suggestion,
                app,
                theme,
                idx == state.active_suggestion_index,
            )
        })
        .collect::<Vec<_>>();

    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.overlay_bg).fg(theme.text_fg))
            .block(
                Block::default()
                    .style(Style::default().bg(theme.overlay_bg))
                    .padding(Padding::horizontal(TEXT_PADDING)),
            ),
        overlay,
    );
}

fn hex_or(value: &str, fallback: Color) -> Color {
    parse_color(value).unwrap_or(fallback)
}

fn suggestion_line<T: Transport>(
    suggestion: &Suggestion,
    app: &App<T>,
    theme: &Theme,
    active: bool,
) -> Line<'static> {
    let selected = Style::default().bg(theme.selected_bg).fg(SELECTED_FG);
    let pick = |style: Style| if active { selected } else { style };
    let text = Style::default().fg(theme.text_fg);
    let muted = Style::default().fg(theme.muted_fg);

    let mut spans = Vec::new();
    match &suggestion.properties {
        SuggestionProps::None => {
            spans.push(Span::styled(suggestion.token.clone(), pick(text)));
            if let Some(spec) = app.state().available_commands.get(&suggestion.token)
                && !spec.description.is_empty()
            {
                spans.push(Span::styled(
                    format!("  {}", spec.description),
                    pick(Style::default().fg(DESCRIPTION_FG)),
                ));
            }
        }
        SuggestionProps::Emote(_) => {
            spans.push(Span::styled(suggestion.token.clone(), pick(text)));
            spans.push(Span::styled("  emote", pick(muted)));
        }
        SuggestionProps::ChannelCommand(command) => {
            spans.push(Span::styled(
                format!("[{}] ", command.platform),
                pick(Style::default().fg(hex_or(command.color(), theme.muted_fg))),
            ));
            spans.push(Span::styled(
                format!("{} ", command.level.label()),
                pick(Style::default().fg(hex_or(command.level.color(), theme.muted_fg))),
            ));
            spans.push(Span::styled(
                suggestion.token.clone(),
                pick(text.add_modifier(Modifier::BOLD)),
            ));
            if !command.aliases.is_empty() {
                spans.push(Span::styled(
                    format!(" ({})", command.aliases.join(", ")),
                    pick(muted),
                ));
            }
            if !command.description.is_empty() {
                spans.push(Span::styled(format!(" - {}", command.description), pick(muted)));
            }
        }
    }
    let line = Line::from(spans);
    if active { line.style(selected) } else { line }
}

fn render_notification<T: Transport>(frame: &mut Frame, app: &App<T>, messages: Rect, theme: &Theme) {
    let Some(notification) = app.current_notification() else {
        return;
    };
    let text_width = u16::try_from(notification.text.width()).unwrap_or(u16::MAX);
    let width = text_width
        .saturating_add(TEXT_PADDING * 4)
        .min(messages.width);
    let height = (1 + TEXT_PADDING * 2).min(messages.height);
    if width == 0 || height == 0 {
        return;
    }
    let area = Rect::new(messages.right() - width, messages.y, width, height);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(notification.text.clone())
            .style(
                Style::default()
                    .bg(theme.overlay_bg)
                    .fg(theme.accent_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .block(
                Block::default()
                    .style(Style::default().bg(theme.overlay_bg))
                    .padding(Padding::symmetric(TEXT_PADDING * 2, TEXT_PADDING)),
            ),
        area,
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    start: u16,
    end: u16,
    target: MessageTarget,
}

/// One painted row of the message pane and the clickable ranges on it.
#[derive(Debug, Clone)]
struct PaneRow {
    line: Line<'static>,
    links: Vec<Link>,
}

impl PaneRow {
    fn plain(line: Line<'static>) -> Self {
        Self {
            line,
            links: Vec::new(),
        }
    }

    /// Makes the first span reading exactly `text` clickable.
    fn link(&mut self, text: &str, target: MessageTarget) {
        let mut col = 0u16;
        for span in &self.line.spans {
            let width = u16::try_from(span.width()).unwrap_or(u16::MAX);
            if span.content == text {
                self.links.push(Link {
                    start: col,
                    end: col.saturating_add(width),
                    target,
                });
                return;
            }
            col = col.saturating_add(width);
        }
    }
}

fn plain_rows(lines: Vec<Line<'static>>) -> Vec<PaneRow> {
    lines.into_iter().map(PaneRow::plain).collect()
}

fn message_rows<T: Transport>(app: &App<T>, theme: &Theme, width: u16) -> Vec<PaneRow> {
    let state = app.state();
    let body_width = width.saturating_sub(GUTTER_WIDTH).max(1);
    let mut rows = Vec::new();
    for (idx, line) in state.displayed_lines.iter().enumerate() {
        if state.unread_marker == Some(idx) {
            rows.push(PaneRow::plain(unread_separator(width, theme)));
        }
        rows.extend(line_rows(line, app, theme, body_width));
    }
    rows
}

fn unread_separator(width: u16, theme: &Theme) -> Line<'static> {
    let label = " new messages ";
    let width = usize::from(width);
    let text = if width >= label.width() + 2 {
        format!("──{label}{}", "─".repeat(width - label.width() - 2))
    } else {
        "─".repeat(width)
    };
    Line::from(Span::styled(text, Style::default().fg(theme.accent_fg)))
}

fn line_rows<T: Transport>(line: &chat::Line, app: &App<T>, theme: &Theme, width: u16) -> Vec<PaneRow> {
    let base = Style::default().fg(kind_color(line.kind).unwrap_or(theme.text_fg));
    let mut in_active_channel = false;
    let mut rows = match &line.content {
        LineContent::Text(text) => plain_rows(wrap_spans(&[Span::styled(text.clone(), base)], width, 0)),
        LineContent::Structured(StructuredContent::UserMessage(message)) => {
            in_active_channel =
                app.state().active_channel.as_deref() == Some(message.channel.as_str());
            user_message_rows(message, app, theme, width)
        }
        LineContent::Structured(StructuredContent::ChannelCommand(echo)) => {
            plain_rows(wrap_spans(&channel_command_spans(echo, theme), width, 0))
        }
        LineContent::Structured(StructuredContent::JoinedChannels(roster)) => {
            joined_channel_rows(roster, theme, width)
        }
        LineContent::Structured(StructuredContent::ChannelJoined(presence)) => {
            plain_rows(wrap_spans(&presence_spans("Joined", presence, base, theme), width, 0))
        }
        LineContent::Structured(StructuredContent::ChannelExited(presence)) => {
            plain_rows(wrap_spans(&presence_spans("Left", presence, base, theme), width, 0))
        }
        LineContent::Structured(StructuredContent::HelpListing(entries)) => {
            help_rows(entries, theme, width)
        }
        LineContent::Structured(StructuredContent::StateDump(dump)) => {
            let pretty = serde_json::to_string_pretty(dump).unwrap_or_else(|_| dump.to_string());
            plain_rows(wrap_spans(
                &[Span::styled(pretty, Style::default().fg(theme.muted_fg))],
                width,
                0,
            ))
        }
    };

    let bar = Span::styled("┃ ", Style::default().fg(theme.accent_fg));
    for (idx, row) in rows.iter_mut().enumerate() {
        let gutter = if in_active_channel {
            bar.clone()
        } else if idx == 0 {
            Span::styled(format!("{} ", kind_icon(line.kind)), base)
        } else {
            Span::raw("  ")
        };
        row.line.spans.insert(0, gutter);
        for link in &mut row.links {
            link.start += GUTTER_WIDTH;
            link.end += GUTTER_WIDTH;
        }
    }
    rows
}

fn user_message_rows<T: Transport>(
    message: &UserMessage,
    app: &App<T>,
    theme: &Theme,
    width: u16,
) -> Vec<PaneRow> {
    let muted = Style::default().fg(theme.muted_fg);
    let channel_label = format!("#{}", message.channel);
    let channel_fg = message
        .channel_color
        .as_deref()
        .and_then(|color| lighten(color, LIGHTEN_PERCENT))
        .unwrap_or(theme.accent_fg);

    let mut header = Vec::new();
    if !message.formatted_time.is_empty() {
        header.push(Span::styled(message.formatted_time.clone(), muted));
        header.push(Span::raw(" "));
    }
    header.push(Span::styled(channel_label.clone(), Style::default().fg(channel_fg)));
    let broadcaster_type = app
        .state()
        .user_data_by_channel
        .get(&message.channel)
        .and_then(|data| data.broadcaster_type.as_deref())
        .filter(|kind| !kind.is_empty());
    if let Some(kind) = broadcaster_type {
        header.push(Span::styled(format!(" ({kind})"), muted));
    }
    let mut rows = plain_rows(wrap_spans(&header, width, 0));
    if let Some(first) = rows.first_mut() {
        first.link(&channel_label, MessageTarget::Channel(message.channel.clone()));
    }

    let name = message.display_name().to_string();
    let name_fg = message
        .name_color()
        .and_then(|color| lighten(color, LIGHTEN_PERCENT))
        .unwrap_or(theme.text_fg);
    let mut body = vec![
        Span::styled(
            name.clone(),
            Style::default().fg(name_fg).add_modifier(Modifier::BOLD),
        ),
        Span::styled(": ", muted),
    ];
    body.extend(message_words(message, app, theme));
    let mut body_rows = plain_rows(wrap_spans(&body, width, 0));
    if let Some(first) = body_rows.first_mut() {
        first.link(
            &name,
            MessageTarget::User {
                channel: message.channel.clone(),
                name: name.clone(),
            },
        );
    }
    rows.extend(body_rows);
    rows
}

fn message_words<T: Transport>(message: &UserMessage, app: &App<T>, theme: &Theme) -> Vec<Span<'static>> {
    let state = app.state();
    let emotes = [message.channel.as_str(), GLOBAL_EMOTE_SCOPE]
        .into_iter()
        .filter_map(|scope| state.available_emotes.get(scope))
        .flatten()
        .map(|emote| emote.code.as_str())
        .collect::<Vec<_>>();
    let text = Style::default().fg(theme.text_fg);

    let mut spans = Vec::new();
    for (idx, word) in message.message_part.split(' ').enumerate() {
        if idx > 0 {
            spans.push(Span::styled(" ", text));
        }
        if word.is_empty() {
            continue;
        }
        let style = if emotes.contains(&word) {
            Style::default()
                .fg(theme.accent_fg)
                .add_modifier(Modifier::ITALIC)
        } else if is_highlighted(word, app.highlight_words()) {
            text.bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
        } else {
            text
        };
        spans.push(Span::styled(word.to_string(), style));
    }
    spans
}

/// Whole-word, case-insensitive match ignoring surrounding punctuation.
fn is_highlighted(word: &str, highlight_words: &[String]) -> bool {
    let core = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    !core.is_empty()
        && highlight_words
            .iter()
            .any(|highlight| highlight.to_lowercase() == core.to_lowercase())
}

fn normalized_echo(echo: &ChannelCommandEcho) -> Option<NormalizedCommand> {
    let platform = Platform::from_key(&echo.platform)?;
    PlatformCommand::from_value(platform, echo.command.clone())
        .ok()?
        .normalize()
}

fn channel_command_spans(echo: &ChannelCommandEcho, theme: &Theme) -> Vec<Span<'static>> {
    let muted = Style::default().fg(theme.muted_fg);
    let Some(command) = normalized_echo(echo) else {
        return vec![Span::styled(echo.command.to_string(), muted)];
    };

    let mut head = command.command_id.clone();
    if !command.aliases.is_empty() {
        head.push_str(&format!(" (aliases: {})", command.aliases.join(", ")));
    }
    let mut spans = vec![Span::styled(
        head,
        Style::default()
            .fg(theme.accent_fg)
            .add_modifier(Modifier::BOLD),
    )];
    if !command.description.is_empty() {
        spans.push(Span::raw("\n"));
        spans.push(Span::styled(
            command.description.clone(),
            Style::default().fg(theme.text_fg),
        ));
    }
    spans.push(Span::styled("\nPlatform: ", muted));
    spans.push(Span::styled(
        command.platform.key(),
        Style::default().fg(hex_or(command.color(), theme.text_fg)),
    ));
    if command.cost > 0 {
        spans.push(Span::styled(format!("\nCost: {}", command.cost), muted));
    }
    match command.cooldown {
        Some(Cooldown::Split { user, global }) => spans.push(Span::styled(
            format!("\nCooldown: user {user}s, global {global}s"),
            muted,
        )),
        Some(Cooldown::Seconds(seconds)) => {
            spans.push(Span::styled(format!("\nCooldown: {seconds}s"), muted));
        }
        None => {}
    }
    spans
}

fn joined_channel_rows(roster: &[JoinedChannel], theme: &Theme, width: u16) -> Vec<PaneRow> {
    if roster.is_empty() {
        return plain_rows(wrap_spans(
            &[Span::styled("No joined channels", Style::default().fg(theme.muted_fg))],
            width,
            0,
        ));
    }
    roster
        .iter()
        .flat_map(|entry| {
            let (fg, live) = if entry.live() {
                (ONLINE_FG, "YES")
            } else {
                (OFFLINE_FG, "NO")
            };
            let spans = [
                Span::styled(entry.channel.clone(), Style::default().fg(theme.text_fg)),
                Span::styled(format!(" - ACTIVE: {live}"), Style::default().fg(fg)),
            ];
            plain_rows(wrap_spans(&spans, width, 0))
        })
        .collect()
}

fn presence_spans(
    verb: &str,
    presence: &ChannelPresence,
    base: Style,
    theme: &Theme,
) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!("{verb} channel "), base),
        Span::styled(presence.channel.clone(), base.add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(
            presence.emote.clone(),
            Style::default()
                .fg(theme.accent_fg)
                .add_modifier(Modifier::ITALIC),
        ),
    ]
}

fn help_rows(entries: &[HelpEntry], theme: &Theme, width: u16) -> Vec<PaneRow> {
    let muted = Style::default().fg(theme.muted_fg);
    let mut rows = plain_rows(wrap_spans(
        &[Span::styled("Available commands:", Style::default().fg(theme.text_fg))],
        width,
        0,
    ));
    for entry in entries {
        let mut spans = vec![Span::styled(
            entry.name.clone(),
            Style::default().fg(theme.prompt_fg),
        )];
        for param in &entry.params {
            spans.push(Span::styled(format!(" <{param}>"), muted));
        }
        spans.push(Span::styled(" - ", muted));
        spans.push(Span::styled(
            entry.description.clone(),
            Style::default().fg(theme.text_fg),
        ));
        rows.extend(plain_rows(wrap_spans(&spans, width, 4)));
    }
    rows
}

fn cursor_line_col(wrapped: &WrappedText, cursor: usize) -> (u16, u16) {
    wrapped
        .positions
        .get(cursor)
        .or_else(|| wrapped.positions.last())
        .copied()
        .unwrap_or((0, 0))
}

fn input_box_metrics(input_text_lines: u16, cursor_line: u16, max_input_height: u16) -> (u16, u16) {
    let capped_text_lines = input_text_lines.clamp(1, MAX_INPUT_TEXT_LINES);
    let desired_height = capped_text_lines.saturating_add(TEXT_PADDING * 2);
    let input_height = desired_height.clamp(1, max_input_height.max(1));
    let visible_text_lines = input_height.saturating_sub(TEXT_PADDING * 2).max(1);
    let max_scroll = input_text_lines.saturating_sub(visible_text_lines);
    let middle_line = visible_text_lines / 2;
    let input_scroll = cursor_line.saturating_sub(middle_line).min(max_scroll);
    (input_height, input_scroll)
}

fn point_in_rect(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
