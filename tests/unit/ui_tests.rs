use std::time::{Duration, Instant};

use super::*;
use crate::dispatch::RecordingTransport;
use crate::history_store::{INITIALIZED_MESSAGE, MemoryHistory};
use crate::scroll::ScrollController;
use crate::state::Store;
use crate::transport::TransportEvent;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use serde_json::json;

fn app() -> App<RecordingTransport> {
    App::new(
        Store::hydrate(Box::new(MemoryHistory::default())),
        ScrollController::default(),
        RecordingTransport::default(),
        vec!["pog".to_string()],
    )
}

fn draw(app: &mut App<RecordingTransport>, width: u16, height: u16) -> Buffer {
    let theme = Theme::default();
    let screen = Rect::new(0, 0, width, height);
    let (scroll_height, client_height) = message_viewport(screen, app, &theme);
    app.layout(scroll_height, client_height);

    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).expect("test terminal should initialize");
    terminal
        .draw(|frame| render(frame, app, &theme))
        .expect("render should succeed");
    terminal.backend().buffer().clone()
}

fn buffer_rows(buffer: &Buffer) -> Vec<String> {
    (0..buffer.area.height)
        .map(|y| {
            (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol())
                .collect::<String>()
        })
        .collect()
}

fn buffer_to_string(buffer: &Buffer) -> String {
    buffer_rows(buffer).join("\n")
}

/// Column and row of the first cell where `needle` starts.
fn find(buffer: &Buffer, needle: &str) -> Option<(u16, u16)> {
    buffer_rows(buffer).iter().enumerate().find_map(|(y, row)| {
        row.find(needle)
            .map(|idx| (row[..idx].chars().count() as u16, y as u16))
    })
}

fn fncall(function: &str, data: serde_json::Value) -> TransportEvent {
    TransportEvent::Message(json!({"type": "fncall", "function": function, "data": data}).to_string())
}

fn user_message(channel: &str, user: &str, text: &str) -> TransportEvent {
    fncall(
        "user_message",
        json!({
            "user": user.to_lowercase(),
            "channel": channel,
            "formatted_time": "12:30",
            "message_part": text,
            "channel_color": "#123456",
            "tags": {"display-name": user, "color": "#0000ff"}
        }),
    )
}

#[test]
fn render_shows_header_history_prompt_and_help() {
    let mut app = app();
    let text = buffer_to_string(&draw(&mut app, 100, 12));
    assert!(text.contains("Twitch Multi Chat"));
    assert!(text.contains("offline"));
    assert!(text.contains(INITIALIZED_MESSAGE));
    assert!(text.contains("$ "));
    assert!(text.contains("Enter send"));
}

#[test]
fn placeholder_names_the_active_channel() {
    let mut app = app();
    app.start(Some("foo".to_string()), false);
    app.transport_mut().connected = true;
    let text = buffer_to_string(&draw(&mut app, 80, 12));
    assert!(text.contains("Active channel: foo"));
    assert!(text.contains("online"));
    assert!(text.contains("#foo"));
}

#[test]
fn suggestion_overlay_lists_tokens_and_highlights_the_active_row() {
    let mut app = app();
    app.input_char('/');
    app.input_char('s');
    let buffer = draw(&mut app, 80, 14);
    let text = buffer_to_string(&buffer);
    assert!(text.contains("/status  Checks the connection status."));

    let (x, y) = find(&buffer, "/status").expect("suggestion row");
    assert_eq!(buffer[(x, y)].bg, Theme::default().selected_bg);
    assert_eq!(suggestion_hit_test(Rect::new(0, 0, 80, 14), &app, x, y), Some(0));
    assert_eq!(suggestion_hit_test(Rect::new(0, 0, 80, 14), &app, x, 0), None);
}

#[test]
fn user_messages_render_header_and_body_with_click_targets() {
    let mut app = app();
    app.handle_transport_event(user_message("foo", "Bob", "hello pog world"));
    let buffer = draw(&mut app, 80, 12);
    let text = buffer_to_string(&buffer);
    assert!(text.contains("12:30 #foo"));
    assert!(text.contains("Bob: hello pog world"));

    let screen = Rect::new(0, 0, 80, 12);
    let theme = Theme::default();
    let (cx, cy) = find(&buffer, "#foo").expect("channel label");
    assert_eq!(
        message_hit_test(screen, &app, &theme, cx + 1, cy),
        Some(MessageTarget::Channel("foo".to_string()))
    );
    let (nx, ny) = find(&buffer, "Bob:").expect("author name");
    assert_eq!(
        message_hit_test(screen, &app, &theme, nx, ny),
        Some(MessageTarget::User {
            channel: "foo".to_string(),
            name: "Bob".to_string(),
        })
    );
    assert_eq!(message_hit_test(screen, &app, &theme, nx + 6, ny), None);

    let (hx, hy) = find(&buffer, "pog").expect("highlighted word");
    assert_eq!(buffer[(hx, hy)].bg, theme.highlight_bg);
}

#[test]
fn messages_in_the_active_channel_get_a_bar() {
    let mut app = app();
    app.start(Some("foo".to_string()), false);
    app.handle_transport_event(user_message("foo", "Bob", "hi"));
    app.handle_transport_event(user_message("bar", "Ann", "yo"));
    let rows = buffer_rows(&draw(&mut app, 60, 14));
    let foo_row = rows.iter().find(|row| row.contains("#foo")).expect("foo header");
    let bar_row = rows.iter().find(|row| row.contains("#bar")).expect("bar header");
    assert!(foo_row.contains("┃ 12:30"));
    assert!(!bar_row.contains('┃'));
}

#[test]
fn over_limit_drafts_show_the_counter() {
    let mut app = app();
    for c in format!("/say #foo {}", "a".repeat(501)).chars() {
        app.input_char(c);
    }
    app.dismiss();
    let text = buffer_to_string(&draw(&mut app, 80, 16));
    assert!(text.contains("501/500 characters"));
    assert!(!text.contains("Enter send"));
}

#[test]
fn structured_lines_render_readably() {
    let mut app = app();
    app.handle_transport_event(fncall(
        "joined_channels",
        json!([{"channel": "foo", "isLive": "yes"}, {"channel": "bar", "isLive": "no"}]),
    ));
    app.handle_transport_event(fncall("channel_joined", json!("baz")));
    app.handle_transport_event(fncall(
        "user_message",
        json!({
            "is_channel_command": true,
            "platform": "streamelements",
            "command": {
                "command": "hug",
                "aliases": ["cuddle"],
                "accessLevel": 100,
                "description": "Hugs someone",
                "cost": 5,
                "cooldown": {"user": 10, "global": 3}
            }
        }),
    ));
    let text = buffer_to_string(&draw(&mut app, 80, 24));
    assert!(text.contains("foo - ACTIVE: YES"));
    assert!(text.contains("bar - ACTIVE: NO"));
    assert!(text.contains("Joined channel baz peepoClap"));
    assert!(text.contains("!hug (aliases: cuddle)"));
    assert!(text.contains("Hugs someone"));
    assert!(text.contains("Platform: streamelements"));
    assert!(text.contains("Cost: 5"));
    assert!(text.contains("Cooldown: user 10s, global 3s"));
}

#[test]
fn notifications_show_in_the_corner() {
    let mut app = app();
    app.handle_transport_event(fncall("channel_exited", json!("foo")));
    app.tick(Instant::now());
    let rows = buffer_rows(&draw(&mut app, 60, 12));
    assert!(rows[2].trim_end().ends_with("Left channel foo"));
}

#[test]
fn unread_lines_are_counted_then_separated_after_returning() {
    let mut app = app();
    for i in 0..20 {
        app.handle_transport_event(fncall(
            "join_part",
            json!({"user": format!("u{i}"), "channel": "foo", "action": "JOIN"}),
        ));
    }
    draw(&mut app, 40, 12);

    let t0 = Instant::now();
    app.wheel_up(t0);
    app.tick(t0 + Duration::from_millis(300));
    assert!(!app.state().is_scrolled_to_bottom);

    for user in ["late1", "late2"] {
        app.handle_transport_event(fncall(
            "join_part",
            json!({"user": user, "channel": "foo", "action": "JOIN"}),
        ));
    }
    let text = buffer_to_string(&draw(&mut app, 40, 12));
    assert!(text.contains("2 unread"));
    assert!(!text.contains("late1"));

    let t1 = t0 + Duration::from_secs(1);
    app.jump_to_bottom(t1);
    app.tick(t1 + Duration::from_millis(300));
    let text = buffer_to_string(&draw(&mut app, 40, 12));
    assert!(text.contains("new messages"));
    assert!(text.contains("late2 joined channel foo"));
    assert!(!text.contains("unread"));
}

#[test]
fn input_box_metrics_caps_at_five_lines_and_scrolls_after() {
    assert_eq!(input_box_metrics(1, 0, 20), (3, 0));
    assert_eq!(input_box_metrics(5, 4, 20), (7, 0));
    assert_eq!(input_box_metrics(9, 8, 20), (7, 4));
    assert_eq!(input_box_metrics(9, 0, 20), (7, 0));
}

#[test]
fn input_box_metrics_respects_small_available_height() {
    assert_eq!(input_box_metrics(4, 3, 2), (2, 3));
}
