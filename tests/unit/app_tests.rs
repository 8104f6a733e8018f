use super::*;
use crate::dispatch::RecordingTransport;
use crate::history_store::MemoryHistory;
use crate::line::LineKind;
use serde_json::json;

fn app_with(history: &MemoryHistory) -> App<RecordingTransport> {
    App::new(
        Store::hydrate(Box::new(history.clone())),
        ScrollController::default(),
        RecordingTransport::default(),
        Vec::new(),
    )
}

fn app() -> App<RecordingTransport> {
    app_with(&MemoryHistory::default())
}

fn type_text(app: &mut App<RecordingTransport>, text: &str) {
    for c in text.chars() {
        app.input_char(c);
    }
}

/// Types and submits `text`, closing the suggestion panel first.
fn run(app: &mut App<RecordingTransport>, text: &str) {
    type_text(app, text);
    app.dismiss();
    app.submit();
}

fn fncall(function: &str, data: serde_json::Value) -> TransportEvent {
    TransportEvent::Message(json!({"type": "fncall", "function": function, "data": data}).to_string())
}

fn last_text(app: &App<RecordingTransport>) -> Option<&str> {
    app.state().lines.last().and_then(Line::as_text)
}

#[test]
fn typing_a_command_prefix_opens_suggestions_and_tab_commits() {
    let mut app = app();
    type_text(&mut app, "/he");

    assert!(app.suggestions_visible());
    let tokens: Vec<_> = app.state().suggestions.iter().map(|s| s.token.as_str()).collect();
    assert_eq!(tokens, vec!["/help"]);

    app.complete();
    assert_eq!(app.state().command, "/help ");
    assert_eq!(app.cursor(), 6);
    assert!(!app.suggestions_visible());
}

#[test]
fn arrows_cycle_suggestions_with_wraparound() {
    let mut app = app();
    type_text(&mut app, "/");
    let count = app.state().suggestions.len();
    assert_eq!(count, 8);

    app.move_down();
    assert_eq!(app.state().active_suggestion_index, 1);
    app.move_up();
    app.move_up();
    assert_eq!(app.state().active_suggestion_index, count - 1);

    app.submit();
    assert_eq!(app.state().command, "/quit ");
    assert!(app.running);
}

#[test]
fn clearing_the_draft_hides_suggestions_but_keeps_the_list() {
    let mut app = app();
    type_text(&mut app, "/");
    app.backspace_input();

    assert_eq!(app.state().command, "");
    assert!(!app.state().show_suggestions);
    assert_eq!(app.state().suggestions.len(), 8);
}

#[test]
fn escape_dismisses_the_panel() {
    let mut app = app();
    type_text(&mut app, "/st");
    assert!(app.suggestions_visible());
    app.dismiss();
    assert!(!app.suggestions_visible());
    assert_eq!(app.state().command, "/st");
}

#[test]
fn editing_respects_the_cursor() {
    let mut app = app();
    type_text(&mut app, "héllo");
    app.move_cursor_home();
    app.move_cursor_right();
    app.delete_input();
    assert_eq!(app.state().command, "hllo");
    app.input_char('e');
    assert_eq!(app.state().command, "hello");
    app.move_cursor_end();
    app.backspace_input();
    assert_eq!(app.state().command, "hell");
    assert_eq!(app.cursor(), 4);
}

#[test]
fn history_browsing_walks_back_and_returns_to_an_empty_draft() {
    let mut app = app();
    run(&mut app, "hello");
    run(&mut app, "world");
    assert_eq!(app.state().command_history, vec!["world", "hello"]);

    app.move_up();
    assert_eq!(app.state().command, "world");
    assert_eq!(app.cursor(), 5);
    app.move_up();
    assert_eq!(app.state().command, "hello");
    app.move_up();
    assert_eq!(app.state().command, "hello");
    assert_eq!(app.state().history_index, Some(1));

    app.move_down();
    assert_eq!(app.state().command, "world");
    app.move_down();
    assert_eq!(app.state().command, "");
    assert_eq!(app.state().history_index, None);
}

#[test]
fn over_budget_submit_keeps_the_draft() {
    let mut app = app();
    let draft = format!("/say #foo {}", "a".repeat(501));
    type_text(&mut app, &draft);
    app.dismiss();

    let count = app.char_count().expect("a budgeted draft");
    assert_eq!(count.current, 501);
    assert!(count.exceeded());

    app.submit();
    assert_eq!(app.state().command, draft);
    assert_eq!(
        last_text(&app),
        Some("Message exceeds 500 characters (501/500)")
    );
}

#[test]
fn scenario_plain_text_is_said_in_the_active_channel() {
    let mut app = app();
    app.transport_mut().connected = true;
    app.start(Some("foo".to_string()), false);
    assert_eq!(app.transport().connects, 1);
    assert_eq!(app.placeholder().as_deref(), Some("Active channel: foo"));

    run(&mut app, "hi there");
    let sent = &app.transport().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].command, "/say");
    assert_eq!(sent[0].payload, "#foo hi there");
    assert_eq!(last_text(&app), Some("TY -> [foo] hi there"));
    assert_eq!(app.state().command, "");
}

#[test]
fn start_without_channel_or_auto_connect_stays_offline() {
    let mut app = app();
    app.start(None, false);
    assert_eq!(app.transport().connects, 0);
    assert_eq!(app.placeholder(), None);

    app.start(None, true);
    assert_eq!(app.transport().connects, 1);
}

#[test]
fn quit_needs_commit_then_submit() {
    let mut app = app();
    type_text(&mut app, "/quit");
    app.submit();
    assert!(app.running);
    assert_eq!(app.state().command, "/quit ");
    app.submit();
    assert!(!app.running);
}

#[test]
fn refresh_reloads_from_storage_and_reconnects() {
    let history = MemoryHistory::default();
    let mut app = app_with(&history);
    app.transport_mut().connected = true;
    run(&mut app, "/status");
    run(&mut app, "/refresh");

    let stored = history.stored().expect("history was saved");
    assert_eq!(app.state().lines, stored);
    assert!(app.state().command_history.is_empty());
    assert_eq!(app.transport().connects, 1);
}

#[test]
fn transport_events_become_lines() {
    let mut app = app();
    app.handle_transport_event(TransportEvent::Open);
    assert_eq!(app.state().lines.last().map(|l| l.kind), Some(LineKind::Success));
    assert_eq!(last_text(&app), Some("WebSocket connection established"));

    app.handle_transport_event(TransportEvent::Error("boom".to_string()));
    assert_eq!(last_text(&app), Some("WebSocket error: boom"));

    app.handle_transport_event(TransportEvent::Reconnecting {
        attempt: 2,
        delay: Duration::from_millis(2000),
    });
    let line = app.state().lines.last().expect("a line");
    assert_eq!(line.kind, LineKind::Info);
    assert!(!line.persist);
}

#[test]
fn close_drops_server_commands() {
    let mut app = app();
    app.handle_transport_event(fncall("available_commands", json!({"/join": "Joins a channel"})));
    assert!(app.state().available_commands.contains_key("/join"));

    app.handle_transport_event(TransportEvent::Closed {
        code: 1006,
        reason: String::new(),
    });
    assert_eq!(last_text(&app), Some("WebSocket connection closed: Unknown reason"));
    assert!(!app.state().available_commands.contains_key("/join"));
    assert!(app.state().available_commands.contains_key("/help"));
}

#[test]
fn pump_drains_queued_events_in_order() {
    let mut app = app();
    app.transport_mut().inbox = vec![
        TransportEvent::Open,
        fncall("join_part", json!({"user": "bob", "channel": "foo", "action": "JOIN"})),
    ];
    assert_eq!(app.pump_transport(), 2);
    assert_eq!(last_text(&app), Some("bob joined channel foo"));
    assert_eq!(app.pump_transport(), 0);
}

#[test]
fn notifications_rotate_long_then_short() {
    let mut app = app();
    for i in 1..=6 {
        app.handle_transport_event(fncall("channel_joined", json!(format!("c{i}"))));
    }
    let t0 = Instant::now();
    let shown = |app: &App<RecordingTransport>| app.current_notification().map(|n| n.text.clone());

    app.tick(t0);
    assert_eq!(shown(&app).as_deref(), Some("Joined channel c1"));
    app.tick(t0 + Duration::from_secs(4));
    assert_eq!(shown(&app).as_deref(), Some("Joined channel c1"));

    for k in 1..5u64 {
        app.tick(t0 + Duration::from_secs(5 * k));
        let expected = format!("Joined channel c{}", k + 1);
        assert_eq!(shown(&app), Some(expected));
    }

    app.tick(t0 + Duration::from_secs(25));
    assert_eq!(shown(&app).as_deref(), Some("Joined channel c6"));
    app.tick(t0 + Duration::from_millis(25_500));
    assert_eq!(shown(&app).as_deref(), Some("Joined channel c6"));
    app.tick(t0 + Duration::from_secs(26));
    assert_eq!(shown(&app), None);
}

#[test]
fn clicking_a_channel_targets_it() {
    let mut app = app();
    app.click_message(MessageTarget::Channel("foo".to_string()));
    assert_eq!(app.state().command, "/say #foo ");
    assert_eq!(app.cursor(), 10);
}

#[test]
fn clicking_a_name_adds_one_mention() {
    let mut app = app();
    let bob = || MessageTarget::User {
        channel: "foo".to_string(),
        name: "Bob".to_string(),
    };
    app.click_message(bob());
    assert_eq!(app.state().command, "/say #foo @Bob ");
    app.click_message(bob());
    assert_eq!(app.state().command, "/say #foo @Bob ");

    app.click_message(MessageTarget::User {
        channel: "foo".to_string(),
        name: "Ann".to_string(),
    });
    assert_eq!(app.state().command, "/say #foo @Bob @Ann ");

    app.click_message(MessageTarget::User {
        channel: "bar".to_string(),
        name: "Ann".to_string(),
    });
    assert_eq!(app.state().command, "/say #bar @Ann ");
}

#[test]
fn clicking_a_suggestion_commits_it() {
    let mut app = app();
    type_text(&mut app, "/s");
    let tokens: Vec<_> = app.state().suggestions.iter().map(|s| s.token.clone()).collect();
    assert_eq!(tokens, vec!["/status"]);
    app.commit_suggestion(0);
    assert_eq!(app.state().command, "/status ");
    app.commit_suggestion(3);
    assert_eq!(app.state().command, "/status ");
}

#[test]
fn layout_follows_the_bottom_until_scrolled() {
    let mut app = app();
    assert_eq!(app.layout(100, 20), 80);
    assert_eq!(app.message_scroll(), 80);
    assert_eq!(app.layout(110, 20), 90);
}

#[test]
fn scenario_prefix_suggestions_start_at_the_first_match() {
    let mut app = app();
    type_text(&mut app, "/h");
    assert!(app.state().suggestions.iter().any(|s| s.token == "/help"));
    assert_eq!(app.state().active_suggestion_index, 0);
}

#[test]
fn scenario_emote_suggestions_include_global_emotes() {
    let mut app = app();
    app.start(Some("foo".to_string()), false);
    app.handle_transport_event(fncall(
        "available_emotes",
        json!({"global": [{"code": "Kappa", "urls": []}]}),
    ));
    type_text(&mut app, ":Ka");

    let suggestion = app.state().suggestions.first().expect("an emote suggestion");
    assert_eq!(suggestion.token, "Kappa");
    assert!(matches!(suggestion.properties, crate::suggest::SuggestionProps::Emote(_)));
}

#[test]
fn scenario_offline_input_is_reported_and_kept_in_history() {
    let mut app = app();
    run(&mut app, "ping");
    assert_eq!(
        last_text(&app),
        Some("Cannot execute 'ping'. Not connected to a server.")
    );
    assert_eq!(app.state().command_history, vec!["ping"]);
    assert!(app.transport().sent.is_empty());
}
