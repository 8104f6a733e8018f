use super::*;
use crate::catalog::{CommandCatalog, Platform};
use crate::history_store::MemoryHistory;
use crate::line::LineContent;
use serde_json::json;

fn fresh_store() -> Store {
    Store::hydrate(Box::new(MemoryHistory::default()))
}

fn receive(store: &mut Store, frame: Value) {
    let mut scroll = ScrollController::default();
    Inbound {
        store,
        scroll: &mut scroll,
    }
    .handle_text(&frame.to_string());
}

fn receive_raw(store: &mut Store, raw: &str) {
    let mut scroll = ScrollController::default();
    Inbound {
        store,
        scroll: &mut scroll,
    }
    .handle_text(raw);
}

fn fncall(function: &str, data: Value) -> Value {
    json!({"type": "fncall", "function": function, "data": data})
}

fn last_line(store: &Store) -> &Line {
    store.state().lines.last().expect("a line")
}

#[test]
fn malformed_frames_become_error_lines() {
    let mut store = fresh_store();
    receive_raw(&mut store, "{not json");
    let line = last_line(&store);
    assert_eq!(line.kind, LineKind::Error);
    assert_eq!(line.as_text(), Some("Received malformed message: {not json"));
}

#[test]
fn unknown_functions_warn() {
    let mut store = fresh_store();
    receive(&mut store, fncall("teleport", json!({})));
    let line = last_line(&store);
    assert_eq!(line.kind, LineKind::Warning);
    assert_eq!(line.as_text(), Some("No handler for function: teleport"));
}

#[test]
fn non_fncall_frames_are_echoed_with_their_kind() {
    let mut store = fresh_store();
    receive(&mut store, json!({"type": "error"}));
    let line = last_line(&store);
    assert_eq!(line.kind, LineKind::Error);
    assert_eq!(line.as_text(), Some(r#"SERVER -> CLIENT: {"type":"error"}"#));

    receive(&mut store, json!({"type": "pong"}));
    assert_eq!(last_line(&store).kind, LineKind::Info);
}

#[test]
fn user_messages_are_cleaned_and_stored_structured() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall(
            "user_message",
            json!({
                "user": "bob",
                "channel": "foo",
                "formatted_time": "12:00",
                "message_part": "\u{1}ACTION waves\u{1}",
                "tags": {"display-name": "Bob", "room-id": "1", "badges": "vip/1"}
            }),
        ),
    );
    let LineContent::Structured(StructuredContent::UserMessage(message)) =
        &last_line(&store).content
    else {
        panic!("expected a user message");
    };
    assert_eq!(message.message_part, "ACTION waves");
    assert_eq!(message.display_name(), "Bob");
    assert_eq!(message.tags.extra["badges"], "vip/1");
}

#[test]
fn shared_chat_relays_are_dropped() {
    let mut store = fresh_store();
    let before = store.state().lines.len();
    receive(
        &mut store,
        fncall(
            "user_message",
            json!({
                "user": "bob",
                "channel": "foo",
                "message_part": "hi",
                "tags": {"room-id": "1", "source-room-id": "2"}
            }),
        ),
    );
    assert_eq!(store.state().lines.len(), before);

    receive(
        &mut store,
        fncall(
            "user_message",
            json!({
                "user": "bob",
                "channel": "foo",
                "message_part": "hi",
                "tags": {"room-id": "1", "source-room-id": "1"}
            }),
        ),
    );
    assert_eq!(store.state().lines.len(), before + 1);
}

#[test]
fn channel_command_messages_echo_platform_and_command() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall(
            "user_message",
            json!({
                "is_channel_command": true,
                "platform": "nightbot",
                "command": {"name": "!discord"},
                "message_part": ""
            }),
        ),
    );
    let LineContent::Structured(StructuredContent::ChannelCommand(echo)) =
        &last_line(&store).content
    else {
        panic!("expected a channel command echo");
    };
    assert_eq!(echo.platform, "nightbot");
    assert_eq!(echo.command["name"], "!discord");
}

#[test]
fn join_part_lines_use_plus_and_minus_kinds() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall("join_part", json!({"user": "amy", "channel": "foo", "action": "JOIN"})),
    );
    assert_eq!(last_line(&store).kind, LineKind::PlusOne);
    assert_eq!(last_line(&store).as_text(), Some("amy joined channel foo"));

    receive(
        &mut store,
        fncall("join_part", json!({"user": "amy", "channel": "foo", "action": "PART"})),
    );
    assert_eq!(last_line(&store).kind, LineKind::MinusOne);
    assert_eq!(last_line(&store).as_text(), Some("amy left channel foo"));
}

#[test]
fn bad_handler_data_is_reported() {
    let mut store = fresh_store();
    receive(&mut store, fncall("join_part", json!("nope")));
    let line = last_line(&store);
    assert_eq!(line.kind, LineKind::Error);
    assert!(
        line.as_text()
            .is_some_and(|text| text.starts_with("Invalid data for function join_part"))
    );
}

#[test]
fn available_commands_merge_into_global_catalog() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall("available_commands", json!({"/join": "Join a channel", "/ping": "Ping"})),
    );
    let catalog: &CommandCatalog = &store.state().available_commands;
    assert_eq!(catalog["/join"].description, "Join a channel");
    assert!(catalog["/join"].params.is_empty());
    assert!(catalog.contains_key("/help"));
}

#[test]
fn channel_lifecycle_updates_catalogs_and_notifies() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall(
            "available_commands_channel",
            json!({"foo": {"moobot": [{"identifier": "!lurk"}]}}),
        ),
    );
    receive(
        &mut store,
        fncall("user_data", json!({"foo": {"broadcaster_type": "partner"}})),
    );
    receive(&mut store, fncall("channel_joined", json!("foo")));
    {
        let state = store.state();
        let platforms = state.available_commands_channel["foo"]
            .platforms()
            .map(|(platform, _)| *platform)
            .collect::<Vec<_>>();
        assert_eq!(platforms, vec![Platform::Moobot]);
        assert_eq!(
            state.user_data_by_channel["foo"].broadcaster_type.as_deref(),
            Some("partner")
        );
        assert_eq!(state.notifications.len(), 1);
        assert_eq!(state.notifications[0].text, "Joined channel foo");
    }

    receive(&mut store, fncall("channel_exited", json!("foo")));
    let state = store.state();
    assert!(!state.available_commands_channel.contains_key("foo"));
    assert!(!state.user_data_by_channel.contains_key("foo"));
    assert_eq!(state.notifications.len(), 2);
    let LineContent::Structured(StructuredContent::ChannelExited(presence)) =
        &last_line(&store).content
    else {
        panic!("expected channel exited line");
    };
    assert_eq!(presence.emote, EXITED_EMOTE);
}

#[test]
fn emotes_merge_by_scope() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall(
            "available_emotes",
            json!({"global": [{"code": "Kappa", "urls": [{"size": "1x", "url": "https://e/1"}]}]}),
        ),
    );
    assert_eq!(store.state().available_emotes["global"][0].code, "Kappa");
}

#[test]
fn joined_channels_roster_is_a_system_line() {
    let mut store = fresh_store();
    receive(
        &mut store,
        fncall(
            "joined_channels",
            json!([{"channel": "foo", "isLive": "YES"}, {"channel": "bar", "isLive": "NO"}]),
        ),
    );
    let line = last_line(&store);
    assert_eq!(line.kind, LineKind::System);
    let LineContent::Structured(StructuredContent::JoinedChannels(roster)) = &line.content else {
        panic!("expected roster");
    };
    assert!(roster[0].live());
    assert!(!roster[1].live());
}
