use super::*;
use crate::history_store::{MemoryHistory, ScrollConfig};

fn store_with(count: usize) -> Store {
    let lines = (0..count)
        .map(|i| Line::system(format!("line {i}")))
        .collect::<Vec<_>>();
    Store::hydrate(Box::new(MemoryHistory::with_lines(lines)))
}

fn controller() -> ScrollController {
    ScrollController::new(&ScrollConfig {
        tolerance_rows: 1,
        debounce_ms: 200,
    })
}

fn texts(lines: &[Line]) -> Vec<String> {
    lines
        .iter()
        .filter_map(Line::as_text)
        .map(str::to_string)
        .collect()
}

fn is_subsequence(window: &[Line], full: &[Line]) -> bool {
    let mut full = full.iter();
    window.iter().all(|line| full.any(|candidate| candidate == line))
}

#[test]
fn line_received_at_bottom_is_displayed_immediately() {
    let mut store = store_with(3);
    let mut scroll = controller();
    scroll.receive_line(&mut store, Line::system("fresh"));
    let state = store.state();
    assert_eq!(state.lines.len(), 4);
    assert_eq!(state.displayed_lines.last().and_then(Line::as_text), Some("fresh"));
    assert!(state.buffered_lines.is_empty());
}

#[test]
fn residual_buffer_is_shown_ahead_of_a_line_received_at_bottom() {
    let mut store = store_with(2);
    let mut scroll = controller();
    store.dispatch(Action::AddBufferedLine(Line::system("held")));
    scroll.receive_line(&mut store, Line::system("fresh"));

    let state = store.state();
    assert_eq!(texts(&state.displayed_lines), vec!["line 0", "line 1", "held", "fresh"]);
    assert!(state.buffered_lines.is_empty());
    assert_eq!(state.unread_marker, None);
}

#[test]
fn lines_received_while_scrolled_up_are_buffered_until_bottom() {
    let mut store = store_with(40);
    let mut scroll = controller();
    let start = Instant::now();
    scroll.after_layout(60, 10, true);

    scroll.on_scroll(
        ViewportMetrics {
            scroll_top: 20,
            scroll_height: 60,
            client_height: 10,
        },
        start,
    );
    assert!(!scroll.poll(&mut store, start + Duration::from_millis(100)));
    assert!(scroll.poll(&mut store, start + Duration::from_millis(200)));
    assert!(!store.state().is_scrolled_to_bottom);

    scroll.receive_line(&mut store, Line::system("a"));
    scroll.receive_line(&mut store, Line::system("b"));
    assert_eq!(texts(&store.state().buffered_lines), vec!["a", "b"]);
    assert_eq!(store.state().displayed_lines.len(), 30);

    let later = start + Duration::from_secs(1);
    scroll.on_scroll(
        ViewportMetrics {
            scroll_top: 50,
            scroll_height: 60,
            client_height: 10,
        },
        later,
    );
    scroll.poll(&mut store, later + Duration::from_millis(200));
    let state = store.state();
    assert!(state.is_scrolled_to_bottom);
    assert!(state.buffered_lines.is_empty());
    let tail = texts(&state.displayed_lines[state.displayed_lines.len() - 2..]);
    assert_eq!(tail, vec!["a", "b"]);
    assert_eq!(state.unread_marker, Some(30));
    assert!(is_subsequence(&state.displayed_lines, &state.lines));
}

#[test]
fn debounce_restarts_on_every_scroll_event() {
    let mut store = store_with(5);
    let mut scroll = controller();
    let start = Instant::now();
    let metrics = ViewportMetrics {
        scroll_top: 3,
        scroll_height: 40,
        client_height: 10,
    };
    scroll.on_scroll(metrics, start);
    scroll.on_scroll(metrics, start + Duration::from_millis(150));
    assert!(!scroll.poll(&mut store, start + Duration::from_millis(250)));
    assert!(scroll.poll(&mut store, start + Duration::from_millis(350)));
}

#[test]
fn tolerance_counts_one_row_short_of_bottom_as_bottom() {
    let metrics = ViewportMetrics {
        scroll_top: 29,
        scroll_height: 40,
        client_height: 10,
    };
    assert!(metrics.is_at_bottom(1));
    assert!(!metrics.is_at_bottom(0));
}

#[test]
fn lazy_load_prepends_the_preceding_page() {
    let mut store = store_with(100);
    let mut scroll = controller();
    let loaded = scroll.load_older(&mut store);
    assert_eq!(loaded, 30);
    let state = store.state();
    assert_eq!(state.displayed_lines.len(), 60);
    assert_eq!(state.displayed_lines[0].as_text(), Some("line 40"));
    assert_eq!(state.displayed_lines[30].as_text(), Some("line 70"));
    assert!(is_subsequence(&state.displayed_lines, &state.lines));
}

#[test]
fn lazy_load_takes_the_partial_remainder_then_stops() {
    let mut store = store_with(45);
    let mut scroll = controller();
    assert_eq!(scroll.load_older(&mut store), 15);
    assert_eq!(store.state().displayed_lines.len(), 45);
    scroll.after_layout(90, 10, false);
    assert_eq!(scroll.load_older(&mut store), 0);
    assert_eq!(store.state().displayed_lines.len(), 45);
    assert!(!scroll.has_pending_anchor());
}

#[test]
fn lazy_load_ignores_lines_held_in_the_buffer() {
    let mut store = store_with(35);
    let mut scroll = controller();
    store.dispatch(Action::SetScrolledToBottom(false));
    scroll.receive_line(&mut store, Line::system("held"));
    assert_eq!(scroll.load_older(&mut store), 5);
    let state = store.state();
    assert_eq!(state.displayed_lines[0].as_text(), Some("line 0"));
    assert!(
        state
            .displayed_lines
            .iter()
            .all(|line| line.as_text() != Some("held"))
    );
}

#[test]
fn scroll_to_top_loads_and_anchor_keeps_first_visible_row() {
    let mut store = store_with(100);
    let mut scroll = controller();
    let start = Instant::now();
    scroll.after_layout(30, 10, true);

    scroll.on_scroll(
        ViewportMetrics {
            scroll_top: 0,
            scroll_height: 30,
            client_height: 10,
        },
        start,
    );
    scroll.poll(&mut store, start + Duration::from_millis(200));
    assert_eq!(store.state().displayed_lines.len(), 60);
    assert!(scroll.has_pending_anchor());

    let top = scroll.after_layout(60, 10, store.state().is_scrolled_to_bottom);
    assert_eq!(top, 30);
    assert!(!scroll.has_pending_anchor());
}

#[test]
fn pending_anchor_survives_a_user_scroll_before_layout() {
    let mut store = store_with(100);
    let mut scroll = controller();
    let start = Instant::now();
    scroll.after_layout(30, 10, true);
    scroll.on_scroll(
        ViewportMetrics {
            scroll_top: 0,
            scroll_height: 30,
            client_height: 10,
        },
        start,
    );
    scroll.poll(&mut store, start + Duration::from_millis(200));

    scroll.scroll_by(2, start + Duration::from_millis(210));
    assert!(scroll.has_pending_anchor());
    assert_eq!(scroll.after_layout(60, 10, false), 32);
}

#[test]
fn layout_pins_to_bottom_while_following_output() {
    let mut scroll = controller();
    assert_eq!(scroll.after_layout(25, 10, true), 15);
    assert_eq!(scroll.after_layout(27, 10, true), 17);
    assert_eq!(scroll.after_layout(30, 10, false), 17);
}

#[test]
fn clear_drops_pending_work() {
    let mut store = store_with(100);
    let mut scroll = controller();
    scroll.scroll_by(-1, Instant::now());
    scroll.load_older(&mut store);
    scroll.clear();
    assert!(!scroll.has_pending_anchor());
    assert!(!scroll.has_pending_evaluation());
}
