use std::time::{Duration, Instant};

use crate::history_store::ScrollConfig;
use crate::line::Line;
use crate::state::{Action, Store};

/// Lines loaded per upward lazy-load step.
pub const PAGE_SIZE: usize = 30;

/// Geometry of the message pane in wrapped rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportMetrics {
    pub scroll_top: usize,
    pub scroll_height: usize,
    pub client_height: usize,
}

impl ViewportMetrics {
    pub fn max_scroll_top(&self) -> usize {
        self.scroll_height.saturating_sub(self.client_height)
    }

    pub fn is_at_bottom(&self, tolerance: usize) -> bool {
        self.scroll_height.saturating_sub(self.scroll_top) <= self.client_height + tolerance
    }
}

/// Keeps the displayed window, the unread buffer and the scroll position of
/// the message pane consistent with each other.
///
/// Scroll evaluation is debounced; a lazy load records the content height
/// before the prepend so the next layout pass can shift `scroll_top` by the
/// height that was added above the visible rows.
#[derive(Debug, Clone)]
pub struct ScrollController {
    tolerance: usize,
    debounce: Duration,
    viewport: ViewportMetrics,
    evaluate_at: Option<Instant>,
    pending_anchor: Option<usize>,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(&ScrollConfig::default())
    }
}

impl ScrollController {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            tolerance: usize::from(config.tolerance_rows),
            debounce: Duration::from_millis(config.debounce_ms),
            viewport: ViewportMetrics::default(),
            evaluate_at: None,
            pending_anchor: None,
        }
    }

    pub fn viewport(&self) -> ViewportMetrics {
        self.viewport
    }

    #[cfg(test)]
    pub fn has_pending_anchor(&self) -> bool {
        self.pending_anchor.is_some()
    }

    #[cfg(test)]
    pub fn has_pending_evaluation(&self) -> bool {
        self.evaluate_at.is_some()
    }

    /// Records a new line and either shows it or holds it as unread.
    /// Lines still buffered when the viewport is already at the bottom are
    /// shown ahead of it without an unread marker.
    pub fn receive_line(&mut self, store: &mut Store, line: Line) {
        store.dispatch(Action::AddLine(line.clone()));
        if store.state().is_scrolled_to_bottom {
            let residual = store.state().buffered_lines.clone();
            if !residual.is_empty() {
                for held in residual {
                    store.dispatch(Action::AppendDisplayed(held));
                }
                store.dispatch(Action::ClearBufferedLines);
            }
            store.dispatch(Action::AppendDisplayed(line));
        } else {
            store.dispatch(Action::AddBufferedLine(line));
        }
    }

    /// Moves the viewport by `delta` rows and schedules an evaluation.
    pub fn scroll_by(&mut self, delta: isize, now: Instant) {
        let max = self.viewport.max_scroll_top();
        let top = self.viewport.scroll_top.saturating_add_signed(delta).min(max);
        self.on_scroll(
            ViewportMetrics {
                scroll_top: top,
                ..self.viewport
            },
            now,
        );
    }

    pub fn scroll_to_bottom(&mut self, now: Instant) {
        let bottom = self.viewport.max_scroll_top();
        self.on_scroll(
            ViewportMetrics {
                scroll_top: bottom,
                ..self.viewport
            },
            now,
        );
    }

    /// A scroll event restarts the debounce window.
    pub fn on_scroll(&mut self, metrics: ViewportMetrics, now: Instant) {
        self.viewport = metrics;
        self.evaluate_at = Some(now + self.debounce);
    }

    /// Runs a due scroll evaluation. Returns true when one ran.
    pub fn poll(&mut self, store: &mut Store, now: Instant) -> bool {
        match self.evaluate_at {
            Some(deadline) if now >= deadline => {
                self.evaluate_at = None;
                self.evaluate(store);
                true
            }
            _ => false,
        }
    }

    fn evaluate(&mut self, store: &mut Store) {
        let at_bottom = self.viewport.is_at_bottom(self.tolerance);
        if at_bottom != store.state().is_scrolled_to_bottom {
            tracing::trace!(at_bottom, "scroll position changed");
            store.dispatch(Action::SetScrolledToBottom(at_bottom));
        }
        if at_bottom && !store.state().buffered_lines.is_empty() {
            store.dispatch(Action::FlushBuffered);
        }
        if self.viewport.scroll_top == 0 {
            self.load_older(store);
        }
    }

    /// Prepends the next page of older history to the displayed window.
    /// Returns the number of lines loaded.
    pub fn load_older(&mut self, store: &mut Store) -> usize {
        let state = store.state();
        let remaining = state.hidden_line_count();
        if remaining == 0 {
            return 0;
        }
        let chunk = remaining.min(PAGE_SIZE);
        let start = remaining - chunk;
        let older = state.lines[start..start + chunk].to_vec();
        store.dispatch(Action::PrependLines(older));
        self.pending_anchor.get_or_insert(self.viewport.scroll_height);
        tracing::debug!(loaded = chunk, remaining = remaining - chunk, "loaded older lines");
        chunk
    }

    /// Layout pass, run with the freshly measured pane before it is painted.
    /// Returns the row to render from.
    pub fn after_layout(
        &mut self,
        scroll_height: usize,
        client_height: usize,
        at_bottom: bool,
    ) -> usize {
        let mut top = self.viewport.scroll_top;
        if let Some(old_height) = self.pending_anchor.take() {
            top += scroll_height.saturating_sub(old_height);
        } else if at_bottom && self.evaluate_at.is_none() {
            top = scroll_height.saturating_sub(client_height);
        }
        self.viewport = ViewportMetrics {
            scroll_top: top.min(scroll_height.saturating_sub(client_height)),
            scroll_height,
            client_height,
        };
        self.viewport.scroll_top
    }

    pub fn clear(&mut self) {
        self.evaluate_at = None;
        self.pending_anchor = None;
    }
}

#[cfg(test)]
#[path = "../tests/unit/scroll_tests.rs"]
mod tests;
