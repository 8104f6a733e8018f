use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone)]
pub struct WrappedText {
    pub rendered: String,
    /// Row and column of every char boundary, for cursor placement.
    pub positions: Vec<(u16, u16)>,
    pub line_count: u16,
}

fn char_width(ch: char) -> u16 {
    ch.width().unwrap_or(0) as u16
}

/// Word-wraps plain text to `width` display columns.
pub fn wrap_word_with_positions(text: &str, width: u16) -> WrappedText {
    let width = width.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut rendered = String::new();
    let mut positions = Vec::with_capacity(chars.len() + 1);
    let mut line = 0u16;
    let mut col = 0u16;

    positions.push((line, col));

    for (idx, ch) in chars.iter().copied().enumerate() {
        if ch == '\n' {
            rendered.push('\n');
            line = line.saturating_add(1);
            col = 0;
            positions.push((line, col));
            continue;
        }

        let ch_width = char_width(ch);
        if col > 0
            && (should_wrap_before_word(&chars, idx, col, width)
                || col.saturating_add(ch_width) > width)
        {
            rendered.push('\n');
            line = line.saturating_add(1);
            col = 0;
        }

        rendered.push(ch);
        col = col.saturating_add(ch_width);
        if col >= width {
            rendered.push('\n');
            line = line.saturating_add(1);
            col = 0;
        }

        positions.push((line, col));
    }

    let line_count = positions
        .iter()
        .map(|(l, _)| *l)
        .max()
        .unwrap_or(0)
        .saturating_add(1);

    WrappedText {
        rendered,
        positions,
        line_count,
    }
}

fn should_wrap_before_word(chars: &[char], idx: usize, col: u16, width: u16) -> bool {
    if chars[idx].is_whitespace() {
        return false;
    }
    if idx > 0 && !chars[idx - 1].is_whitespace() {
        return false;
    }

    let word_width = chars[idx..]
        .iter()
        .take_while(|c| !c.is_whitespace())
        .map(|c| char_width(*c))
        .fold(0u16, u16::saturating_add);

    word_width <= width && col.saturating_add(word_width) > width
}

/// Splits into runs of non-space text, runs of spaces, and single newlines.
fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut prev: Option<u8> = None;
    for (idx, ch) in text.char_indices() {
        let class = match ch {
            '\n' => 2,
            c if c.is_whitespace() => 1,
            _ => 0,
        };
        if idx > start && (prev != Some(class) || class == 2) {
            runs.push(&text[start..idx]);
            start = idx;
        }
        prev = Some(class);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

struct RowBuilder {
    width: usize,
    indent: usize,
    rows: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    col: usize,
    soft_break: bool,
}

impl RowBuilder {
    fn row_start(&self) -> usize {
        if self.rows.is_empty() { 0 } else { self.indent }
    }

    fn break_row(&mut self, soft: bool) {
        self.soft_break = soft;
        let spans = std::mem::take(&mut self.current);
        self.rows.push(Line::from(spans));
        if self.indent > 0 {
            self.current.push(Span::raw(" ".repeat(self.indent)));
        }
        self.col = self.indent;
    }

    fn push(&mut self, text: String, style: Style) {
        if !text.is_empty() {
            self.soft_break = false;
            self.current.push(Span::styled(text, style));
        }
    }

    fn push_word(&mut self, word: &str, style: Style) {
        let word_width = word.width();
        let start = self.row_start();
        if self.col > start
            && self.col + word_width > self.width
            && word_width <= self.width - start
        {
            self.break_row(true);
        }
        if self.col + word_width <= self.width {
            self.push(word.to_string(), style);
            self.col += word_width;
            return;
        }

        let mut chunk = String::new();
        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if self.col + ch_width > self.width && self.col > self.row_start() {
                self.push(std::mem::take(&mut chunk), style);
                self.break_row(true);
            }
            chunk.push(ch);
            self.col += ch_width;
        }
        self.push(chunk, style);
    }

    fn push_space(&mut self, space: &str, style: Style) {
        if self.soft_break && self.col == self.row_start() {
            return;
        }
        let space_width = space.width();
        if self.col + space_width > self.width {
            self.break_row(true);
            return;
        }
        self.push(space.to_string(), style);
        self.col += space_width;
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        let spans = std::mem::take(&mut self.current);
        self.rows.push(Line::from(spans));
        self.rows
    }
}

/// Word-wraps styled spans into rows of at most `width` columns.
/// Rows after the first start with `indent` blank columns; spaces that
/// land at the start of a wrapped row are dropped.
pub fn wrap_spans(spans: &[Span<'static>], width: u16, indent: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(1));
    let mut builder = RowBuilder {
        width,
        indent: usize::from(indent).min(width - 1),
        rows: Vec::new(),
        current: Vec::new(),
        col: 0,
        soft_break: false,
    };
    for span in spans {
        for run in split_runs(&span.content) {
            if run == "\n" {
                builder.break_row(false);
            } else if run.chars().all(char::is_whitespace) {
                builder.push_space(run, span.style);
            } else {
                builder.push_word(run, span.style);
            }
        }
    }
    builder.finish()
}
