use crate::model::ContainerTarget;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_LINES: usize = 10_000;
pub const DEFAULT_TAIL_LINES: i64 = 100;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StreamState {
    Idle,
    Streaming,
    Paused,
    Error,
    Ended,
}

/// Handle returned by [`LogView::start`]: the id tags every line of this subscription and
/// the token tears the reader down.
#[derive(Debug, Clone)]
pub struct LogSubscription {
    pub stream: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub struct LogView {
    target: Option<ContainerTarget>,
    lines: Vec<String>,
    held: Vec<String>,
    max_lines: usize,
    state: StreamState,
    error: Option<String>,
    follow: bool,
    scroll: usize,
    viewport_height: usize,
    stream: u64,
    cancel: Option<CancellationToken>,
    trimmed: usize,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl LogView {
    pub fn new(max_lines: usize) -> Self {
        Self {
            target: None,
            lines: Vec::new(),
            held: Vec::new(),
            max_lines: max_lines.max(10),
            state: StreamState::Idle,
            error: None,
            follow: true,
            scroll: 0,
            viewport_height: 1,
            stream: 0,
            cancel: None,
            trimmed: 0,
        }
    }

    /// Cancels any live subscription, clears the buffer and opens a new subscription.
    pub fn start(&mut self, target: ContainerTarget) -> LogSubscription {
        self.stop();
        self.clear();
        self.stream += 1;
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        self.target = Some(target);
        self.state = StreamState::Streaming;
        self.follow = true;
        LogSubscription {
            stream: self.stream,
            cancel,
        }
    }

    /// Cancels the subscription and ends the stream from any state, any number of times.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state = StreamState::Ended;
        self.flush_held();
    }

    /// Drops everything and returns to Idle. Cancels first so no reader outlives the reset.
    pub fn reset(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.clear();
        self.target = None;
        self.state = StreamState::Idle;
        self.follow = true;
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.held.clear();
        self.error = None;
        self.scroll = 0;
        self.trimmed = 0;
    }

    /// Whether lines tagged with `stream` still belong on screen.
    pub fn accepts(&self, stream: u64) -> bool {
        stream == self.stream && matches!(self.state, StreamState::Streaming | StreamState::Paused)
    }

    pub fn push_line(&mut self, line: String) {
        if self.state == StreamState::Paused {
            self.held.push(line);
            if self.held.len() > self.max_lines {
                let excess = self.held.len() - self.max_lines;
                self.held.drain(..excess);
            }
            return;
        }

        self.lines.push(line);
        self.trim();
        if self.follow {
            self.scroll = self.max_scroll();
        }
    }

    fn trim(&mut self) {
        if self.lines.len() <= self.max_lines {
            return;
        }
        let batch = (self.max_lines / 10).max(self.lines.len() - self.max_lines);
        self.lines.drain(..batch);
        self.trimmed += batch;
        self.scroll = self.scroll.saturating_sub(batch);
    }

    /// Terminal error for this subscription; the reader is cancelled.
    pub fn fail(&mut self, error: impl Into<String>) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.flush_held();
        self.error = Some(error.into());
        self.state = StreamState::Error;
    }

    /// Upstream closed without an error.
    pub fn end(&mut self) {
        self.cancel = None;
        self.flush_held();
        if matches!(self.state, StreamState::Streaming | StreamState::Paused) {
            self.state = StreamState::Ended;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            StreamState::Streaming => self.state = StreamState::Paused,
            StreamState::Paused => {
                self.state = StreamState::Streaming;
                self.flush_held();
            }
            _ => {}
        }
    }

    fn flush_held(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let held = std::mem::take(&mut self.held);
        self.lines.extend(held);
        self.trim();
        if self.follow {
            self.scroll = self.max_scroll();
        }
    }

    pub fn toggle_follow(&mut self) {
        self.follow = !self.follow;
        if self.follow {
            self.scroll = self.max_scroll();
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll());
        if self.at_bottom() {
            self.follow = true;
        }
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport_height.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport_height.max(1));
    }

    pub fn goto_top(&mut self) {
        self.follow = false;
        self.scroll = 0;
    }

    pub fn goto_bottom(&mut self) {
        self.follow = true;
        self.scroll = self.max_scroll();
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        if self.follow {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    fn max_scroll(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport_height)
    }

    pub fn at_bottom(&self) -> bool {
        self.scroll >= self.max_scroll()
    }

    pub fn visible_lines(&self) -> &[String] {
        let start = self.scroll.min(self.lines.len());
        let end = (start + self.viewport_height).min(self.lines.len());
        &self.lines[start..end]
    }

    pub fn scroll_percent(&self) -> usize {
        let max_scroll = self.max_scroll();
        if max_scroll == 0 {
            return 100;
        }
        self.scroll * 100 / max_scroll
    }

    /// Bracketed status labels plus line count and scroll position for the footer.
    pub fn status_line(&self) -> String {
        let state = match self.state {
            StreamState::Streaming => "[STREAMING]".to_string(),
            StreamState::Paused => format!("[PAUSED +{}]", self.held.len()),
            StreamState::Error => {
                format!("[ERROR: {}]", self.error.as_deref().unwrap_or("unknown"))
            }
            StreamState::Ended => "[STREAM ENDED]".to_string(),
            StreamState::Idle => "[IDLE]".to_string(),
        };
        let follow = if self.follow { " [FOLLOW]" } else { "" };
        format!(
            "{state}{follow} Lines: {} | {}%",
            self.lines.len(),
            self.scroll_percent()
        )
    }

    pub fn target(&self) -> Option<&ContainerTarget> {
        self.target.as_ref()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn trimmed(&self) -> usize {
        self.trimmed
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }
}
