use crate::model::{ContainerTarget, ExecOutcome};

pub const DEFAULT_HISTORY: usize = 50;
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 5_000;

/// Splits a typed command line into argv. `"` toggles quoting; whitespace outside quotes
/// separates arguments. Returns `None` when nothing remains to run.
pub fn tokenize(line: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in line.trim().chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    if args.is_empty() { None } else { Some(args) }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecState {
    Idle,
    Running,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecFocus {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    target: Option<ContainerTarget>,
    input: String,
    history: Vec<String>,
    history_cursor: Option<usize>,
    max_history: usize,
    output: Vec<String>,
    max_output_lines: usize,
    state: ExecState,
    focus: ExecFocus,
    last_outcome: Option<ExecOutcome>,
    request: u64,
    scroll: usize,
    viewport_height: usize,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY, DEFAULT_MAX_OUTPUT_LINES)
    }
}

impl CommandRunner {
    pub fn new(max_history: usize, max_output_lines: usize) -> Self {
        Self {
            target: None,
            input: String::new(),
            history: Vec::new(),
            history_cursor: None,
            max_history: max_history.max(1),
            output: Vec::new(),
            max_output_lines: max_output_lines.max(10),
            state: ExecState::Idle,
            focus: ExecFocus::Input,
            last_outcome: None,
            request: 0,
            scroll: 0,
            viewport_height: 1,
        }
    }

    /// Clears input, output and history for a new target. Any in-flight result becomes stale.
    pub fn reset(&mut self, target: Option<ContainerTarget>) {
        let request = self.request + 1;
        *self = Self {
            target,
            request,
            viewport_height: self.viewport_height,
            ..Self::new(self.max_history, self.max_output_lines)
        };
    }

    pub fn target(&self) -> Option<&ContainerTarget> {
        self.target.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn focus(&self) -> ExecFocus {
        self.focus
    }

    pub fn last_outcome(&self) -> Option<&ExecOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state == ExecState::Running
    }

    pub fn accepts_input(&self) -> bool {
        !self.is_running() && self.focus == ExecFocus::Input
    }

    pub fn push_char(&mut self, c: char) {
        if self.is_running() {
            return;
        }
        self.input.push(c);
        self.history_cursor = None;
    }

    pub fn backspace(&mut self) {
        if self.is_running() {
            return;
        }
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        if self.is_running() {
            return;
        }
        self.input.clear();
        self.history_cursor = None;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ExecFocus::Input => ExecFocus::Output,
            ExecFocus::Output => ExecFocus::Input,
        };
    }

    pub fn history_prev(&mut self) {
        if self.is_running() || self.history.is_empty() {
            return;
        }
        let index = match self.history_cursor {
            None => self.history.len() - 1,
            Some(index) => index.saturating_sub(1),
        };
        self.history_cursor = Some(index);
        self.input = self.history[index].clone();
    }

    pub fn history_next(&mut self) {
        if self.is_running() {
            return;
        }
        let Some(index) = self.history_cursor else {
            return;
        };
        if index + 1 >= self.history.len() {
            self.history_cursor = None;
            self.input.clear();
        } else {
            self.history_cursor = Some(index + 1);
            self.input = self.history[index + 1].clone();
        }
    }

    /// Takes the typed line and, when it tokenizes to something runnable, marks the runner
    /// busy and returns `(request, argv)` for dispatch.
    pub fn submit(&mut self) -> Option<(u64, Vec<String>)> {
        if self.is_running() || self.target.is_none() {
            return None;
        }
        let argv = tokenize(&self.input)?;
        let line = self.input.trim().to_string();

        self.record_history(&line);
        self.input.clear();
        self.history_cursor = None;
        self.push_output(String::new());
        self.push_output(format!("$ {line}"));
        self.push_output("-".repeat(line.chars().count().clamp(8, 60) + 2));
        self.state = ExecState::Running;
        self.request += 1;
        Some((self.request, argv))
    }

    fn record_history(&mut self, line: &str) {
        if self.history.last().is_some_and(|last| last == line) {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }

    /// Records a command result. Returns false for results from a superseded request.
    pub fn finish(&mut self, request: u64, outcome: ExecOutcome) -> bool {
        if request != self.request || !self.is_running() {
            return false;
        }

        for line in outcome.stdout.lines() {
            self.push_output(line.to_string());
        }
        for line in outcome.stderr.lines().filter(|line| !line.trim().is_empty()) {
            self.push_output(format!("[stderr] {line}"));
        }
        if let Some(error) = outcome.error.as_deref() {
            self.push_output(format!("error: {error} (exit code {})", outcome.exit_code));
            self.state = ExecState::Error;
        } else {
            self.state = ExecState::Complete;
        }
        self.last_outcome = Some(outcome);
        self.scroll = self.max_scroll();
        true
    }

    fn push_output(&mut self, line: String) {
        self.output.push(line);
        if self.output.len() > self.max_output_lines {
            let batch = (self.max_output_lines / 10).max(self.output.len() - self.max_output_lines);
            self.output.drain(..batch);
        }
        self.scroll = self.max_scroll();
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn max_scroll(&self) -> usize {
        self.output.len().saturating_sub(self.viewport_height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let next = (self.scroll as isize + delta).clamp(0, self.max_scroll() as isize);
        self.scroll = next as usize;
    }

    pub fn page_size(&self) -> isize {
        self.viewport_height.max(1) as isize
    }

    pub fn visible_output(&self) -> &[String] {
        let start = self.scroll.min(self.output.len());
        let end = (start + self.viewport_height).min(self.output.len());
        &self.output[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandRunner, ExecState, tokenize};
    use crate::model::{ContainerTarget, ExecOutcome};

    fn runner() -> CommandRunner {
        let mut runner = CommandRunner::new(50, 5_000);
        runner.reset(Some(ContainerTarget::new("default", "beta", Some("app"))));
        runner
    }

    fn type_line(runner: &mut CommandRunner, line: &str) {
        for c in line.chars() {
            runner.push_char(c);
        }
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            tokenize("echo \"hello world\""),
            Some(vec!["echo".to_string(), "hello world".to_string()])
        );
        assert_eq!(
            tokenize("  ls   -la\t/tmp "),
            Some(vec!["ls".to_string(), "-la".to_string(), "/tmp".to_string()])
        );
    }

    #[test]
    fn blank_input_is_not_runnable() {
        assert_eq!(tokenize("   "), None);
        assert_eq!(tokenize(""), None);

        let mut runner = runner();
        type_line(&mut runner, "   ");
        assert_eq!(runner.submit(), None);
        assert_eq!(runner.state(), ExecState::Idle);
    }

    #[test]
    fn submit_marks_running_and_ignores_typing() {
        let mut runner = runner();
        type_line(&mut runner, "pwd");
        let (request, argv) = runner.submit().expect("runnable command");
        assert_eq!(argv, vec!["pwd".to_string()]);
        assert!(runner.is_running());
        assert_eq!(runner.output()[1], "$ pwd");

        runner.push_char('x');
        assert_eq!(runner.input(), "");
        assert_eq!(runner.submit(), None);

        assert!(runner.finish(request, ExecOutcome::completed("/app\n", "")));
        assert_eq!(runner.state(), ExecState::Complete);
        assert_eq!(runner.output().last().map(String::as_str), Some("/app"));
    }

    #[test]
    fn failures_keep_partial_output() {
        let mut runner = runner();
        type_line(&mut runner, "cat /missing");
        let (request, _) = runner.submit().expect("runnable command");
        let outcome = ExecOutcome::failed(
            "partial\n",
            "cat: /missing: No such file or directory\n\n",
            1,
            "command terminated with exit code 1",
        );
        runner.finish(request, outcome);

        assert_eq!(runner.state(), ExecState::Error);
        let output = runner.output();
        assert!(output.iter().any(|line| line == "partial"));
        assert!(
            output
                .iter()
                .any(|line| line == "[stderr] cat: /missing: No such file or directory")
        );
        assert!(!output.iter().any(|line| line == "[stderr] "));
        assert_eq!(runner.last_outcome().map(|outcome| outcome.exit_code), Some(1));
    }

    #[test]
    fn history_skips_repeats_and_browses_backwards() {
        let mut runner = runner();
        for line in ["ls", "ls", "pwd"] {
            type_line(&mut runner, line);
            let (request, _) = runner.submit().expect("runnable command");
            runner.finish(request, ExecOutcome::completed("", ""));
        }
        assert_eq!(runner.history(), ["ls".to_string(), "pwd".to_string()]);

        runner.history_prev();
        assert_eq!(runner.input(), "pwd");
        runner.history_prev();
        assert_eq!(runner.input(), "ls");
        runner.history_next();
        assert_eq!(runner.input(), "pwd");
        runner.history_next();
        assert_eq!(runner.input(), "");
    }

    #[test]
    fn history_is_bounded() {
        let mut runner = CommandRunner::new(3, 5_000);
        runner.reset(Some(ContainerTarget::new("default", "beta", None)));
        for index in 0..5 {
            type_line(&mut runner, &format!("echo {index}"));
            let (request, _) = runner.submit().expect("runnable command");
            runner.finish(request, ExecOutcome::completed("", ""));
        }
        assert_eq!(runner.history().len(), 3);
        assert_eq!(runner.history()[0], "echo 2");
    }

    #[test]
    fn reset_discards_in_flight_result() {
        let mut runner = runner();
        type_line(&mut runner, "sleep 10");
        let (request, _) = runner.submit().expect("runnable command");
        runner.reset(Some(ContainerTarget::new("default", "beta", None)));

        assert!(!runner.finish(request, ExecOutcome::completed("done", "")));
        assert!(runner.output().is_empty());
        assert_eq!(runner.state(), ExecState::Idle);
    }
}
