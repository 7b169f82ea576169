use crate::cluster::LogRequest;
use crate::config::Settings;
use crate::exec::{CommandRunner, ExecFocus};
use crate::files::{FileBrowser, FileOpen, parse_listing};
use crate::input::{Action, KeyScope};
use crate::logs::LogView;
use crate::model::{
    ContainerTarget, ContextRecord, ExecOutcome, LogLine, NamespaceRecord, PodRecord, Screen,
};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LoadKind {
    Pods,
    Namespaces,
    Contexts,
    ContextSwitch,
}

impl LoadKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::Namespaces => "namespaces",
            Self::Contexts => "contexts",
            Self::ContextSwitch => "context switch",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoadFailure {
    pub kind: LoadKind,
    pub message: String,
}

/// Work a transition asks the session to perform.
#[derive(Debug, Clone)]
pub enum AppCommand {
    LoadPods {
        request: u64,
        namespace: String,
    },
    LoadNamespaces {
        request: u64,
    },
    LoadContexts {
        request: u64,
    },
    SetNamespace {
        namespace: String,
    },
    SwitchContext {
        context: String,
    },
    OpenLogStream {
        stream: u64,
        request: LogRequest,
        cancel: CancellationToken,
    },
    RunCommand {
        request: u64,
        target: ContainerTarget,
        argv: Vec<String>,
    },
    ListDirectory {
        target: ContainerTarget,
        path: String,
    },
    ReadFile {
        target: ContainerTarget,
        path: String,
        max_bytes: usize,
    },
}

/// Results of background work, delivered back through the event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    PodsLoaded {
        request: u64,
        namespace: String,
        result: Result<Vec<PodRecord>, String>,
    },
    NamespacesLoaded {
        request: u64,
        result: Result<Vec<NamespaceRecord>, String>,
    },
    ContextsLoaded {
        request: u64,
        contexts: Vec<ContextRecord>,
    },
    ContextSwitched {
        context: String,
        result: Result<String, String>,
    },
    LogStreamOpened {
        stream: u64,
    },
    LogLineReceived {
        stream: u64,
        line: LogLine,
    },
    LogStreamFailed {
        stream: u64,
        error: String,
    },
    LogStreamEnded {
        stream: u64,
    },
    CommandFinished {
        request: u64,
        outcome: ExecOutcome,
    },
    DirectoryListed {
        target: ContainerTarget,
        path: String,
        result: Result<String, String>,
    },
    FileLoaded {
        target: ContainerTarget,
        path: String,
        result: Result<String, String>,
    },
}

#[derive(Debug)]
pub struct App {
    running: bool,
    screens: Vec<Screen>,
    cluster: String,
    context: String,
    namespace: String,
    pods: Vec<PodRecord>,
    namespaces: Vec<NamespaceRecord>,
    contexts: Vec<ContextRecord>,
    selected_pod: usize,
    selected_namespace: usize,
    selected_context: usize,
    selected_container: Option<String>,
    loading_pods: bool,
    loading_namespaces: bool,
    switching_context: Option<String>,
    last_error: Option<LoadFailure>,
    status: String,
    last_refreshed: Option<DateTime<Local>>,
    issued: HashMap<LoadKind, u64>,
    applied: HashMap<LoadKind, u64>,
    logs: LogView,
    exec: CommandRunner,
    files: FileBrowser,
    log_tail_lines: i64,
    file_preview_bytes: usize,
    body_rows: u16,
}

impl App {
    pub fn new(cluster: String, context: String, namespace: String, settings: &Settings) -> Self {
        Self {
            running: true,
            screens: vec![Screen::PodList],
            cluster,
            context,
            namespace,
            pods: Vec::new(),
            namespaces: Vec::new(),
            contexts: Vec::new(),
            selected_pod: 0,
            selected_namespace: 0,
            selected_context: 0,
            selected_container: None,
            loading_pods: false,
            loading_namespaces: false,
            switching_context: None,
            last_error: None,
            status: "Ready".to_string(),
            last_refreshed: None,
            issued: HashMap::new(),
            applied: HashMap::new(),
            logs: LogView::new(settings.log_max_lines),
            exec: CommandRunner::new(settings.exec_history, settings.exec_max_lines),
            files: FileBrowser::default(),
            log_tail_lines: settings.log_tail_lines,
            file_preview_bytes: settings.file_preview_bytes,
            body_rows: 13,
        }
    }

    /// Initial loads once the cluster client is connected.
    pub fn bootstrap(&mut self) -> Vec<AppCommand> {
        self.set_status(format!("Loading pods in {}…", self.namespace));
        vec![self.load_pods(), self.load_contexts()]
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn screen(&self) -> Screen {
        self.screens.last().copied().unwrap_or(Screen::PodList)
    }

    /// Bottom-up: the base view followed by any overlays opened on top of it.
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn key_scope(&self) -> KeyScope {
        match self.screen() {
            Screen::Help => KeyScope::Help,
            Screen::Logs => KeyScope::Logs,
            Screen::Exec if self.exec.focus() == ExecFocus::Input => KeyScope::CommandLine,
            Screen::PodList
            | Screen::Exec
            | Screen::Files
            | Screen::NamespaceSelect
            | Screen::ContextSelect => KeyScope::Browse,
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pods(&self) -> &[PodRecord] {
        &self.pods
    }

    pub fn selected_pod_index(&self) -> Option<usize> {
        self.pods
            .len()
            .checked_sub(1)
            .map(|last| self.selected_pod.min(last))
    }

    pub fn selected_pod(&self) -> Option<&PodRecord> {
        self.selected_pod_index().and_then(|index| self.pods.get(index))
    }

    pub fn selected_container(&self) -> Option<&str> {
        self.selected_container.as_deref()
    }

    pub fn namespaces(&self) -> &[NamespaceRecord] {
        &self.namespaces
    }

    pub fn selected_namespace_index(&self) -> Option<usize> {
        (!self.namespaces.is_empty()).then_some(self.selected_namespace)
    }

    pub fn contexts(&self) -> &[ContextRecord] {
        &self.contexts
    }

    pub fn selected_context_index(&self) -> Option<usize> {
        (!self.contexts.is_empty()).then_some(self.selected_context)
    }

    pub fn loading_pods(&self) -> bool {
        self.loading_pods
    }

    pub fn loading_namespaces(&self) -> bool {
        self.loading_namespaces
    }

    pub fn switching_context(&self) -> Option<&str> {
        self.switching_context.as_deref()
    }

    pub fn last_error(&self) -> Option<&LoadFailure> {
        self.last_error.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn logs(&self) -> &LogView {
        &self.logs
    }

    pub fn exec(&self) -> &CommandRunner {
        &self.exec
    }

    pub fn files(&self) -> &FileBrowser {
        &self.files
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    /// Rows of the body between the one-line header and footer, sized from the terminal.
    fn resize(&mut self, height: u16) {
        self.body_rows = height.saturating_sub(2);
        let panel_rows = usize::from(self.body_rows.saturating_sub(3)).max(1);
        self.logs.set_viewport_height(panel_rows);
        self.exec
            .set_viewport_height(usize::from(self.body_rows.saturating_sub(5)).max(1));
        self.files.set_viewport_height(panel_rows);
    }

    /// Table rows visible on the pod list; the inline error line takes one.
    fn pod_page_size(&self) -> usize {
        let error_rows = u16::from(self.last_error.is_some());
        usize::from(self.body_rows.saturating_sub(3 + error_rows)).max(1)
    }

    /// Stops the program and releases the log subscription.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.logs.stop();
    }

    pub fn apply_action(&mut self, action: Action) -> Vec<AppCommand> {
        if action == Action::Quit {
            self.shutdown();
            return Vec::new();
        }
        if let Action::Resize { height, .. } = action {
            self.resize(height);
            return Vec::new();
        }

        if self.screen() == Screen::Help {
            self.pop_overlay();
            return Vec::new();
        }

        match action {
            Action::Help => {
                self.push_overlay(Screen::Help);
                Vec::new()
            }
            Action::Back => self.go_back(),
            _ => match self.screen() {
                Screen::PodList => self.handle_pod_list(action),
                Screen::Logs => self.handle_logs(action),
                Screen::Exec => self.handle_exec(action),
                Screen::Files => self.handle_files(action),
                Screen::NamespaceSelect => self.handle_namespace_select(action),
                Screen::ContextSelect => self.handle_context_select(action),
                Screen::Help => Vec::new(),
            },
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) -> Vec<AppCommand> {
        match event {
            AppEvent::PodsLoaded {
                request,
                namespace,
                result,
            } => self.on_pods_loaded(request, &namespace, result),
            AppEvent::NamespacesLoaded { request, result } => {
                self.on_namespaces_loaded(request, result)
            }
            AppEvent::ContextsLoaded { request, contexts } => {
                self.on_contexts_loaded(request, contexts)
            }
            AppEvent::ContextSwitched { context, result } => {
                self.on_context_switched(context, result)
            }
            AppEvent::LogStreamOpened { stream } => {
                if self.logs.accepts(stream) {
                    debug!(stream, "log stream opened");
                }
                Vec::new()
            }
            AppEvent::LogLineReceived { stream, line } => {
                if self.logs.accepts(stream) {
                    match line.error {
                        Some(error) => {
                            self.set_status(format!("Log stream failed: {error}"));
                            self.logs.fail(error);
                        }
                        None => self.logs.push_line(line.content),
                    }
                }
                Vec::new()
            }
            AppEvent::LogStreamFailed { stream, error } => {
                if self.logs.accepts(stream) {
                    self.set_status(format!("Log stream failed: {error}"));
                    self.logs.fail(error);
                }
                Vec::new()
            }
            AppEvent::LogStreamEnded { stream } => {
                if self.logs.accepts(stream) {
                    self.logs.end();
                    self.set_status("Log stream ended");
                }
                Vec::new()
            }
            AppEvent::CommandFinished { request, outcome } => {
                let summary = match outcome.error.as_deref() {
                    None => "Command completed".to_string(),
                    Some(error) => format!("Command failed (exit {}): {error}", outcome.exit_code),
                };
                if self.exec.finish(request, outcome) {
                    self.set_status(summary);
                }
                Vec::new()
            }
            AppEvent::DirectoryListed {
                target,
                path,
                result,
            } => {
                if self.files.target() == Some(&target) {
                    let result = result.map(|raw| parse_listing(&raw));
                    if self.files.apply_listing(&path, result) {
                        self.set_status(listing_status(&path, &self.files));
                    }
                }
                Vec::new()
            }
            AppEvent::FileLoaded {
                target,
                path,
                result,
            } => {
                if self.files.target() == Some(&target) && self.files.apply_preview(&path, result)
                {
                    match self.files.error() {
                        Some(error) => self.set_status(error.to_string()),
                        None => self.set_status(format!("Viewing {path}")),
                    }
                }
                Vec::new()
            }
        }
    }

    fn push_overlay(&mut self, overlay: Screen) {
        if self.screen() != overlay {
            self.screens.push(overlay);
        }
    }

    fn pop_overlay(&mut self) {
        if self.screens.len() > 1 && self.screen().is_overlay() {
            self.screens.pop();
        }
    }

    fn set_base(&mut self, screen: Screen) {
        self.screens = vec![screen];
    }

    fn go_back(&mut self) -> Vec<AppCommand> {
        let screen = self.screen();
        if screen.is_overlay() {
            self.pop_overlay();
            return Vec::new();
        }

        match screen {
            Screen::Logs => {
                self.logs.stop();
                self.logs.reset();
            }
            Screen::Exec => self.exec.reset(None),
            Screen::Files => self.files.reset(None),
            Screen::PodList
            | Screen::NamespaceSelect
            | Screen::ContextSelect
            | Screen::Help => {}
        }
        self.set_base(Screen::PodList);
        Vec::new()
    }

    fn issue(&mut self, kind: LoadKind) -> u64 {
        let next = self.issued.entry(kind).or_insert(0);
        *next += 1;
        *next
    }

    /// Accepts a result only if it is newer than the last one applied for its kind.
    fn accept(&mut self, kind: LoadKind, request: u64) -> bool {
        let applied = self.applied.entry(kind).or_insert(0);
        if request <= *applied {
            debug!(kind = kind.label(), request, "dropping stale result");
            return false;
        }
        *applied = request;
        true
    }

    fn in_flight_after(&self, kind: LoadKind, request: u64) -> bool {
        self.issued.get(&kind).is_some_and(|latest| *latest > request)
    }

    fn load_pods(&mut self) -> AppCommand {
        self.loading_pods = true;
        AppCommand::LoadPods {
            request: self.issue(LoadKind::Pods),
            namespace: self.namespace.clone(),
        }
    }

    fn load_namespaces(&mut self) -> AppCommand {
        self.loading_namespaces = true;
        AppCommand::LoadNamespaces {
            request: self.issue(LoadKind::Namespaces),
        }
    }

    fn load_contexts(&mut self) -> AppCommand {
        AppCommand::LoadContexts {
            request: self.issue(LoadKind::Contexts),
        }
    }

    fn record_error(&mut self, kind: LoadKind, message: String) {
        self.set_status(format!("Failed to load {}: {message}", kind.label()));
        self.last_error = Some(LoadFailure { kind, message });
    }

    fn clear_error(&mut self, kind: LoadKind) {
        if self
            .last_error
            .as_ref()
            .is_some_and(|failure| failure.kind == kind)
        {
            self.last_error = None;
        }
    }

    fn selected_target(&self) -> Option<ContainerTarget> {
        let pod = self.selected_pod()?;
        Some(ContainerTarget::new(
            &pod.namespace,
            &pod.name,
            pod.first_container(),
        ))
    }

    fn handle_pod_list(&mut self, action: Action) -> Vec<AppCommand> {
        let page = self.pod_page_size() as isize;
        match action {
            Action::Up => self.selected_pod = step(self.selected_pod, -1, self.pods.len()),
            Action::Down => self.selected_pod = step(self.selected_pod, 1, self.pods.len()),
            Action::PageUp => self.selected_pod = step(self.selected_pod, -page, self.pods.len()),
            Action::PageDown => self.selected_pod = step(self.selected_pod, page, self.pods.len()),
            Action::Top => self.selected_pod = 0,
            Action::Bottom => self.selected_pod = self.pods.len().saturating_sub(1),
            Action::OpenLogs => return self.open_logs(),
            Action::OpenExec => self.open_exec(),
            Action::OpenFiles => return self.open_files(),
            Action::Refresh => {
                self.set_status(format!("Refreshing pods in {}…", self.namespace));
                return vec![self.load_pods()];
            }
            Action::SelectNamespace => {
                self.push_overlay(Screen::NamespaceSelect);
                return vec![self.load_namespaces()];
            }
            Action::SelectContext => {
                self.push_overlay(Screen::ContextSelect);
                return vec![self.load_contexts()];
            }
            _ => {}
        }
        Vec::new()
    }

    fn open_logs(&mut self) -> Vec<AppCommand> {
        let Some(target) = self.selected_target() else {
            self.set_status("No pod selected");
            return Vec::new();
        };
        self.selected_container = target.container.clone();
        self.set_base(Screen::Logs);
        vec![self.start_log_stream(target)]
    }

    fn start_log_stream(&mut self, target: ContainerTarget) -> AppCommand {
        let subscription = self.logs.start(target.clone());
        self.set_status(format!("Streaming logs for {target}"));
        AppCommand::OpenLogStream {
            stream: subscription.stream,
            request: LogRequest {
                target,
                follow: true,
                tail_lines: self.log_tail_lines,
            },
            cancel: subscription.cancel,
        }
    }

    fn open_exec(&mut self) {
        let Some(target) = self.selected_target() else {
            self.set_status("No pod selected");
            return;
        };
        self.selected_container = target.container.clone();
        self.set_status(format!("Exec in {target}"));
        self.exec.reset(Some(target));
        self.set_base(Screen::Exec);
    }

    fn open_files(&mut self) -> Vec<AppCommand> {
        let Some(target) = self.selected_target() else {
            self.set_status("No pod selected");
            return Vec::new();
        };
        self.selected_container = target.container.clone();
        self.files.reset(Some(target.clone()));
        self.files.begin_load();
        self.set_base(Screen::Files);
        self.set_status(format!("Listing / in {target}"));
        vec![AppCommand::ListDirectory {
            target,
            path: "/".to_string(),
        }]
    }

    fn handle_logs(&mut self, action: Action) -> Vec<AppCommand> {
        match action {
            Action::Up => self.logs.scroll_up(1),
            Action::Down => self.logs.scroll_down(1),
            Action::PageUp => self.logs.page_up(),
            Action::PageDown => self.logs.page_down(),
            Action::Top => self.logs.goto_top(),
            Action::Bottom => self.logs.goto_bottom(),
            Action::ToggleFollow => self.logs.toggle_follow(),
            Action::TogglePause => self.logs.toggle_pause(),
            Action::Refresh => {
                if let Some(target) = self.logs.target().cloned() {
                    return vec![self.start_log_stream(target)];
                }
            }
            Action::NextContainer => return self.next_log_container(),
            _ => {}
        }
        Vec::new()
    }

    fn next_log_container(&mut self) -> Vec<AppCommand> {
        let Some(current) = self.logs.target().cloned() else {
            return Vec::new();
        };
        let Some(pod) = self
            .pods
            .iter()
            .find(|pod| pod.name == current.pod && pod.namespace == current.namespace)
        else {
            return Vec::new();
        };
        if pod.containers.len() < 2 {
            self.set_status(format!("{} has a single container", pod.name));
            return Vec::new();
        }

        let index = pod
            .containers
            .iter()
            .position(|container| Some(&container.name) == current.container.as_ref())
            .map(|index| (index + 1) % pod.containers.len())
            .unwrap_or(0);
        let container = pod.containers[index].name.clone();
        let target = ContainerTarget::new(&current.namespace, &current.pod, Some(&container));
        self.selected_container = Some(container);
        vec![self.start_log_stream(target)]
    }

    fn handle_exec(&mut self, action: Action) -> Vec<AppCommand> {
        let page = self.exec.page_size();
        match (self.exec.focus(), action) {
            (_, Action::ToggleFocus) => self.exec.toggle_focus(),
            (_, Action::PageUp) => self.exec.scroll_by(-page),
            (_, Action::PageDown) => self.exec.scroll_by(page),
            (ExecFocus::Input, Action::InputChar(c)) => self.exec.push_char(c),
            (ExecFocus::Input, Action::Backspace) => self.exec.backspace(),
            (ExecFocus::Input, Action::ClearInput) => self.exec.clear_input(),
            (ExecFocus::Input, Action::Up) => self.exec.history_prev(),
            (ExecFocus::Input, Action::Down) => self.exec.history_next(),
            (ExecFocus::Input, Action::Enter) => return self.submit_command(),
            (ExecFocus::Output, Action::Up) => self.exec.scroll_by(-1),
            (ExecFocus::Output, Action::Down) => self.exec.scroll_by(1),
            (ExecFocus::Output, Action::Top) => {
                self.exec.scroll_by(-(self.exec.output().len() as isize))
            }
            (ExecFocus::Output, Action::Bottom) => {
                self.exec.scroll_by(self.exec.output().len() as isize)
            }
            _ => {}
        }
        Vec::new()
    }

    fn submit_command(&mut self) -> Vec<AppCommand> {
        let Some(target) = self.exec.target().cloned() else {
            return Vec::new();
        };
        let Some((request, argv)) = self.exec.submit() else {
            return Vec::new();
        };
        self.set_status(format!("Running `{}` in {target}", argv.join(" ")));
        vec![AppCommand::RunCommand {
            request,
            target,
            argv,
        }]
    }

    fn handle_files(&mut self, action: Action) -> Vec<AppCommand> {
        let Some(target) = self.files.target().cloned() else {
            return Vec::new();
        };
        let page = self.files.page_size();

        if self.files.is_viewing() {
            match action {
                Action::Up => self.files.scroll_preview(-1),
                Action::Down => self.files.scroll_preview(1),
                Action::PageUp => self.files.scroll_preview(-page),
                Action::PageDown => self.files.scroll_preview(page),
                Action::Top => self.files.preview_to_end(false),
                Action::Bottom => self.files.preview_to_end(true),
                Action::Backspace => {
                    self.files.close_preview();
                }
                _ => {}
            }
            return Vec::new();
        }

        match action {
            Action::Up => self.files.move_selection(-1),
            Action::Down => self.files.move_selection(1),
            Action::PageUp => self.files.move_selection(-page),
            Action::PageDown => self.files.move_selection(page),
            Action::Top => self.files.select_first(),
            Action::Bottom => self.files.select_last(),
            Action::Enter => match self.files.open_selected() {
                Some(FileOpen::Directory(path)) => {
                    self.set_status(format!("Listing {path}"));
                    return vec![AppCommand::ListDirectory { target, path }];
                }
                Some(FileOpen::File(path)) => {
                    self.set_status(format!("Reading {path}"));
                    return vec![AppCommand::ReadFile {
                        target,
                        path,
                        max_bytes: self.file_preview_bytes,
                    }];
                }
                None => {}
            },
            Action::Backspace => {
                if let Some(path) = self.files.go_parent() {
                    self.set_status(format!("Listing {path}"));
                    return vec![AppCommand::ListDirectory { target, path }];
                }
            }
            Action::Refresh => {
                self.files.begin_load();
                return vec![AppCommand::ListDirectory {
                    target,
                    path: self.files.current_path().to_string(),
                }];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_namespace_select(&mut self, action: Action) -> Vec<AppCommand> {
        let len = self.namespaces.len();
        match action {
            Action::Up => self.selected_namespace = step(self.selected_namespace, -1, len),
            Action::Down => self.selected_namespace = step(self.selected_namespace, 1, len),
            Action::Top => self.selected_namespace = 0,
            Action::Bottom => self.selected_namespace = len.saturating_sub(1),
            Action::Refresh => return vec![self.load_namespaces()],
            Action::Enter => {
                let Some(namespace) = self
                    .namespaces
                    .get(self.selected_namespace)
                    .map(|record| record.name.clone())
                else {
                    return Vec::new();
                };
                self.pop_overlay();
                for record in &mut self.namespaces {
                    record.is_current = record.name == namespace;
                }
                self.namespace = namespace.clone();
                self.selected_pod = 0;
                self.set_status(format!("Switched to namespace {namespace}"));
                return vec![AppCommand::SetNamespace { namespace }, self.load_pods()];
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_context_select(&mut self, action: Action) -> Vec<AppCommand> {
        let len = self.contexts.len();
        match action {
            Action::Up => self.selected_context = step(self.selected_context, -1, len),
            Action::Down => self.selected_context = step(self.selected_context, 1, len),
            Action::Top => self.selected_context = 0,
            Action::Bottom => self.selected_context = len.saturating_sub(1),
            Action::Refresh => return vec![self.load_contexts()],
            Action::Enter => {
                let Some(context) = self
                    .contexts
                    .get(self.selected_context)
                    .map(|record| record.name.clone())
                else {
                    return Vec::new();
                };
                self.pop_overlay();
                self.switching_context = Some(context.clone());
                self.set_status(format!("Switching to context {context}…"));
                return vec![AppCommand::SwitchContext { context }];
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_pods_loaded(
        &mut self,
        request: u64,
        namespace: &str,
        result: Result<Vec<PodRecord>, String>,
    ) -> Vec<AppCommand> {
        if namespace != self.namespace || !self.accept(LoadKind::Pods, request) {
            return Vec::new();
        }
        self.loading_pods = self.in_flight_after(LoadKind::Pods, request);

        match result {
            Ok(pods) => {
                let previous = self.selected_pod().map(|pod| pod.name.clone());
                self.pods = pods;
                let index = previous
                    .and_then(|name| self.pods.iter().position(|pod| pod.name == name))
                    .unwrap_or(self.selected_pod);
                self.selected_pod = index.min(self.pods.len().saturating_sub(1));
                self.clear_error(LoadKind::Pods);
                self.last_refreshed = Some(Local::now());
                self.set_status(format!(
                    "Loaded {} pods in {}",
                    self.pods.len(),
                    self.namespace
                ));
            }
            Err(error) => self.record_error(LoadKind::Pods, error),
        }
        Vec::new()
    }

    fn on_namespaces_loaded(
        &mut self,
        request: u64,
        result: Result<Vec<NamespaceRecord>, String>,
    ) -> Vec<AppCommand> {
        if !self.accept(LoadKind::Namespaces, request) {
            return Vec::new();
        }
        self.loading_namespaces = self.in_flight_after(LoadKind::Namespaces, request);

        match result {
            Ok(namespaces) => {
                self.namespaces = namespaces;
                self.selected_namespace = self
                    .namespaces
                    .iter()
                    .position(|record| record.is_current)
                    .unwrap_or(0);
                self.clear_error(LoadKind::Namespaces);
            }
            Err(error) => self.record_error(LoadKind::Namespaces, error),
        }
        Vec::new()
    }

    fn on_contexts_loaded(
        &mut self,
        request: u64,
        contexts: Vec<ContextRecord>,
    ) -> Vec<AppCommand> {
        if !self.accept(LoadKind::Contexts, request) {
            return Vec::new();
        }
        self.contexts = contexts;
        self.selected_context = self
            .contexts
            .iter()
            .position(|record| record.is_current)
            .unwrap_or(0);
        if let Some(current) = self.contexts.iter().find(|record| record.is_current) {
            self.context = current.name.clone();
        }
        self.clear_error(LoadKind::Contexts);
        Vec::new()
    }

    fn on_context_switched(
        &mut self,
        context: String,
        result: Result<String, String>,
    ) -> Vec<AppCommand> {
        self.switching_context = None;
        match result {
            Ok(namespace) => {
                self.set_status(format!("Switched to context {context} ({namespace})"));
                self.context = context;
                self.namespace = namespace;
                self.pods.clear();
                self.namespaces.clear();
                self.selected_pod = 0;
                self.clear_error(LoadKind::ContextSwitch);
                vec![self.load_pods(), self.load_contexts()]
            }
            Err(error) => {
                self.record_error(LoadKind::ContextSwitch, error);
                Vec::new()
            }
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let max_index = len.saturating_sub(1) as isize;
    let current = current.min(max_index as usize) as isize;
    (current + delta).clamp(0, max_index) as usize
}

fn listing_status(path: &str, files: &FileBrowser) -> String {
    if let Some(error) = files.error() {
        return error.to_string();
    }
    match files.skipped() {
        0 => format!("{path}: {} entries", files.entries().len()),
        skipped => format!(
            "{path}: {} entries ({skipped} unparsable lines skipped)",
            files.entries().len()
        ),
    }
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
