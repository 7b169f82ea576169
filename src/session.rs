use crate::app::{AppCommand, AppEvent};
use crate::cluster::{ClusterClient, LogRequest};
use crate::model::ExecOutcome;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs [`AppCommand`]s against a cluster client and reports results as [`AppEvent`]s.
///
/// Namespace changes mutate the client in place on the event loop. A context switch runs
/// on a clone; the switched client is adopted at the next dispatch. Everything else is
/// spawned and answers through `events`, except log streams, which answer through the
/// bounded `log_events` and wait when it is full.
pub struct Session<C: ClusterClient> {
    client: C,
    events: mpsc::UnboundedSender<AppEvent>,
    log_events: mpsc::Sender<AppEvent>,
    pending_switch: Option<oneshot::Receiver<C>>,
    list_timeout: Duration,
    exec_timeout: Duration,
}

impl<C: ClusterClient> Session<C> {
    pub fn new(
        client: C,
        events: mpsc::UnboundedSender<AppEvent>,
        log_events: mpsc::Sender<AppEvent>,
        list_timeout: Duration,
        exec_timeout: Duration,
    ) -> Self {
        Self {
            client,
            events,
            log_events,
            pending_switch: None,
            list_timeout,
            exec_timeout,
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn dispatch_all(&mut self, commands: Vec<AppCommand>) {
        for command in commands {
            self.dispatch(command).await;
        }
    }

    pub async fn dispatch(&mut self, command: AppCommand) {
        self.adopt_switched_client();
        match command {
            AppCommand::LoadPods { request, namespace } => {
                debug!(request, %namespace, "loading pods");
                let client = self.client.clone();
                let label = format!("listing pods in {namespace}");
                let call_namespace = namespace.clone();
                self.spawn_bounded(
                    self.list_timeout,
                    label,
                    move |result| AppEvent::PodsLoaded {
                        request,
                        namespace,
                        result,
                    },
                    async move { client.list_pods(&call_namespace).await },
                );
            }
            AppCommand::LoadNamespaces { request } => {
                debug!(request, "loading namespaces");
                let client = self.client.clone();
                self.spawn_bounded(
                    self.list_timeout,
                    "listing namespaces".to_string(),
                    move |result| AppEvent::NamespacesLoaded { request, result },
                    async move { client.list_namespaces().await },
                );
            }
            AppCommand::LoadContexts { request } => {
                let contexts = self.client.list_contexts();
                debug!(request, count = contexts.len(), "contexts listed");
                self.send(AppEvent::ContextsLoaded { request, contexts });
            }
            AppCommand::SetNamespace { namespace } => {
                self.client.set_namespace(&namespace);
            }
            AppCommand::SwitchContext { context } => {
                info!(%context, "switching context");
                let mut switched = self.client.clone();
                let events = self.events.clone();
                let limit = self.list_timeout;
                let (adopt, pending) = oneshot::channel();
                self.pending_switch = Some(pending);
                tokio::spawn(async move {
                    let outcome = timeout(limit, switched.switch_context(&context)).await;
                    let result = match outcome {
                        Ok(Ok(())) => {
                            let namespace = switched.current_namespace().to_string();
                            let _ = adopt.send(switched);
                            Ok(namespace)
                        }
                        Ok(Err(error)) => Err(compact_error(&error)),
                        Err(_) => Err(timeout_message("switching context", limit)),
                    };
                    if let Err(error) = &result {
                        warn!(%context, %error, "context switch failed");
                    }
                    let _ = events.send(AppEvent::ContextSwitched { context, result });
                });
            }
            AppCommand::OpenLogStream {
                stream,
                request,
                cancel,
            } => {
                debug!(stream, target = %request.target, "opening log stream");
                tokio::spawn(forward_log_stream(
                    self.client.clone(),
                    self.log_events.clone(),
                    stream,
                    request,
                    cancel,
                ));
            }
            AppCommand::RunCommand {
                request,
                target,
                argv,
            } => {
                info!(%target, command = %argv.join(" "), "running command");
                let client = self.client.clone();
                let events = self.events.clone();
                let limit = self.exec_timeout;
                tokio::spawn(async move {
                    let outcome = match timeout(limit, client.run_command(&target, &argv)).await {
                        Ok(outcome) => outcome,
                        Err(_) => ExecOutcome::failed(
                            "",
                            "",
                            1,
                            format!("command timed out after {}s", limit.as_secs()),
                        ),
                    };
                    let _ = events.send(AppEvent::CommandFinished { request, outcome });
                });
            }
            AppCommand::ListDirectory { target, path } => {
                debug!(%target, %path, "listing directory");
                let client = self.client.clone();
                let label = format!("listing {path}");
                let call_target = target.clone();
                let call_path = path.clone();
                self.spawn_bounded(
                    self.exec_timeout,
                    label,
                    move |result| AppEvent::DirectoryListed {
                        target,
                        path,
                        result,
                    },
                    async move { client.list_directory(&call_target, &call_path).await },
                );
            }
            AppCommand::ReadFile {
                target,
                path,
                max_bytes,
            } => {
                debug!(%target, %path, max_bytes, "reading file");
                let client = self.client.clone();
                let label = format!("reading {path}");
                let call_target = target.clone();
                let call_path = path.clone();
                self.spawn_bounded(
                    self.exec_timeout,
                    label,
                    move |result| AppEvent::FileLoaded {
                        target,
                        path,
                        result,
                    },
                    async move {
                        client
                            .read_file(&call_target, &call_path, max_bytes)
                            .await
                    },
                );
            }
        }
    }

    /// Spawns `work` under `limit` and posts its flattened result through `finish`.
    fn spawn_bounded<T, W, F>(&self, limit: Duration, label: String, finish: F, work: W)
    where
        T: Send + 'static,
        W: Future<Output = anyhow::Result<T>> + Send + 'static,
        F: FnOnce(Result<T, String>) -> AppEvent + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match timeout(limit, work).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(compact_error(&error)),
                Err(_) => Err(timeout_message(&label, limit)),
            };
            if let Err(error) = &result {
                warn!(%label, %error, "background operation failed");
            }
            let _ = events.send(finish(result));
        });
    }

    /// Takes over the client of a finished context switch. A failed switch leaves the
    /// current client in place.
    fn adopt_switched_client(&mut self) {
        let Some(pending) = self.pending_switch.as_mut() else {
            return;
        };
        match pending.try_recv() {
            Ok(client) => {
                debug!(context = client.current_context(), "adopting switched client");
                self.client = client;
                self.pending_switch = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => self.pending_switch = None,
        }
    }

    fn send(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            debug!("event loop closed; dropping event");
        }
    }
}

async fn forward_log_stream<C: ClusterClient>(
    client: C,
    events: mpsc::Sender<AppEvent>,
    stream: u64,
    request: LogRequest,
    cancel: CancellationToken,
) {
    let mut lines = match client.open_log_stream(&request, cancel.clone()).await {
        Ok(lines) => lines,
        Err(error) => {
            let error = compact_error(&error);
            warn!(stream, %error, "log stream failed to open");
            deliver(&events, &cancel, AppEvent::LogStreamFailed { stream, error }).await;
            return;
        }
    };
    if !deliver(&events, &cancel, AppEvent::LogStreamOpened { stream }).await {
        return;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = lines.recv() => next,
        };
        let Some(line) = next else {
            deliver(&events, &cancel, AppEvent::LogStreamEnded { stream }).await;
            break;
        };
        let failed = line.error.is_some();
        if !deliver(&events, &cancel, AppEvent::LogLineReceived { stream, line }).await || failed {
            break;
        }
    }
    debug!(stream, "log forwarder stopped");
}

/// Waits for room in the log queue. False once the stream is cancelled or the loop is gone.
async fn deliver(
    events: &mpsc::Sender<AppEvent>,
    cancel: &CancellationToken,
    event: AppEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

fn timeout_message(label: &str, limit: Duration) -> String {
    format!("{label} timed out after {}s", limit.as_secs())
}

/// The error plus up to two causes, one per line.
pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::app::{App, AppEvent, LoadKind};
    use crate::cluster::{ClusterClient, LOG_QUEUE_CAPACITY, LogRequest};
    use crate::config::Settings;
    use crate::input::map_key;
    use crate::logs::StreamState;
    use crate::model::{
        ContainerLifecycle, ContainerRecord, ContainerTarget, ContextRecord, ExecOutcome,
        LogLine, NamespaceRecord, PodPhase, PodRecord,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    #[derive(Clone)]
    struct MockCluster {
        context: String,
        namespace: String,
        pods: Vec<PodRecord>,
        namespaces: Vec<&'static str>,
        log_lines: Vec<String>,
        hold_log_stream: bool,
        fail_log_stream: bool,
        delay: Duration,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MockCluster {
        fn new(pods: Vec<PodRecord>) -> Self {
            Self {
                context: "dev".to_string(),
                namespace: "default".to_string(),
                pods,
                namespaces: vec!["default", "kube-system", "prod"],
                log_lines: Vec::new(),
                hold_log_stream: false,
                fail_log_stream: false,
                delay: Duration::ZERO,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().expect("calls lock").push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl ClusterClient for MockCluster {
        fn current_context(&self) -> &str {
            &self.context
        }

        fn current_namespace(&self) -> &str {
            &self.namespace
        }

        fn set_namespace(&mut self, namespace: &str) {
            self.record(format!("set_namespace {namespace}"));
            self.namespace = namespace.to_string();
        }

        async fn switch_context(&mut self, name: &str) -> Result<()> {
            self.record(format!("switch_context {name}"));
            tokio::time::sleep(self.delay).await;
            if name != "dev" && name != "prod" {
                bail!("context not found: {name}");
            }
            self.context = name.to_string();
            self.namespace = "default".to_string();
            Ok(())
        }

        fn list_contexts(&self) -> Vec<ContextRecord> {
            ["dev", "prod"]
                .into_iter()
                .map(|name| ContextRecord {
                    name: name.to_string(),
                    cluster: format!("{name}-cluster"),
                    user: "ops".to_string(),
                    namespace: "default".to_string(),
                    is_current: name == self.context,
                })
                .collect()
        }

        async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
            self.record(format!("list_pods {namespace}"));
            tokio::time::sleep(self.delay).await;
            Ok(self.pods.clone())
        }

        async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>> {
            self.record("list_namespaces".to_string());
            Ok(self
                .namespaces
                .iter()
                .map(|name| NamespaceRecord {
                    name: name.to_string(),
                    status: "Active".to_string(),
                    age: Duration::from_secs(600),
                    is_current: *name == self.namespace,
                })
                .collect())
        }

        async fn open_log_stream(
            &self,
            request: &LogRequest,
            cancel: CancellationToken,
        ) -> Result<mpsc::Receiver<LogLine>> {
            self.record(format!("open_log_stream {}", request.target));
            if self.fail_log_stream {
                bail!("pods \"{}\" not found", request.target.pod);
            }

            let (tx, rx) = mpsc::channel(LOG_QUEUE_CAPACITY);
            let lines = self.log_lines.clone();
            let hold = self.hold_log_stream;
            tokio::spawn(async move {
                for line in lines {
                    if tx.send(LogLine::new(line)).await.is_err() {
                        return;
                    }
                }
                if hold {
                    cancel.cancelled().await;
                }
            });
            Ok(rx)
        }

        async fn run_command(&self, target: &ContainerTarget, argv: &[String]) -> ExecOutcome {
            self.record(format!("run {} {}", target.pod, argv.join(" ")));
            match argv.first().map(String::as_str) {
                Some("pwd") => ExecOutcome::completed("/app\n", ""),
                Some("sleep") => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    ExecOutcome::completed("", "")
                }
                _ => ExecOutcome::failed("", "sh: not found\n", 127, "exit code 127"),
            }
        }

        async fn list_directory(&self, target: &ContainerTarget, path: &str) -> Result<String> {
            self.record(format!("ls {} {path}", target.pod));
            Ok("total 4\ndrwxr-xr-x 2 root root 4096 Jan 1 12:00 app\n".to_string())
        }

        async fn read_file(
            &self,
            target: &ContainerTarget,
            path: &str,
            max_bytes: usize,
        ) -> Result<String> {
            self.record(format!("read {} {path} {max_bytes}", target.pod));
            Ok("hello\n".to_string())
        }
    }

    fn pod(name: &str, phase: PodPhase, ready: usize) -> PodRecord {
        PodRecord {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase,
            reason: String::new(),
            ready,
            total: 1,
            restarts: 0,
            age: Duration::from_secs(120),
            ip: String::new(),
            node: String::new(),
            containers: vec![ContainerRecord {
                name: "app".to_string(),
                ready: ready == 1,
                restarts: 0,
                state: ContainerLifecycle::Running,
                reason: String::new(),
            }],
        }
    }

    struct Harness {
        app: App,
        session: Session<MockCluster>,
        events: mpsc::UnboundedReceiver<AppEvent>,
        log_events: mpsc::Receiver<AppEvent>,
        mock: MockCluster,
    }

    impl Harness {
        fn new(mock: MockCluster, list_timeout: Duration, exec_timeout: Duration) -> Self {
            let (tx, events) = mpsc::unbounded_channel();
            let (log_tx, log_events) = mpsc::channel(LOG_QUEUE_CAPACITY);
            let session = Session::new(mock.clone(), tx, log_tx, list_timeout, exec_timeout);
            let app = App::new(
                "https://mock:6443".to_string(),
                "dev".to_string(),
                "default".to_string(),
                &Settings::default(),
            );
            Self {
                app,
                session,
                events,
                log_events,
                mock,
            }
        }

        fn standard() -> Self {
            Self::new(
                MockCluster::new(vec![
                    pod("alpha", PodPhase::Running, 1),
                    pod("beta", PodPhase::Pending, 0),
                ]),
                Duration::from_secs(10),
                Duration::from_secs(30),
            )
        }

        async fn bootstrap(&mut self) {
            let commands = self.app.bootstrap();
            self.session.dispatch_all(commands).await;
            self.pump(2).await;
        }

        async fn press(&mut self, code: KeyCode) {
            let key = KeyEvent::new(code, KeyModifiers::NONE);
            if let Some(action) = map_key(self.app.key_scope(), key) {
                let commands = self.app.apply_action(action);
                self.session.dispatch_all(commands).await;
            }
        }

        async fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c)).await;
            }
        }

        async fn next_event(&mut self) -> AppEvent {
            let next = async {
                tokio::select! {
                    Some(event) = self.events.recv() => event,
                    Some(event) = self.log_events.recv() => event,
                    else => panic!("event channels closed"),
                }
            };
            timeout(Duration::from_secs(5), next)
                .await
                .expect("event before deadline")
        }

        /// Applies `count` events, dispatching whatever they trigger.
        async fn pump(&mut self, count: usize) {
            for _ in 0..count {
                let event = self.next_event().await;
                let commands = self.app.apply_event(event);
                self.session.dispatch_all(commands).await;
            }
        }
    }

    #[tokio::test]
    async fn exec_in_selected_pod_reports_outcome() {
        let mut harness = Harness::standard();
        harness.bootstrap().await;
        assert_eq!(harness.app.pods().len(), 2);
        assert_eq!(harness.app.pods()[0].ready_label(), "1/1");
        assert_eq!(harness.app.pods()[1].phase, PodPhase::Pending);

        harness.press(KeyCode::Char('j')).await;
        harness.press(KeyCode::Char('e')).await;
        harness.type_text("pwd").await;
        harness.press(KeyCode::Enter).await;
        harness.pump(1).await;

        let outcome = harness.app.exec().last_outcome().expect("command finished");
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("/app"));
        assert!(harness.mock.calls().contains(&"run beta pwd".to_string()));
    }

    #[tokio::test]
    async fn confirming_namespace_reloads_pods_once() {
        let mut harness = Harness::standard();
        harness.bootstrap().await;

        harness.press(KeyCode::Char('n')).await;
        harness.pump(1).await;
        let current = harness
            .app
            .namespaces()
            .iter()
            .filter(|namespace| namespace.is_current)
            .map(|namespace| namespace.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(current, ["default"]);

        harness.press(KeyCode::Char('j')).await;
        harness.press(KeyCode::Char('j')).await;
        harness.press(KeyCode::Enter).await;
        harness.pump(1).await;

        assert_eq!(harness.session.client().current_namespace(), "prod");
        assert_eq!(harness.app.namespace(), "prod");
        let prod_loads = harness
            .mock
            .calls()
            .iter()
            .filter(|call| *call == "list_pods prod")
            .count();
        assert_eq!(prod_loads, 1);
    }

    #[tokio::test]
    async fn slow_pod_list_times_out_as_load_error() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.delay = Duration::from_secs(30);
        let mut harness = Harness::new(mock, Duration::from_millis(20), Duration::from_secs(30));

        harness.bootstrap().await;
        let failure = harness.app.last_error().expect("timeout recorded");
        assert_eq!(failure.kind, LoadKind::Pods);
        assert!(failure.message.contains("timed out"));
        assert!(harness.app.pods().is_empty());
    }

    #[tokio::test]
    async fn slow_command_times_out_with_failed_outcome() {
        let mut harness = Harness::new(
            MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]),
            Duration::from_secs(10),
            Duration::from_millis(20),
        );
        harness.bootstrap().await;

        harness.press(KeyCode::Char('e')).await;
        harness.type_text("sleep 60").await;
        harness.press(KeyCode::Enter).await;
        harness.pump(1).await;

        let outcome = harness.app.exec().last_outcome().expect("command finished");
        assert_eq!(outcome.exit_code, 1);
        assert!(
            outcome
                .error
                .as_deref()
                .is_some_and(|error| error.starts_with("command timed out"))
        );
    }

    #[tokio::test]
    async fn log_lines_arrive_in_order_and_back_cancels_reader() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.log_lines = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        mock.hold_log_stream = true;
        let mut harness = Harness::new(mock, Duration::from_secs(10), Duration::from_secs(30));
        harness.bootstrap().await;

        harness.press(KeyCode::Char('l')).await;
        harness.pump(4).await;
        assert_eq!(harness.app.logs().lines(), ["one", "two", "three"]);
        assert_eq!(harness.app.logs().state(), StreamState::Streaming);

        harness.press(KeyCode::Esc).await;
        let Harness {
            session,
            mut log_events,
            ..
        } = harness;
        drop(session);
        let closed = timeout(Duration::from_secs(5), async {
            while log_events.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "log forwarder kept running after cancel");
    }

    #[tokio::test]
    async fn idle_consumer_leaves_at_most_one_queue_of_log_events() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.log_lines = (0..5_000).map(|index| format!("line {index}")).collect();
        mock.hold_log_stream = true;
        let mut harness = Harness::new(mock, Duration::from_secs(10), Duration::from_secs(30));
        harness.bootstrap().await;

        harness.press(KeyCode::Char('l')).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut queued = Vec::new();
        while let Ok(event) = harness.log_events.try_recv() {
            queued.push(event);
        }
        assert!(
            queued.len() <= LOG_QUEUE_CAPACITY,
            "{} log events queued",
            queued.len()
        );
        assert!(matches!(queued.first(), Some(AppEvent::LogStreamOpened { .. })));

        // The reader resumes once there is room again, still in order.
        tokio::time::sleep(Duration::from_millis(50)).await;
        match harness.log_events.try_recv() {
            Ok(AppEvent::LogLineReceived { line, .. }) => {
                assert_eq!(line.content, format!("line {}", queued.len() - 1));
            }
            other => panic!("expected the next log line, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finished_log_source_ends_stream() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.log_lines = vec!["only".to_string()];
        let mut harness = Harness::new(mock, Duration::from_secs(10), Duration::from_secs(30));
        harness.bootstrap().await;

        harness.press(KeyCode::Char('l')).await;
        harness.pump(3).await;
        assert_eq!(harness.app.logs().state(), StreamState::Ended);
        assert!(harness.app.logs().status_line().starts_with("[STREAM ENDED]"));
    }

    #[tokio::test]
    async fn log_open_failure_is_a_stream_error() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.fail_log_stream = true;
        let mut harness = Harness::new(mock, Duration::from_secs(10), Duration::from_secs(30));
        harness.bootstrap().await;

        harness.press(KeyCode::Char('l')).await;
        harness.pump(1).await;
        assert_eq!(harness.app.logs().state(), StreamState::Error);
        assert_eq!(harness.app.logs().error(), Some("pods \"alpha\" not found"));
    }

    #[tokio::test]
    async fn context_switch_reloads_against_new_context() {
        let mut harness = Harness::standard();
        harness.bootstrap().await;
        assert_eq!(harness.app.contexts().len(), 2);

        harness.press(KeyCode::Char('c')).await;
        harness.pump(1).await;
        harness.press(KeyCode::Char('j')).await;
        harness.press(KeyCode::Enter).await;
        harness.pump(1).await;

        assert_eq!(harness.session.client().current_context(), "prod");
        assert_eq!(harness.app.context(), "prod");
        harness.pump(2).await;
        assert_eq!(harness.app.pods().len(), 2);
        assert!(
            harness
                .app
                .contexts()
                .iter()
                .any(|context| context.name == "prod" && context.is_current)
        );
    }

    #[tokio::test]
    async fn slow_context_switch_does_not_hold_the_loop() {
        let mut mock = MockCluster::new(vec![pod("alpha", PodPhase::Running, 1)]);
        mock.delay = Duration::from_secs(30);
        let mut harness = Harness::new(mock, Duration::from_millis(50), Duration::from_secs(30));
        harness.bootstrap().await;

        harness.press(KeyCode::Char('c')).await;
        harness.pump(1).await;
        harness.press(KeyCode::Char('j')).await;
        let pressed = timeout(Duration::from_millis(20), harness.press(KeyCode::Enter)).await;
        assert!(pressed.is_ok(), "context switch ran on the event loop");
        assert_eq!(harness.app.switching_context(), Some("prod"));

        harness.pump(1).await;
        let failure = harness.app.last_error().expect("switch timeout recorded");
        assert_eq!(failure.kind, LoadKind::ContextSwitch);
        assert!(failure.message.contains("timed out"));
        assert_eq!(harness.session.client().current_context(), "dev");
        assert_eq!(harness.app.context(), "dev");
    }

    #[tokio::test]
    async fn file_browser_lists_and_previews() {
        let mut harness = Harness::standard();
        harness.bootstrap().await;

        harness.press(KeyCode::Char('f')).await;
        harness.pump(1).await;
        assert_eq!(harness.app.files().entries()[0].name, "app");
        assert!(harness.mock.calls().contains(&"ls alpha /".to_string()));

        harness.press(KeyCode::Enter).await;
        harness.pump(1).await;
        assert_eq!(harness.app.files().current_path(), "/app");
    }

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = anyhow::anyhow!("root cause")
            .context("middle")
            .context("outer")
            .context("top");
        assert_eq!(
            super::compact_error(&error),
            "top\ncaused by: outer\ncaused by: middle"
        );
    }
}
