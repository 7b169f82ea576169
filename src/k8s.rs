use anyhow::{Context, Result, bail};
use futures::{AsyncBufRead, AsyncBufReadExt, StreamExt};
use k8s_openapi::api::core::v1::{ContainerStatus, Namespace, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cluster::{ClusterClient, LOG_QUEUE_CAPACITY, LogRequest};
use crate::model::{
    ContainerLifecycle, ContainerRecord, ContainerTarget, ContextRecord, DEFAULT_NAMESPACE,
    ExecOutcome, LogLine, NamespaceRecord, PodPhase, PodRecord,
};

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    namespace: String,
    kube_targets: Vec<KubeTarget>,
}

#[derive(Debug, Clone)]
struct KubeTarget {
    context: String,
    cluster_name: String,
    user_name: Option<String>,
    namespace: Option<String>,
}

impl KubeGateway {
    /// Connects using the kubeconfig (or in-cluster config), optionally pinning the
    /// starting context and namespace.
    pub async fn connect(context: Option<String>, namespace: Option<String>) -> Result<Self> {
        let mut gateway = Self::from_kube_selection(context).await?;
        if let Some(namespace) = namespace.filter(|value| !value.trim().is_empty()) {
            gateway.namespace = namespace;
        }
        info!(
            context = %gateway.context,
            namespace = %gateway.namespace,
            cluster = %gateway.cluster,
            "connected to cluster"
        );
        Ok(gateway)
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    async fn from_kube_selection(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if context.is_some() {
                bail!("kubeconfig not found; context switching is unavailable in this environment");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster_url = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let kube_targets = kubeconfig
            .as_ref()
            .map(build_kube_targets)
            .unwrap_or_default();
        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context: active_context,
            cluster: cluster_url,
            namespace: default_namespace,
            kube_targets,
        })
    }

    /// `--context` for kubectl, only when the active context comes from a kubeconfig.
    fn kubectl_context(&self) -> Option<&str> {
        self.kube_targets
            .iter()
            .any(|target| target.context == self.context)
            .then_some(self.context.as_str())
    }
}

impl ClusterClient for KubeGateway {
    fn current_context(&self) -> &str {
        &self.context
    }

    fn current_namespace(&self) -> &str {
        &self.namespace
    }

    fn set_namespace(&mut self, namespace: &str) {
        debug!(namespace, "namespace selected");
        self.namespace = namespace.to_string();
    }

    async fn switch_context(&mut self, name: &str) -> Result<()> {
        if !self.kube_targets.iter().any(|target| target.context == name) {
            bail!("context not found: {name}");
        }
        let switched = Self::from_kube_selection(Some(name.to_string()))
            .await
            .with_context(|| format!("failed to switch to context {name}"))?;
        *self = switched;
        info!(context = %self.context, namespace = %self.namespace, "context switched");
        Ok(())
    }

    fn list_contexts(&self) -> Vec<ContextRecord> {
        context_records(&self.kube_targets, &self.context)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRecord>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list pods in {namespace}"))?;

        let now = now_seconds();
        let mut records = list
            .into_iter()
            .map(|pod| pod_record(&pod, now))
            .collect::<Vec<_>>();
        records.sort_by(|left, right| left.name.cmp(&right.name));
        debug!(namespace, count = records.len(), "pods listed");
        Ok(records)
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .context("failed to list namespaces")?;

        let now = now_seconds();
        let mut records = list
            .into_iter()
            .map(|namespace| namespace_record(&namespace, &self.namespace, now))
            .collect::<Vec<_>>();
        records.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(records)
    }

    async fn open_log_stream(
        &self,
        request: &LogRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<LogLine>> {
        let target = &request.target;
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);
        let params = LogParams {
            container: target.container.clone(),
            follow: request.follow,
            tail_lines: Some(request.tail_lines),
            ..LogParams::default()
        };

        let reader = pods
            .log_stream(&target.pod, &params)
            .await
            .with_context(|| format!("failed to open log stream for {target}"))?;

        let (tx, rx) = mpsc::channel(LOG_QUEUE_CAPACITY);
        tokio::spawn(forward_log_lines(reader, tx, cancel));
        Ok(rx)
    }

    async fn run_command(&self, target: &ContainerTarget, argv: &[String]) -> ExecOutcome {
        if argv.is_empty() {
            return ExecOutcome::failed("", "", 1, "command is required");
        }
        match run_kubectl_exec(self.kubectl_context(), target, argv).await {
            Ok(outcome) => outcome,
            Err(error) => ExecOutcome::failed("", "", 1, format!("{error:#}")),
        }
    }

    async fn list_directory(&self, target: &ContainerTarget, path: &str) -> Result<String> {
        let argv = ls_argv(path);
        let outcome = self.run_command(target, &argv).await;
        listing_result(path, outcome)
    }

    async fn read_file(
        &self,
        target: &ContainerTarget,
        path: &str,
        max_bytes: usize,
    ) -> Result<String> {
        let argv = if max_bytes == 0 {
            vec!["cat".to_string(), path.to_string()]
        } else {
            vec![
                "head".to_string(),
                "-c".to_string(),
                max_bytes.to_string(),
                path.to_string(),
            ]
        };
        let outcome = self.run_command(target, &argv).await;
        file_result(path, outcome)
    }
}

/// Reads lines until the source ends, fails, or `cancel` fires. A read failure is sent as
/// a final error line.
async fn forward_log_lines<R>(reader: R, tx: mpsc::Sender<LogLine>, cancel: CancellationToken)
where
    R: AsyncBufRead + Send + 'static,
{
    let mut lines = Box::pin(reader.lines());
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = lines.next() => next,
        };
        let line = match next {
            Some(Ok(line)) => LogLine::new(line),
            Some(Err(error)) => LogLine::failure(format!("log stream read failed: {error}")),
            None => break,
        };

        let failed = line.error.is_some();
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(line) => sent,
        };
        if sent.is_err() || failed {
            break;
        }
    }
    debug!(cancelled = cancel.is_cancelled(), "log reader stopped");
}

fn kubectl_exec_args(
    context: Option<&str>,
    target: &ContainerTarget,
    argv: &[String],
) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(context) = context {
        args.push("--context".to_string());
        args.push(context.to_string());
    }
    args.push("-n".to_string());
    args.push(target.namespace.clone());
    args.push(target.pod.clone());
    if let Some(container) = target.container.as_deref() {
        args.push("-c".to_string());
        args.push(container.to_string());
    }
    args.push("--".to_string());
    args.extend(argv.iter().cloned());
    args
}

async fn run_kubectl_exec(
    context: Option<&str>,
    target: &ContainerTarget,
    argv: &[String],
) -> Result<ExecOutcome> {
    let mut cmd = TokioCommand::new("kubectl");
    cmd.args(kubectl_exec_args(context, target, argv))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("failed to execute kubectl for {target}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if output.status.success() {
        return Ok(ExecOutcome::completed(stdout, stderr));
    }

    let exit_code = output.status.code().unwrap_or(1);
    debug!(%target, exit_code, "kubectl exec failed");
    Ok(ExecOutcome::failed(
        stdout,
        stderr,
        exit_code,
        format!("command terminated with exit code {exit_code}"),
    ))
}

/// `ls -l` prints a symlink named on the command line as the link itself; the trailing
/// slash makes it list the directory the link points at.
fn ls_argv(path: &str) -> Vec<String> {
    let dir = if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    };
    vec!["ls".to_string(), "-la".to_string(), dir]
}

fn listing_result(path: &str, outcome: ExecOutcome) -> Result<String> {
    let stderr = outcome.stderr.as_str();
    if let Some(error) = outcome.error.as_deref() {
        if stderr.contains("No such file or directory") {
            bail!("directory not found: {path}");
        }
        if stderr.contains("Permission denied") {
            bail!("permission denied: {path}");
        }
        if stderr.contains("Not a directory") {
            bail!("not a directory: {path}");
        }
        let detail = if stderr.trim().is_empty() {
            error
        } else {
            stderr.trim()
        };
        bail!("failed to list directory: {detail}");
    }

    if stderr.contains("cannot access") {
        bail!("cannot access: {path}");
    }
    Ok(outcome.stdout)
}

fn file_result(path: &str, outcome: ExecOutcome) -> Result<String> {
    let Some(error) = outcome.error.as_deref() else {
        return Ok(outcome.stdout);
    };

    let stderr = outcome.stderr.as_str();
    if stderr.contains("No such file or directory") {
        bail!("file not found: {path}");
    }
    if stderr.contains("Permission denied") {
        bail!("permission denied: {path}");
    }
    if stderr.contains("Is a directory") {
        bail!("is a directory: {path}");
    }
    let detail = if stderr.trim().is_empty() {
        error
    } else {
        stderr.trim()
    };
    bail!("failed to read file: {detail}")
}

fn build_kube_targets(kubeconfig: &Kubeconfig) -> Vec<KubeTarget> {
    let mut targets = kubeconfig
        .contexts
        .iter()
        .filter_map(|named| {
            let context = named.context.as_ref()?;
            Some(KubeTarget {
                context: named.name.clone(),
                cluster_name: context.cluster.clone(),
                user_name: context.user.clone(),
                namespace: context.namespace.clone(),
            })
        })
        .collect::<Vec<_>>();

    targets.sort_by(|left, right| left.context.cmp(&right.context));
    targets.dedup_by(|left, right| left.context == right.context);
    targets
}

fn context_records(targets: &[KubeTarget], current: &str) -> Vec<ContextRecord> {
    targets
        .iter()
        .map(|target| ContextRecord {
            name: target.context.clone(),
            cluster: target.cluster_name.clone(),
            user: target.user_name.clone().unwrap_or_default(),
            namespace: target
                .namespace
                .clone()
                .filter(|namespace| !namespace.is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            is_current: target.context == current,
        })
        .collect()
}

fn pod_record(pod: &Pod, now: i64) -> PodRecord {
    let status = pod.status.as_ref();
    let statuses = status
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);

    let containers = if statuses.is_empty() {
        pod.spec
            .iter()
            .flat_map(|spec| spec.containers.iter())
            .map(|container| ContainerRecord {
                name: container.name.clone(),
                ready: false,
                restarts: 0,
                state: ContainerLifecycle::Waiting,
                reason: String::new(),
            })
            .collect::<Vec<_>>()
    } else {
        statuses.iter().map(container_record).collect::<Vec<_>>()
    };

    let (phase, reason) = pod_phase_and_reason(pod, &containers);
    PodRecord {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        phase,
        reason,
        ready: containers.iter().filter(|container| container.ready).count(),
        total: containers.len(),
        restarts: containers.iter().map(|container| container.restarts).sum(),
        age: age_since(pod.metadata.creation_timestamp.as_ref(), now),
        ip: status
            .and_then(|status| status.pod_ip.clone())
            .unwrap_or_default(),
        node: pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_default(),
        containers,
    }
}

fn pod_phase_and_reason(pod: &Pod, containers: &[ContainerRecord]) -> (PodPhase, String) {
    if pod.metadata.deletion_timestamp.is_some() {
        return (PodPhase::Terminating, String::new());
    }

    let status = pod.status.as_ref();
    let raw_phase = status.and_then(|status| status.phase.as_deref());
    let phase = PodPhase::from_phase(raw_phase);
    let first_reason = |state: ContainerLifecycle| {
        containers
            .iter()
            .find(|container| container.state == state && !container.reason.is_empty())
            .map(|container| container.reason.clone())
    };

    let reason = match phase {
        PodPhase::Failed => status
            .and_then(|status| status.reason.clone())
            .filter(|reason| !reason.is_empty())
            .or_else(|| first_reason(ContainerLifecycle::Terminated)),
        PodPhase::Pending => status
            .and_then(|status| status.conditions.as_ref())
            .and_then(|conditions| {
                conditions.iter().find(|condition| {
                    condition.type_ == "PodScheduled" && condition.status == "False"
                })
            })
            .and_then(|condition| condition.reason.clone())
            .filter(|reason| !reason.is_empty())
            .or_else(|| first_reason(ContainerLifecycle::Waiting)),
        PodPhase::Running => containers
            .iter()
            .find(|container| !container.ready)
            .map(|container| container.reason.clone())
            .filter(|reason| !reason.is_empty()),
        PodPhase::Unknown => raw_phase
            .filter(|raw| !raw.is_empty() && *raw != "Unknown")
            .map(str::to_string),
        PodPhase::Succeeded | PodPhase::Terminating => None,
    };

    (phase, reason.unwrap_or_default())
}

fn container_record(status: &ContainerStatus) -> ContainerRecord {
    let (state, reason) = match status.state.as_ref() {
        Some(state) if state.running.is_some() => (ContainerLifecycle::Running, String::new()),
        Some(state) => {
            if let Some(waiting) = state.waiting.as_ref() {
                (
                    ContainerLifecycle::Waiting,
                    waiting.reason.clone().unwrap_or_default(),
                )
            } else if let Some(terminated) = state.terminated.as_ref() {
                let reason = terminated
                    .reason
                    .clone()
                    .filter(|value| !value.is_empty())
                    .unwrap_or_else(|| format!("Exit({})", terminated.exit_code));
                (ContainerLifecycle::Terminated, reason)
            } else {
                (ContainerLifecycle::Unknown, String::new())
            }
        }
        None => (ContainerLifecycle::Unknown, String::new()),
    };

    ContainerRecord {
        name: status.name.clone(),
        ready: status.ready,
        restarts: status.restart_count.max(0) as u32,
        state,
        reason,
    }
}

fn namespace_record(namespace: &Namespace, current: &str, now: i64) -> NamespaceRecord {
    let name = namespace.name_any();
    NamespaceRecord {
        is_current: name == current,
        status: namespace
            .status
            .as_ref()
            .and_then(|status| status.phase.clone())
            .unwrap_or_else(|| "Active".to_string()),
        age: age_since(namespace.metadata.creation_timestamp.as_ref(), now),
        name,
    }
}

fn now_seconds() -> i64 {
    k8s_openapi::jiff::Timestamp::now().as_second()
}

fn age_since(timestamp: Option<&Time>, now: i64) -> Duration {
    timestamp
        .map(|timestamp| Duration::from_secs((now - timestamp.0.as_second()).max(0) as u64))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{
        build_kube_targets, context_records, file_result, forward_log_lines, kubectl_exec_args,
        listing_result, ls_argv, namespace_record, pod_record,
    };
    use crate::model::{ContainerLifecycle, ContainerTarget, ExecOutcome, PodPhase};
    use futures::io::{AsyncRead, AsyncReadExt, BufReader, Cursor};
    use k8s_openapi::api::core::v1::{
        Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
        ContainerStateWaiting, ContainerStatus, Namespace, NamespaceStatus, Pod, PodCondition,
        PodSpec, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::jiff::Timestamp;
    use kube::config::Kubeconfig;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    const CREATED: i64 = 1_700_000_000;

    fn time(seconds: i64) -> Time {
        Time(Timestamp::from_second(seconds).expect("valid timestamp"))
    }

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            creation_timestamp: Some(time(CREATED)),
            ..ObjectMeta::default()
        }
    }

    fn spec(containers: &[&str]) -> PodSpec {
        PodSpec {
            containers: containers
                .iter()
                .map(|name| Container {
                    name: name.to_string(),
                    ..Container::default()
                })
                .collect(),
            node_name: Some("node-a".to_string()),
            ..PodSpec::default()
        }
    }

    fn running(name: &str, ready: bool, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready,
            restart_count: restarts,
            state: Some(ContainerState {
                running: Some(ContainerStateRunning::default()),
                ..ContainerState::default()
            }),
            ..ContainerStatus::default()
        }
    }

    fn waiting(name: &str, reason: &str, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready: false,
            restart_count: restarts,
            state: Some(ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: Some(reason.to_string()),
                    ..ContainerStateWaiting::default()
                }),
                ..ContainerState::default()
            }),
            ..ContainerStatus::default()
        }
    }

    fn pod(phase: &str, statuses: Vec<ContainerStatus>) -> Pod {
        let names = statuses
            .iter()
            .map(|status| status.name.clone())
            .collect::<Vec<_>>();
        let names = names.iter().map(String::as_str).collect::<Vec<_>>();
        Pod {
            metadata: meta("api-7d9f"),
            spec: Some(spec(&names)),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                pod_ip: Some("10.1.2.3".to_string()),
                container_statuses: Some(statuses),
                ..PodStatus::default()
            }),
        }
    }

    fn target() -> ContainerTarget {
        ContainerTarget::new("default", "api-7d9f", Some("api"))
    }

    #[test]
    fn running_pod_reports_readiness_age_and_placement() {
        let record = pod_record(
            &pod("Running", vec![running("api", true, 2), running("proxy", true, 1)]),
            CREATED + 7_200,
        );
        assert_eq!(record.name, "api-7d9f");
        assert_eq!(record.namespace, "default");
        assert_eq!(record.phase, PodPhase::Running);
        assert_eq!(record.reason, "");
        assert_eq!(record.ready_label(), "2/2");
        assert_eq!(record.restarts, 3);
        assert_eq!(record.age, Duration::from_secs(7_200));
        assert_eq!(record.ip, "10.1.2.3");
        assert_eq!(record.node, "node-a");
        assert_eq!(record.first_container(), Some("api"));
    }

    #[test]
    fn unready_running_pod_carries_waiting_reason() {
        let record = pod_record(
            &pod(
                "Running",
                vec![running("api", true, 0), waiting("worker", "CrashLoopBackOff", 7)],
            ),
            CREATED,
        );
        assert_eq!(record.ready_label(), "1/2");
        assert_eq!(record.reason, "CrashLoopBackOff");
        assert_eq!(record.status_label(), "Running (CrashLoopBackOff)");
        assert_eq!(record.containers[1].state, ContainerLifecycle::Waiting);
    }

    #[test]
    fn unscheduled_pod_falls_back_to_spec_containers() {
        let mut unscheduled = pod("Pending", Vec::new());
        unscheduled.spec = Some(spec(&["api"]));
        if let Some(status) = unscheduled.status.as_mut() {
            status.conditions = Some(vec![PodCondition {
                type_: "PodScheduled".to_string(),
                status: "False".to_string(),
                reason: Some("Unschedulable".to_string()),
                ..PodCondition::default()
            }]);
        }

        let record = pod_record(&unscheduled, CREATED);
        assert_eq!(record.phase, PodPhase::Pending);
        assert_eq!(record.reason, "Unschedulable");
        assert_eq!(record.ready_label(), "0/1");
        assert_eq!(record.containers[0].state, ContainerLifecycle::Waiting);
    }

    #[test]
    fn failed_pod_uses_terminated_container_reason() {
        let killed = ContainerStatus {
            name: "api".to_string(),
            state: Some(ContainerState {
                terminated: Some(ContainerStateTerminated {
                    exit_code: 137,
                    reason: Some("OOMKilled".to_string()),
                    ..ContainerStateTerminated::default()
                }),
                ..ContainerState::default()
            }),
            ..ContainerStatus::default()
        };
        let record = pod_record(&pod("Failed", vec![killed]), CREATED);
        assert_eq!(record.phase, PodPhase::Failed);
        assert_eq!(record.reason, "OOMKilled");
    }

    #[test]
    fn deleting_pod_is_terminating() {
        let mut deleting = pod("Running", vec![running("api", true, 0)]);
        deleting.metadata.deletion_timestamp = Some(time(CREATED + 10));
        assert_eq!(pod_record(&deleting, CREATED).phase, PodPhase::Terminating);
    }

    #[test]
    fn unrecognised_phase_is_unknown_with_raw_reason() {
        let record = pod_record(&pod("Evicting", Vec::new()), CREATED);
        assert_eq!(record.phase, PodPhase::Unknown);
        assert_eq!(record.reason, "Evicting");
    }

    #[test]
    fn namespace_marks_current_and_defaults_status() {
        let namespace = Namespace {
            metadata: meta("prod"),
            status: Some(NamespaceStatus {
                phase: Some("Terminating".to_string()),
                ..NamespaceStatus::default()
            }),
            ..Namespace::default()
        };
        let record = namespace_record(&namespace, "prod", CREATED + 60);
        assert!(record.is_current);
        assert_eq!(record.status, "Terminating");
        assert_eq!(record.age, Duration::from_secs(60));

        let bare = Namespace {
            metadata: meta("default"),
            ..Namespace::default()
        };
        let record = namespace_record(&bare, "prod", CREATED);
        assert!(!record.is_current);
        assert_eq!(record.status, "Active");
    }

    #[test]
    fn contexts_are_sorted_with_current_flag_and_default_namespace() {
        let kubeconfig = Kubeconfig::from_yaml(
            r#"
apiVersion: v1
kind: Config
current-context: staging
clusters:
  - name: prod-cluster
    cluster:
      server: https://prod.example:6443
  - name: staging-cluster
    cluster:
      server: https://staging.example:6443
contexts:
  - name: staging
    context:
      cluster: staging-cluster
      user: alice
      namespace: payments
  - name: prod
    context:
      cluster: prod-cluster
      user: ops
users: []
"#,
        )
        .expect("valid kubeconfig");

        let records = context_records(&build_kube_targets(&kubeconfig), "staging");
        let names = records
            .iter()
            .map(|record| record.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["prod", "staging"]);
        assert_eq!(records[0].namespace, "default");
        assert!(!records[0].is_current);
        assert_eq!(records[1].cluster, "staging-cluster");
        assert_eq!(records[1].user, "alice");
        assert_eq!(records[1].namespace, "payments");
        assert!(records[1].is_current);
    }

    #[test]
    fn kubectl_args_include_context_and_container() {
        let argv = vec!["ls".to_string(), "-la".to_string(), "/".to_string()];
        assert_eq!(
            kubectl_exec_args(Some("staging"), &target(), &argv),
            [
                "exec", "--context", "staging", "-n", "default", "api-7d9f", "-c", "api", "--",
                "ls", "-la", "/"
            ]
        );

        let bare = ContainerTarget::new("default", "api-7d9f", None);
        assert_eq!(
            kubectl_exec_args(None, &bare, &["pwd".to_string()]),
            ["exec", "-n", "default", "api-7d9f", "--", "pwd"]
        );
    }

    #[test]
    fn listing_follows_symlinked_directories() {
        assert_eq!(ls_argv("/bin"), ["ls", "-la", "/bin/"]);
        assert_eq!(ls_argv("/"), ["ls", "-la", "/"]);
        assert_eq!(ls_argv("/usr/lib/"), ["ls", "-la", "/usr/lib/"]);
    }

    #[test]
    fn listing_failures_map_to_readable_messages() {
        let failed = |stderr: &str| ExecOutcome::failed("", stderr, 2, "exit 2");
        let message = |result: anyhow::Result<String>| {
            result.expect_err("listing should fail").to_string()
        };

        assert_eq!(
            message(listing_result(
                "/nope",
                failed("ls: cannot access '/nope': No such file or directory")
            )),
            "directory not found: /nope"
        );
        assert_eq!(
            message(listing_result("/root", failed("ls: /root: Permission denied"))),
            "permission denied: /root"
        );
        assert_eq!(
            message(listing_result("/etc/hosts/", failed("Not a directory"))),
            "not a directory: /etc/hosts/"
        );
        assert_eq!(
            message(listing_result("/", failed(""))),
            "failed to list directory: exit 2"
        );
        assert_eq!(
            message(listing_result(
                "/proc",
                ExecOutcome::completed("", "ls: cannot access '/proc/1/cwd'")
            )),
            "cannot access: /proc"
        );
        assert_eq!(
            listing_result("/", ExecOutcome::completed("total 0\n", "")).expect("listing"),
            "total 0\n"
        );
    }

    #[test]
    fn file_read_failures_map_to_readable_messages() {
        let failed = |stderr: &str| ExecOutcome::failed("", stderr, 1, "exit 1");
        assert_eq!(
            file_result("/etc", failed("head: error reading '/etc': Is a directory"))
                .expect_err("directory")
                .to_string(),
            "is a directory: /etc"
        );
        assert_eq!(
            file_result("/x", failed("head: cannot open '/x': No such file or directory"))
                .expect_err("missing")
                .to_string(),
            "file not found: /x"
        );
        assert_eq!(
            file_result("/etc/hostname", ExecOutcome::completed("pod\n", "")).expect("content"),
            "pod\n"
        );
    }

    struct Reset;

    impl AsyncRead for Reset {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        }
    }

    #[tokio::test]
    async fn forwarder_preserves_order_and_closes_at_end() {
        let (tx, mut rx) = mpsc::channel(4);
        let reader = Cursor::new(b"one\ntwo\nthree\n".to_vec());
        tokio::spawn(forward_log_lines(reader, tx, CancellationToken::new()));

        let mut received = Vec::new();
        while let Some(line) = rx.recv().await {
            assert_eq!(line.error, None);
            received.push(line.content);
        }
        assert_eq!(received, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn forwarder_reports_read_error_as_final_line() {
        let (tx, mut rx) = mpsc::channel(4);
        let reader = BufReader::new(Cursor::new(b"first\n".to_vec()).chain(Reset));
        tokio::spawn(forward_log_lines(reader, tx, CancellationToken::new()));

        let first = rx.recv().await.expect("first line");
        assert_eq!(first.content, "first");
        let failure = rx.recv().await.expect("error line");
        assert!(
            failure
                .error
                .as_deref()
                .is_some_and(|error| error.contains("connection reset"))
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_forwarder_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        forward_log_lines(Cursor::new(b"late\n".to_vec()), tx, cancel).await;
        assert!(rx.recv().await.is_none());
    }
}
