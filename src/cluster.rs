use crate::model::{
    ContainerTarget, ContextRecord, ExecOutcome, LogLine, NamespaceRecord, PodRecord,
};
use anyhow::Result;
use std::future::Future;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the queue between a log reader and its consumer.
pub const LOG_QUEUE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogRequest {
    pub target: ContainerTarget,
    pub follow: bool,
    pub tail_lines: i64,
}

/// Operations the session needs from a cluster. Implemented by the kube gateway and by
/// test doubles.
///
/// Namespace and context mutation takes `&mut self` and is only called from the event loop;
/// everything else runs on clones inside background tasks.
pub trait ClusterClient: Clone + Send + Sync + 'static {
    fn current_context(&self) -> &str;

    fn current_namespace(&self) -> &str;

    fn set_namespace(&mut self, namespace: &str);

    fn switch_context(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    fn list_contexts(&self) -> Vec<ContextRecord>;

    fn list_pods(&self, namespace: &str) -> impl Future<Output = Result<Vec<PodRecord>>> + Send;

    fn list_namespaces(&self) -> impl Future<Output = Result<Vec<NamespaceRecord>>> + Send;

    /// Opens a line source fed through a bounded queue. The reader stops as soon as
    /// `cancel` fires; an I/O failure arrives as a final [`LogLine`] with its
    /// error set.
    fn open_log_stream(
        &self,
        request: &LogRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<mpsc::Receiver<LogLine>>> + Send;

    fn run_command(
        &self,
        target: &ContainerTarget,
        argv: &[String],
    ) -> impl Future<Output = ExecOutcome> + Send;

    fn list_directory(
        &self,
        target: &ContainerTarget,
        path: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    fn read_file(
        &self,
        target: &ContainerTarget,
        path: &str,
        max_bytes: usize,
    ) -> impl Future<Output = Result<String>> + Send;
}
