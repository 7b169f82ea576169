use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Screen {
    PodList,
    Logs,
    Exec,
    Files,
    NamespaceSelect,
    ContextSelect,
    Help,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Self::PodList => "Pods",
            Self::Logs => "Logs",
            Self::Exec => "Exec",
            Self::Files => "Files",
            Self::NamespaceSelect => "Namespaces",
            Self::ContextSelect => "Contexts",
            Self::Help => "Help",
        }
    }

    /// Overlays are drawn over the screen they were opened from and restore it on dismissal.
    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            Self::NamespaceSelect | Self::ContextSelect | Self::Help
        )
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PodPhase {
    Running,
    Pending,
    Succeeded,
    Failed,
    Unknown,
    Terminating,
}

impl PodPhase {
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Running") => Self::Running,
            Some("Pending") => Self::Pending,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Pending => "Pending",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
            Self::Terminating => "Terminating",
        }
    }
}

impl Display for PodPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ContainerLifecycle {
    Running,
    Waiting,
    Terminated,
    Unknown,
}

impl ContainerLifecycle {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Waiting => "Waiting",
            Self::Terminated => "Terminated",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerRecord {
    pub name: String,
    pub ready: bool,
    pub restarts: u32,
    pub state: ContainerLifecycle,
    pub reason: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub reason: String,
    pub ready: usize,
    pub total: usize,
    pub restarts: u32,
    pub age: Duration,
    pub ip: String,
    pub node: String,
    pub containers: Vec<ContainerRecord>,
}

impl PodRecord {
    pub fn ready_label(&self) -> String {
        format!("{}/{}", self.ready, self.total)
    }

    /// Phase plus the reason when one is known, e.g. `Pending (Unschedulable)`.
    pub fn status_label(&self) -> String {
        if self.reason.is_empty() {
            self.phase.label().to_string()
        } else {
            format!("{} ({})", self.phase.label(), self.reason)
        }
    }

    pub fn first_container(&self) -> Option<&str> {
        self.containers.first().map(|container| container.name.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamespaceRecord {
    pub name: String,
    pub status: String,
    pub age: Duration,
    pub is_current: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContextRecord {
    pub name: String,
    pub cluster: String,
    pub user: String,
    pub namespace: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub error: Option<String>,
}

impl LogLine {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Local::now(),
            error: None,
        }
    }

    /// A line carrying an error terminates the stream; its content is ignored.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            timestamp: Local::now(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FileRecord {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub size: u64,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub mod_time: String,
    pub link_target: Option<String>,
}

impl FileRecord {
    /// Symlinks are entered like directories. A link to a file lists as "not a directory".
    pub fn is_navigable(&self) -> bool {
        self.is_dir || self.is_symlink
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub error: Option<String>,
}

impl ExecOutcome {
    pub fn completed(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: 0,
            error: None,
        }
    }

    /// Builds a failed outcome. A zero exit code is bumped to 1 so an error never reads as success.
    pub fn failed(
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ContainerTarget {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
}

impl ContainerTarget {
    pub fn new(namespace: &str, pod: &str, container: Option<&str>) -> Self {
        Self {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.map(str::to_string),
        }
    }

    pub fn label(&self) -> String {
        match self.container.as_deref() {
            Some(container) => format!("{}/{}:{container}", self.namespace, self.pod),
            None => format!("{}/{}", self.namespace, self.pod),
        }
    }
}

impl Display for ContainerTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

pub fn format_age(age: Duration) -> String {
    let seconds = age.as_secs();
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.1}G", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1}M", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1}K", size as f64 / KB as f64)
    } else {
        size.to_string()
    }
}
