use crate::exec::{DEFAULT_HISTORY, DEFAULT_MAX_OUTPUT_LINES};
use crate::logs::{DEFAULT_MAX_LINES, DEFAULT_TAIL_LINES};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LIST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FILE_PREVIEW_BYTES: usize = 100 * 1024;

/// Effective runtime settings after defaults and clamping.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    pub source: Option<String>,
    pub log_tail_lines: i64,
    pub log_max_lines: usize,
    pub list_timeout: Duration,
    pub exec_timeout: Duration,
    pub file_preview_bytes: usize,
    pub exec_history: usize,
    pub exec_max_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        SettingsFile::default().into_settings(None)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SettingsFile {
    #[serde(alias = "tail_lines")]
    log_tail_lines: i64,
    #[serde(alias = "max_log_lines")]
    log_max_lines: usize,
    #[serde(alias = "list_timeout")]
    list_timeout_secs: u64,
    #[serde(alias = "exec_timeout")]
    exec_timeout_secs: u64,
    #[serde(alias = "preview_bytes")]
    file_preview_bytes: usize,
    exec_history: usize,
    exec_max_lines: usize,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            log_tail_lines: DEFAULT_TAIL_LINES,
            log_max_lines: DEFAULT_MAX_LINES,
            list_timeout_secs: DEFAULT_LIST_TIMEOUT_SECS,
            exec_timeout_secs: DEFAULT_EXEC_TIMEOUT_SECS,
            file_preview_bytes: DEFAULT_FILE_PREVIEW_BYTES,
            exec_history: DEFAULT_HISTORY,
            exec_max_lines: DEFAULT_MAX_OUTPUT_LINES,
        }
    }
}

impl SettingsFile {
    fn into_settings(self, source: Option<String>) -> Settings {
        Settings {
            source,
            log_tail_lines: self.log_tail_lines.max(1),
            log_max_lines: self.log_max_lines.max(1),
            list_timeout: Duration::from_secs(self.list_timeout_secs.max(1)),
            exec_timeout: Duration::from_secs(self.exec_timeout_secs.max(1)),
            file_preview_bytes: self.file_preview_bytes.max(1),
            exec_history: self.exec_history.max(1),
            exec_max_lines: self.exec_max_lines.max(1),
        }
    }
}

impl Settings {
    /// Loads the settings file from `explicit` or the first discovered location.
    /// Without a file the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_path(),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_yaml(&raw, Some(path.display().to_string()))
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }

    pub fn from_yaml(raw: &str, source: Option<String>) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(SettingsFile::default().into_settings(source));
        }
        let parsed: SettingsFile = serde_yaml::from_str(raw)?;
        Ok(parsed.into_settings(source))
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PODDECK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("poddeck.yaml"),
        PathBuf::from("poddeck.yml"),
        PathBuf::from(".poddeck.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/poddeck/config.yaml"),
            PathBuf::from(&home).join(".config/poddeck/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
