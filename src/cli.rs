use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "poddeck",
    version,
    about = "Browse pods, follow logs, run commands and explore container files from the terminal."
)]
pub struct CliArgs {
    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long)]
    pub context: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append diagnostics to this file (discarded otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Settings file to load instead of the discovered one
    #[arg(long)]
    pub config: Option<PathBuf>,
}
