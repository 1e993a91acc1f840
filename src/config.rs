/// Configuration loading for the sandbox.
/// Read once at process start and treated as immutable afterwards; executions
/// never re-mutate shared configuration.
use crate::types::{Result, SandboxError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Modules importable inside the worker. A submodule of an allowed module is
/// also allowed (e.g. `matplotlib.ticker`).
fn default_allowed_modules() -> Vec<String> {
    [
        "matplotlib",
        "matplotlib.pyplot",
        "matplotlib.font_manager",
        "numpy",
        "pandas",
        "scipy",
        "seaborn",
        "math",
        "random",
        "datetime",
        "collections",
        "itertools",
        "functools",
        "os.path",
        "re",
        "json",
        "csv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Names of functions/attributes that grant filesystem, process, network, or
/// reflection access. Matched token-boundary-aware by the pre-screener.
fn default_forbidden_tokens() -> Vec<String> {
    [
        "eval",
        "exec",
        "compile",
        "globals",
        "locals",
        "open",
        "__import__",
        "import_module",
        "system",
        "popen",
        "subprocess",
        "os.system",
        "os.popen",
        "os.spawn",
        "os.exec",
        "subprocess.run",
        "subprocess.call",
        "subprocess.Popen",
        "pty.spawn",
        "importlib.import_module",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Dunder reflection tokens, raw I/O verbs, and network scheme prefixes.
fn default_suspicious_patterns() -> Vec<String> {
    [
        "__builtins__",
        "__dict__",
        "__class__",
        "__base__",
        "__subclasses__",
        "__getattribute__",
        "__getattr__",
        "__globals__",
        "getattr(",
        "setattr(",
        "delattr(",
        "read(",
        "write(",
        "socket.",
        "connect(",
        "bind(",
        "listen(",
        "requests.",
        "urllib",
        "http",
        "https",
        "ftp",
        "smtp",
        "telnet",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_python() -> PathBuf {
    PathBuf::from("python3")
}

fn default_workspace_base() -> PathBuf {
    std::env::temp_dir().join("plotbox")
}

fn default_dpi() -> u32 {
    300
}

fn default_wall_time_limit_secs() -> u64 {
    15
}

fn default_stdout_limit() -> usize {
    8 * 1024 * 1024
}

fn default_stderr_limit() -> usize {
    2 * 1024 * 1024
}

/// Process-wide sandbox configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Python interpreter used for worker processes
    #[serde(default = "default_python")]
    pub python: PathBuf,
    /// Base directory under which per-submission workspaces are created
    #[serde(default = "default_workspace_base")]
    pub workspace_base: PathBuf,
    /// Import allow-list enforced inside the worker
    #[serde(default = "default_allowed_modules")]
    pub allowed_modules: Vec<String>,
    /// Forbidden-token set for the pre-screener
    #[serde(default = "default_forbidden_tokens")]
    pub forbidden_tokens: Vec<String>,
    /// Suspicious-substring set for the pre-screener
    #[serde(default = "default_suspicious_patterns")]
    pub suspicious_patterns: Vec<String>,
    /// Artifact resolution passed to savefig
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Wall-clock limit per execution; expiry kills the worker process group
    #[serde(default = "default_wall_time_limit_secs")]
    pub wall_time_limit_secs: u64,
    /// Per-stream stdout collection limit (bytes)
    #[serde(default = "default_stdout_limit")]
    pub stdout_limit: usize,
    /// Per-stream stderr collection limit (bytes)
    #[serde(default = "default_stderr_limit")]
    pub stderr_limit: usize,
    /// Optional JSON-lines audit trail for security events
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            workspace_base: default_workspace_base(),
            allowed_modules: default_allowed_modules(),
            forbidden_tokens: default_forbidden_tokens(),
            suspicious_patterns: default_suspicious_patterns(),
            dpi: default_dpi(),
            wall_time_limit_secs: default_wall_time_limit_secs(),
            stdout_limit: default_stdout_limit(),
            stderr_limit: default_stderr_limit(),
            audit_log: None,
        }
    }
}

impl SandboxConfig {
    /// Load configuration from a JSON file; absent fields fall back to defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SandboxError::Config(format!("Failed to read config file: {}", e)))?;

        let config: SandboxConfig = serde_json::from_str(&content)
            .map_err(|e| SandboxError::Config(format!("Failed to parse config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a working sandbox
    pub fn validate(&self) -> Result<()> {
        if self.dpi == 0 {
            return Err(SandboxError::Config("dpi must be non-zero".to_string()));
        }
        if self.wall_time_limit_secs == 0 {
            return Err(SandboxError::Config(
                "wall_time_limit_secs must be non-zero".to_string(),
            ));
        }
        if self.allowed_modules.is_empty() {
            return Err(SandboxError::Config(
                "allowed_modules must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn wall_time_limit(&self) -> Duration {
        Duration::from_secs(self.wall_time_limit_secs)
    }
}
