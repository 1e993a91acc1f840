/// Security event logging for the sandbox.
/// Structured records of security-relevant decisions (screen rejections,
/// import rejections, timeout kills, cleanup failures) for operator review;
/// raw diagnostics stay here and never reach submitters.
use crate::types::{Result, SandboxError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SecurityEventType {
    ScreenRejection,
    ImportRejection,
    TimeoutKill,
    OutputTruncated,
    CleanupFailure,
}

impl SecurityEventType {
    fn default_severity(&self) -> Severity {
        match self {
            SecurityEventType::ScreenRejection => Severity::High,
            SecurityEventType::ImportRejection => Severity::High,
            SecurityEventType::TimeoutKill => Severity::Medium,
            SecurityEventType::OutputTruncated => Severity::Low,
            SecurityEventType::CleanupFailure => Severity::Medium,
        }
    }
}

/// Individual security event, serialized as one JSON line in the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    pub severity: Severity,
    /// Workspace run id, when the event is tied to an execution
    pub run_id: Option<String>,
    pub details: String,
    pub timestamp: SystemTime,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType, details: String) -> Self {
        let severity = event_type.default_severity();
        Self {
            event_type,
            severity,
            run_id: None,
            details,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }
}

struct AuditSink {
    file: Mutex<std::fs::File>,
    path: PathBuf,
}

static AUDIT_SINK: OnceLock<AuditSink> = OnceLock::new();

/// Open the audit trail. Call once at startup; later calls are ignored.
/// Without initialization events still reach the log facade.
pub fn init(path: PathBuf) -> Result<()> {
    if AUDIT_SINK.get().is_some() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            SandboxError::Config(format!("Failed to open audit log {}: {}", path.display(), e))
        })?;

    let _ = AUDIT_SINK.set(AuditSink {
        file: Mutex::new(file),
        path,
    });
    Ok(())
}

fn record(event: SecurityEvent) {
    match event.severity {
        Severity::High | Severity::Medium => warn!(
            "security event {:?}: {}",
            event.event_type, event.details
        ),
        Severity::Low => info!(
            "security event {:?}: {}",
            event.event_type, event.details
        ),
    }

    if let Some(sink) = AUDIT_SINK.get() {
        if let Ok(line) = serde_json::to_string(&event) {
            if let Ok(mut file) = sink.file.lock() {
                if let Err(e) = writeln!(file, "{}", line) {
                    warn!("Failed to append audit event to {}: {}", sink.path.display(), e);
                }
            }
        }
    }
}

/// Convenience constructors used at the call sites
pub mod events {
    use super::*;

    pub fn screen_rejection(token: &str, reason: &str) {
        record(SecurityEvent::new(
            SecurityEventType::ScreenRejection,
            format!("token '{}': {}", token, reason),
        ));
    }

    pub fn import_rejection(run_id: &str, detail: &str) {
        record(
            SecurityEvent::new(SecurityEventType::ImportRejection, detail.to_string())
                .with_run_id(run_id),
        );
    }

    pub fn timeout_kill(run_id: &str, limit_secs: u64) {
        record(
            SecurityEvent::new(
                SecurityEventType::TimeoutKill,
                format!("worker killed after exceeding {}s wall limit", limit_secs),
            )
            .with_run_id(run_id),
        );
    }

    pub fn output_truncated(run_id: &str, stream: &str, limit: usize) {
        record(
            SecurityEvent::new(
                SecurityEventType::OutputTruncated,
                format!("{} truncated at {} bytes", stream, limit),
            )
            .with_run_id(run_id),
        );
    }

    pub fn cleanup_failure(run_id: &str, detail: &str) {
        record(
            SecurityEvent::new(SecurityEventType::CleanupFailure, detail.to_string())
                .with_run_id(run_id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_severity_defaults() {
        let event = SecurityEvent::new(SecurityEventType::ScreenRejection, "x".to_string());
        assert!(matches!(event.severity, Severity::High));
        let event = SecurityEvent::new(SecurityEventType::OutputTruncated, "x".to_string());
        assert!(matches!(event.severity, Severity::Low));
    }

    #[test]
    fn test_event_serializes_to_json_line() {
        let event = SecurityEvent::new(SecurityEventType::TimeoutKill, "killed".to_string())
            .with_run_id("abc");
        let line = serde_json::to_string(&event).unwrap();
        assert!(line.contains("TimeoutKill"));
        assert!(line.contains("abc"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_events_without_sink_do_not_panic() {
        events::screen_rejection("eval", "Code contains forbidden function: eval");
        events::cleanup_failure("run", "permission denied");
    }
}
