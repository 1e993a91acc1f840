/// Core types and structures for the plotbox sandbox
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Verdict produced by the safety pre-screener. One per submission, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SafetyVerdict {
    /// No forbidden token or suspicious pattern found
    Accepted,
    /// Screening matched a rule; the submission must not be executed
    Rejected {
        category: ScreenCategory,
        /// The token or pattern that matched
        token: String,
        /// Human-readable reason suitable for the submitter
        reason: String,
    },
}

impl SafetyVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SafetyVerdict::Accepted)
    }
}

/// Which rule set rejected the submission
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScreenCategory {
    /// Matched the forbidden-token set (eval, exec, os.system, ...)
    ForbiddenFunction,
    /// Matched the suspicious-substring set (dunder reflection, raw I/O verbs, ...)
    SuspiciousPattern,
}

/// A rendered chart persisted by the worker, read back before workspace teardown
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    /// File name inside the workspace (plot_NNN.png)
    pub name: String,
    /// Embedded sequence number, defines artifact ordering
    pub sequence: u32,
    /// Raw image bytes
    pub data: Vec<u8>,
}

/// Result of running an accepted submission in the worker
#[derive(Clone, Debug)]
pub enum ExecutionOutcome {
    /// Worker exited cleanly; artifacts are ordered by sequence number
    Completed {
        artifacts: Vec<Artifact>,
        output: String,
    },
    /// Worker raised, crashed, or was killed; detail carries the full
    /// diagnostic text (message + traceback) for classification
    Failed { detail: String },
}

/// Stable error taxonomy surfaced to callers
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    ForbiddenFunction,
    SuspiciousPattern,
    ImportRejected,
    Syntax,
    Name,
    Type,
    Value,
    Attribute,
    Timeout,
    /// Catch-all for any other failure raised during execution
    Runtime,
}

impl ErrorCategory {
    /// Human-readable label used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ForbiddenFunction | ErrorCategory::SuspiciousPattern => {
                "Security error"
            }
            ErrorCategory::ImportRejected => "Import error",
            ErrorCategory::Syntax => "Syntax error",
            ErrorCategory::Name => "Name error",
            ErrorCategory::Type => "Type error",
            ErrorCategory::Value => "Value error",
            ErrorCategory::Attribute => "Attribute error",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::Runtime => "Runtime error",
        }
    }
}

/// Classified failure returned to the caller in place of a raw trace
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorClassification {
    pub category: ErrorCategory,
    /// Single user-facing line; the raw trace stays in the operator log
    pub message: String,
}

/// The complete caller-visible result of one submission
#[derive(Clone, Debug)]
pub enum SubmitOutcome {
    /// Script ran and rendered at least one chart
    Rendered {
        artifacts: Vec<Artifact>,
        output: String,
    },
    /// Script ran but never called the display function; not an error
    NoArtifacts { output: String },
    /// Screening rejection or execution failure, already classified
    Failed(ErrorClassification),
}

/// Custom error types for plotbox host-side failures.
/// Untrusted-code failures never surface here; they become `ExecutionOutcome::Failed`.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Workspace error: {path}: {detail}")]
    Workspace { path: PathBuf, detail: String },
}

/// Result type alias for plotbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;
