//! plotbox: a workspace-isolated execution sandbox for untrusted plotting scripts
//!
//! Accepts short, user-supplied Python scripts expected to render matplotlib
//! charts and executes them without granting the submitter filesystem,
//! network, process-control, or reflection access beyond what rendering
//! needs.
//!
//! # Architecture
//!
//! Each submission flows through four components:
//!
//! - [`screen`]: static textual pre-screen (forbidden tokens, suspicious
//!   patterns, token-boundary-aware). Advisory; rejection is cheap and early.
//! - [`executor`]: out-of-process worker isolation. A fresh workspace, a
//!   scrubbed environment, a restricted in-worker import resolver, piped and
//!   bounded stdio, and a wall-clock deadline with process-group kill.
//! - [`rewrite`]: textual rewrite of display calls into persist calls, and
//!   ordered collection of the produced artifacts.
//! - [`classify`]: deterministic mapping of raw failure text onto a stable
//!   error taxonomy; total over all inputs.
//!
//! The pre-screen is a known-weak pattern heuristic: containment does not
//! rest on it. Even when a payload slips past the screen, the worker has no
//! host state to corrupt, dies with its process group on timeout, and leaves
//! nothing behind once its workspace is removed.
//!
//! # Design principles
//!
//! 1. **Isolation by construction** - worker-process-local restriction, not
//!    host-global hook swapping
//! 2. **Every exit path tears down** - workspace removal is Drop-backed
//! 3. **Untrusted failure is data** - exceptions become classified results,
//!    never host errors
//! 4. **Configuration is immutable** - read once at startup, shared read-only

// Core data model
pub mod types;

// Configuration & policy
pub mod config;

// Safety pre-screener
pub mod screen;

// Artifact rewriter/extractor
pub mod rewrite;

// Workspace lifecycle
pub mod workspace;

// Worker harness generation
pub mod harness;

// Execution environment manager
pub mod executor;

// Error classifier
pub mod classify;

// Security event audit
pub mod audit;

// Submission orchestration
pub mod sandbox;

// CLI entrypoint wiring for the plotbox binary
pub mod cli;

// Re-export commonly used types for convenience
pub use config::SandboxConfig;
pub use sandbox::Sandbox;
pub use types::{
    Artifact, ErrorCategory, ErrorClassification, ExecutionOutcome, Result, SafetyVerdict,
    SandboxError, ScreenCategory, SubmitOutcome,
};
