/// Submission orchestration: the single inbound surface collaborators call.
/// screen -> execute -> classify; exactly one of rendered artifacts, a
/// no-artifacts notice, or one classified error line comes back. Raw traces
/// go to the operator log only.
use crate::classify;
use crate::config::SandboxConfig;
use crate::executor::SandboxExecutor;
use crate::screen;
use crate::types::{ExecutionOutcome, SafetyVerdict, SubmitOutcome};
use std::sync::Arc;

/// The untrusted-script execution sandbox.
///
/// Cheap to share: configuration is read-only behind an `Arc`, and every
/// execution runs in its own worker process with its own workspace, so
/// `submit` is safe to call concurrently.
pub struct Sandbox {
    config: Arc<SandboxConfig>,
    executor: SandboxExecutor,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        let config = Arc::new(config);
        let executor = SandboxExecutor::new(config.clone());
        Self { config, executor }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// True when the configured interpreter and plotting stack are usable
    pub fn probe_runtime(&self) -> bool {
        self.executor.probe_runtime()
    }

    /// Handle one submission end to end. Never panics on untrusted input and
    /// never surfaces a raw trace: every failure path yields a classified,
    /// single-line error.
    pub fn submit(&self, source: &str) -> SubmitOutcome {
        if let SafetyVerdict::Rejected { token, reason, .. } =
            screen::screen(source, &self.config)
        {
            crate::audit::events::screen_rejection(&token, &reason);
            return SubmitOutcome::Failed(classify::classify(&reason));
        }

        let outcome = match self.executor.execute(source) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Host-side fault (workspace IO, spawn failure); the
                // submitter still gets a classified line, not a panic
                log::error!("sandbox host error: {}", e);
                return SubmitOutcome::Failed(classify::classify(&e.to_string()));
            }
        };

        match outcome {
            ExecutionOutcome::Completed { artifacts, output } => {
                if artifacts.is_empty() {
                    SubmitOutcome::NoArtifacts { output }
                } else {
                    SubmitOutcome::Rendered { artifacts, output }
                }
            }
            ExecutionOutcome::Failed { detail } => {
                log::debug!("execution failure detail:\n{}", detail);
                let classification = classify::classify(&detail);
                if classification.category == crate::types::ErrorCategory::ImportRejected {
                    crate::audit::events::import_rejection("-", &classification.message);
                }
                SubmitOutcome::Failed(classification)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use std::path::PathBuf;

    fn offline_sandbox() -> Sandbox {
        // Interpreter that cannot exist; only screening paths run
        Sandbox::new(SandboxConfig {
            python: PathBuf::from("/nonexistent/plotbox-python"),
            workspace_base: std::env::temp_dir().join("plotbox-sandbox-tests"),
            ..SandboxConfig::default()
        })
    }

    #[test]
    fn test_submit_rejects_forbidden_function_before_execution() {
        let sandbox = offline_sandbox();
        // Would fail with a host error if execution were attempted; the
        // screen rejection must happen first
        match sandbox.submit("result = eval('2+2')") {
            SubmitOutcome::Failed(c) => {
                assert_eq!(c.category, ErrorCategory::ForbiddenFunction);
                assert!(c.message.contains("eval"));
            }
            other => panic!("expected screen rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_rejects_suspicious_pattern() {
        let sandbox = offline_sandbox();
        match sandbox.submit("x = obj.__dict__") {
            SubmitOutcome::Failed(c) => {
                assert_eq!(c.category, ErrorCategory::SuspiciousPattern);
            }
            other => panic!("expected screen rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_host_error_is_classified_not_panicked() {
        let sandbox = offline_sandbox();
        match sandbox.submit("print('hi')") {
            SubmitOutcome::Failed(c) => {
                assert_eq!(c.category, ErrorCategory::Runtime);
            }
            other => panic!("expected classified failure, got {:?}", other),
        }
    }
}
