/// Execution environment manager.
///
/// Runs one accepted submission in a disposable worker process: fresh
/// workspace, scrubbed environment, piped stdio drained by bounded collector
/// threads, wall-clock deadline enforced by the host. Capability restriction
/// lives in the worker (harness import hook, curated builtins); the host
/// never swaps global state, so concurrent executions cannot observe each
/// other. A crashed or killed worker cannot corrupt the host.
use crate::config::SandboxConfig;
use crate::harness;
use crate::rewrite;
use crate::types::{ExecutionOutcome, Result, SandboxError};
use crate::workspace::{Workspace, WorkspaceManager};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Worker process executor
pub struct SandboxExecutor {
    config: Arc<SandboxConfig>,
}

impl SandboxExecutor {
    pub fn new(config: Arc<SandboxConfig>) -> Self {
        Self { config }
    }

    /// Execute a pre-screened submission. Untrusted failures come back as
    /// `ExecutionOutcome::Failed`; `Err` is reserved for host-side faults
    /// (workspace IO, spawn failure). The workspace is removed on every exit
    /// path, including early `?` returns, via its Drop impl.
    pub fn execute(&self, source: &str) -> Result<ExecutionOutcome> {
        let manager = WorkspaceManager::new(self.config.workspace_base.clone())?;
        let workspace = manager.create_workspace()?;

        let rewritten = rewrite::rewrite(source);
        workspace.write_file(harness::SUBMISSION_FILE, &rewritten)?;
        workspace.write_file(harness::HARNESS_FILE, &harness::render(&self.config))?;
        let mpl_config_dir = workspace.create_subdir("mplconfig")?;

        let mut cmd = Command::new(&self.config.python);
        cmd.arg("-B")
            .arg("-I")
            .arg(harness::HARNESS_FILE)
            .current_dir(workspace.dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Scrubbed environment: the worker sees nothing of the host beyond a
        // minimal PATH and matplotlib pointed at workspace-local state.
        cmd.env_clear();
        cmd.env("PATH", "/usr/local/bin:/usr/bin:/bin");
        cmd.env("HOME", workspace.dir());
        cmd.env("MPLBACKEND", "Agg");
        cmd.env("MPLCONFIGDIR", &mpl_config_dir);

        // Own process group so a timeout kill reaches any grandchildren too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| {
            SandboxError::Process(format!(
                "Failed to start worker {}: {}",
                self.config.python.display(),
                e
            ))
        })?;

        let pid = child.id();
        log::debug!("run {}: worker pid {}", workspace.run_id(), pid);

        let stdout_handle = child.stdout.take().map(|stream| {
            let limit = self.config.stdout_limit;
            thread::spawn(move || collect_stream(stream, limit))
        });
        let stderr_handle = child.stderr.take().map(|stream| {
            let limit = self.config.stderr_limit;
            thread::spawn(move || collect_stream(stream, limit))
        });

        let deadline = Instant::now() + self.config.wall_time_limit();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let (stdout, stdout_truncated) = join_collector(stdout_handle);
                    let (stderr, stderr_truncated) = join_collector(stderr_handle);
                    if stdout_truncated {
                        crate::audit::events::output_truncated(
                            workspace.run_id(),
                            "stdout",
                            self.config.stdout_limit,
                        );
                    }
                    if stderr_truncated {
                        crate::audit::events::output_truncated(
                            workspace.run_id(),
                            "stderr",
                            self.config.stderr_limit,
                        );
                    }

                    let output = String::from_utf8_lossy(&stdout).to_string();

                    if status.success() {
                        // Read artifacts back before the workspace is removed
                        let artifacts = rewrite::collect(workspace.dir())?;
                        log::info!(
                            "run {}: completed with {} artifact(s)",
                            workspace.run_id(),
                            artifacts.len()
                        );
                        return Ok(ExecutionOutcome::Completed { artifacts, output });
                    }

                    let mut detail = String::from_utf8_lossy(&stderr).to_string();
                    if detail.trim().is_empty() {
                        detail = format!("worker exited with {}", status);
                    }
                    log::debug!("run {}: worker failed: {}", workspace.run_id(), detail);
                    return Ok(ExecutionOutcome::Failed { detail });
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        kill_worker(&mut child, pid);
                        // Reap so the collector threads see EOF
                        let _ = child.wait();
                        let _ = join_collector(stdout_handle);
                        let _ = join_collector(stderr_handle);

                        crate::audit::events::timeout_kill(
                            workspace.run_id(),
                            self.config.wall_time_limit_secs,
                        );
                        return Ok(ExecutionOutcome::Failed {
                            detail: format!(
                                "Execution timed out after {} seconds and was terminated",
                                self.config.wall_time_limit_secs
                            ),
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    kill_worker(&mut child, pid);
                    let _ = child.wait();
                    return Err(SandboxError::Process(format!(
                        "Failed waiting for worker: {}",
                        e
                    )));
                }
            }
        }
    }

    /// Run-scoped check usable by callers and tests: the interpreter plus the
    /// plotting stack must be importable under the same flags the worker uses.
    pub fn probe_runtime(&self) -> bool {
        Command::new(&self.config.python)
            .args(["-B", "-I", "-c", "import matplotlib"])
            .env("MPLBACKEND", "Agg")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

fn join_collector(
    handle: Option<thread::JoinHandle<(Vec<u8>, bool)>>,
) -> (Vec<u8>, bool) {
    match handle {
        Some(h) => h.join().unwrap_or_default(),
        None => (Vec::new(), false),
    }
}

/// Drain a worker stream up to `limit` bytes; returns the data and whether
/// it was truncated. Keeps reading after the limit so the worker never
/// blocks on a full pipe.
fn collect_stream<R: Read>(mut stream: R, limit: usize) -> (Vec<u8>, bool) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut truncated = false;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buffer.len() >= limit {
                    truncated = true;
                    continue;
                }
                let take = n.min(limit - buffer.len());
                buffer.extend_from_slice(&chunk[..take]);
                if take < n {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }

    (buffer, truncated)
}

#[cfg(unix)]
fn kill_worker(child: &mut std::process::Child, pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // Kill the whole group; fall back to the direct child if the group is gone
    if killpg(Pid::from_raw(pid as i32), Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_worker(child: &mut std::process::Child, _pid: u32) {
    let _ = child.kill();
}
