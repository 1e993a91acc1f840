/// Submission-scoped workspace management.
/// Each execution owns a uuid-named directory; no two submissions share one.
/// Removal is attempted on every exit path, including panics, via Drop;
/// a failed removal is logged, never escalated.
use crate::types::{Result, SandboxError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Exclusively-owned workspace directory for one submission
pub struct Workspace {
    run_id: String,
    dir: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace under `base`
    pub fn new(base: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let dir = base.join(&run_id);

        fs::create_dir_all(&dir).map_err(|e| SandboxError::Workspace {
            path: dir.clone(),
            detail: format!("failed to create workspace directory: {}", e),
        })?;

        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a file into the workspace (harness, rewritten submission)
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::write(&path, content).map_err(|e| SandboxError::Workspace {
            path: path.clone(),
            detail: format!("failed to write {}: {}", name, e),
        })?;
        Ok(path)
    }

    /// Create a subdirectory inside the workspace
    pub fn create_subdir(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        fs::create_dir_all(&path).map_err(|e| SandboxError::Workspace {
            path: path.clone(),
            detail: format!("failed to create {}: {}", name, e),
        })?;
        Ok(path)
    }

    /// Recursive removal; idempotent, failure is logged rather than raised
    pub fn cleanup(&self) {
        if self.dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.dir) {
                log::warn!(
                    "Failed to remove workspace {}: {}",
                    self.dir.display(),
                    e
                );
                crate::audit::events::cleanup_failure(&self.run_id, &e.to_string());
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Manager for the workspace base directory
pub struct WorkspaceManager {
    base: PathBuf,
}

impl WorkspaceManager {
    pub fn new(base: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base).map_err(|e| SandboxError::Workspace {
            path: base.clone(),
            detail: format!("failed to create workspace base: {}", e),
        })?;
        Ok(Self { base })
    }

    pub fn create_workspace(&self) -> Result<Workspace> {
        Workspace::new(&self.base)
    }

    /// Remove leftover workspaces older than `max_age`. Leftovers only exist
    /// after a host crash; normal runs remove their workspace on drop.
    pub fn cleanup_stale(&self, max_age: std::time::Duration) -> Result<usize> {
        let mut cleaned = 0;
        let now = std::time::SystemTime::now();

        if !self.base.exists() {
            return Ok(0);
        }

        for entry in fs::read_dir(&self.base)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read workspace entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = match now.duration_since(modified) {
                Ok(d) => d,
                Err(_) => continue, // future timestamp, skip
            };

            if age > max_age {
                log::info!("Removing stale workspace {}", path.display());
                if let Err(e) = fs::remove_dir_all(&path) {
                    log::warn!("Failed to remove stale workspace {}: {}", path.display(), e);
                } else {
                    cleaned += 1;
                }
            }
        }

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_workspace_created_and_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let dir;
        {
            let ws = Workspace::new(base.path()).unwrap();
            dir = ws.dir().to_path_buf();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn test_workspaces_are_disjoint() {
        let base = tempfile::tempdir().unwrap();
        let a = Workspace::new(base.path()).unwrap();
        let b = Workspace::new(base.path()).unwrap();
        assert_ne!(a.run_id(), b.run_id());
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn test_write_file_lands_in_workspace() {
        let base = tempfile::tempdir().unwrap();
        let ws = Workspace::new(base.path()).unwrap();
        let path = ws.write_file("submission.py", "plt.plot()").unwrap();
        assert!(path.starts_with(ws.dir()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "plt.plot()");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let ws = Workspace::new(base.path()).unwrap();
        ws.cleanup();
        ws.cleanup();
        assert!(!ws.dir().exists());
    }

    #[test]
    fn test_cleanup_stale_spares_fresh_dirs() {
        let base = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(base.path().to_path_buf()).unwrap();
        let ws = manager.create_workspace().unwrap();

        let cleaned = manager.cleanup_stale(Duration::from_secs(3600)).unwrap();
        assert_eq!(cleaned, 0);
        assert!(ws.dir().exists());
    }
}
