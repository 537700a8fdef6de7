// src/archive/workspace.rs

//! Per-job temporary workspaces and the registry that tracks them

use crate::error::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Name prefix of every workspace directory
pub const WORKSPACE_PREFIX: &str = "pacrepack.";

/// Set of live workspaces, shared between workers and the cleanup hook
///
/// Cloning is cheap; all clones see the same set.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRegistry {
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // A panicking worker must not disable cleanup for everyone else
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a fresh workspace under `tmp_root` and register it
    pub fn create(&self, tmp_root: &Path) -> Result<Workspace> {
        fs::create_dir_all(tmp_root)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(tmp_root)?;

        debug!("Created workspace {}", dir.path().display());
        self.lock().insert(dir.path().to_path_buf());

        Ok(Workspace {
            dir: Some(dir),
            registry: self.clone(),
        })
    }

    /// Paths of all workspaces currently alive
    pub fn active(&self) -> Vec<PathBuf> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every registered workspace from disk
    ///
    /// Used on termination; in-flight jobs lose their partial output.
    /// Returns the number of directories removed.
    pub fn sweep(&self) -> usize {
        let paths: Vec<PathBuf> = self.lock().drain().collect();
        let mut removed = 0;
        for path in paths {
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
            }
        }
        removed
    }

    fn release(&self, path: &Path) {
        self.lock().remove(path);
    }
}

/// A job's private scratch directory, removed when dropped
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    registry: WorkspaceRegistry,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Write a generated member into the workspace
    pub fn write_member(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close()
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove workspace {}: {}", path.display(), e);
            }
            self.registry.release(&path);
            debug!("Released workspace {}", path.display());
        }
    }
}
