//! Files the tools wrote during a run

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared record of written files; clones see the same list
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remember `path`; writing the same file twice keeps one entry
    pub fn record(&self, path: &Path) {
        let mut paths = self.lock();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    /// Everything recorded so far, leaving the log empty
    pub fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.lock())
    }
}
