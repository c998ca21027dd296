//! Named locks shared across processes.
//!
//! The web server, scheduled jobs and CLI helpers all run as separate OS
//! processes and mutate the same Postfix configuration, so in-process
//! synchronization alone is not enough. Each named lock pairs a
//! `tokio::sync::Mutex` (serializes tasks within this process) with an
//! exclusive `flock` on a file under the lock directory (serializes
//! processes). Both are released when the guard drops, on every exit path.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{ConfError, Result};

/// Registry of named locks backed by lock files in one directory.
///
/// Injected into the config store at construction so tests can point it at a
/// temporary directory instead of the system lock directory.
pub struct LockRegistry {
    lock_dir: PathBuf,
    slots: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Scoped ownership of one named lock.
///
/// Operations that must run inside a critical section take a `&LockGuard`
/// witness, so the type system rules out calling them without the lock held.
/// Nested scopes of one logical operation share a single guard rather than
/// re-acquiring.
pub struct LockGuard {
    name: String,
    file: Option<File>,
    _task: OwnedMutexGuard<()>,
}

impl LockRegistry {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        LockRegistry {
            lock_dir: lock_dir.into(),
            slots: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Block until exclusive ownership of the named resource is obtained,
    /// across tasks in this process and across independent processes.
    pub async fn acquire_all(&self, name: &str) -> Result<LockGuard> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| ConfError::Config("lock registry poisoned".to_string()))?;
            Arc::clone(slots.entry(name.to_string()).or_default())
        };

        // Task-level exclusion first, so at most one task per process ever
        // blocks on the flock below.
        let task = slot.lock_owned().await;

        fs::create_dir_all(&self.lock_dir)?;
        let path = self.lock_dir.join(format!("{}.lock", name));

        // flock blocks the calling thread, keep it off the async runtime.
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| ConfError::Config(format!("lock task failed: {}", e)))??;

        debug!(lock = name, "acquired");
        Ok(LockGuard {
            name: name.to_string(),
            file: Some(file),
            _task: task,
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
        debug!(lock = %self.name, "released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LockRegistry::new(dir.path());

        let guard = registry.acquire_all("postconf").await.unwrap();
        drop(guard);

        // Released lock can be taken again.
        let guard = registry.acquire_all("postconf").await.unwrap();
        drop(guard);
    }

    #[tokio::test]
    async fn test_distinct_names_do_not_block_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LockRegistry::new(dir.path());

        let a = registry.acquire_all("postconf").await.unwrap();
        let b = registry.acquire_all("aliases").await.unwrap();
        drop(a);
        drop(b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_tasks_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(LockRegistry::new(dir.path()));
        let in_section = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_section = Arc::clone(&in_section);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire_all("postconf").await.unwrap();
                let n = in_section.fetch_add(1, Ordering::SeqCst);
                assert_eq!(n, 0, "another task was inside the critical section");
                tokio::task::yield_now().await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
