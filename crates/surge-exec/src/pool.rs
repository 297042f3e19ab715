//! Fixed-size arena of private session directories.
//!
//! The external tool keys its login/session state off a single home directory. Running several invocations
//! against one directory corrupts that state, so each in-flight invocation borrows a directory of its own.
//!
//! ## Invariants
//! - exactly `size` slots exist from construction until [`SlotPool::drain`];
//! - at most `size` slots are checked out at once;
//! - slots are handed out by borrow order only, never by unit identity;
//! - a [`Slot`] returns itself to the pool exactly once, when dropped.
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tempfile::TempDir;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ExecError, ExecResult};

const SLOT_PREFIX: &str = "surge-home";

pub struct SlotPool {
    size: usize,
    permits: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<TempDir>>>,
}

impl SlotPool {
    /// Provision `size` slots, copying `template` (if any) into each of them.
    ///
    /// Fails instead of running under capacity: a pool smaller than the concurrency ceiling would quietly
    /// serialize work the caller believes is parallel.
    pub fn new(size: usize, template: Option<&Path>) -> ExecResult<Self> {
        if size == 0 {
            return Err(ExecError::Provision("pool size must be positive".into()));
        }
        if let Some(template) = template
            && !template.is_dir()
        {
            return Err(ExecError::Provision(format!(
                "session template {} is not a directory",
                template.display()
            )));
        }

        let mut dirs = Vec::with_capacity(size);
        for _ in 0..size {
            let dir = tempfile::Builder::new()
                .prefix(SLOT_PREFIX)
                .tempdir()
                .map_err(|e| ExecError::Provision(format!("create slot dir: {e}")))?;

            if let Some(template) = template {
                let target = match template.file_name() {
                    Some(name) => dir.path().join(name),
                    None => dir.path().to_path_buf(),
                };
                copy_tree(template, &target).map_err(|e| {
                    ExecError::Provision(format!(
                        "copy {} into {}: {e}",
                        template.display(),
                        target.display()
                    ))
                })?;
            }
            debug!(target: "surge.exec.pool", dir = %dir.path().display(), "slot provisioned");
            dirs.push(dir);
        }
        info!(target: "surge.exec.pool", size, "slot pool ready");

        Ok(Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(dirs)),
        })
    }

    /// Slots currently checked out.
    pub fn in_use(&self) -> usize {
        self.size.saturating_sub(self.permits.available_permits())
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> ExecResult<Slot> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ExecError::PoolDrained)?;

        let dir = lock(&self.idle).pop().ok_or(ExecError::PoolDrained)?;
        let path = dir.path().to_path_buf();

        Ok(Slot {
            path,
            dir: Some(dir),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }

    /// Wait until every slot is idle, then delete all slot directories.
    ///
    /// Later calls to [`SlotPool::acquire`] fail with [`ExecError::PoolDrained`].
    pub async fn drain(&self) -> ExecResult<()> {
        let n = u32::try_from(self.size)
            .map_err(|_| ExecError::Provision("pool size exceeds permit range".into()))?;
        let loaned = self.in_use();
        if loaned > 0 {
            debug!(target: "surge.exec.pool", loaned, "waiting for loaned slots before draining");
        }
        let _all = self
            .permits
            .acquire_many(n)
            .await
            .map_err(|_| ExecError::PoolDrained)?;
        self.permits.close();

        let dirs = std::mem::take(&mut *lock(&self.idle));
        info!(target: "surge.exec.pool", slots = dirs.len(), "draining slot pool");

        for dir in dirs {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(target: "surge.exec.pool", dir = %path.display(), error = %e, "failed to remove slot dir");
            }
        }
        Ok(())
    }
}

/// Exclusive loan of one session directory.
pub struct Slot {
    path: PathBuf,
    dir: Option<TempDir>,
    idle: Arc<Mutex<Vec<TempDir>>>,
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        // Directory goes back before the permit is released.
        if let Some(dir) = self.dir.take() {
            lock(&self.idle).push(dir);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);

        let kind = entry.file_type();
        if kind.is_dir() {
            fs::create_dir_all(&target)?;
        } else if kind.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
