//! Local-state reconciliation and filing.
//!
//! The pieces run in this order for each course:
//! 1. [`inventory`] scans the course folder
//! 2. [`reconcile`] decides which remote items are missing
//! 3. (the portal fetches them)
//! 4. [`filing`] routes numbered documents into `H{nn}` folders and cleans up
//! 5. [`templates`] seeds each `H{nn}` folder with its document skeleton
//!
//! Every step is idempotent: running it again on an unchanged tree is a no-op.

pub mod filing;
pub mod inventory;
pub mod numbering;
pub mod reconcile;
pub mod templates;

use std::fs;
use std::io;
use std::path::Path;

use crate::portal::PortalError;

pub use filing::{FilingReport, NumberSets, OrphanPolicy};
pub use inventory::{FiledInventory, FolderInventory, InventorySource, LocalInventory};
pub use numbering::{AssignmentNumber, Extractor, ItemKind, Numbered};
pub use templates::{SeedReport, DEFAULT_TEMPLATE};

/// Course-level failure. Per-file problems are recorded in reports instead.
#[derive(Debug)]
pub enum SyncError {
    /// Filesystem error: (path, message)
    Io(String, String),
    Portal(PortalError),
}

impl SyncError {
    pub(crate) fn io(path: &Path, err: io::Error) -> Self {
        SyncError::Io(path.display().to_string(), err.to_string())
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Io(path, err) => write!(f, "IO error at {}: {}", path, err),
            SyncError::Portal(err) => write!(f, "Portal error: {}", err),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Portal(err) => Some(err),
            SyncError::Io(_, _) => None,
        }
    }
}

impl From<PortalError> for SyncError {
    fn from(err: PortalError) -> Self {
        SyncError::Portal(err)
    }
}

/// Create `dir` (and parents) unless it already exists. Returns true if created.
pub fn ensure_dir(dir: &Path) -> Result<bool, SyncError> {
    if dir.is_dir() {
        return Ok(false);
    }
    if dir.exists() {
        return Err(SyncError::Io(
            dir.display().to_string(),
            "path exists but is not a directory".to_string(),
        ));
    }
    fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
    Ok(true)
}

/// Move a file, falling back to copy-then-remove when a rename is refused
/// (e.g. across devices). Either way exactly one copy ends up at `dst`.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    move_file_with(src, dst, |from, to| fs::rename(from, to), |from, to| fs::copy(from, to))
}

fn move_file_with<R, C>(src: &Path, dst: &Path, rename: R, copy: C) -> io::Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
    C: FnOnce(&Path, &Path) -> io::Result<u64>,
{
    match rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            tracing::debug!(
                "Rename {} -> {} failed ({}), copying instead",
                src.display(),
                dst.display(),
                e
            );
            if let Err(e) = copy(src, dst) {
                // A partial copy would pass for a filed duplicate later
                let _ = fs::remove_file(dst);
                return Err(e);
            }
            if let Err(e) = fs::remove_file(src) {
                // Never leave two copies behind
                let _ = fs::remove_file(dst);
                return Err(e);
            }
            Ok(())
        }
    }
}
