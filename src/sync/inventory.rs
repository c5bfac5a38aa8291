//! Local inventory - what a course folder already holds.
//!
//! The directory listing is the source of truth for "already downloaded".
//! Callers go through [`InventorySource`] so a persisted manifest could
//! replace the folder scan without touching reconciliation.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use super::{ensure_dir, SyncError};
use crate::paths;

/// Snapshot of a course folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInventory {
    /// NFC-normalized document names with the extension stripped
    pub documents: BTreeSet<String>,
    /// Names of immediate subdirectories
    pub folders: BTreeSet<String>,
}

impl LocalInventory {
    /// Whether a document with this (already stripped) name is present.
    pub fn contains_document(&self, stem: &str) -> bool {
        self.documents.contains(&normalize_name(stem))
    }
}

/// Anything that can report a course's local inventory.
pub trait InventorySource {
    fn scan(&self) -> Result<LocalInventory, SyncError>;
}

/// Inventory read straight from a course folder (non-recursive).
#[derive(Debug, Clone)]
pub struct FolderInventory<'a> {
    folder: &'a Path,
    extension: &'a str,
}

impl<'a> FolderInventory<'a> {
    pub fn new(folder: &'a Path, extension: &'a str) -> Self {
        Self { folder, extension }
    }
}

impl InventorySource for FolderInventory<'_> {
    fn scan(&self) -> Result<LocalInventory, SyncError> {
        scan_folder(self.folder, self.extension)
    }
}

/// Course folder plus documents already filed into its `H{nn}` folders
/// (any width, so `H100` counts too).
///
/// Used for numbered courses so a filed document is not fetched again.
#[derive(Debug, Clone)]
pub struct FiledInventory<'a> {
    folder: &'a Path,
    extension: &'a str,
}

impl<'a> FiledInventory<'a> {
    pub fn new(folder: &'a Path, extension: &'a str) -> Self {
        Self { folder, extension }
    }
}

impl InventorySource for FiledInventory<'_> {
    fn scan(&self) -> Result<LocalInventory, SyncError> {
        let mut inventory = scan_folder(self.folder, self.extension)?;

        let destinations: Vec<&String> = inventory
            .folders
            .iter()
            .filter(|name| paths::parse_filed_folder(name).is_some())
            .collect();
        let mut filed = BTreeSet::new();
        for name in destinations {
            for path in document_files(&self.folder.join(name), self.extension)? {
                if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                    filed.insert(normalize_name(strip_extension(file_name, self.extension)));
                }
            }
        }
        inventory.documents.extend(filed);

        Ok(inventory)
    }
}

/// NFC form used for every name comparison.
pub fn normalize_name(name: &str) -> String {
    name.nfc().collect()
}

/// Replace characters that cannot appear in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// `true` if `name` ends in `.{extension}` (case-sensitive).
pub fn has_extension(name: &str, extension: &str) -> bool {
    strip_extension(name, extension).len() != name.len()
}

/// Drop a trailing `.{extension}`; other names pass through unchanged.
pub fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    name.strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(name)
}

/// Scan a course folder, creating it first if it is missing.
pub fn scan_folder(folder: &Path, extension: &str) -> Result<LocalInventory, SyncError> {
    if ensure_dir(folder)? {
        tracing::info!("Created course folder {}", folder.display());
    }

    let mut inventory = LocalInventory::default();
    let entries = fs::read_dir(folder).map_err(|e| SyncError::io(folder, e))?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!("Skipping non UTF-8 entry {}", path.display());
            continue;
        };

        if path.is_dir() {
            inventory.folders.insert(name.to_string());
        } else if path.is_file() && has_extension(name, extension) {
            inventory
                .documents
                .insert(normalize_name(strip_extension(name, extension)));
        }
    }

    Ok(inventory)
}

/// Paths of the documents lying directly in `folder`, sorted by name.
pub fn document_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, SyncError> {
    let entries = fs::read_dir(folder).map_err(|e| SyncError::io(folder, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| has_extension(n, extension))
        })
        .collect();
    files.sort();

    Ok(files)
}
