//! Filing of numbered assignment documents.
//!
//! For sheet courses every download lands flat in the course folder. Filing
//! then:
//! 1. collects the assignment numbers of primary and solution-like remote
//!    items ([`NumberSets`])
//! 2. ensures an `H{nn}` folder per primary number
//! 3. moves each flat document whose number has a folder into it
//! 4. deletes whatever flat documents are left over
//!
//! Step 4 only ever touches files that went through step 3 in the same pass.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::inventory::document_files;
use super::numbering::{AssignmentNumber, Extractor, ItemKind};
use super::{ensure_dir, move_file, SyncError};
use crate::paths;

/// What to do with a solution-like document whose number has no folder yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave it in the flat folder; it gets filed once its sheet appears
    #[default]
    Keep,
    /// Delete it with the other leftovers
    Delete,
}

/// Assignment numbers seen among remote items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberSets {
    /// Numbers of primary items (the H-set); each gets a folder
    pub primary: BTreeSet<AssignmentNumber>,
    /// Numbers of solution-like items (the L-set)
    pub solutions: BTreeSet<AssignmentNumber>,
}

impl NumberSets {
    pub fn from_names<'a, I>(names: I, extractor: &Extractor) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sets = NumberSets::default();
        for name in names {
            match extractor.extract(name) {
                Some(numbered) => match numbered.kind {
                    ItemKind::Primary => {
                        sets.primary.insert(numbered.number);
                    }
                    ItemKind::SolutionLike => {
                        sets.solutions.insert(numbered.number);
                    }
                },
                None => tracing::debug!("No assignment number in '{}'", name),
            }
        }
        sets
    }

    /// Solution numbers without a matching primary.
    pub fn orphan_solutions(&self) -> impl Iterator<Item = &AssignmentNumber> {
        self.solutions.difference(&self.primary)
    }
}

/// Outcome of a filing pass. Entries are file names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilingReport {
    pub moved: Vec<String>,
    /// Already present at the destination; left for cleanup
    pub duplicates: Vec<String>,
    pub unnumbered: Vec<String>,
    /// Numbered, but no folder exists for the number
    pub unfiled: Vec<String>,
    /// Orphan solutions kept under [`OrphanPolicy::Keep`]
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    /// (file, error) pairs; failed files are never deleted
    pub failures: Vec<(String, String)>,
}

impl FilingReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Create the `H{nn}` folder for every primary number. Returns the ones created.
pub fn ensure_destination_folders(
    course_dir: &Path,
    sets: &NumberSets,
) -> Result<Vec<PathBuf>, SyncError> {
    let mut created = Vec::new();
    for number in &sets.primary {
        let dir = paths::destination_dir(course_dir, number);
        if ensure_dir(&dir)? {
            tracing::info!("Created folder {}", dir.display());
            created.push(dir);
        }
    }
    Ok(created)
}

/// Routes flat documents of one course folder.
#[derive(Debug, Clone)]
pub struct Filer<'a> {
    course_dir: &'a Path,
    extension: &'a str,
    extractor: &'a Extractor,
    orphans: OrphanPolicy,
}

impl<'a> Filer<'a> {
    pub fn new(
        course_dir: &'a Path,
        extension: &'a str,
        extractor: &'a Extractor,
        orphans: OrphanPolicy,
    ) -> Self {
        Self {
            course_dir,
            extension,
            extractor,
            orphans,
        }
    }

    /// Move pass followed by cleanup pass over the current flat documents.
    pub fn file_documents(&self, sets: &NumberSets) -> Result<FilingReport, SyncError> {
        let mut report = FilingReport::default();
        let mut leftovers = Vec::new();

        for path in document_files(self.course_dir, self.extension)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };

            let Some(numbered) = self.extractor.extract(&name) else {
                tracing::warn!("No assignment number in '{}', leaving it unfiled", name);
                report.unnumbered.push(name);
                leftovers.push(path);
                continue;
            };

            if !sets.primary.contains(&numbered.number) {
                if numbered.kind == ItemKind::SolutionLike && self.orphans == OrphanPolicy::Keep {
                    tracing::info!(
                        "Keeping '{}': no sheet {} yet",
                        name,
                        paths::primary_label(&numbered.number)
                    );
                    report.kept.push(name);
                } else {
                    tracing::debug!("'{}' has no folder for {}", name, numbered.number);
                    report.unfiled.push(name);
                    leftovers.push(path);
                }
                continue;
            }

            let dest_dir = paths::destination_dir(self.course_dir, &numbered.number);
            let dest = dest_dir.join(&name);
            if dest.exists() {
                tracing::warn!(
                    "'{}' already exists in {}, skipping move",
                    name,
                    dest_dir.display()
                );
                report.duplicates.push(name);
                leftovers.push(path);
                continue;
            }

            let moved = ensure_dir(&dest_dir)
                .map_err(|e| e.to_string())
                .and_then(|_| move_file(&path, &dest).map_err(|e| e.to_string()));
            match moved {
                Ok(()) => {
                    tracing::info!("Moved '{}' into {}", name, dest_dir.display());
                    report.moved.push(name);
                }
                Err(e) => {
                    tracing::warn!("Failed to move '{}': {}", name, e);
                    report.failures.push((name, e));
                }
            }
        }

        self.cleanup(leftovers, &mut report);
        Ok(report)
    }

    // Runs strictly after the move pass; only receives files that pass has seen.
    fn cleanup(&self, leftovers: Vec<PathBuf>, report: &mut FilingReport) {
        for path in leftovers {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !path.exists() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Removed leftover '{}'", name);
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!("Failed to remove '{}': {}", name, e);
                    report.failures.push((name, e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extractor() -> Extractor {
        Extractor::new(["Lösung", "Loesung", "Hinweis"])
    }

    fn num(s: &str) -> AssignmentNumber {
        AssignmentNumber::from_digits(s).unwrap()
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name).unwrap();
    }

    fn file_once(dir: &Path, remote: &[&str], orphans: OrphanPolicy) -> FilingReport {
        let extractor = extractor();
        let sets = NumberSets::from_names(remote.iter().copied(), &extractor);
        ensure_destination_folders(dir, &sets).unwrap();
        Filer::new(dir, "pdf", &extractor, orphans)
            .file_documents(&sets)
            .unwrap()
    }

    #[test]
    fn test_number_sets_split_by_kind() {
        let sets = NumberSets::from_names(
            ["Blatt01.pdf", "Blatt01_Loesung.pdf", "Blatt3_Hinweis.pdf", "Intro.pdf"],
            &extractor(),
        );
        assert_eq!(sets.primary, BTreeSet::from([num("01")]));
        assert_eq!(sets.solutions, BTreeSet::from([num("01"), num("03")]));
        assert_eq!(sets.orphan_solutions().collect::<Vec<_>>(), vec![&num("03")]);
    }

    #[test]
    fn test_folders_only_for_primary_numbers() {
        let temp = TempDir::new().unwrap();
        let sets = NumberSets::from_names(["Blatt01", "Blatt02_Loesung"], &extractor());

        let created = ensure_destination_folders(temp.path(), &sets).unwrap();
        assert_eq!(created, vec![temp.path().join("H01")]);
        assert!(!temp.path().join("H02").exists());

        // Second call creates nothing
        assert!(ensure_destination_folders(temp.path(), &sets).unwrap().is_empty());
    }

    #[test]
    fn test_files_numbered_documents() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Blatt01.pdf");
        touch(temp.path(), "Blatt01_Loesung.pdf");
        touch(temp.path(), "Intro.pdf");

        let report = file_once(
            temp.path(),
            &["Blatt01.pdf", "Blatt01_Loesung.pdf", "Intro.pdf"],
            OrphanPolicy::Keep,
        );

        assert_eq!(report.moved, vec!["Blatt01.pdf", "Blatt01_Loesung.pdf"]);
        assert_eq!(report.unnumbered, vec!["Intro.pdf"]);
        assert_eq!(report.deleted, vec!["Intro.pdf"]);
        assert!(temp.path().join("H01/Blatt01.pdf").is_file());
        assert!(temp.path().join("H01/Blatt01_Loesung.pdf").is_file());
        assert!(!temp.path().join("Intro.pdf").exists());
    }

    #[test]
    fn test_duplicate_destination_skips_then_cleans() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("H02")).unwrap();
        fs::write(temp.path().join("H02/Blatt02.pdf"), "original").unwrap();
        fs::write(temp.path().join("Blatt02.pdf"), "fresh").unwrap();

        let report = file_once(temp.path(), &["Blatt02"], OrphanPolicy::Keep);

        assert_eq!(report.duplicates, vec!["Blatt02.pdf"]);
        assert_eq!(report.deleted, vec!["Blatt02.pdf"]);
        assert!(report.moved.is_empty());
        assert_eq!(
            fs::read_to_string(temp.path().join("H02/Blatt02.pdf")).unwrap(),
            "original"
        );
    }

    #[test]
    fn test_orphan_solution_kept_by_default() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Blatt04_Loesung.pdf");

        let report = file_once(temp.path(), &["Blatt04_Loesung.pdf"], OrphanPolicy::Keep);

        assert_eq!(report.kept, vec!["Blatt04_Loesung.pdf"]);
        assert!(report.deleted.is_empty());
        assert!(temp.path().join("Blatt04_Loesung.pdf").is_file());
        assert!(!temp.path().join("H04").exists());
    }

    #[test]
    fn test_orphan_solution_deleted_when_configured() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Blatt04_Loesung.pdf");

        let report = file_once(temp.path(), &["Blatt04_Loesung.pdf"], OrphanPolicy::Delete);

        assert_eq!(report.unfiled, vec!["Blatt04_Loesung.pdf"]);
        assert_eq!(report.deleted, vec!["Blatt04_Loesung.pdf"]);
        assert!(!temp.path().join("Blatt04_Loesung.pdf").exists());
    }

    #[test]
    fn test_primary_without_folder_is_removed() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Blatt09.pdf");

        // Remote no longer lists sheet 9
        let report = file_once(temp.path(), &["Blatt01.pdf"], OrphanPolicy::Keep);

        assert_eq!(report.unfiled, vec!["Blatt09.pdf"]);
        assert_eq!(report.deleted, vec!["Blatt09.pdf"]);
    }

    #[test]
    fn test_non_documents_untouched() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Blatt01.zip");
        touch(temp.path(), "notes.txt");

        let report = file_once(temp.path(), &["Blatt01.pdf"], OrphanPolicy::Keep);

        assert_eq!(report, FilingReport::default());
        assert!(temp.path().join("Blatt01.zip").is_file());
        assert!(temp.path().join("notes.txt").is_file());
    }

    #[test]
    fn test_filing_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let remote = ["Blatt01.pdf", "Blatt02.pdf", "Blatt02_Hinweis.pdf", "Skript.pdf"];
        for name in remote {
            touch(temp.path(), name);
        }

        file_once(temp.path(), &remote, OrphanPolicy::Keep);
        let snapshot = tree(temp.path());

        let second = file_once(temp.path(), &remote, OrphanPolicy::Keep);
        assert_eq!(second, FilingReport::default());
        assert_eq!(tree(temp.path()), snapshot);
    }

    fn tree(dir: &Path) -> Vec<String> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
            let path = entry.path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if path.is_dir() {
                for inner in tree(&path) {
                    out.push(format!("{}/{}", name, inner));
                }
                out.push(format!("{}/", name));
            } else {
                out.push(name);
            }
        }
        out.sort();
        out
    }
}
