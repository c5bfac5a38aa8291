//! Course folder layout - single source of truth for generated paths.
//!
//! ```text
//! <local_folder>/
//!   H<NN>/
//!     H<NN>/Tex/H<NN>.tex
//!     P<NN>/Tex/P<NN>.tex
//!     Code-H<NN>/            (coding sheets only)
//! ```

use std::path::{Path, PathBuf};

use crate::sync::AssignmentNumber;

/// Subfolder holding a document's LaTeX source
pub const TEX_DIR: &str = "Tex";

/// Extension of generated documents
pub const TEX_EXTENSION: &str = "tex";

/// Prefix of primary (homework) folders and documents
pub const PRIMARY_PREFIX: &str = "H";

/// Prefix of practice documents
pub const PRACTICE_PREFIX: &str = "P";

/// Prefix of coding-sheet code folders
pub const CODE_PREFIX: &str = "Code-H";

/// `H07` for assignment 07
pub fn primary_label(number: &AssignmentNumber) -> String {
    format!("{PRIMARY_PREFIX}{number}")
}

/// `P07` for assignment 07
pub fn practice_label(number: &AssignmentNumber) -> String {
    format!("{PRACTICE_PREFIX}{number}")
}

/// Destination folder for an assignment: `<course>/H07`
pub fn destination_dir(course_dir: &Path, number: &AssignmentNumber) -> PathBuf {
    course_dir.join(primary_label(number))
}

/// `<course>/H07/H07/Tex/H07.tex`
pub fn primary_document(course_dir: &Path, number: &AssignmentNumber) -> PathBuf {
    document_path(course_dir, number, &primary_label(number))
}

/// `<course>/H07/P07/Tex/P07.tex`
pub fn practice_document(course_dir: &Path, number: &AssignmentNumber) -> PathBuf {
    document_path(course_dir, number, &practice_label(number))
}

/// `<course>/H07/Code-H07`
pub fn code_dir(course_dir: &Path, number: &AssignmentNumber) -> PathBuf {
    destination_dir(course_dir, number).join(format!("{CODE_PREFIX}{number}"))
}

fn document_path(course_dir: &Path, number: &AssignmentNumber, label: &str) -> PathBuf {
    destination_dir(course_dir, number)
        .join(label)
        .join(TEX_DIR)
        .join(format!("{label}.{TEX_EXTENSION}"))
}

/// Number of a destination folder name: exactly `H` followed by two digits.
pub fn parse_destination_folder(name: &str) -> Option<AssignmentNumber> {
    let digits = name.strip_prefix(PRIMARY_PREFIX)?;
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    AssignmentNumber::from_digits(digits)
}

/// Number of any folder filing may have created: `H` followed by a
/// canonical assignment number (`H07`, `H100`, but not `H7` or `H007`).
pub fn parse_filed_folder(name: &str) -> Option<AssignmentNumber> {
    let digits = name.strip_prefix(PRIMARY_PREFIX)?;
    AssignmentNumber::from_digits(digits).filter(|number| number.as_str() == digits)
}

// ==================== Tests ====================
