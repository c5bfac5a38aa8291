//! Course records supplied by configuration.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// How a course's downloads are organized locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Lecture slides and the like: a flat folder, no filing
    Lecture,
    /// Numbered assignment sheets filed into `H{nn}` folders
    Sheet,
    /// Numbered sheets that also get a `Code-H{nn}` folder
    CodingSheet,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lecture => "lecture",
            Category::Sheet => "sheet",
            Category::CodingSheet => "coding_sheet",
        }
    }

    /// Whether downloads are filed into per-assignment folders.
    pub fn is_numbered(&self) -> bool {
        matches!(self, Category::Sheet | Category::CodingSheet)
    }

    pub fn has_code_folder(&self) -> bool {
        matches!(self, Category::CodingSheet)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "lecture" => Ok(Category::Lecture),
            "sheet" => Ok(Category::Sheet),
            "coding_sheet" | "codingsheet" => Ok(Category::CodingSheet),
            _ => Err(format!("Invalid course category: {}", s)),
        }
    }
}

// Accepts both `coding_sheet` and the upper-case `CODING_SHEET` of older configs.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One course to sync. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSpec {
    /// Remote identifier (the portal's `ref_id`)
    pub id: String,
    pub category: Category,
    /// Folder the course's downloads land in
    pub local_folder: PathBuf,
    /// Human-readable name, used in logs and generated documents
    pub name: String,
}
