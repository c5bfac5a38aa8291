//! Assignment numbers and solution markers derived from item names.
//!
//! A name like `Blatt7_Hinweis.pdf` carries two facts: the assignment it
//! belongs to (`07`, from the first run of digits) and whether it is a
//! solution/hint rather than the sheet itself (a keyword is present).

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

/// Canonical assignment number: at least two digits, zero-padded.
///
/// Padding only ever extends short numbers, so `7` becomes `07` while
/// `100` stays `100`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentNumber(String);

impl AssignmentNumber {
    /// Canonicalize a run of ASCII digits. Returns `None` for anything else.
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Equivalent to parsing as an integer and formatting with `{:02}`,
        // without overflowing on absurdly long runs.
        let significant = digits.trim_start_matches('0');
        Some(Self(format!("{:0>2}", significant)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Numeric order: "07" < "12" < "100".
impl Ord for AssignmentNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for AssignmentNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for AssignmentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category flag of a numbered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// The assignment sheet itself ("H")
    Primary,
    /// Solution, hint, or similar companion document ("L")
    SolutionLike,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numbered {
    pub number: AssignmentNumber,
    pub kind: ItemKind,
}

/// First maximal run of ASCII digits in `name`.
pub fn first_digit_run(name: &str) -> Option<&str> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let rest = &name[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Derives assignment numbers and category flags using a fixed keyword set.
#[derive(Debug, Clone)]
pub struct Extractor {
    keywords: Vec<String>,
}

impl Extractor {
    /// Keywords are matched case-sensitively as substrings, after NFC
    /// normalization of both sides.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().nfc().collect::<String>())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn kind_of(&self, name: &str) -> ItemKind {
        let normalized: String = name.nfc().collect();
        if self.keywords.iter().any(|k| normalized.contains(k.as_str())) {
            ItemKind::SolutionLike
        } else {
            ItemKind::Primary
        }
    }

    /// Number and category of `name`, or `None` when it contains no digits.
    pub fn extract(&self, name: &str) -> Option<Numbered> {
        let number = first_digit_run(name).and_then(AssignmentNumber::from_digits)?;
        Some(Numbered {
            number,
            kind: self.kind_of(name),
        })
    }
}
