//! Items scraped from a course page.

/// Opaque handle the portal uses to fetch an item (a link target for ILIAS).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A downloadable entry on a course page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Display name as shown on the page (trimmed)
    pub name: String,
    pub locator: Locator,
}

impl RemoteItem {
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: Locator::new(locator),
        }
    }
}

/// A raw "item title" element as the portal reports it, before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTitle {
    pub text: String,
    pub href: Option<String>,
}

impl ItemTitle {
    pub fn new(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            href: href.map(String::from),
        }
    }
}
