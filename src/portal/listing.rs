//! Remote listing - display name to locator for one course page.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::{PortalError, PortalSession};
use crate::domain::{ItemTitle, Locator, RemoteItem};

/// What to do when two items on a page share a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later entries overwrite earlier ones
    #[default]
    LastWins,
    /// Drop every entry of a duplicated name
    Reject,
}

/// Items on a course page, keyed (and therefore sorted) by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    items: BTreeMap<String, Locator>,
}

impl RemoteListing {
    /// Build a listing from raw title elements.
    ///
    /// Names are trimmed; entries without a name or a locator are dropped.
    pub fn from_titles<I>(titles: I, policy: DuplicatePolicy) -> Self
    where
        I: IntoIterator<Item = ItemTitle>,
    {
        let mut items = BTreeMap::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for title in titles {
            let name = title.text.trim();
            let locator = title.href.as_deref().map(str::trim).unwrap_or("");
            if name.is_empty() || locator.is_empty() {
                continue;
            }

            *seen.entry(name.to_string()).or_insert(0) += 1;
            items.insert(name.to_string(), Locator::new(locator));
        }

        if policy == DuplicatePolicy::Reject {
            for (name, count) in seen.into_iter().filter(|(_, count)| *count > 1) {
                tracing::warn!("Dropping '{}': listed {} times on the page", name, count);
                items.remove(&name);
            }
        }

        Self { items }
    }

    pub fn insert(&mut self, name: impl Into<String>, locator: Locator) {
        self.items.insert(name.into(), locator);
    }

    pub fn get(&self, name: &str) -> Option<&Locator> {
        self.items.get(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Display names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn items(&self) -> impl Iterator<Item = RemoteItem> + '_ {
        self.items.iter().map(|(name, locator)| RemoteItem {
            name: name.clone(),
            locator: locator.clone(),
        })
    }
}

impl FromIterator<RemoteItem> for RemoteListing {
    fn from_iter<T: IntoIterator<Item = RemoteItem>>(iter: T) -> Self {
        let mut listing = RemoteListing::default();
        for item in iter {
            listing.insert(item.name, item.locator);
        }
        listing
    }
}

/// List every item on an already-loaded course page.
pub fn list_remote_items<S: PortalSession>(
    session: &mut S,
    page: &S::Page,
    policy: DuplicatePolicy,
) -> Result<RemoteListing, PortalError> {
    let titles = session.list_items(page)?;
    let raw_count = titles.len();
    let listing = RemoteListing::from_titles(titles, policy);
    tracing::debug!("Page lists {} title elements, {} usable items", raw_count, listing.len());
    Ok(listing)
}
