//! Which remote items still need fetching.
//!
//! An item counts as downloaded purely by name. The display name and the
//! local file name must match once the document extension is stripped and
//! both sides are NFC-normalized. Path separators in the display name are
//! replaced the way downloads name their files. No hashing, sizes or
//! timestamps are consulted, so a renamed or corrupted local file still
//! counts as present.

use super::inventory::{normalize_name, sanitize_file_name, strip_extension, LocalInventory};
use crate::domain::RemoteItem;
use crate::portal::RemoteListing;

/// Remote items absent locally, sorted lexicographically by display name.
pub fn missing_items(
    listing: &RemoteListing,
    inventory: &LocalInventory,
    extension: &str,
) -> Vec<RemoteItem> {
    listing
        .items()
        .filter(|item| !is_present(&item.name, inventory, extension))
        .collect()
}

fn is_present(name: &str, inventory: &LocalInventory, extension: &str) -> bool {
    inventory
        .documents
        .contains(&normalize_name(&sanitize_file_name(strip_extension(name, extension))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RemoteItem;

    fn listing(names: &[&str]) -> RemoteListing {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| RemoteItem::new(*n, format!("loc{}", i)))
            .collect()
    }

    fn missing_names(
        listing: &RemoteListing,
        inventory: &LocalInventory,
        ext: &str,
    ) -> Vec<String> {
        missing_items(listing, inventory, ext)
            .into_iter()
            .map(|item| item.name)
            .collect()
    }

    fn inventory(stems: &[&str]) -> LocalInventory {
        LocalInventory {
            documents: stems.iter().map(|s| s.to_string()).collect(),
            folders: Default::default(),
        }
    }

    #[test]
    fn test_set_difference_sorted() {
        let remote = listing(&["Blatt03", "Blatt01", "Skript", "Blatt02"]);
        let local = inventory(&["Blatt02", "Other"]);

        let missing = missing_names(&remote, &local, "pdf");
        assert_eq!(missing, vec!["Blatt01", "Blatt03", "Skript"]);
    }

    #[test]
    fn test_extension_stripped_on_both_sides() {
        let remote = listing(&["Blatt01.pdf", "Blatt02"]);
        let local = inventory(&["Blatt01", "Blatt02"]);

        assert!(missing_names(&remote, &local, "pdf").is_empty());
    }

    #[test]
    fn test_everything_missing_from_empty_folder() {
        let remote = listing(&["b", "a"]);
        let missing = missing_items(&remote, &LocalInventory::default(), "pdf");
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].name, "a");
        assert_eq!(missing[0].locator.as_str(), "loc1");
    }

    #[test]
    fn test_reconcile_is_repeatable() {
        let remote = listing(&["Blatt01", "Blatt02"]);
        let local = inventory(&["Blatt01"]);

        let first = missing_names(&remote, &local, "pdf");
        let second = missing_names(&remote, &local, "pdf");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unicode_forms_compare_equal() {
        let remote = listing(&["Lo\u{0308}sung 1"]);
        let local = inventory(&["L\u{00f6}sung 1"]);
        assert!(missing_names(&remote, &local, "pdf").is_empty());
    }

    #[test]
    fn test_separators_match_saved_file_name() {
        let remote = listing(&["Ü1/Ü2"]);
        let local = inventory(&["Ü1_Ü2"]);

        assert!(missing_names(&remote, &local, "pdf").is_empty());
    }
}
