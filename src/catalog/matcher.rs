//! Catalog matcher: maps free text to candidate catalog entries.

use crate::catalog::{CatalogEntry, normalize_text};

/// Finds the catalog entries a free-text message refers to.
///
/// Zero, one, or many results; callers decide what ambiguity means.
pub trait CatalogMatcher: Send + Sync {
    fn find<'a>(&self, text: &str, entries: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry>;
}

/// Matches entries whose normalized program name appears in the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameMatcher;

impl CatalogMatcher for NameMatcher {
    fn find<'a>(&self, text: &str, entries: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry> {
        let haystack = normalize_text(text);
        entries
            .iter()
            .filter(|entry| {
                let needle = normalize_text(&entry.program_name);
                !needle.is_empty() && haystack.contains(&needle)
            })
            .collect()
    }
}
