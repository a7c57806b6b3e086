//! Content catalog: programs, text blocks, payment details.

pub mod loader;
pub mod matcher;
pub mod model;

pub use loader::load_catalog;
pub use matcher::{CatalogMatcher, NameMatcher};
pub use model::{
    BankAccount, CatalogEntry, Category, ContentCatalog, EntryMedia, PaymentAssets,
    PaymentDetails, Segment, SegmentPricing, TextBlocks, WalletDetails,
};

/// Normalize free text for comparisons: trim, lowercase, fold Spanish
/// diacritics and collapse runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_accents() {
        assert_eq!(normalize_text("  Información   Pública "), "informacion publica");
        assert_eq!(normalize_text("AÑO"), "ano");
        assert_eq!(normalize_text("Pingüino"), "pinguino");
    }

    #[test]
    fn normalize_keeps_punctuation() {
        assert_eq!(normalize_text("Hola, estoy en"), "hola, estoy en");
    }
}
