//! Place-name canonicalization.
//!
//! Backend rows spell the same municipality in several ways ("Pívijay", "PIVIJAY", "pivijay ").
//! The canonical form is used as the join key for aggregation, gazetteer lookup and marker identity.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Apostrophe look-alikes folded to `'`.
const APOSTROPHE_VARIANTS: &[char] = &[
    '\u{2019}', // right single quotation mark
    '\u{2018}', // left single quotation mark
    '\u{02BC}', // modifier letter apostrophe
    '\u{0060}', // grave accent
    '\u{00B4}', // acute accent
    '\u{2032}', // prime
];

/// Canonicalize a place name: uppercase, strip diacritics, fold apostrophes, collapse whitespace.
///
/// Total and idempotent: `normalize(&normalize(s)) == normalize(s)` for every `s`, and the empty
/// string maps to the empty key.
pub fn normalize(raw: &str) -> String {
    let mut current = canonicalize_once(raw);
    // Repeat until stable so the result is always a fixed point.
    for _ in 0..MAX_PASSES {
        let next = canonicalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

const MAX_PASSES: usize = 4;

fn canonicalize_once(raw: &str) -> String {
    // Uppercase first: case mapping can emit combining marks and apostrophes
    // (e.g. U+0149 -> "ʼN"), which the following steps then remove.
    let upper = raw.to_uppercase();
    let stripped: String = upper
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if APOSTROPHE_VARIANTS.contains(&c) { '\'' } else { c })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_uppercases() {
        assert_eq!(normalize("Pívijay"), "PIVIJAY");
        assert_eq!(normalize("Ciénaga"), "CIENAGA");
        assert_eq!(normalize("ñ"), "N");
    }

    #[test]
    fn test_collapses_and_trims_whitespace() {
        assert_eq!(normalize("  Puerto   Colombia \t"), "PUERTO COLOMBIA");
        assert_eq!(normalize("Santa\u{00A0}Marta"), "SANTA MARTA");
    }

    #[test]
    fn test_folds_apostrophes() {
        assert_eq!(normalize("Cabo d’Hornos"), "CABO D'HORNOS");
        assert_eq!(normalize("Cabo d`Hornos"), "CABO D'HORNOS");
    }

    #[test]
    fn test_empty_and_blank_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_idempotent_on_tricky_inputs() {
        for s in ["ŉ", "ΐ", "ǰ", "Ǆ", "Ärzte  ’ s", "ß", "İstanbul", "\u{0301}a"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
