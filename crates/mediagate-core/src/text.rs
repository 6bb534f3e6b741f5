//! String and token utilities shared by key generation and scratch staging.

use rand::{distr::Alphanumeric, Rng};
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics from a string.
///
/// Decomposes to NFD and drops the combining marks in U+0300..=U+036F, then
/// maps the Vietnamese đ/Đ (which do not decompose) to their ASCII forms.
/// Pure-ASCII input comes back unchanged.
pub fn remove_diacritics(s: &str) -> String {
    s.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// Build a URL-safe slug: diacritics stripped, lowercased, spaces collapsed
/// to hyphens.
pub fn slugify(s: &str) -> String {
    remove_diacritics(s)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Generate a random alphanumeric token of the given length.
pub fn random_token(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
