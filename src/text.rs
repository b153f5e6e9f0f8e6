// 🔤 Text Normalization - accent folding and tokenization
// Shared by the classifier, the catalog matcher and the CSV header lookup

use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// STOP WORDS
// ============================================================================

/// Articles, prepositions and generic nouns that carry no matching signal.
/// Stored already normalized (no accents, lowercase).
pub const STOPWORDS: &[&str] = &[
    // articles / prepositions / connectors
    "el", "la", "los", "las", "un", "una", "unos", "unas",
    "de", "del", "al", "a", "en", "y", "o", "u", "para", "por", "con", "sin",
    "sobre", "segun", "entre", "desde", "hasta", "tipo",
    // generic nouns common in technical descriptions
    "servicio", "trabajo", "trabajos", "reparacion", "mantenimiento",
    "equipo", "equipos", "unidad", "unidades",
];

/// Tokens shorter than this are dropped.
pub const MIN_TOKEN_LEN: usize = 2;

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Trim, lowercase and strip diacritics (NFD, then drop combining marks).
/// Anything that is not an ASCII letter, digit or whitespace becomes a space,
/// and runs of whitespace collapse to one.
///
/// ```
/// use cost_derivation::text::normalize;
/// assert_eq!(normalize("  Provisión de CABLES, 2x1.5mm "), "provision de cables 2x1 5mm");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Normalized token set with stop words and short tokens removed.
///
/// A `BTreeSet` keeps iteration order stable, which keeps debug output and
/// fingerprints reproducible.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split(' ')
        .filter(|t| t.len() >= MIN_TOKEN_LEN && !is_stopword(t))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
