//! Place-name normalization.
//!
//! Reverse-geocoding providers spell the same neighborhood many ways
//! ("Piantini", "PIANTINI", "Piantíni "). [`normalize`] maps all of them to
//! one comparison key; [`is_generic`] flags administrative boilerplate that
//! says nothing about where a point actually is.

/// Vowel and `ñ` substitutions applied after lowercasing.
const DIACRITICS: &[(char, char)] = &[
    ('á', 'a'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('í', 'i'),
    ('ì', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ô', 'o'),
    ('ö', 'o'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
    ('ñ', 'n'),
];

/// Fragments that mark a name as non-discriminative. Matched as substrings.
pub const GENERIC_NAMES: &[&str] = &[
    "centro",
    "downtown",
    "municipio",
    "distrito",
    "zona céntrica",
    "polígono central",
    "casco urbano",
    "city center",
    "city centre",
];

fn fold(c: char) -> char {
    DIACRITICS
        .iter()
        .find_map(|&(from, to)| (from == c).then_some(to))
        .unwrap_or(c)
}

/// Maps a raw place name to its canonical comparison key.
///
/// Lowercases, folds accented vowels and `ñ`, turns whitespace runs into a
/// single hyphen and drops everything outside `[a-z0-9-]`. Leading, trailing
/// and repeated hyphens are collapsed, so the output is idempotent.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.chars().flat_map(char::to_lowercase).map(fold) {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !key.is_empty() {
                key.push('-');
            }
            pending_hyphen = false;
            key.push(c);
        }
    }

    key
}

/// Returns `true` when `raw` contains any [`GENERIC_NAMES`] fragment.
///
/// The comparison is case-insensitive and tolerant of missing accents, so
/// "Zona Centrica" is caught the same as "zona céntrica".
#[must_use]
pub fn is_generic(raw: &str) -> bool {
    let folded: String = raw.chars().flat_map(char::to_lowercase).map(fold).collect();
    GENERIC_NAMES.iter().any(|generic| {
        let generic: String = generic.chars().map(fold).collect();
        folded.contains(&generic)
    })
}
