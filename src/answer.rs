//! Answer normalization and grading.
//!
//! Typed answers are compared after normalization so that casing and stray
//! whitespace do not count against the learner; a second pass ignores
//! punctuation differences ("it's" vs "its").

/// Normalize for comparison: trim, collapse runs of whitespace, lowercase.
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Whether a typed answer matches the expected one.
///
/// Empty or whitespace-only answers never match.
pub fn answers_match(given: &str, expected: &str) -> bool {
    let g = normalize(given);
    if g.is_empty() {
        return false;
    }
    let e = normalize(expected);
    if g == e {
        return true;
    }
    strip_punctuation(&g) == strip_punctuation(&e)
}
