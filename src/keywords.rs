use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

// Leftmost-first alternation: a triple dash is consumed whole before the
// double dash gets a chance to split it.
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"---|--|[;,]").unwrap());

/// Split a raw keyword field into distinct, lowercase, trimmed keywords.
pub fn normalize_keywords(raw: &str) -> BTreeSet<String> {
    SEPARATOR_RE
        .split(raw)
        .map(str::trim)
        .filter(|kw| !kw.is_empty())
        .map(str::to_lowercase)
        .collect()
}
