use once_cell::sync::Lazy;
use regex::Regex;

static RE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Text normalization shared by every scorer.
///
/// 1. lowercase
/// 2. every character that is neither a word character nor whitespace becomes a space
/// 3. whitespace runs collapse to one space, and the result is trimmed
///
/// Empty input gives an empty string. Word characters are Unicode-aware and include `_`.
pub fn normalize_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let spaced = RE_PUNCTUATION.replace_all(&lowered, " ");
    let collapsed = RE_WHITESPACE.replace_all(&spaced, " ");
    collapsed.trim().to_string()
}

/// `normalize_text` for optional fields; absent means empty.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize_text).unwrap_or_default()
}
