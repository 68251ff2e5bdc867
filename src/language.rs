//! Language tag validation and script detection.
//!
//! Script detection is a heuristic for the language-of-parts check. It is
//! intentionally coarse: detect likely foreign-language content, avoid
//! false positives on Latin text, and defer precise identification to
//! `/Lang` metadata.

use std::collections::HashSet;

lazy_static::lazy_static! {
    /// BCP 47 language tag syntax (RFC 5646 subset): a 2-3 letter primary
    /// subtag followed by hyphen-separated subtags.
    static ref LANG_TAG: regex::Regex = regex::Regex::new(
        r"^[A-Za-z]{2,3}(?:-(?:[A-Za-z]{4}|[A-Za-z]{2}|[0-9]{3}|[A-Za-z0-9]{5,8}))*$"
    )
    .expect("lang tag regex");

    /// Unicode script block detection, per the Unicode code charts.
    static ref SCRIPT_PATTERNS: Vec<(&'static str, regex::Regex)> = vec![
        // Cyrillic blocks (basic + extensions)
        ("Cyrillic", regex::Regex::new(r"[\x{0400}-\x{052f}\x{2de0}-\x{2dff}\x{a640}-\x{a69f}]").expect("cyrillic")),
        // CJK: Hiragana, Katakana, CJK Unified Ideographs, Hangul
        ("CJK", regex::Regex::new(r"[\x{3040}-\x{30ff}\x{3400}-\x{4dbf}\x{4e00}-\x{9fff}\x{ac00}-\x{d7af}]").expect("cjk")),
        // Arabic script (basic + extensions)
        ("Arabic", regex::Regex::new(r"[\x{0600}-\x{06ff}\x{0750}-\x{077f}\x{08a0}-\x{08ff}]").expect("arabic")),
        ("Hebrew", regex::Regex::new(r"[\x{0590}-\x{05ff}]").expect("hebrew")),
        ("Greek", regex::Regex::new(r"[\x{0370}-\x{03ff}]").expect("greek")),
        // Indic scripts (Devanagari through Sinhala)
        ("Indic", regex::Regex::new(r"[\x{0900}-\x{0dff}]").expect("indic")),
    ];
}

/// Likely primary subtags per detected script. Hints only; scripts are
/// shared across many languages.
fn script_language_hints(script: &str) -> &'static [&'static str] {
    match script {
        "Cyrillic" => &["ru", "uk", "bg", "sr", "mk", "be", "kk", "ky", "mn"],
        "Arabic" => &["ar", "fa", "ur", "ps"],
        "CJK" => &["zh", "ja", "ko"],
        "Hebrew" => &["he", "iw", "yi"],
        "Greek" => &["el"],
        "Indic" => &["hi", "mr", "ne", "bn", "pa", "gu", "or", "ta", "te", "kn", "ml", "si"],
        _ => &[],
    }
}

/// Clean up a `/Lang` entry: trim and drop a stray leading slash.
pub fn normalize_lang_value(lang: &str) -> Option<String> {
    let normalized = lang.trim().trim_start_matches('/').trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Validate BCP 47-style language tags.
pub fn is_valid_lang_tag(lang: &str) -> bool {
    match normalize_lang_value(lang) {
        Some(normalized) => LANG_TAG.is_match(&normalized),
        None => false,
    }
}

/// First script label whose block appears in the text.
pub fn detect_script_hint(text: &str) -> Option<&'static str> {
    if text.is_empty() {
        return None;
    }
    SCRIPT_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(label, _)| *label)
}

/// All script labels detected within the text.
pub fn collect_script_hints(text: &str) -> HashSet<&'static str> {
    SCRIPT_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(label, _)| *label)
        .collect()
}

/// Primary language subtag, lowercased.
pub fn base_language(lang: &str) -> Option<String> {
    let normalized = normalize_lang_value(lang)?;
    Some(normalized.to_lowercase().split('-').next()?.to_string())
}

/// Whether a language tag plausibly covers the detected script.
pub fn lang_matches_script(lang: &str, script: &str) -> bool {
    let Some(base) = base_language(lang) else {
        return false;
    };
    script_language_hints(script).contains(&base.as_str())
}
