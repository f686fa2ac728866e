//! Field-name and value normalisation used for matching.
//!
//! Both are deliberately minimal: surrounding whitespace is trimmed and
//! letters are lower-cased. Inner whitespace, punctuation and number
//! formatting are compared as-is (`"3.50"` does not match `"3.5"`).

/// Normalise a field name for lookup.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalise a field value for comparison. Missing values become `""`.
pub fn normalize_value(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_lowercase()).unwrap_or_default()
}
