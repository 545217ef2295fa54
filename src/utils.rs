//! Text helpers shared by the fetchers, the session and the exporters.

use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Turn a feed summary into plain single-line text.
///
/// Feed descriptions frequently embed HTML markup; tags are dropped and the
/// handful of HTML entities that survive XML unescaping are decoded.
pub fn clean_summary(raw: &str) -> String {
    let without_tags = HTML_TAG.replace_all(raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    squash_whitespace(&decoded)
}

/// Pad or cut `s` to exactly `width` characters for table columns.
pub fn fit_width(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        format!("{}{}", s, " ".repeat(width - count))
    } else if width == 0 {
        String::new()
    } else {
        let kept: String = s.chars().take(width - 1).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hola, mundo!", 100), "Hola, mundo!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let result = truncate_for_log("añoñoño", 2);
        assert!(result.starts_with("añ"));
    }

    #[test]
    fn test_clean_summary_strips_markup_and_newlines() {
        let raw = "<p>El dólar <b>subió</b>\nhoy &amp; mañana</p>\n";
        assert_eq!(clean_summary(raw), "El dólar subió hoy & mañana");
    }

    #[test]
    fn test_clean_summary_empty() {
        assert_eq!(clean_summary(""), "");
    }

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdef", 4), "abc…");
        assert_eq!(fit_width("ñandú", 5), "ñandú");
    }
}
