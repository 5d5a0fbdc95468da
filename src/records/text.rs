//! Plain-text helpers for rich-text fields
//!
//! Journal text is stored as HTML from the dashboard editor. Previews and
//! exports want it as plain text.

use regex::Regex;
use std::sync::OnceLock;

/// Length of list-view previews, ellipsis included
pub const PREVIEW_CHARS: usize = 100;

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    // Attribute lists may wrap onto several lines
    TAG_PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("static tag pattern"))
}

/// Remove every HTML tag
pub fn strip_tags(html: &str) -> String {
    tag_pattern().replace_all(html, "").into_owned()
}

/// Remove tags and decode the few entities the editor emits
pub fn clean_html(html: &str) -> String {
    strip_tags(html)
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
}

/// Truncate to at most `max` characters, ending with an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <strong>there</strong></p>"), "Hello there");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_strip_tags_spanning_lines() {
        assert_eq!(strip_tags("<p style=\"a\"\nclass=\"x\">Hello</p>"), "Hello");
        assert_eq!(strip_tags("<p>one\ntwo</p>"), "one\ntwo");
    }

    #[test]
    fn test_clean_html_entities() {
        assert_eq!(
            clean_html("<p>It&#39;s&nbsp;a &quot;test&quot;</p>"),
            "It's a \"test\""
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 10), "abcdefghij");
        let cut = truncate_chars("abcdefghijk", 10);
        assert_eq!(cut, "abcdefghi…");
        assert_eq!(cut.chars().count(), 10);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("ééééé", 3), "éé…");
    }
}
