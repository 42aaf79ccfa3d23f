//! Lossy HTML-to-text reduction.
//!
//! The output is only meant for keyword and digit scanning: layout is
//! discarded, every tag becomes a single space so adjacent tokens stay apart.

use once_cell::sync::Lazy;
use regex::Regex;

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Named entities decoded after tag removal, in application order.
const ENTITIES: [(&str, &str); 4] = [("&nbsp;", " "), ("&amp;", "&"), ("&lt;", "<"), ("&gt;", ">")];

/// Returns the approximate visible text of an HTML fragment.
///
/// Style and script blocks are dropped with their content, remaining tags
/// are replaced by a space, and `&nbsp;`, `&amp;`, `&lt;`, `&gt;` are decoded.
/// Malformed markup is handled best-effort: an unterminated tag or block is
/// left in place.
///
/// # Example
///
/// ```
/// use mail_otp::markup::strip_markup;
///
/// let text = strip_markup("<style>p{}</style><p>Code:&nbsp;<b>1234</b></p>");
/// assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["Code:", "1234"]);
/// ```
#[must_use]
pub fn strip_markup(html: &str) -> String {
    let without_styles = STYLE_BLOCK.replace_all(html, "");
    let without_scripts = SCRIPT_BLOCK.replace_all(&without_styles, "");
    let mut text = TAG.replace_all(&without_scripts, " ").into_owned();

    for (entity, literal) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, literal);
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_style_and_script_blocks() {
        let html = "<STYLE type=\"text/css\">.otp { color: red; } 9999</STYLE>\
                    <script>var x = 123456;</script><p>Use 4321</p>";
        let text = strip_markup(html);
        assert!(!text.contains("9999"));
        assert!(!text.contains("123456"));
        assert!(text.contains("Use 4321"));
    }

    #[test]
    fn test_block_removal_is_non_greedy() {
        let html = "<style>a{}</style>keep 1111<style>b{}</style>";
        assert_eq!(strip_markup(html), "keep 1111");
    }

    #[test]
    fn test_tags_become_spaces() {
        assert_eq!(strip_markup("<td>12</td><td>34</td>"), " 12  34 ");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(
            strip_markup("a&nbsp;b &amp; c &lt;d&gt;"),
            "a b & c <d>"
        );
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let text = strip_markup("Code 5555 <style> never closed <b");
        assert_eq!(text, "Code 5555   never closed <b");
    }

    #[test]
    fn test_multiline_script_block() {
        let html = "<script>\nconst a = 1;\nconst b = 22222;\n</script>ok";
        assert_eq!(strip_markup(html), "ok");
    }
}
