//! Text helpers for hand-built HTML and page metadata

/// Escape text for use in HTML content or a quoted attribute
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Shorten `text` to at most `max_chars` characters for a meta description.
///
/// Whitespace runs collapse to one space. Longer text is cut at the last
/// word boundary that fits and ends with an ellipsis.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max_chars {
        return text;
    }

    // One character is reserved for the ellipsis. Looking one past the
    // budget keeps a word that ends exactly at the limit.
    let budget = max_chars.saturating_sub(1);
    let window: String = text.chars().take(budget + 1).collect();
    let cut: String = match window.rfind(' ') {
        Some(space) if space > 0 => window[..space].to_string(),
        _ => window.chars().take(budget).collect(),
    };
    format!("{}…", cut.trim_end_matches([',', ';', ':', '.']))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(html_escape("naïve"), "naïve");
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize("Short", 160), "Short");
        assert_eq!(summarize("  spread\n over   lines ", 160), "spread over lines");
        assert_eq!(summarize("Hello brave new world", 12), "Hello brave…");
        assert_eq!(summarize("Hello, world again", 10), "Hello…");
        assert_eq!(summarize("abcdefghij", 5), "abcd…");
    }
}
