//! Rendering helpers for Telegram-flavored HTML.

/// Escape user-supplied text for inclusion in an HTML-mode message body.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_special_chars() {
        assert_eq!(
            escape_html(r#"<b>&"fish"</b>"#),
            "&lt;b&gt;&amp;&quot;fish&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }
}
