/// Decode the handful of entities line markup carries, for terminal output.
/// `&amp;` goes last so `&amp;lt;` prints as `&lt;`.
pub fn unescape_html(markup: &str) -> String {
    markup
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#61;", "=")
        .replace("&amp;", "&")
}

/// Shorten `text` to `max` characters, marking the cut with `…`
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
