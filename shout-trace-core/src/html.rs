use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;

static HTML_MAP: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ('<', "&lt;"),
        ('>', "&gt;"),
        ('"', "&quo;"),
        ('&', "&amp;"),
        (' ', "&nbsp;"),
        ('\n', "<br />\n"),
    ])
});

/// Escapes text for display inside markup. Spaces and newlines are rendered
/// visibly, so this is meant for body text, not attribute values.
///
/// Absent input stays absent. Borrows when nothing needs escaping.
pub fn html_escape(text: Option<&str>) -> Option<Cow<'_, str>> {
    text.map(escape_str)
}

pub fn escape_str(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| HTML_MAP.contains_key(&c)) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match HTML_MAP.get(&c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Applies [`escape_str`] only when `enabled`.
pub fn escape_if(text: &str, enabled: bool) -> Cow<'_, str> {
    if enabled {
        escape_str(text)
    } else {
        Cow::Borrowed(text)
    }
}

/// Escaping for double-quoted attribute values.
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
