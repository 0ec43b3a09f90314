use std::sync::OnceLock;

use regex::Regex;

fn line_break() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").ok()).as_ref()
}

fn paragraph_break() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</p>\s*<p[^>]*>").ok()).as_ref()
}

fn any_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").ok()).as_ref()
}

fn replace(re: Option<&Regex>, text: &str, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Convert status HTML to plain text.
pub fn html_to_text(html: &str) -> String {
    let text = replace(line_break(), html, "\n");
    let text = replace(paragraph_break(), &text, "\n\n");
    let text = replace(any_tag(), &text, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}
