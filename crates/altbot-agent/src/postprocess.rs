use std::sync::OnceLock;

use regex::Regex;

/// Lead-in phrases models like to prepend ("Here's alt text describing the image:").
const PREAMBLE_PATTERN: &str = r"(?i)here's alt text (describing|for) the (image|video|audio):?\s*";

fn preamble() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PREAMBLE_PATTERN).ok()).as_ref()
}

/// Strip boilerplate lead-ins and surrounding whitespace from model output.
pub fn normalize(text: &str) -> String {
    match preamble() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}
