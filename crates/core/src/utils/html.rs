//! HTML error-message extraction
//!
//! The ERP gateway reports validation failures as small HTML documents.
//! These helpers pull a human-readable message out of such a body so the
//! portal never shows raw markup to a client.
//!
//! # Extraction Strategy
//!
//! 1. The first `<p>` paragraph, unescaped and trimmed
//! 2. The whole body with tags stripped and whitespace collapsed
//! 3. The caller's fallback message

use once_cell::sync::Lazy;
use regex::Regex;

/// First paragraph of an HTML error page. `(?is)` keeps the match working
/// across newlines and mixed-case tags.
static FIRST_PARAGRAPH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<p>(.*?)</p>").expect("FIRST_PARAGRAPH_REGEX should compile - this is a bug")
});

static HTML_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("HTML_TAG_REGEX should compile - this is a bug"));

static WHITESPACE_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN_REGEX should compile - this is a bug"));

/// Decimal character references such as `&#233;`.
static NUMERIC_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(\d+);").expect("NUMERIC_ENTITY_REGEX should compile - this is a bug")
});

/// Extract a readable message from an HTML error body.
///
/// Returns the first paragraph when one exists, otherwise the tag-stripped
/// body, otherwise `fallback`. The result never contains markup.
pub fn extract_error_message(body: &str, fallback: &str) -> String {
    if let Some(caps) = FIRST_PARAGRAPH_REGEX.captures(body) {
        if let Some(inner) = caps.get(1) {
            let extracted = unescape_entities(inner.as_str());
            let extracted = extracted.trim();
            if !extracted.is_empty() {
                return extracted.to_string();
            }
        }
    }

    let stripped = HTML_TAG_REGEX.replace_all(body, " ");
    let cleaned = unescape_entities(&stripped);
    let cleaned = WHITESPACE_RUN_REGEX.replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();
    if !cleaned.is_empty() {
        return cleaned.to_string();
    }

    fallback.to_string()
}

/// Resolve the entities the gateway's error pages actually emit: the five
/// named XML entities, `&nbsp;`, and decimal character references.
pub fn unescape_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY_REGEX.replace_all(text, |caps: &regex::Captures<'_>| {
        caps[1].parse::<u32>().ok().and_then(char::from_u32).map(String::from).unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
