//! Plain-text summary of a release notes page

use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Length of the body-text fallback summary, in characters
const FALLBACK_SUMMARY_CHARS: usize = 200;

static PARAGRAPH_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector is valid"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector is valid"));

/// Summarize release notes content
///
/// Uses the first paragraph with text. Pages without one fall back to the start of the
/// body text.
pub fn summarize(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(content);

    let paragraph = document
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .find(|text| !text.is_empty());

    if let Some(paragraph) = paragraph {
        return paragraph;
    }

    document
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| collapse_whitespace(&body.text().collect::<String>()))
        .unwrap_or_default()
        .chars()
        .take(FALLBACK_SUMMARY_CHARS)
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
