//! Pulls the pieces of an article out of feed and post markup: the lead
//! image, the first paragraph (used as the subhead), and the body of a full
//! post page.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Candidate containers for a post's body, most specific first.
pub const POST_BODY_SELECTORS: &[&str] = &[
    ".markup",
    "[class*=\"markup\"]",
    ".post-body",
    "[class*=\"post-body\"]",
    ".body",
    "[class*=\"body\"]",
    "article .body",
    "section[class*=\"post\"]",
];

/// A container must hold more text than this to count as the body, which
/// skips empty wrappers that happen to match a selector.
const MIN_BODY_TEXT: usize = 100;

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("hardcoded regex pattern is valid")
});

static FIRST_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("hardcoded regex pattern is valid")
});

static FIRST_PARAGRAPH_AND_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<p[^>]*>.*?</p>\s*").expect("hardcoded regex pattern is valid")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("hardcoded regex pattern is valid"));

static OPENING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[a-z].*>").expect("hardcoded regex pattern is valid"));

/// The `src` of the first `<img>` in `html`.
pub fn first_img_src(html: &str) -> Option<&str> {
    IMG_SRC
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The text of the first `<p>`, tags stripped and trimmed. Empty if there is
/// no paragraph.
pub fn first_paragraph_text(html: &str) -> String {
    match FIRST_PARAGRAPH.captures(html).and_then(|c| c.get(1)) {
        Some(inner) => ANY_TAG.replace_all(inner.as_str(), "").trim().to_owned(),
        None => String::new(),
    }
}

/// `html` without its first `<p>` (and the whitespace after it), trimmed.
pub fn strip_first_paragraph(html: &str) -> String {
    FIRST_PARAGRAPH_AND_SPACE
        .replace(html, "")
        .trim()
        .to_owned()
}

/// Whether `text` contains anything that looks like an HTML tag.
pub fn has_markup(text: &str) -> bool {
    OPENING_TAG.is_match(text)
}

/// Splits `html` into a subhead (its first paragraph's text) and the content
/// that follows. With no usable first paragraph the whole of `html` is the
/// content.
pub fn split_subhead(html: &str) -> (String, String) {
    let subhead = first_paragraph_text(html);
    if subhead.is_empty() {
        (subhead, html.to_owned())
    } else {
        (subhead, strip_first_paragraph(html))
    }
}

/// Finds the body of a full post page: the first [`POST_BODY_SELECTORS`]
/// match holding enough text, minus its first captioned image (which
/// duplicates the article's lead image). Returns the trimmed inner markup,
/// or `None` if nothing qualifies.
pub fn extract_post_body(html: &str) -> Option<String> {
    let mut document = Html::parse_document(html);
    let caption = Selector::parse(".captioned-image-container").ok()?;

    let mut body = None;
    for selector in POST_BODY_SELECTORS {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(err) => {
                tracing::warn!(selector, %err, "skipping invalid selector");
                continue;
            }
        };
        if let Some(element) = document.select(&selector).next() {
            if element.text().collect::<String>().trim().chars().count() > MIN_BODY_TEXT {
                let image = element.select(&caption).next().map(|e| e.id());
                body = Some((element.id(), image));
                break;
            }
        }
    }

    let (body, image) = body?;
    if let Some(image) = image {
        if let Some(mut node) = document.tree.get_mut(image) {
            node.detach();
        }
    }
    let element = document.tree.get(body).and_then(scraper::ElementRef::wrap)?;
    Some(element.inner_html().trim().to_owned())
}
