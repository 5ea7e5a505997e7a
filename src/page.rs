//! Parses a fetched destination page into what the swap stage needs: the new
//! title, the body markup with every `<script>` removed, and the external
//! scripts that must be re-inserted as fresh elements (scripts assigned
//! through `innerHTML` never run).

use scraper::{Html, Selector};
use std::fmt;
use url::Url;

/// An external script captured from a fetched page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptRef {
    /// The script's absolute URL.
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
}

/// A destination page, ready to be swapped into the live document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// The page's `<title>` text, if it has one.
    pub title: Option<String>,

    /// The inner markup of `<body>`, scripts stripped.
    pub body_html: String,

    /// External body scripts in document order.
    pub scripts: Vec<ScriptRef>,
}

impl FetchedPage {
    /// Parses `html`, resolving script sources against `url` (the address the
    /// page was fetched from). Inline scripts are dropped; external ones are
    /// dropped from the markup and returned in [`FetchedPage::scripts`].
    pub fn parse(html: &str, url: &Url) -> Result<FetchedPage> {
        let mut document = Html::parse_document(html);

        let mut scripts = Vec::new();
        let mut script_nodes = Vec::new();
        for script in document.select(&selector("body script")?) {
            script_nodes.push(script.id());
            let element = script.value();
            if let Some(src) = element.attr("src") {
                match url.join(src) {
                    Ok(src) => scripts.push(ScriptRef {
                        src: src.to_string(),
                        is_async: element.attr("async").is_some(),
                        defer: element.attr("defer").is_some(),
                    }),
                    Err(err) => {
                        tracing::warn!(src, %err, "skipping script with unresolvable src")
                    }
                }
            }
        }
        for id in script_nodes {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        let title = document
            .select(&selector("title")?)
            .next()
            .map(|t| t.text().collect::<String>());
        let body_html = document
            .select(&selector("body")?)
            .next()
            .map(|b| b.inner_html())
            .unwrap_or_default();

        Ok(FetchedPage {
            title,
            body_html,
            scripts,
        })
    }
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::Selector(e.to_string()))
}

/// The result of parsing a fetched page.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to parse a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned when a built-in selector fails to compile.
    Selector(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Selector(err) => write!(f, "invalid selector: {}", err),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;

    const WRITING: &str = r#"<!doctype html>
<html>
<head>
  <title>Writing · Happy Appe</title>
  <script src="scripts/head-only.js"></script>
</head>
<body>
  <div class="page-frame writing-page">
    <div class="article-list"><p class="article-list-placeholder">Loading…</p></div>
    <script>console.log("nested inline")</script>
  </div>
  <script src="scripts/main.js" defer></script>
  <script>window.inline = true;</script>
  <script src="https://cdn.example.net/analytics.js" async></script>
</body>
</html>"#;

    fn parse() -> FetchedPage {
        let url = Url::parse("https://example.org/writing.html").unwrap();
        FetchedPage::parse(WRITING, &url).unwrap()
    }

    #[test]
    fn test_title() {
        assert_eq!(Some(String::from("Writing · Happy Appe")), parse().title);
    }

    #[test]
    fn test_body_has_no_scripts() {
        let page = parse();
        assert!(!page.body_html.contains("<script"), "{}", page.body_html);
        assert!(page.body_html.contains(r#"class="page-frame writing-page""#));
        assert!(page.body_html.contains("article-list-placeholder"));
    }

    #[test]
    fn test_external_body_scripts_in_order() {
        assert_eq!(
            vec![
                ScriptRef {
                    src: String::from("https://example.org/scripts/main.js"),
                    is_async: false,
                    defer: true,
                },
                ScriptRef {
                    src: String::from("https://cdn.example.net/analytics.js"),
                    is_async: true,
                    defer: false,
                },
            ],
            parse().scripts
        );
    }

    #[test]
    fn test_page_without_title_or_scripts() {
        let url = Url::parse("https://example.org/").unwrap();
        let page = FetchedPage::parse("<p>hi</p>", &url).unwrap();
        assert_eq!(None, page.title);
        assert_eq!("<p>hi</p>", page.body_html);
        assert!(page.scripts.is_empty());
    }
}
