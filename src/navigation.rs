//! Classifies links into the two logical pages the site transitions between
//! and derives the canonical paths pushed onto the history stack. Everything
//! here is resolved with [`url::Url`] against the document's current location,
//! so it behaves the same in the browser and in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The two logical pages of the site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Home,
    Writing,
}

impl PageKind {
    /// Derives the page for a location path. Anything that isn't a writing
    /// path is treated as home, which is what back/forward handling wants.
    pub fn from_path(path: &str) -> PageKind {
        if is_writing_path(path) {
            PageKind::Writing
        } else {
            PageKind::Home
        }
    }

    /// The selector for the region whose opacity transition paces the fades
    /// while this page's content is on screen.
    pub fn fade_selector(self) -> &'static str {
        match self {
            PageKind::Home => ".text-columns, .grid-field",
            PageKind::Writing => ".article-list-container, .article-content",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Home => "home",
            PageKind::Writing => "writing",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a click on a link should do. [`NavigationTarget::None`] leaves the
/// click to the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationTarget {
    Home,
    Writing,
    None,
}

impl NavigationTarget {
    pub fn page(self) -> Option<PageKind> {
        match self {
            NavigationTarget::Home => Some(PageKind::Home),
            NavigationTarget::Writing => Some(PageKind::Writing),
            NavigationTarget::None => None,
        }
    }
}

impl From<PageKind> for NavigationTarget {
    fn from(page: PageKind) -> NavigationTarget {
        match page {
            PageKind::Home => NavigationTarget::Home,
            PageKind::Writing => NavigationTarget::Writing,
        }
    }
}

/// The attributes of an anchor element that decide whether it's eligible for
/// an in-page transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct Link<'a> {
    /// The raw `href` attribute, unresolved.
    pub href: Option<&'a str>,

    /// The `target` attribute.
    pub target: Option<&'a str>,

    /// Whether the anchor carries a `download` attribute.
    pub download: bool,
}

/// The marker stored with each history entry the engine pushes. Only used to
/// tell pop events apart; rendering always re-derives the page from the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub page: PageKind,
}

/// Resolves `link` against `location` if it's eligible for a transition at
/// all: it has a non-fragment `href`, opens in the same tab, isn't a
/// download, stays on the same origin, and carries no fragment.
pub fn resolve(link: &Link, location: &Url) -> Option<Url> {
    let href = link.href?;
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if link.target == Some("_blank") || link.download {
        return None;
    }
    let resolved = location.join(href).ok()?;
    if !same_origin(&resolved, location) {
        return None;
    }
    match resolved.fragment() {
        Some(fragment) if !fragment.is_empty() => None,
        _ => Some(resolved),
    }
}

/// Classifies `link` as a transition to the home page, the writing page, or
/// neither.
pub fn classify_link(link: &Link, location: &Url) -> NavigationTarget {
    match resolve(link, location) {
        Some(url) => target_for_path(url.path()),
        None => NavigationTarget::None,
    }
}

/// Maps a resolved path onto a [`NavigationTarget`].
pub fn target_for_path(path: &str) -> NavigationTarget {
    if is_writing_path(path) {
        NavigationTarget::Writing
    } else if path.is_empty()
        || path == "/"
        || path.ends_with('/')
        || path.ends_with("/index.html")
    {
        NavigationTarget::Home
    } else {
        NavigationTarget::None
    }
}

/// The path pushed onto the history stack after transitioning to `page` at
/// `url`. Query and fragment are dropped.
pub fn history_path(page: PageKind, url: &Url) -> String {
    let path = url.path();
    match page {
        PageKind::Writing => match path {
            "" | "/" => String::from("/writing.html"),
            _ => path.to_owned(),
        },
        PageKind::Home => match path.strip_suffix("index.html") {
            Some(dir) if path.ends_with("/index.html") => match dir {
                "" => String::from("/"),
                _ => dir.to_owned(),
            },
            _ if path.is_empty() => String::from("/"),
            _ => path.to_owned(),
        },
    }
}

fn is_writing_path(path: &str) -> bool {
    path.ends_with("writing.html") || path.ends_with("/writing")
}

// `Url::origin` is opaque (and never equal) for `file:` URLs, which would
// disable transitions when the site is opened from disk.
fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod test {
    use super::*;

    fn location() -> Url {
        Url::parse("https://example.org/index.html").unwrap()
    }

    fn href(href: &str) -> NavigationTarget {
        classify_link(
            &Link {
                href: Some(href),
                ..Link::default()
            },
            &location(),
        )
    }

    #[test]
    fn test_writing_links() {
        for h in [
            "writing.html",
            "/writing.html",
            "./writing.html",
            "/writing",
            "/blog/writing",
            "https://example.org/writing.html",
            "writing.html?from=home",
        ] {
            assert_eq!(NavigationTarget::Writing, href(h), "href `{}`", h);
        }
    }

    #[test]
    fn test_home_links() {
        for h in ["/", "index.html", "/index.html", "/blog/", "..", "https://example.org"] {
            assert_eq!(NavigationTarget::Home, href(h), "href `{}`", h);
        }
    }

    #[test]
    fn test_other_same_origin_links() {
        for h in ["/about.html", "/styles/main.css", "/writings", "/writing.htm"] {
            assert_eq!(NavigationTarget::None, href(h), "href `{}`", h);
        }
    }

    #[test]
    fn test_fragment_and_empty_links() {
        for h in ["", "#", "#about", "writing.html#on-lanes", "/#top"] {
            assert_eq!(NavigationTarget::None, href(h), "href `{}`", h);
        }
    }

    #[test]
    fn test_cross_origin_links() {
        for h in [
            "https://happyappe.substack.com/writing",
            "http://example.org/writing.html",
            "https://example.org:8443/writing.html",
            "mailto:hi@example.org",
        ] {
            assert_eq!(NavigationTarget::None, href(h), "href `{}`", h);
        }
    }

    #[test]
    fn test_new_tab_and_download_links() {
        let blank = Link {
            href: Some("writing.html"),
            target: Some("_blank"),
            download: false,
        };
        let download = Link {
            href: Some("writing.html"),
            target: None,
            download: true,
        };
        let missing = Link::default();
        assert_eq!(NavigationTarget::None, classify_link(&blank, &location()));
        assert_eq!(NavigationTarget::None, classify_link(&download, &location()));
        assert_eq!(NavigationTarget::None, classify_link(&missing, &location()));
    }

    #[test]
    fn test_same_target_frame_is_eligible() {
        let link = Link {
            href: Some("writing.html"),
            target: Some("_self"),
            download: false,
        };
        assert_eq!(NavigationTarget::Writing, classify_link(&link, &location()));
    }

    #[test]
    fn test_file_urls_share_an_origin() -> Result<(), url::ParseError> {
        let location = Url::parse("file:///home/me/site/index.html")?;
        let link = Link {
            href: Some("writing.html"),
            ..Link::default()
        };
        assert_eq!(NavigationTarget::Writing, classify_link(&link, &location));
        Ok(())
    }

    #[test]
    fn test_page_kind_from_path() {
        assert_eq!(PageKind::Writing, PageKind::from_path("/writing.html"));
        assert_eq!(PageKind::Writing, PageKind::from_path("/writing"));
        assert_eq!(PageKind::Home, PageKind::from_path("/"));
        assert_eq!(PageKind::Home, PageKind::from_path("/about.html"));
    }

    #[test]
    fn test_history_paths() -> Result<(), url::ParseError> {
        let cases = [
            (PageKind::Writing, "https://example.org/writing.html?x=1", "/writing.html"),
            (PageKind::Writing, "https://example.org/", "/writing.html"),
            (PageKind::Writing, "https://example.org/writing", "/writing"),
            (PageKind::Home, "https://example.org/index.html", "/"),
            (PageKind::Home, "https://example.org/site/index.html", "/site/"),
            (PageKind::Home, "https://example.org/", "/"),
            (PageKind::Home, "https://example.org/site/#top", "/site/"),
        ];
        for (page, url, wanted) in cases {
            assert_eq!(wanted, history_path(page, &Url::parse(url)?), "url `{}`", url);
        }
        Ok(())
    }

    #[test]
    fn test_history_state_serializes_page_name() -> Result<(), serde_json::Error> {
        let state = HistoryState {
            page: PageKind::Writing,
        };
        assert_eq!(r#"{"page":"writing"}"#, serde_json::to_string(&state)?);
        Ok(())
    }
}
