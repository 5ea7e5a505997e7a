//! Defines the [`Article`] type, the on-disk [`ArticleFile`] document, and the
//! [`ArticleStore`], which is the date-ordered, in-memory collection the
//! writing page renders from. Articles are produced by the sync binary and
//! loaded read-only by the browser; a store is never mutated after it's
//! built, only replaced.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single piece of writing. Field names serialize in camelCase to match
/// `data/articles.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// The article's slug. Unique across the collection and used verbatim as
    /// the URL fragment for deep links.
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// ISO date (`YYYY-MM-DD`). Day granularity is all the ordering relies
    /// on.
    #[serde(default)]
    pub date: String,

    /// Display date, e.g. `Mar 4 24`.
    #[serde(default)]
    pub date_formatted: String,

    /// Empty when the article has no lead image.
    #[serde(default)]
    pub image_url: String,

    /// Empty when the article has no subhead.
    #[serde(default)]
    pub subhead: String,

    /// Raw HTML fragment for the article body.
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub source_url: String,
}

/// The persisted shape of `data/articles.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ArticleFile {
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// Sorts articles most-recent first. The sort is stable, but articles dated
/// the same day keep no particular order beyond that.
pub fn sort_by_date(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.date.cmp(&a.date));
}

/// The ordered collection of [`Article`]s for one page load.
#[derive(Debug, Default)]
pub struct ArticleStore {
    articles: Vec<Article>,
}

impl ArticleStore {
    /// Builds a store from an arbitrary list. Articles with an empty `id` and
    /// repeats of an `id` already seen are dropped so lookups by fragment are
    /// unambiguous; the remainder is sorted by date.
    pub fn new(articles: Vec<Article>) -> ArticleStore {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
        for article in articles {
            if article.id.is_empty() {
                tracing::warn!(title = %article.title, "dropping article without id");
                continue;
            }
            if !seen.insert(article.id.clone()) {
                tracing::warn!(id = %article.id, "dropping duplicate article");
                continue;
            }
            kept.push(article);
        }
        sort_by_date(&mut kept);
        ArticleStore { articles: kept }
    }

    /// Parses the contents of an [`ArticleFile`].
    pub fn from_json(text: &str) -> Result<ArticleStore> {
        let file: ArticleFile = serde_json::from_str(text)?;
        Ok(ArticleStore::new(file.articles))
    }

    /// Fetches and parses the article document at `url`. Any failure is
    /// reported once; callers show a placeholder rather than retrying.
    #[cfg(target_arch = "wasm32")]
    pub async fn fetch(url: &str) -> Result<ArticleStore> {
        use gloo_net::http::Request;

        let response = Request::get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        if !response.ok() {
            return Err(Error::Status(response.status()));
        }
        let text = response
            .text()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        ArticleStore::from_json(&text)
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// The most recent article, which is selected when no deep link is given.
    pub fn first(&self) -> Option<&Article> {
        self.articles.first()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }
}

/// The result of a fallible store operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to load the article document.
#[derive(Debug)]
pub enum Error {
    /// Returned when the document isn't valid article JSON.
    Json(serde_json::Error),

    /// Returned when the request couldn't be made or the body couldn't be
    /// read.
    Fetch(String),

    /// Returned when the server answers with a non-success status.
    Status(u16),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "parsing articles: {}", err),
            Error::Fetch(err) => write!(f, "fetching articles: {}", err),
            Error::Status(status) => {
                write!(f, "fetching articles: HTTP status {}", status)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::Fetch(_) => None,
            Error::Status(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    /// Converts a [`serde_json::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator when decoding the document.
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}
