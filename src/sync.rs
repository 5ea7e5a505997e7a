//! The feed sync: fetch the feed, map its items, backfill bodies the feed
//! only excerpts, and replace the article document atomically.

use crate::article::{sort_by_date, Article, ArticleFile};
use crate::config::Config;
use crate::extract;
use crate::feed;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// A fetched response: its status and its body as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches documents over HTTP.
pub trait Http {
    /// GETs `url`. Only transport failures are errors; any status is a
    /// [`Fetched`].
    fn get(&self, url: &str) -> Result<Fetched>;
}

/// [`Http`] over a blocking `reqwest` client.
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<HttpClient> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(HttpClient { client })
    }
}

impl Http for HttpClient {
    fn get(&self, url: &str) -> Result<Fetched> {
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        Ok(Fetched {
            status,
            body: response.text()?,
        })
    }
}

/// What a successful sync did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub articles: usize,
    pub backfilled: usize,
    pub output: PathBuf,
}

/// Runs a full sync as described by `config`. On any failure the existing
/// article document is left as it was.
pub fn run(config: &Config, http: &impl Http) -> Result<Summary> {
    let url = config.feed_url.as_str();
    tracing::info!(url, "fetching feed");
    let response = http.get(url)?;
    if !response.is_success() {
        return Err(Error::Status {
            url: url.to_owned(),
            status: response.status,
        });
    }

    let mut articles = feed::articles_from_feed(&response.body)?;
    let backfilled = if config.backfill {
        backfill(&mut articles, http)?
    } else {
        0
    };
    sort_by_date(&mut articles);

    let count = articles.len();
    write_articles(&config.output, &ArticleFile { articles })?;
    tracing::info!(count, output = %config.output.display(), "wrote articles");
    Ok(Summary {
        articles: count,
        backfilled,
        output: config.output.clone(),
    })
}

/// Fills in the content of articles the feed gave no body for, by fetching
/// each post page and extracting its body. Posts that answer with an error
/// status, or whose body can't be found, are left as they are. Returns how
/// many articles were filled in.
pub fn backfill(articles: &mut [Article], http: &impl Http) -> Result<usize> {
    let mut filled = 0;
    for article in articles.iter_mut() {
        if !article.content.is_empty() || article.source_url.is_empty() {
            continue;
        }
        let response = http.get(&article.source_url)?;
        if !response.is_success() {
            tracing::warn!(
                url = %article.source_url,
                status = response.status,
                "skipping post that couldn't be fetched"
            );
            continue;
        }
        let body = match extract::extract_post_body(&response.body) {
            Some(body) => body,
            None => {
                tracing::debug!(url = %article.source_url, "no post body found");
                continue;
            }
        };
        if article.subhead.is_empty() {
            let (subhead, content) = extract::split_subhead(&body);
            article.subhead = subhead;
            article.content = content;
        } else {
            article.content = body;
        }
        tracing::debug!(id = %article.id, "backfilled post body");
        filled += 1;
    }
    Ok(filled)
}

/// Writes `file` to `path` as pretty-printed JSON. The document is written
/// to a temporary file in the same directory and renamed over `path`, so
/// readers see either the old document or the new one, and a failure leaves
/// no temporary file behind.
pub fn write_articles(path: &Path, file: &ArticleFile) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, file)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// The result of a sync step.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed sync.
#[derive(Debug)]
pub enum Error {
    /// Returned when a request fails in transport.
    Http(reqwest::Error),

    /// Returned when the feed answers with a non-success status.
    Status { url: String, status: u16 },

    /// Returned when the feed isn't valid RSS.
    Feed(rss::Error),

    /// Returned when the article document can't be serialized.
    Json(serde_json::Error),

    /// Returned for filesystem failures while writing the document.
    Io(std::io::Error),

    /// Returned when the finished document can't be moved into place.
    Persist(tempfile::PersistError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http(err) => write!(f, "request failed: {}", err),
            Error::Status { url, status } => write!(f, "fetching `{}`: HTTP {}", url, status),
            Error::Feed(err) => write!(f, "parsing feed: {}", err),
            Error::Json(err) => write!(f, "serializing articles: {}", err),
            Error::Io(err) => err.fmt(f),
            Error::Persist(err) => write!(f, "replacing article document: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(err) => Some(err),
            Error::Status { .. } => None,
            Error::Feed(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Persist(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}

impl From<rss::Error> for Error {
    fn from(err: rss::Error) -> Error {
        Error::Feed(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator when writing the article document.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::Persist(err)
    }
}
