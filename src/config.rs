//! Configuration for the feed sync. Settings come from an optional
//! `site.yaml` in the project root, found by walking up from a starting
//! directory, and are overridden by whatever the command line (or its
//! environment) supplied.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "site.yaml";

/// The publication synced when nothing else is configured.
pub const DEFAULT_FEED_URL: &str = "https://happyappe.substack.com/feed";

/// Where the article document goes, relative to the project root.
pub const DEFAULT_OUTPUT: &str = "data/articles.json";

/// Sent with post page requests; some hosts refuse clients without one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; SubstackSync/1.0)";

fn default_backfill() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Project {
    #[serde(default)]
    feed_url: Option<String>,

    #[serde(default)]
    output: Option<PathBuf>,

    #[serde(default = "default_backfill")]
    backfill: bool,

    #[serde(default)]
    user_agent: Option<String>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            feed_url: None,
            output: None,
            backfill: default_backfill(),
            user_agent: None,
        }
    }
}

/// Settings given on the command line. `None` defers to the project file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub feed_url: Option<String>,
    pub output: Option<PathBuf>,
    pub no_backfill: bool,
}

/// The resolved sync configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The directory holding `site.yaml`, or the starting directory if there
    /// is none.
    pub project_root: PathBuf,
    pub feed_url: Url,
    pub output: PathBuf,

    /// Whether to fetch full post pages for items the feed only excerpts.
    pub backfill: bool,
    pub user_agent: String,
}

impl Config {
    /// Looks for `site.yaml` in `dir` and each of its ancestors, and builds
    /// a [`Config`] from the first one found. Without a project file the
    /// defaults apply and `dir` is the project root.
    pub fn from_directory(dir: &Path, overrides: Overrides) -> Result<Config> {
        match dir
            .ancestors()
            .map(|d| d.join(PROJECT_FILE))
            .find(|path| path.is_file())
        {
            Some(path) => Config::from_project_file(&path, overrides),
            None => {
                tracing::debug!(dir = %dir.display(), "no {} found; using defaults", PROJECT_FILE);
                Config::resolve(dir, Project::default(), overrides)
            }
        }
    }

    /// Builds a [`Config`] from the project file at `path`.
    pub fn from_project_file(path: &Path, overrides: Overrides) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        // An empty file deserializes to null rather than an empty mapping.
        let project: Project = if text.trim().is_empty() {
            Project::default()
        } else {
            serde_yaml::from_str(&text)?
        };
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        tracing::debug!(path = %path.display(), "loaded project file");
        Config::resolve(root, project, overrides)
    }

    fn resolve(root: &Path, project: Project, overrides: Overrides) -> Result<Config> {
        let feed_url = overrides
            .feed_url
            .or(project.feed_url)
            .unwrap_or_else(|| String::from(DEFAULT_FEED_URL));
        let output = match (overrides.output, project.output) {
            (Some(output), _) => output,
            (None, Some(output)) => root.join(output),
            (None, None) => root.join(DEFAULT_OUTPUT),
        };
        Ok(Config {
            project_root: root.to_owned(),
            feed_url: Url::parse(&feed_url)?,
            output,
            backfill: project.backfill && !overrides.no_backfill,
            user_agent: project
                .user_agent
                .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT)),
        })
    }
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when the project file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML for a [`Config`].
    Yaml(serde_yaml::Error),

    /// Returned when the configured feed URL doesn't parse.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "reading `{}`: {}", path.display(), err),
            Error::Yaml(err) => write!(f, "parsing {}: {}", PROJECT_FILE, err),
            Error::Url(err) => write!(f, "invalid feed URL: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            Error::Yaml(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts [`serde_yaml::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator when parsing the project file.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    type TestResult<T = ()> = std::result::Result<T, Box<dyn std::error::Error>>;

    fn project(yaml: &str) -> TestResult<(TempDir, PathBuf)> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join(PROJECT_FILE), yaml)?;
        let nested = root.path().join("scripts").join("deep");
        fs::create_dir_all(&nested)?;
        Ok((root, nested))
    }

    #[test]
    fn test_defaults_without_project_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = Config::from_directory(dir.path(), Overrides::default())?;
        assert_eq!(DEFAULT_FEED_URL, config.feed_url.as_str());
        assert_eq!(dir.path().join("data/articles.json"), config.output);
        assert!(config.backfill);
        assert_eq!(DEFAULT_USER_AGENT, config.user_agent);
        Ok(())
    }

    #[test]
    fn test_project_file_found_in_ancestor() -> TestResult {
        let (root, nested) = project(
            "feed_url: https://example.substack.com/feed\noutput: public/articles.json\nbackfill: false\n",
        )?;
        let config = Config::from_directory(&nested, Overrides::default())?;
        assert_eq!(root.path(), config.project_root);
        assert_eq!("https://example.substack.com/feed", config.feed_url.as_str());
        assert_eq!(root.path().join("public/articles.json"), config.output);
        assert!(!config.backfill);
        Ok(())
    }

    #[test]
    fn test_overrides_win() -> TestResult {
        let (_root, nested) = project("feed_url: https://example.substack.com/feed\n")?;
        let config = Config::from_directory(
            &nested,
            Overrides {
                feed_url: Some(String::from("https://other.substack.com/feed")),
                output: Some(PathBuf::from("/tmp/out.json")),
                no_backfill: true,
            },
        )?;
        assert_eq!("https://other.substack.com/feed", config.feed_url.as_str());
        assert_eq!(PathBuf::from("/tmp/out.json"), config.output);
        assert!(!config.backfill);
        Ok(())
    }

    #[test]
    fn test_empty_project_file_uses_defaults() -> TestResult {
        let (root, nested) = project("")?;
        let config = Config::from_directory(&nested, Overrides::default())?;
        assert_eq!(root.path().join(DEFAULT_OUTPUT), config.output);
        Ok(())
    }

    #[test]
    fn test_invalid_feed_url() -> TestResult {
        let (_root, nested) = project("feed_url: not a url\n")?;
        match Config::from_directory(&nested, Overrides::default()) {
            Err(Error::Url(_)) => Ok(()),
            other => panic!("expected a URL error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_yaml() -> TestResult {
        let (_root, nested) = project("backfill: [\n")?;
        match Config::from_directory(&nested, Overrides::default()) {
            Err(Error::Yaml(_)) => Ok(()),
            other => panic!("expected a YAML error, got {:?}", other),
        }
    }
}
