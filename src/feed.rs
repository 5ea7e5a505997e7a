//! Maps the items of a Substack RSS feed onto [`Article`]s.

use crate::article::Article;
use crate::extract;
use chrono::{DateTime, Datelike, FixedOffset};
use regex::Regex;
use rss::{Channel, Item};
use std::sync::LazyLock;

/// The `source` recorded for every synced article.
pub const SOURCE: &str = "substack";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

/// Parses an RSS document and maps its items, dropping any that end up
/// without an id or title. Feed order is kept.
pub fn articles_from_feed(text: &str) -> Result<Vec<Article>, rss::Error> {
    let channel = Channel::read_from(text.as_bytes())?;
    let articles: Vec<Article> = channel
        .items()
        .iter()
        .map(map_item)
        .filter(|article| {
            let keep = !article.id.is_empty() && !article.title.is_empty();
            if !keep {
                tracing::debug!(link = %article.source_url, "dropping item without id or title");
            }
            keep
        })
        .collect();
    tracing::debug!(items = channel.items().len(), kept = articles.len(), "mapped feed");
    Ok(articles)
}

/// Maps one feed item. The body comes from `content:encoded`, falling back
/// to the description; when it's markup its first paragraph becomes the
/// subhead, and when it's plain text it *is* the subhead.
pub fn map_item(item: &Item) -> Article {
    let raw = item.content().or(item.description()).unwrap_or_default();
    let image_url = item
        .enclosure()
        .filter(|e| e.mime_type().starts_with("image/"))
        .map(|e| e.url())
        .or_else(|| extract::first_img_src(raw))
        .unwrap_or_default()
        .to_owned();

    let (subhead, content) = if extract::has_markup(raw) {
        extract::split_subhead(raw)
    } else {
        (raw.trim().to_owned(), String::new())
    };

    let link = item.link().unwrap_or_default();
    let (date, date_formatted) = match item.pub_date().and_then(parse_date) {
        Some(date) => (iso_date(&date), short_date(&date)),
        None => {
            if let Some(pub_date) = item.pub_date() {
                tracing::warn!(pub_date, link, "unparseable pubDate");
            }
            (String::new(), String::new())
        }
    };

    Article {
        id: slug_from_link(link),
        title: item.title().unwrap_or_default().to_owned(),
        date,
        date_formatted,
        image_url,
        subhead,
        content,
        source: String::from(SOURCE),
        source_url: link.to_owned(),
    }
}

/// The slug for a post link: its last non-empty path segment, lowercased,
/// with runs of whitespace turned into `-`.
pub fn slug_from_link(link: &str) -> String {
    let path = link.split(['?', '#']).next().unwrap_or_default();
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => path,
    };
    let segment = path
        .split('/')
        .filter(|s| !s.trim().is_empty())
        .last()
        .unwrap_or_default();
    WHITESPACE
        .replace_all(segment.trim(), "-")
        .to_lowercase()
}

/// Parses an RSS `pubDate` (RFC 2822), or an RFC 3339 timestamp as some
/// feeds use instead. The offset is kept.
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(text.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(text.trim()))
        .ok()
}

/// `YYYY-MM-DD`.
pub fn iso_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `Mon D YY`, e.g. `Mar 4 24`.
pub fn short_date(date: &DateTime<FixedOffset>) -> String {
    format!("{} {} {}", date.format("%b"), date.day(), date.format("%y"))
}

#[cfg(test)]
mod test {
    use super::*;
    use rss::{EnclosureBuilder, ItemBuilder};

    fn fixture() -> Vec<Article> {
        articles_from_feed(include_str!("../testdata/feed.xml")).unwrap()
    }

    fn find<'a>(articles: &'a [Article], id: &str) -> &'a Article {
        articles
            .iter()
            .find(|a| a.id == id)
            .unwrap_or_else(|| panic!("no article `{}` in {:?}", id, articles))
    }

    #[test]
    fn test_two_paragraph_content_splits_into_subhead_and_content() {
        let articles = fixture();
        let article = find(&articles, "second-light");
        assert_eq!("Morning again.", article.subhead);
        assert_eq!(
            r#"<p>And again.</p><p><img src="https://substackcdn.com/image/inline.jpg"></p>"#,
            article.content
        );
        assert_eq!("Second light", article.title);
        assert_eq!(SOURCE, article.source);
        assert_eq!("https://happyappe.substack.com/p/second-light", article.source_url);
    }

    #[test]
    fn test_plain_description_becomes_subhead() {
        let articles = fixture();
        let article = find(&articles, "hello");
        assert_eq!("Hello world", article.subhead);
        assert_eq!("", article.content);
        assert_eq!("2024-02-11", article.date);
        assert_eq!("Feb 11 24", article.date_formatted);
    }

    #[test]
    fn test_same_day_items_share_formatted_date() {
        let articles = fixture();
        let morning = find(&articles, "second-light");
        let evening = find(&articles, "second-light-later");
        assert_eq!("2024-03-04", morning.date);
        assert_eq!(morning.date, evening.date);
        assert_eq!("Mar 4 24", morning.date_formatted);
        assert_eq!(morning.date_formatted, evening.date_formatted);
    }

    #[test]
    fn test_image_prefers_image_enclosure() {
        let articles = fixture();
        assert_eq!(
            "https://substackcdn.com/image/second-light.jpg",
            find(&articles, "second-light").image_url
        );
        assert_eq!(
            "https://substackcdn.com/image/evening.png",
            find(&articles, "second-light-later").image_url
        );
        assert_eq!("", find(&articles, "hello").image_url);
    }

    #[test]
    fn test_non_image_enclosure_is_ignored() {
        let item = ItemBuilder::default()
            .title(Some(String::from("Episode")))
            .link(Some(String::from("https://happyappe.substack.com/p/episode")))
            .enclosure(Some(
                EnclosureBuilder::default()
                    .url("https://cdn.example.com/episode.mp3")
                    .mime_type("audio/mpeg")
                    .build(),
            ))
            .content(Some(String::from(r#"<p>Listen.</p><img src="cover.png">"#)))
            .build();
        assert_eq!("cover.png", map_item(&item).image_url);
    }

    #[test]
    fn test_unparseable_date_is_empty() {
        let articles = fixture();
        let article = find(&articles, "undated");
        assert_eq!("", article.date);
        assert_eq!("", article.date_formatted);
        // A description with markup goes through the paragraph split too.
        assert_eq!("Sometime.", article.subhead);
        assert_eq!("", article.content);
    }

    #[test]
    fn test_items_without_id_or_title_are_dropped() {
        let ids: Vec<String> = fixture().into_iter().map(|a| a.id).collect();
        assert_eq!(
            vec!["second-light", "second-light-later", "hello", "undated"],
            ids
        );
    }

    #[test]
    fn test_slug_from_link() {
        assert_eq!("my-post", slug_from_link("https://x.substack.com/p/my-post"));
        assert_eq!("my-post", slug_from_link("https://x.substack.com/p/My-Post/"));
        assert_eq!("a-b-c", slug_from_link("https://x.substack.com/p/A  b\tc?utm=1"));
        assert_eq!("", slug_from_link(""));
        assert_eq!("", slug_from_link("https://x.substack.com/"));
    }

    #[test]
    fn test_date_keeps_feed_offset() {
        let date = parse_date("Mon, 04 Mar 2024 23:30:00 -0800").unwrap();
        assert_eq!("2024-03-04", iso_date(&date));
        assert_eq!("Mar 4 24", short_date(&date));
        let date = parse_date("2023-11-20T09:00:00+01:00").unwrap();
        assert_eq!("Nov 20 23", short_date(&date));
    }
}
