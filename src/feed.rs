//! Support for serializing the ordered note set into RSS 2.0 and JSON
//! Feed 1.1. Both feeds carry the notes in exactly the order the
//! repository produced (newest first) and embed each note's rendered HTML
//! body unmodified. Item links are absolute when a site base URL is
//! configured and root-relative otherwise; RSS GUIDs are only flagged as
//! permalinks in the absolute case.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use chrono::{TimeZone, Utc};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use serde::Serialize;

use crate::config::SiteConfig;
use crate::note::Note;
use crate::url::{feed_urls, note_feed_url};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";
const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

/// Serializes the notes as an RSS 2.0 document and writes it to `w`.
pub fn write_rss<W: Write>(notes: &[Note], config: &SiteConfig, mut w: W) -> Result<()> {
    let urls = feed_urls(config.site_url.as_ref())?;

    let mut items = Vec::with_capacity(notes.len());
    for note in notes {
        let item_url = note_feed_url(&note.note_rel_dir, config.site_url.as_ref())?;
        items.push(
            ItemBuilder::default()
                .title(note.title.clone())
                .link(item_url.clone())
                .guid(
                    GuidBuilder::default()
                        .value(item_url)
                        .permalink(config.site_url.is_some())
                        .build(),
                )
                .pub_date(Utc.from_utc_datetime(&note.published_at()).to_rfc2822())
                .content(note.content_html.clone())
                .build(),
        );
    }

    let channel = ChannelBuilder::default()
        .namespaces(BTreeMap::from([(
            "content".to_owned(),
            CONTENT_NAMESPACE.to_owned(),
        )]))
        .title(config.site_title.clone())
        .link(urls.home)
        .description(format!("{} timeline", config.site_title))
        .items(items)
        .build();

    writeln!(w, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    channel.write_to(&mut w)?;
    Ok(())
}

/// Serializes the notes as a JSON Feed 1.1 document and writes it to `w`,
/// pretty-printed with a trailing newline.
pub fn write_json_feed<W: Write>(notes: &[Note], config: &SiteConfig, mut w: W) -> Result<()> {
    let urls = feed_urls(config.site_url.as_ref())?;

    let mut items = Vec::with_capacity(notes.len());
    for note in notes {
        let item_url = note_feed_url(&note.note_rel_dir, config.site_url.as_ref())?;
        items.push(JsonFeedItem {
            id: item_url.clone(),
            url: item_url,
            title: &note.title,
            date_published: format!(
                "{}T{}Z",
                note.date.format("%Y-%m-%d"),
                note.time.format("%H:%M:%S"),
            ),
            content_html: &note.content_html,
        });
    }

    let feed = JsonFeed {
        version: JSON_FEED_VERSION,
        title: &config.site_title,
        home_page_url: &urls.home,
        feed_url: &urls.json,
        items,
    };
    serde_json::to_writer_pretty(&mut w, &feed)?;
    w.write_all(b"\n")?;
    Ok(())
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'a str,
    title: &'a str,
    home_page_url: &'a str,
    feed_url: &'a str,
    items: Vec<JsonFeedItem<'a>>,
}

#[derive(Serialize)]
struct JsonFeedItem<'a> {
    id: String,
    url: String,
    title: &'a str,
    date_published: String,
    content_html: &'a str,
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an RSS serialization error.
    Rss(rss::Error),

    /// Returned when there is a JSON serialization error.
    Json(serde_json::Error),

    /// Returned when a feed URL can't be composed from the site base URL.
    Url(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Rss(err) => err.fmt(f),
            Error::Json(err) => err.fmt(f),
            Error::Url(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Rss(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Url(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<rss::Error> for Error {
    /// Converts [`rss::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: rss::Error) -> Error {
        Error::Rss(err)
    }
}

impl From<serde_json::Error> for Error {
    /// Converts [`serde_json::Error`]s into [`Error`]. This allows us to
    /// use the `?` operator in fallible feed operations.
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use
    /// the `?` operator when composing feed URLs.
    fn from(err: url::ParseError) -> Error {
        Error::Url(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::note::Frontmatter;
    use std::path::PathBuf;
    use url::Url;

    fn make_note(frontmatter: &str, slug: &str, body: &str) -> Note {
        let frontmatter: Frontmatter = serde_yaml::from_str(frontmatter).unwrap();
        Note::from_parts(
            frontmatter,
            body.to_owned(),
            PathBuf::from(format!("content/2024/{}", slug)),
            false,
        )
        .unwrap()
        .unwrap()
    }

    // Newest first, the repository's order.
    fn make_notes() -> Vec<Note> {
        vec![
            make_note(
                "title: Second\ndate: \"2024-03-06\"\ntime: \"09:30\"",
                "second",
                "<p>newer</p>",
            ),
            make_note(
                "title: First\ndate: \"2024-03-05\"",
                "first",
                "<p><a href=\"./img.png\">older</a></p>",
            ),
        ]
    }

    fn config(site_url: Option<&str>) -> SiteConfig {
        SiteConfig {
            items_per_page: 10,
            site_url: site_url.map(|u| Url::parse(u).unwrap()),
            site_title: String::from("Notes"),
        }
    }

    fn rss_string(config: &SiteConfig) -> String {
        let mut out = Vec::new();
        write_rss(&make_notes(), config, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_rss_with_site_url() {
        let xml = rss_string(&config(Some("https://x.test/")));
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains("<title>Notes</title>"), "{}", xml);
        assert!(xml.contains("<link>https://x.test/notes/</link>"), "{}", xml);
        assert!(xml.contains("<description>Notes timeline</description>"), "{}", xml);
        assert!(
            xml.contains("https://x.test/notes/2024/2024-03-06-second/"),
            "{}",
            xml,
        );
        assert!(!xml.contains(r#"isPermaLink="false""#), "{}", xml);
        assert!(xml.contains("content:encoded"), "{}", xml);
        assert!(
            xml.contains(r#"xmlns:content="http://purl.org/rss/1.0/modules/content/""#),
            "{}",
            xml,
        );
    }

    #[test]
    fn test_rss_without_site_url_is_root_relative() {
        let xml = rss_string(&config(None));
        assert!(xml.contains("<link>./</link>"), "{}", xml);
        assert!(xml.contains("./2024/2024-03-06-second/"), "{}", xml);
        assert!(xml.contains(r#"isPermaLink="false""#), "{}", xml);
    }

    #[test]
    fn test_rss_preserves_repository_order() {
        let xml = rss_string(&config(Some("https://x.test/")));
        let second = xml.find("<title>Second</title>").unwrap();
        let first = xml.find("<title>First</title>").unwrap();
        assert!(second < first, "{}", xml);
    }

    #[test]
    fn test_rss_pub_date_is_rfc2822_utc() {
        let xml = rss_string(&config(Some("https://x.test/")));
        assert!(xml.contains("Mar 2024 09:30:00 +0000"), "{}", xml);
        assert!(xml.contains("Mar 2024 00:00:00 +0000"), "{}", xml);
    }

    fn json_value(config: &SiteConfig) -> serde_json::Value {
        let mut out = Vec::new();
        write_json_feed(&make_notes(), config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_json_feed_with_site_url() {
        let feed = json_value(&config(Some("https://x.test/")));
        assert_eq!("https://jsonfeed.org/version/1.1", feed["version"]);
        assert_eq!("Notes", feed["title"]);
        assert_eq!("https://x.test/notes/", feed["home_page_url"]);
        assert_eq!("https://x.test/notes/feed.json", feed["feed_url"]);

        let items = feed["items"].as_array().unwrap();
        assert_eq!(2, items.len());
        assert_eq!("Second", items[0]["title"]);
        assert_eq!(
            "https://x.test/notes/2024/2024-03-06-second/",
            items[0]["url"],
        );
        assert_eq!(items[0]["id"], items[0]["url"]);
        assert_eq!("2024-03-06T09:30:00Z", items[0]["date_published"]);
        assert_eq!("2024-03-05T00:00:00Z", items[1]["date_published"]);
        assert_eq!(
            "<p><a href=\"./img.png\">older</a></p>",
            items[1]["content_html"],
        );
    }

    #[test]
    fn test_json_feed_without_site_url() {
        let feed = json_value(&config(None));
        assert_eq!("./", feed["home_page_url"]);
        assert_eq!("./feed.json", feed["feed_url"]);
        let items = feed["items"].as_array().unwrap();
        assert_eq!("./2024/2024-03-06-second/", items[0]["url"]);
    }
}
