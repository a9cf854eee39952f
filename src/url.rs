//! Relative-link and canonical-URL computation. Every hyperlink in the
//! output tree is computed here so that the site works when deployed at an
//! arbitrary base path: pages link to each other with POSIX-style relative
//! paths, while feeds get absolute URLs when a site base URL is configured
//! and fall back to root-relative paths when it isn't.

use url::{ParseError, Url};

/// Computes the relative path from the site-relative directory `from_dir` to
/// the site-relative `target`, POSIX-style. The result always starts with
/// `.` (a `./` prefix is added when the path would otherwise start with a
/// name) and ends with `/` when `is_dir` is set. A target equal to
/// `from_dir` yields `./`.
pub fn rel_path(from_dir: &str, target: &str, is_dir: bool) -> String {
    let from: Vec<&str> = components(from_dir);
    let to: Vec<&str> = components(target);

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
    for _ in common..from.len() {
        parts.push("..");
    }
    parts.extend(&to[common..]);

    let mut value = if parts.is_empty() {
        String::from(".")
    } else {
        parts.join("/")
    };

    if value == "." {
        return String::from("./");
    }
    if !value.starts_with('.') {
        value.insert_str(0, "./");
    }
    if is_dir && !value.ends_with('/') {
        value.push('/');
    }
    value
}

/// Joins a same-document relative reference `value` against `base_href` (a
/// relative path to a directory), normalizing the resulting path and
/// preserving any query string and fragment. Used by the HTML rewriter to
/// re-anchor a note's relative links when its HTML is embedded in a page at
/// a different directory depth.
pub fn join_relative_url(base_href: &str, value: &str) -> String {
    let (rest, fragment) = match value.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (value, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path.is_empty() {
        return value.to_owned();
    }

    let mut joined = if base_href.ends_with('/') {
        format!("{}{}", base_href, path)
    } else {
        format!("{}/{}", base_href, path)
    };
    joined = normalize_path(&joined);
    if path.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    if !joined.starts_with('.') {
        joined.insert_str(0, "./");
    }

    if let Some(query) = query {
        joined.push('?');
        joined.push_str(query);
    }
    if let Some(fragment) = fragment {
        joined.push('#');
        joined.push_str(fragment);
    }
    joined
}

/// Normalizes a site base URL string: trims surrounding whitespace and
/// enforces exactly one trailing slash. An empty (or all-whitespace) value
/// normalizes to the empty string, meaning "no canonical base".
pub fn normalize_site_url(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    format!("{}/", value.trim_end_matches('/'))
}

/// Computes the base URL of the notes collection for feed links. The
/// collection lives at `{site_url}notes/` unless the configured base
/// already ends in `/notes`, in which case it is used as-is.
pub fn notes_base_url(site_url: &Url) -> Result<Url> {
    if site_url.path().trim_end_matches('/').ends_with("/notes") {
        return Ok(site_url.clone());
    }
    site_url.join("notes/")
}

/// The home, RSS, and JSON feed URLs advertised inside the feeds
/// themselves. Absolute under the notes base URL when a site URL is
/// configured; root-relative otherwise.
pub struct FeedUrls {
    pub home: String,
    pub rss: String,
    pub json: String,
}

/// Computes [`FeedUrls`] for an optional site base URL.
pub fn feed_urls(site_url: Option<&Url>) -> Result<FeedUrls> {
    match site_url {
        Some(site_url) => {
            let base = notes_base_url(site_url)?;
            Ok(FeedUrls {
                home: base.to_string(),
                rss: base.join("rss.xml")?.to_string(),
                json: base.join("feed.json")?.to_string(),
            })
        }
        None => Ok(FeedUrls {
            home: String::from("./"),
            rss: String::from("./rss.xml"),
            json: String::from("./feed.json"),
        }),
    }
}

/// Computes the canonical URL of a single note for feed items.
/// `note_rel_dir` is the note's output directory relative to the site root
/// (`notes/{year}/{date}-{slug}`).
pub fn note_feed_url(note_rel_dir: &str, site_url: Option<&Url>) -> Result<String> {
    let rel = format!(
        "{}/",
        note_rel_dir.strip_prefix("notes/").unwrap_or(note_rel_dir)
    );
    match site_url {
        Some(site_url) => Ok(notes_base_url(site_url)?.join(&rel)?.to_string()),
        None => Ok(format!("./{}", rel)),
    }
}

// Splits a site-relative path into its meaningful components, dropping
// empty segments and `.`.
fn components(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}

// Collapses `.`, `..`, and empty components the way `posixpath.normpath`
// does for relative paths. Leading `..` components are preserved.
fn normalize_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            component => out.push(component),
        }
    }
    if out.is_empty() {
        String::from(".")
    } else {
        out.join("/")
    }
}

type Result<T> = std::result::Result<T, ParseError>;
