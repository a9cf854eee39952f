//! Rewrites the relative `href`/`src` attributes of a note's rendered HTML
//! so the markup stays correct when it is embedded in a page at a
//! different directory depth (the timeline vs. the note's own permalink
//! page). This is a surface-syntax rewrite over double-quoted attribute
//! values, not an HTML-tree transformation: everything that isn't a
//! relative URL inside `href="…"`/`src="…"` passes through byte-for-byte.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::url::join_relative_url;

static URL_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(?P<attr>href|src)="(?P<url>[^"]+)""#).unwrap());

// URL prefixes that mark a reference as not author-relative: fragments,
// absolute paths, protocol-relative references, and qualified schemes.
const NON_RELATIVE_PREFIXES: [&str; 8] = [
    "#", "/", "//", "http://", "https://", "mailto:", "tel:", "data:",
];

/// Rewrites every relative URL in `html`'s `href`/`src` attributes by
/// joining it against `base_href`, the embedding page's relative path to
/// the note's output directory. Non-relative URLs and all surrounding
/// markup are preserved unchanged.
pub fn rewrite_relative_urls(html: &str, base_href: &str) -> String {
    URL_ATTR
        .replace_all(html, |caps: &Captures| {
            let url = &caps["url"];
            if !is_relative_url(url) {
                return caps[0].to_owned();
            }
            format!(r#"{}="{}""#, &caps["attr"], join_relative_url(base_href, url))
        })
        .into_owned()
}

/// Whether `url` is relative to the document that contains it.
pub fn is_relative_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let lowered = url.to_lowercase();
    !NON_RELATIVE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::rel_path;

    #[test]
    fn test_relative_href_rewritten() {
        let base = rel_path("notes/page/2", "notes/2024/2024-03-05-hello", true);
        assert_eq!(
            r#"<a href="../../2024/2024-03-05-hello/img.png">x</a>"#,
            rewrite_relative_urls(r#"<a href="./img.png">x</a>"#, &base),
        );
    }

    #[test]
    fn test_relative_src_rewritten() {
        assert_eq!(
            r#"<img src="./2024/2024-03-05-hello/pic.jpg" alt="p">"#,
            rewrite_relative_urls(
                r#"<img src="pic.jpg" alt="p">"#,
                "./2024/2024-03-05-hello/",
            ),
        );
    }

    #[test]
    fn test_rewrite_points_at_same_file() {
        // The reference resolved from the embedding page must reach the
        // same file the original reached from the note's own directory.
        let note_dir = "notes/2024/2024-03-05-hello";
        let page_dir = "notes/page/2";
        let base = rel_path(page_dir, note_dir, true);
        let rewritten = rewrite_relative_urls(r#"<img src="./img.png">"#, &base);
        assert_eq!(r#"<img src="../../2024/2024-03-05-hello/img.png">"#, rewritten);
        // notes/page/2 + ../../2024/2024-03-05-hello/img.png
        //   == notes/2024/2024-03-05-hello/img.png
        //   == note_dir + ./img.png
    }

    #[test]
    fn test_absolute_and_fragment_untouched() {
        let html = concat!(
            r#"<a href="https://example.com/x">a</a>"#,
            r##"<a href="#section">b</a>"##,
            r#"<a href="/root.png">c</a>"#,
            r#"<a href="//cdn.test/x.js">d</a>"#,
            r#"<a href="mailto:me@example.com">e</a>"#,
            r#"<a href="tel:+15551234">f</a>"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<a href="HTTPS://EXAMPLE.COM/X">g</a>"#,
        );
        assert_eq!(html, rewrite_relative_urls(html, "./x/"));
    }

    #[test]
    fn test_surrounding_markup_preserved() {
        let html = r#"<p class="note">text <em>markup</em> <a href="a.png">a</a> tail</p>"#;
        assert_eq!(
            r#"<p class="note">text <em>markup</em> <a href="./x/a.png">a</a> tail</p>"#,
            rewrite_relative_urls(html, "./x/"),
        );
    }

    #[test]
    fn test_query_and_fragment_survive_rewrite() {
        assert_eq!(
            r#"<a href="./x/a.html?v=1#top">a</a>"#,
            rewrite_relative_urls(r#"<a href="a.html?v=1#top">a</a>"#, "./x/"),
        );
    }

    #[test]
    fn test_is_relative_url() {
        assert!(is_relative_url("img.png"));
        assert!(is_relative_url("./img.png"));
        assert!(is_relative_url("../up.png"));
        assert!(!is_relative_url(""));
        assert!(!is_relative_url("#frag"));
        assert!(!is_relative_url("/abs.png"));
        assert!(!is_relative_url("//host/x"));
        assert!(!is_relative_url("http://h/x"));
        assert!(!is_relative_url("HTTP://h/x"));
        assert!(!is_relative_url("mailto:a@b"));
        assert!(!is_relative_url("tel:123"));
        assert!(!is_relative_url("data:text/plain,hi"));
    }
}
