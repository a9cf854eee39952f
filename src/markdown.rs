//! Markdown conversion. The build pipeline treats this as an injected
//! text-to-text converter; this module is the default implementation,
//! wired into [`crate::parser::Parser`] by [`crate::build`].

use pulldown_cmark::{html, Options, Parser};

/// Converts a Markdown body into HTML. Links and images come out exactly
/// as authored; re-anchoring them for embedding contexts is
/// [`crate::rewrite`]'s job.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}
