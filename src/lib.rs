//! The library code for the `notewright` static site generator: a
//! chronological "notes" microblog built from Markdown documents with
//! YAML front matter. The build can be generally broken down into three
//! distinct steps:
//!
//! 1. Parsing and validating notes from source files on disk
//!    ([`crate::parser`], [`crate::note`])
//! 2. Rendering the permalink pages and the paginated timeline
//!    ([`crate::write`])
//! 3. Serializing the RSS 2.0 and JSON Feed 1.1 documents
//!    ([`crate::feed`])
//!
//! The first step owns every invariant that matters: each note's output
//! directory (`notes/{year}/{date}-{slug}`) must be unique, validation
//! failures across the content tree are collected into one aggregated
//! report, and the surviving notes are put into a strict newest-first
//! total order that every later step preserves.
//!
//! The rendering step is where the site earns its portability: no page
//! knows the base path it will be served from, so every hyperlink is a
//! relative path computed by [`crate::url`], and a note's body HTML is
//! re-anchored by [`crate::rewrite`] whenever it is embedded somewhere
//! other than its own directory (i.e., the timeline).
//!
//! [`crate::build`] stitches the steps together for one-shot builds, and
//! [`crate::watch`] re-runs them behind a debounced filesystem watcher.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod markdown;
pub mod note;
pub mod parser;
pub mod rewrite;
pub mod url;
pub mod watch;
pub mod write;
