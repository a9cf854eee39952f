//! Exports the [`build_site`] function which stitches together the
//! high-level steps of building the output static site: loading the
//! configuration ([`crate::config`]), parsing and validating the notes
//! ([`crate::parser`]), rendering permalink and timeline pages
//! ([`crate::write`]), copying static assets, and generating the RSS and
//! JSON feeds ([`crate::feed`]). Validation, template, and logo problems
//! all surface before the previous output tree is touched, so a failed
//! build never destroys a good one.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Local};
use gtmpl::Template;

use crate::config::{self, SiteConfig};
use crate::feed;
use crate::markdown;
use crate::parser::{self, Parser};
use crate::write::{self, copy_static_assets, resolve_logo, Writer};

const CONFIG_FILE: &str = "notes.yaml";
const CLEAN_ATTEMPTS: u32 = 3;
const CLEAN_BACKOFF: Duration = Duration::from_millis(200);

/// The fixed directory layout of a project, derived from its root.
pub struct Project {
    /// Note sources: `{root}/content/{year}/{slug}/index.md`.
    pub content_dir: PathBuf,

    /// gtmpl templates: `note.html` and `timeline.html`.
    pub templates_dir: PathBuf,

    /// Static assets copied to `notes/assets/`; must hold the site logo.
    pub static_dir: PathBuf,

    /// The output root.
    pub dist_dir: PathBuf,

    /// The output notes collection: `{dist}/notes`.
    pub notes_out_dir: PathBuf,

    /// The optional site configuration file.
    pub config_path: PathBuf,
}

impl Project {
    /// Derives the project layout from its root directory.
    pub fn new(root: &Path) -> Project {
        Project {
            content_dir: root.join("content"),
            templates_dir: root.join("templates"),
            static_dir: root.join("static"),
            dist_dir: root.join("dist"),
            notes_out_dir: root.join("dist").join("notes"),
            config_path: root.join(CONFIG_FILE),
        }
    }
}

/// Per-invocation build options.
#[derive(Clone, Copy, Default)]
pub struct Options {
    /// Wipe the whole output root, not just the notes collection.
    pub clean: bool,

    /// Include notes marked `draft: true`.
    pub include_drafts: bool,
}

/// Builds the site. Returns the number of published notes on success.
pub fn build_site(project: &Project, options: Options) -> Result<usize> {
    let config = SiteConfig::load(&project.config_path)?;
    let build_year = Local::now().year();

    // Everything that can reject the input set runs before the previous
    // output tree is deleted.
    let parser = Parser::new(markdown::to_html, options.include_drafts);
    let notes = parser.parse_notes(&project.content_dir)?;
    let note_template = parse_template(&project.templates_dir.join("note.html"))?;
    let timeline_template = parse_template(&project.templates_dir.join("timeline.html"))?;
    let logo_rel = resolve_logo(&project.static_dir)?;

    if options.clean {
        remove_tree(&project.dist_dir)?;
    }
    remove_tree(&project.notes_out_dir)?;
    std::fs::create_dir_all(&project.notes_out_dir)?;

    copy_static_assets(&project.static_dir, &project.dist_dir)?;

    let writer = Writer {
        note_template: &note_template,
        timeline_template: &timeline_template,
        items_per_page: config.items_per_page,
        site_title: &config.site_title,
        logo_rel: &logo_rel,
        copyright_year: build_year,
        output_directory: &project.dist_dir,
    };
    writer.write_notes(&notes)?;
    writer.write_timeline(&notes)?;

    feed::write_rss(
        &notes,
        &config,
        File::create(project.notes_out_dir.join("rss.xml"))?,
    )?;
    feed::write_json_feed(
        &notes,
        &config,
        File::create(project.notes_out_dir.join("feed.json"))?,
    )?;

    println!(
        "Built {} published note(s) into {}",
        notes.len(),
        project.notes_out_dir.display(),
    );
    Ok(notes.len())
}

// Loads the template file contents and parses them into a template.
fn parse_template(path: &Path) -> Result<Template> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(path)
        .map_err(|err| Error::OpenTemplateFile {
            path: path.to_owned(),
            err,
        })?
        .read_to_string(&mut contents)?;

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

// Removes an output tree, tolerating a few transient permission errors
// (files briefly held open by other programs) with growing backoff.
fn remove_tree(dir: &Path) -> Result<()> {
    let mut attempt = 0;
    loop {
        match std::fs::remove_dir_all(dir) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                attempt += 1;
                if attempt >= CLEAN_ATTEMPTS {
                    return Err(Error::Clean {
                        path: dir.to_owned(),
                        err,
                    });
                }
                std::thread::sleep(CLEAN_BACKOFF * attempt);
            }
            Err(err) => {
                return Err(Error::Clean {
                    path: dir.to_owned(),
                    err,
                })
            }
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from the
/// configuration, note validation, page writing, feed serialization,
/// cleaning output directories, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for configuration problems.
    Config(config::Error),

    /// Returned for errors discovering or validating notes.
    Parse(parser::Error),

    /// Returned for errors writing pages to disk as HTML files.
    Write(write::Error),

    /// Returned for errors writing the feeds.
    Feed(feed::Error),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(err) => err.fmt(f),
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Clean { path, err } => write!(
                f,
                "Could not remove '{}': {}. Close any program using files there and retry.",
                path.display(),
                err,
            ),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<config::Error> for Error {
    /// Converts [`config::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: config::Error) -> Error {
        Error::Config(err)
    }
}

impl From<parser::Error> for Error {
    /// Converts [`parser::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: parser::Error) -> Error {
        Error::Parse(err)
    }
}

impl From<write::Error> for Error {
    /// Converts [`write::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: write::Error) -> Error {
        Error::Write(err)
    }
}

impl From<feed::Error> for Error {
    /// Converts [`feed::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: feed::Error) -> Error {
        Error::Feed(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
