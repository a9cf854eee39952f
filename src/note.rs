//! Defines the [`Note`] type and the front-matter validation that turns one
//! source document into a [`Note`]. Discovery, collision detection, and
//! ordering across the whole content tree live in [`crate::parser`].

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use gtmpl::Value;
use serde::Deserialize;

/// A validated, immutable note. Produced exclusively by
/// [`crate::parser::Parser`]; every other component receives read-only
/// views and nothing mutates a note after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// The note's identifier, taken from its containing directory name.
    pub slug: String,

    /// The note's title, non-empty after trimming.
    pub title: String,

    /// The calendar date of publication. No time zone.
    pub date: NaiveDate,

    /// The clock time of publication. Midnight when the source document
    /// gave no `time` field.
    pub time: NaiveTime,

    /// Whether the source document gave an explicit `time` field, as
    /// opposed to the midnight default.
    pub has_time: bool,

    /// The rendered HTML body, relative to the note's own output
    /// directory.
    pub content_html: String,

    /// The note's output directory relative to the site root:
    /// `notes/{year}/{date}-{slug}`. Unique across a build.
    pub note_rel_dir: String,

    /// The source directory holding `index.md` and any co-located assets.
    pub source_dir: PathBuf,
}

impl Note {
    /// Builds a [`Note`] from parsed front matter, the converted body HTML,
    /// and the source directory. Returns `Ok(None)` for a draft that isn't
    /// included; field-level problems are reported as [`Error`]s.
    pub fn from_parts(
        frontmatter: Frontmatter,
        content_html: String,
        source_dir: PathBuf,
        include_drafts: bool,
    ) -> Result<Option<Note>> {
        let title = match &frontmatter.title {
            Some(title) if !title.trim().is_empty() => title.trim().to_owned(),
            _ => return Err(Error::MissingTitle),
        };
        let date = match &frontmatter.date {
            Some(value) => parse_date(value)?,
            None => return Err(Error::MissingDate),
        };
        let (time, has_time) = match &frontmatter.time {
            Some(value) => (parse_time(value)?, true),
            None => (NaiveTime::from_hms(0, 0, 0), false),
        };

        if loose_bool(frontmatter.draft.as_ref()) && !include_drafts {
            return Ok(None);
        }

        let slug = source_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let note_rel_dir = format!(
            "notes/{}/{}-{}",
            date.format("%Y"),
            date.format("%Y-%m-%d"),
            slug,
        );

        Ok(Some(Note {
            slug,
            title,
            date,
            time,
            has_time,
            content_html,
            note_rel_dir,
            source_dir,
        }))
    }

    /// The combined publication instant, used only for sorting and feed
    /// timestamps.
    pub fn published_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }

    /// The sort key yielding the strict newest-first total order:
    /// descending date, descending time-of-day, ascending case-insensitive
    /// slug, ascending output directory as the final tie-break.
    pub fn sort_key(&self) -> (Reverse<NaiveDate>, Reverse<u32>, String, String) {
        (
            Reverse(self.date),
            Reverse(self.time.num_seconds_from_midnight()),
            self.slug.to_lowercase(),
            self.note_rel_dir.clone(),
        )
    }

    /// Converts the note into a template [`Value`] with fields `title`,
    /// `date`, `time`, `has_time`, and `content_html`.
    pub fn to_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert(
            "date".to_owned(),
            Value::String(self.date.format("%Y-%m-%d").to_string()),
        );
        m.insert(
            "time".to_owned(),
            Value::String(self.time.format("%H:%M:%S").to_string()),
        );
        m.insert("has_time".to_owned(), Value::Bool(self.has_time));
        m.insert(
            "content_html".to_owned(),
            Value::String(self.content_html.clone()),
        );
        Value::Object(m)
    }
}

/// The raw front-matter block of a note source document. Field values stay
/// loosely typed here; [`Note::from_parts`] narrows them.
#[derive(Deserialize, Default)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub date: Option<serde_yaml::Value>,
    pub time: Option<serde_yaml::Value>,
    pub draft: Option<serde_yaml::Value>,
}

// `date` accepts a bare `YYYY-MM-DD`, or a date+time composite whose time
// component is exactly midnight. A real time-of-day belongs in `time`.
fn parse_date(value: &serde_yaml::Value) -> Result<NaiveDate> {
    const DATE_ONLY: &str = "must be YYYY-MM-DD";
    const DATE_WITH_TIME: &str = "must be YYYY-MM-DD (date only; put time in `time` field)";

    let s = match value.as_str() {
        Some(s) => s.trim(),
        None => return Err(Error::InvalidDate("must be a string in YYYY-MM-DD format")),
    };

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if s.len() == 10 {
            return Ok(date);
        }
        return Err(Error::InvalidDate(DATE_ONLY));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            if datetime.time() != NaiveTime::from_hms(0, 0, 0) {
                return Err(Error::InvalidDate(DATE_WITH_TIME));
            }
            return Ok(datetime.date());
        }
    }
    Err(Error::InvalidDate(DATE_ONLY))
}

// `time` accepts `HH:MM` or `HH:MM:SS` with two-digit fields; no time
// zone, no sub-second precision.
fn parse_time(value: &serde_yaml::Value) -> Result<NaiveTime> {
    const TIME_ONLY: &str = "must be HH:MM or HH:MM:SS";

    let s = match value.as_str() {
        Some(s) => s.trim(),
        None => {
            return Err(Error::InvalidTime(
                "must be a string in HH:MM or HH:MM:SS format",
            ))
        }
    };

    let well_formed = match s.len() {
        5 => true,
        8 => s.as_bytes()[5] == b':',
        _ => false,
    };
    if !well_formed {
        return Err(Error::InvalidTime(TIME_ONLY));
    }

    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| Error::InvalidTime(TIME_ONLY))
}

// Legacy loose boolean: real booleans pass through; the string forms
// `"1"`, `"true"`, `"yes"`, and `"on"` count as true case-insensitively;
// everything else is false.
fn loose_bool(value: Option<&serde_yaml::Value>) -> bool {
    match value {
        Some(serde_yaml::Value::Bool(b)) => *b,
        Some(serde_yaml::Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        _ => false,
    }
}

/// Represents the result of validating a single note document.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a validation problem in a single note document. The
/// [`fmt::Display`] text is what ends up in the aggregated per-file report.
#[derive(Debug)]
pub enum Error {
    /// Returned when a source document doesn't begin with the `---` front
    /// matter fence.
    MissingFrontmatter,

    /// Returned when the opening fence is never closed by a `---` line.
    UnclosedFrontmatter,

    /// Returned when the front matter isn't valid YAML.
    InvalidFrontmatter(serde_yaml::Error),

    /// Returned when the `title` field is missing or blank.
    MissingTitle,

    /// Returned when the `date` field is missing.
    MissingDate,

    /// Returned when the `date` field doesn't hold a bare calendar date.
    InvalidDate(&'static str),

    /// Returned when the `time` field doesn't hold a plain clock time.
    InvalidTime(&'static str),

    /// Returned when the source document can't be read at all.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingFrontmatter => {
                write!(f, "missing YAML front matter at top of file")
            }
            Error::UnclosedFrontmatter => {
                write!(f, "missing closing `---` for front matter")
            }
            Error::InvalidFrontmatter(err) => write!(f, "invalid front matter: {}", err),
            Error::MissingTitle => write!(f, "missing required `title` field"),
            Error::MissingDate => write!(f, "missing required `date` field"),
            Error::InvalidDate(reason) => write!(f, "invalid `date` field: {}", reason),
            Error::InvalidTime(reason) => write!(f, "invalid `time` field: {}", reason),
            Error::Io(err) => write!(f, "cannot read file: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidFrontmatter(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for front matter deserialization.
    fn from(err: serde_yaml::Error) -> Error {
        Error::InvalidFrontmatter(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator when reading source documents.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
