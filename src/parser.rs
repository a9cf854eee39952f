//! Discovers note source documents under the content root, validates each
//! one into a [`Note`], and produces the deterministic newest-first order
//! consumed by the page and feed emitters. Validation failures are
//! collected across all candidates and reported together; a single invalid
//! document (or an output-path collision) fails the whole batch.

use std::collections::HashMap;
use std::fmt;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use crate::note::{self, Frontmatter, Note};

const INDEX_FILE: &str = "index.md";

/// Parses [`Note`] objects from source files. The Markdown converter is
/// injected so the parser can be exercised without a real renderer.
pub struct Parser {
    /// Converts a Markdown body into HTML.
    markdown: fn(&str) -> String,

    /// Whether notes marked `draft` are included.
    include_drafts: bool,
}

impl Parser {
    /// Constructs a new parser around a Markdown converter.
    pub fn new(markdown: fn(&str) -> String, include_drafts: bool) -> Parser {
        Parser {
            markdown,
            include_drafts,
        }
    }

    /// Searches `content_dir` for note documents at
    /// `{content_dir}/{year}/{slug}/index.md` (exactly two directory levels)
    /// and returns the valid notes sorted newest-first. Each document must
    /// be structured as follows:
    ///
    /// 1. Initial front matter fence (`---`)
    /// 2. YAML front matter with fields `title`, `date`, and optionally
    ///    `time` and `draft`
    /// 3. Terminal front matter fence (`---`)
    /// 4. Note body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2024-03-05
    /// time: "09:00"
    /// ---
    /// Greetings.
    /// ```
    ///
    /// Any per-file validation failure or output-directory collision fails
    /// the whole batch with an aggregated [`Error::Validation`] report.
    pub fn parse_notes(&self, content_dir: &Path) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        let mut invalid = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for path in Self::candidates(content_dir)? {
            match self.parse_note(&path) {
                Ok(None) => {}
                Ok(Some(new)) => match seen.get(&new.note_rel_dir) {
                    Some(first) => invalid.push(Invalid {
                        path,
                        reason: Reason::Collision {
                            first: first.clone(),
                            rel_dir: new.note_rel_dir,
                        },
                    }),
                    None => {
                        seen.insert(new.note_rel_dir.clone(), path);
                        notes.push(new);
                    }
                },
                Err(err) => invalid.push(Invalid {
                    path,
                    reason: Reason::Note(err),
                }),
            }
        }

        if !invalid.is_empty() {
            return Err(Error::Validation(invalid));
        }

        notes.sort_by_key(Note::sort_key);
        Ok(notes)
    }

    // Collects candidate index files in sorted order so discovery is
    // deterministic regardless of directory iteration order.
    fn candidates(content_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();
        if !content_dir.is_dir() {
            return Ok(candidates);
        }
        for result in read_dir(content_dir)? {
            let year_entry = result?;
            if !year_entry.file_type()?.is_dir() {
                continue;
            }
            for result in read_dir(year_entry.path())? {
                let slug_entry = result?;
                if !slug_entry.file_type()?.is_dir() {
                    continue;
                }
                let index = slug_entry.path().join(INDEX_FILE);
                if index.is_file() {
                    candidates.push(index);
                }
            }
        }
        candidates.sort();
        Ok(candidates)
    }

    // Parses a single note document. `Ok(None)` means "valid but excluded"
    // (a draft); note-level problems come back as `note::Error`.
    fn parse_note(&self, path: &Path) -> note::Result<Option<Note>> {
        let contents = std::fs::read_to_string(path)?;
        let input = contents.strip_prefix('\u{feff}').unwrap_or(&contents);

        let (yaml, body) = frontmatter_split(input)?;
        let frontmatter: Frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        let content_html = (self.markdown)(body);

        // source_dir is the directory holding index.md; candidates always
        // have one.
        let source_dir = path.parent().unwrap_or(Path::new("")).to_owned();
        Note::from_parts(frontmatter, content_html, source_dir, self.include_drafts)
    }
}

// Splits a document into its front matter and body. The opening fence must
// be the first line; the closing fence must sit at the start of a line.
fn frontmatter_split(input: &str) -> note::Result<(&str, &str)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(note::Error::MissingFrontmatter);
    }
    match input[FENCE.len()..].find("\n---") {
        None => Err(note::Error::UnclosedFrontmatter),
        Some(offset) => {
            let yaml = &input[FENCE.len()..FENCE.len() + offset];
            let rest = &input[FENCE.len() + offset + 1 + FENCE.len()..];
            let body = match rest.find('\n') {
                Some(i) => &rest[i + 1..],
                None => "",
            };
            Ok((yaml, body))
        }
    }
}

/// Represents the result of a [`Note`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// One invalid source document in an aggregated validation report.
#[derive(Debug)]
pub struct Invalid {
    /// The path of the offending document.
    pub path: PathBuf,

    /// What was wrong with it.
    pub reason: Reason,
}

/// Why a source document was rejected.
#[derive(Debug)]
pub enum Reason {
    /// A per-file front matter problem.
    Note(note::Error),

    /// Two documents mapped to the same output directory. `first` is the
    /// document discovered earlier that claimed `rel_dir`.
    Collision { first: PathBuf, rel_dir: String },
}

impl fmt::Display for Invalid {
    /// Displays one report line: the file path and its problem.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.reason {
            Reason::Note(err) => write!(f, "{}: {}", self.path.display(), err),
            Reason::Collision { first, rel_dir } => write!(
                f,
                "{}: output path collision with {} for {}/",
                self.path.display(),
                first.display(),
                rel_dir,
            ),
        }
    }
}

/// Represents an error discovering or validating notes.
#[derive(Debug)]
pub enum Error {
    /// Returned when one or more documents failed validation. The whole
    /// batch is rejected; no output may be produced from it.
    Validation(Vec<Invalid>),

    /// Returned for I/O problems while scanning the content tree.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Validation(invalid) => {
                write!(f, "Note validation failed:")?;
                for line in invalid {
                    write!(f, "\n- {}", line)?;
                }
                Ok(())
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
