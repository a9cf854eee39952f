//! Responsible for templating and writing the HTML pages of the site:
//! one permalink page per [`Note`] (with its co-located assets copied
//! alongside) and the paginated timeline. All hyperlinks are computed
//! relative to the page being written so the output tree works from any
//! base path. Writes are full-file overwrites; nothing is patched in
//! place.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use gtmpl::{Template, Value};

use crate::note::Note;
use crate::rewrite::rewrite_relative_urls;
use crate::url::rel_path;

/// The accepted site logo filenames under `static/`, checked in order.
pub const LOGO_ASSETS: [&str; 2] = ["logo.png", "logo.svg"];

/// Writes HTML pages to disk from [`Note`] values.
pub struct Writer<'a> {
    /// The template for note permalink pages.
    pub note_template: &'a Template,

    /// The template for timeline pages.
    pub timeline_template: &'a Template,

    /// The number of notes per timeline page.
    pub items_per_page: usize,

    /// The site title, available to every template.
    pub site_title: &'a str,

    /// The site-relative path of the logo asset
    /// (`notes/assets/{filename}`).
    pub logo_rel: &'a str,

    /// The year stamped into page footers.
    pub copyright_year: i32,

    /// The root of the output tree (`dist`).
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes one permalink page per note, copying each note's co-located
    /// assets into its output directory first.
    pub fn write_notes(&self, notes: &[Note]) -> Result<()> {
        for note in notes {
            let out_dir = self.output_directory.join(&note.note_rel_dir);
            self.copy_note_assets(note, &out_dir)?;

            let mut value = self.base_value(&note.note_rel_dir, &note.title);
            value.insert("note".to_owned(), note.to_value());
            self.render(self.note_template, value, &out_dir.join("index.html"))?;
        }
        Ok(())
    }

    /// Writes the paginated timeline: page 1 at the collection root,
    /// pages ≥2 under `page/{n}/`. An empty note set still yields exactly
    /// one (empty) page.
    pub fn write_timeline(&self, notes: &[Note]) -> Result<()> {
        let pages = paginate(notes, self.items_per_page);
        let total_pages = pages.len();

        for (i, notes_on_page) in pages.iter().enumerate() {
            let page_number = i + 1;
            let current_dir = page_dir_rel(page_number);

            let entries: Vec<Value> = notes_on_page
                .iter()
                .map(|note| {
                    let href = rel_path(&current_dir, &note.note_rel_dir, true);
                    let mut entry = match note.to_value() {
                        Value::Object(entry) => entry,
                        _ => HashMap::new(), // to_value always yields an object
                    };
                    entry.insert(
                        "content_html".to_owned(),
                        Value::String(rewrite_relative_urls(&note.content_html, &href)),
                    );
                    entry.insert("href".to_owned(), Value::String(href));
                    Value::Object(entry)
                })
                .collect();

            let page_title = match page_number {
                1 => self.site_title.to_owned(),
                n => format!("{} - Page {}", self.site_title, n),
            };

            let option_to_value = |opt: Option<String>| match opt {
                Some(href) => Value::String(href),
                None => Value::Nil,
            };
            let newer_href = (page_number > 1)
                .then(|| rel_path(&current_dir, &page_dir_rel(page_number - 1), true));
            let older_href = (page_number < total_pages)
                .then(|| rel_path(&current_dir, &page_dir_rel(page_number + 1), true));

            let mut value = self.base_value(&current_dir, &page_title);
            value.insert("notes".to_owned(), Value::Array(entries));
            value.insert(
                "page_number".to_owned(),
                Value::from(page_number as i64),
            );
            value.insert("total_pages".to_owned(), Value::from(total_pages as i64));
            value.insert("newer_href".to_owned(), option_to_value(newer_href));
            value.insert("older_href".to_owned(), option_to_value(older_href));
            value.insert(
                "page_url".to_owned(),
                Value::String(make_page_url(page_number)),
            );

            self.render(
                self.timeline_template,
                value,
                &self.page_out_path(page_number),
            )?;
        }
        Ok(())
    }

    // The variables every page gets: the site title, the page title, and
    // chrome links anchored at the page's own directory.
    fn base_value(&self, page_dir: &str, page_title: &str) -> HashMap<String, Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("site_title".to_owned(), Value::String(self.site_title.to_owned()));
        m.insert("page_title".to_owned(), Value::String(page_title.to_owned()));
        m.insert(
            "css_href".to_owned(),
            Value::String(rel_path(page_dir, "notes/assets/style.css", false)),
        );
        m.insert(
            "home_href".to_owned(),
            Value::String(rel_path(page_dir, "notes", true)),
        );
        m.insert(
            "rss_href".to_owned(),
            Value::String(rel_path(page_dir, "notes/rss.xml", false)),
        );
        m.insert(
            "json_href".to_owned(),
            Value::String(rel_path(page_dir, "notes/feed.json", false)),
        );
        m.insert(
            "logo_href".to_owned(),
            Value::String(rel_path(page_dir, self.logo_rel, false)),
        );
        m.insert(
            "copyright_year".to_owned(),
            Value::from(self.copyright_year as i64),
        );
        m
    }

    // Takes a variable map, templates it, and writes the page to disk.
    fn render(
        &self,
        template: &Template,
        value: HashMap<String, Value>,
        path: &Path,
    ) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let context = gtmpl::Context::from(Value::Object(value)).map_err(Error::Template)?;
        template.execute(&mut File::create(path)?, &context)?;
        Ok(())
    }

    // Copies everything except index.md from the note's source directory
    // into its output directory, preserving subdirectory structure.
    fn copy_note_assets(&self, note: &Note, out_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(out_dir)?;
        for result in walkdir::WalkDir::new(&note.source_dir) {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix shouldn't fail since the walk is rooted at
            // `source_dir`
            let rel = entry.path().strip_prefix(&note.source_dir).unwrap();
            if rel == Path::new("index.md") {
                continue;
            }
            let dest = out_dir.join(rel);
            if let Some(dir) = dest.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::copy(entry.path(), &dest)?;
        }
        Ok(())
    }

    fn page_out_path(&self, page_number: usize) -> PathBuf {
        let notes_dir = self.output_directory.join("notes");
        match page_number {
            1 => notes_dir.join("index.html"),
            n => notes_dir.join("page").join(n.to_string()).join("index.html"),
        }
    }
}

/// Partitions the ordered notes into fixed-size pages; the last page may
/// be short, and an empty note set yields exactly one empty page.
pub fn paginate(notes: &[Note], items_per_page: usize) -> Vec<&[Note]> {
    if notes.is_empty() {
        return vec![notes];
    }
    notes.chunks(items_per_page).collect()
}

// The timeline page's directory relative to the site root.
fn page_dir_rel(page_number: usize) -> String {
    match page_number {
        1 => String::from("notes"),
        n => format!("notes/page/{}", n),
    }
}

// The page's own URL relative to the collection root, handed to templates
// for self-links.
fn make_page_url(page_number: usize) -> String {
    match page_number {
        1 => String::from("./"),
        n => format!("./page/{}/", n),
    }
}

/// Finds the site logo under `static_dir` and returns its site-relative
/// output path. The logo is required; a missing logo fails the build
/// before any page is emitted.
pub fn resolve_logo(static_dir: &Path) -> Result<String> {
    for name in LOGO_ASSETS {
        if static_dir.join(name).is_file() {
            return Ok(format!("notes/assets/{}", name));
        }
    }
    Err(Error::MissingLogo)
}

/// Copies the static source directory into `notes/assets/` under the
/// output root. A missing static directory copies nothing (the required
/// logo is checked separately by [`resolve_logo`]).
pub fn copy_static_assets(static_dir: &Path, output_directory: &Path) -> Result<()> {
    let assets_dir = output_directory.join("notes").join("assets");
    std::fs::create_dir_all(&assets_dir)?;
    if !static_dir.is_dir() {
        return Ok(());
    }
    for result in walkdir::WalkDir::new(static_dir) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        // strip_prefix shouldn't fail since the walk is rooted at
        // `static_dir`
        let rel = entry.path().strip_prefix(static_dir).unwrap();
        let dest = assets_dir.join(rel);
        if let Some(dir) = dest.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(entry.path(), &dest)?;
    }
    Ok(())
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// Returned when `static/` holds none of the accepted logo assets.
    MissingLogo,

    /// An error walking a source directory.
    WalkDir(walkdir::Error),

    /// An error writing the output files.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::MissingLogo => write!(
                f,
                "Missing logo asset in static/. Expected one of: {}",
                LOGO_ASSETS.join(", "),
            ),
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::MissingLogo => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. This allows us to
    /// use the `?` operator when walking asset directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::note::Frontmatter;
    use std::fs;
    use tempfile::TempDir;

    fn make_note(day: u32, slug: &str) -> Note {
        let frontmatter: Frontmatter = serde_yaml::from_str(&format!(
            "title: {}\ndate: \"2024-03-{:02}\"",
            slug, day,
        ))
        .unwrap();
        Note::from_parts(
            frontmatter,
            format!("<p><a href=\"./img.png\">{}</a></p>", slug),
            PathBuf::from(format!("content/2024/{}", slug)),
            false,
        )
        .unwrap()
        .unwrap()
    }

    // Newest-first, the order the repository hands the writer.
    fn make_notes(count: u32) -> Vec<Note> {
        (1..=count)
            .rev()
            .map(|i| make_note(i, &format!("n{:02}", i)))
            .collect()
    }

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    #[test]
    fn test_paginate_shapes() {
        let notes = make_notes(25);
        let pages = paginate(&notes, 10);
        assert_eq!(3, pages.len());
        assert_eq!(10, pages[0].len());
        assert_eq!(10, pages[1].len());
        assert_eq!(5, pages[2].len());
    }

    #[test]
    fn test_paginate_exact_fit() {
        let notes = make_notes(20);
        assert_eq!(2, paginate(&notes, 10).len());
    }

    #[test]
    fn test_paginate_empty_yields_one_page() {
        let pages = paginate(&[], 10);
        assert_eq!(1, pages.len());
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_page_dirs() {
        assert_eq!("notes", page_dir_rel(1));
        assert_eq!("notes/page/3", page_dir_rel(3));
        assert_eq!("./", make_page_url(1));
        assert_eq!("./page/3/", make_page_url(3));
    }

    #[test]
    fn test_resolve_logo() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(resolve_logo(tmp.path()), Err(Error::MissingLogo)));
        fs::write(tmp.path().join("logo.svg"), "<svg/>").unwrap();
        assert_eq!("notes/assets/logo.svg", resolve_logo(tmp.path()).unwrap());
        // png outranks svg when both exist
        fs::write(tmp.path().join("logo.png"), "png").unwrap();
        assert_eq!("notes/assets/logo.png", resolve_logo(tmp.path()).unwrap());
    }

    #[test]
    fn test_copy_static_assets() {
        let tmp = TempDir::new().unwrap();
        let static_dir = tmp.path().join("static");
        fs::create_dir_all(static_dir.join("fonts")).unwrap();
        fs::write(static_dir.join("style.css"), "body{}").unwrap();
        fs::write(static_dir.join("fonts").join("a.woff2"), "f").unwrap();

        let dist = tmp.path().join("dist");
        copy_static_assets(&static_dir, &dist).unwrap();
        assert!(dist.join("notes/assets/style.css").is_file());
        assert!(dist.join("notes/assets/fonts/a.woff2").is_file());
    }

    fn writer<'a>(
        note_template: &'a Template,
        timeline_template: &'a Template,
        output_directory: &'a Path,
    ) -> Writer<'a> {
        Writer {
            note_template,
            timeline_template,
            items_per_page: 10,
            site_title: "Notes",
            logo_rel: "notes/assets/logo.png",
            copyright_year: 2026,
            output_directory,
        }
    }

    #[test]
    fn test_write_notes_renders_and_copies_assets() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("content/2024/hello");
        fs::create_dir_all(source.join("shots")).unwrap();
        fs::write(source.join("index.md"), "ignored").unwrap();
        fs::write(source.join("img.png"), "png").unwrap();
        fs::write(source.join("shots").join("b.png"), "png").unwrap();

        let mut note = make_note(5, "hello");
        note.source_dir = source;

        let note_template =
            template("{{.page_title}}|{{.home_href}}|{{.css_href}}|{{.note.title}}");
        let timeline_template = template("unused");
        let dist = tmp.path().join("dist");
        writer(&note_template, &timeline_template, &dist)
            .write_notes(std::slice::from_ref(&note))
            .unwrap();

        let out_dir = dist.join("notes/2024/2024-03-05-hello");
        assert!(out_dir.join("img.png").is_file());
        assert!(out_dir.join("shots/b.png").is_file());
        assert!(!out_dir.join("index.md").exists());

        let html = fs::read_to_string(out_dir.join("index.html")).unwrap();
        assert_eq!("hello|../../|../../assets/style.css|hello", html);
    }

    #[test]
    fn test_write_timeline_pagination_and_links() {
        let tmp = TempDir::new().unwrap();
        let note_template = template("unused");
        let timeline_template = template(
            "{{.page_title}}|{{.page_number}}/{{.total_pages}}\
             |newer:{{if .newer_href}}{{.newer_href}}{{else}}-{{end}}\
             |older:{{if .older_href}}{{.older_href}}{{else}}-{{end}}\
             |{{range .notes}}[{{.title}}]{{end}}",
        );
        let dist = tmp.path().join("dist");
        let notes = make_notes(25);
        writer(&note_template, &timeline_template, &dist)
            .write_timeline(&notes)
            .unwrap();

        let page1 = fs::read_to_string(dist.join("notes/index.html")).unwrap();
        assert!(page1.starts_with("Notes|1/3|newer:-|older:./page/2/|"), "{}", page1);
        // newest note first on page 1
        assert!(page1.contains("[n25]"), "{}", page1);
        assert!(!page1.contains("[n15]"), "{}", page1);

        let page2 = fs::read_to_string(dist.join("notes/page/2/index.html")).unwrap();
        assert!(
            page2.starts_with("Notes - Page 2|2/3|newer:../../|older:../3/|"),
            "{}",
            page2,
        );

        let page3 = fs::read_to_string(dist.join("notes/page/3/index.html")).unwrap();
        assert!(page3.contains("|newer:../2/|older:-|"), "{}", page3);
    }

    #[test]
    fn test_write_timeline_rewrites_embedded_html() {
        let tmp = TempDir::new().unwrap();
        let note_template = template("unused");
        let timeline_template = template("{{range .notes}}{{.content_html}}{{end}}");
        let dist = tmp.path().join("dist");
        let notes = vec![make_note(5, "hello")];
        writer(&note_template, &timeline_template, &dist)
            .write_timeline(&notes)
            .unwrap();

        let page1 = fs::read_to_string(dist.join("notes/index.html")).unwrap();
        assert!(
            page1.contains(r#"href="./2024/2024-03-05-hello/img.png""#),
            "{}",
            page1,
        );
    }

    #[test]
    fn test_write_timeline_empty_set_still_writes_page_one() {
        let tmp = TempDir::new().unwrap();
        let note_template = template("unused");
        let timeline_template = template("{{.page_number}}/{{.total_pages}}");
        let dist = tmp.path().join("dist");
        writer(&note_template, &timeline_template, &dist)
            .write_timeline(&[])
            .unwrap();
        assert_eq!(
            "1/1",
            fs::read_to_string(dist.join("notes/index.html")).unwrap(),
        );
        assert!(!dist.join("notes/page").exists());
    }
}
