//! Site configuration. The config file is a small YAML document
//! (`notes.yaml` in the project root) with three optional keys; a missing
//! file means "all defaults". Every violation is fatal before any output
//! is touched and names the offending key, so a typo'd config never
//! produces a half-built site.

use std::fmt;
use std::path::Path;

use url::Url;

use crate::url::normalize_site_url;

const DEFAULT_ITEMS_PER_PAGE: usize = 10;
const DEFAULT_SITE_TITLE: &str = "Notes";

/// Process-wide site configuration, read once per build and passed by
/// reference into every component that needs it. Immutable after
/// construction.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Notes per timeline page. Positive.
    pub items_per_page: usize,

    /// The absolute base URL the site is deployed under, normalized to end
    /// with `/`. `None` means no canonical base is known and feeds fall
    /// back to root-relative links.
    pub site_url: Option<Url>,

    /// The site title, non-empty after trimming.
    pub site_title: String,
}

impl Default for SiteConfig {
    /// The configuration used when no config file exists.
    fn default() -> SiteConfig {
        SiteConfig {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            site_url: None,
            site_title: String::from(DEFAULT_SITE_TITLE),
        }
    }
}

impl SiteConfig {
    /// Loads the configuration from `path`, falling back to defaults when
    /// the file doesn't exist.
    pub fn load(path: &Path) -> Result<SiteConfig> {
        if !path.exists() {
            return Ok(SiteConfig::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        if contents.trim().is_empty() {
            return Ok(SiteConfig::default());
        }
        let root: serde_yaml::Value =
            serde_yaml::from_str(&contents).map_err(|err| Error::Parse {
                path: path.to_owned(),
                err,
            })?;
        SiteConfig::from_value(root, path)
    }

    // The keys are pulled out of the mapping by hand rather than through a
    // derived struct so each violation can name its key.
    fn from_value(root: serde_yaml::Value, path: &Path) -> Result<SiteConfig> {
        let mut config = SiteConfig::default();
        let mapping = match root {
            serde_yaml::Value::Null => return Ok(config),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::NotAMapping {
                    path: path.to_owned(),
                })
            }
        };
        let key = |name: &str| serde_yaml::Value::String(name.to_owned());

        if let Some(value) = mapping.get(&key("items_per_page")) {
            config.items_per_page = match value.as_i64() {
                Some(n) if n > 0 => n as usize,
                _ => {
                    return Err(Error::InvalidKey {
                        key: "items_per_page",
                        expected: "a positive integer",
                    })
                }
            };
        }

        if let Some(value) = mapping.get(&key("site_url")) {
            let raw = match value.as_str() {
                Some(raw) => raw,
                None => {
                    return Err(Error::InvalidKey {
                        key: "site_url",
                        expected: "a string",
                    })
                }
            };
            let normalized = normalize_site_url(raw);
            config.site_url = if normalized.is_empty() {
                None
            } else {
                let url = Url::parse(&normalized).map_err(|_| Error::InvalidKey {
                    key: "site_url",
                    expected: "an absolute URL",
                })?;
                if url.cannot_be_a_base() {
                    return Err(Error::InvalidKey {
                        key: "site_url",
                        expected: "an absolute URL",
                    });
                }
                Some(url)
            };
        }

        if let Some(value) = mapping.get(&key("site_title")) {
            config.site_title = match value.as_str().map(str::trim) {
                Some(title) if !title.is_empty() => title.to_owned(),
                _ => {
                    return Err(Error::InvalidKey {
                        key: "site_title",
                        expected: "a non-empty string",
                    })
                }
            };
        }

        Ok(config)
    }
}

/// Represents the result of loading a [`SiteConfig`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`SiteConfig`]. Always fatal.
#[derive(Debug)]
pub enum Error {
    /// Returned when the config file exists but can't be opened.
    Open {
        path: std::path::PathBuf,
        err: std::io::Error,
    },

    /// Returned when the config file isn't valid YAML.
    Parse {
        path: std::path::PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when the document root isn't a key/value mapping.
    NotAMapping { path: std::path::PathBuf },

    /// Returned when a key holds a value of the wrong type or shape.
    InvalidKey {
        key: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening config file `{}`: {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Failed to parse config file {}: {}", path.display(), err)
            }
            Error::NotAMapping { path } => {
                write!(f, "Config root must be a YAML mapping in {}.", path.display())
            }
            Error::InvalidKey { key, expected } => {
                write!(f, "Config key `{}` must be {}.", key, expected)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
            Error::NotAMapping { .. } => None,
            Error::InvalidKey { .. } => None,
        }
    }
}
