//! Watch mode: rebuilds the site when the content tree changes. Filesystem
//! events may arrive from arbitrary notifier threads; they are funneled
//! into a channel and coalesced by [`run_debounced`], which guarantees
//! that a burst of events triggers at most one rebuild, that rebuilds
//! never overlap, and that a change arriving during a rebuild is never
//! dropped — it is held as a single pending flag and drained immediately
//! after the running rebuild finishes. An interrupt signal cancels any
//! pending debounce and ends the loop after the in-flight rebuild's
//! natural completion.

use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use notify::{RecursiveMode, Watcher};

use crate::build::{self, Options, Project};

/// A watch-loop input: either "something under the content root changed"
/// or "stop watching".
pub enum Signal {
    Change,
    Shutdown,
}

/// Builds once (fatally on error, like a one-shot build), then watches the
/// content directory and rebuilds after each quiet period. Rebuild
/// failures after the first build are logged and the watcher keeps
/// running.
pub fn watch_site(project: &Project, options: Options, debounce: Duration) -> Result<()> {
    build::build_site(project, options)?;

    let (tx, rx) = mpsc::channel();

    std::fs::create_dir_all(&project.content_dir)?;
    let changes = tx.clone();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        if result.is_ok() {
            let _ = changes.send(Signal::Change);
        }
    })?;
    watcher.watch(&project.content_dir, RecursiveMode::Recursive)?;

    let interrupts = tx;
    ctrlc::set_handler(move || {
        let _ = interrupts.send(Signal::Shutdown);
    })?;

    println!(
        "Watching {} (debounce {}ms). Press Ctrl+C to stop.",
        project.content_dir.display(),
        debounce.as_millis(),
    );

    run_debounced(&rx, debounce, || {
        println!("Rebuilding...");
        if let Err(err) = build::build_site(project, options) {
            eprintln!("{}", err);
        }
    });

    println!("Stopping watch mode...");
    Ok(())
}

/// Drives `rebuild` from a stream of [`Signal`]s. The loop moves through
/// three phases: idle (blocked on the first change), pending (a debounce
/// timer that resets on every further change), and running. Changes that
/// arrive while running coalesce into one pending flag, drained with an
/// immediate re-run once the rebuild returns. [`Signal::Shutdown`] — or
/// every sender disconnecting — ends the loop from any phase without
/// interrupting a rebuild in progress.
pub fn run_debounced<F: FnMut()>(rx: &Receiver<Signal>, quiet: Duration, mut rebuild: F) {
    'watch: loop {
        // idle
        match rx.recv() {
            Ok(Signal::Change) => {}
            Ok(Signal::Shutdown) | Err(_) => return,
        }

        // pending: every further change resets the timer
        loop {
            match rx.recv_timeout(quiet) {
                Ok(Signal::Change) => continue,
                Ok(Signal::Shutdown) => return,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        // running; changes that arrived mid-rebuild trigger exactly one
        // immediate re-run apiece
        loop {
            rebuild();
            let mut pending = false;
            loop {
                match rx.try_recv() {
                    Ok(Signal::Change) => pending = true,
                    Ok(Signal::Shutdown) => return,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if !pending {
                continue 'watch;
            }
        }
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents an error starting watch mode. Once the loop is running,
/// rebuild failures are logged instead of returned.
#[derive(Debug)]
pub enum Error {
    /// Returned when the initial build fails.
    Build(build::Error),

    /// Returned when the filesystem notifier can't be started.
    Notify(notify::Error),

    /// Returned when the interrupt handler can't be installed.
    Interrupt(ctrlc::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Build(err) => err.fmt(f),
            Error::Notify(err) => err.fmt(f),
            Error::Interrupt(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Build(err) => Some(err),
            Error::Notify(err) => Some(err),
            Error::Interrupt(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<build::Error> for Error {
    /// Converts [`build::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator for the initial build.
    fn from(err: build::Error) -> Error {
        Error::Build(err)
    }
}

impl From<notify::Error> for Error {
    /// Converts [`notify::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator when starting the notifier.
    fn from(err: notify::Error) -> Error {
        Error::Notify(err)
    }
}

impl From<ctrlc::Error> for Error {
    /// Converts [`ctrlc::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator when installing the interrupt handler.
    fn from(err: ctrlc::Error) -> Error {
        Error::Interrupt(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
