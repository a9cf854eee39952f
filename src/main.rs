use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use notewright::build::{self, Options, Project};
use notewright::watch;

/// Build the notes static site.
#[derive(Parser)]
#[command(name = "notewright", version)]
struct Cli {
    /// Project root containing content/, templates/, and static/.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Watch content/ for changes and rebuild automatically.
    #[arg(long)]
    watch: bool,

    /// Wipe dist/ before building.
    #[arg(long)]
    clean: bool,

    /// Debounce delay for watch mode in milliseconds.
    #[arg(long, default_value_t = 350)]
    debounce_ms: u64,

    /// Include notes marked with draft: true.
    #[arg(long)]
    include_drafts: bool,
}

fn main() {
    let cli = Cli::parse();
    let project = Project::new(&cli.root);
    let options = Options {
        clean: cli.clean,
        include_drafts: cli.include_drafts,
    };

    let result = if cli.watch {
        watch::watch_site(&project, options, Duration::from_millis(cli.debounce_ms))
            .map_err(|err| err.to_string())
    } else {
        build::build_site(&project, options)
            .map(|_| ())
            .map_err(|err| err.to_string())
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
