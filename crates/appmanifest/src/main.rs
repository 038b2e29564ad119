use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use appmanifest::app::locator::ApplicationNameLocator;
use appmanifest::app::reconcile::{Reconciled, SelectionChange};
use appmanifest::app::report::{LocatedManifest, OutputFormat, Report, Reporter};
use appmanifest::app::scan::{self, Scanner, ScannerConfig};
use appmanifest::app::session::SelectionStore;
use appmanifest::app::watch::{ManifestWatcher, WatchOptions};
use appmanifest::infra::config::{self, Config};
use appmanifest::infra::logging;

/// Locate application names in Cloud Foundry manifests
#[derive(Parser)]
#[command(name = "appmanifest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log filter directive, overrides the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Read configuration from this file instead of the user/workspace layers
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the applications declared in a manifest
    Locate {
        /// Manifest file
        #[arg(default_value = "manifest.yml")]
        file: PathBuf,

        /// Application to select whenever it is present
        #[arg(long)]
        app: Option<String>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Include each application's source block
        #[arg(long)]
        source: bool,

        /// Keep the selection from the previous run of this command
        #[arg(long)]
        remember: bool,

        /// Fail when the manifest cannot be analysed instead of printing nothing
        #[arg(long)]
        strict: bool,
    },

    /// Find manifests under a directory and list their applications
    Scan {
        #[arg(default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        app: Option<String>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        #[arg(long)]
        source: bool,
    },

    /// Re-list applications every time the manifest changes
    Watch {
        #[arg(default_value = "manifest.yml")]
        file: PathBuf,

        #[arg(long)]
        app: Option<String>,

        /// Quiet period before re-reading the file
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let configured = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.defaults.log_level.clone());
    logging::init(&logging::level_for_verbosity(cli.verbose, &configured));

    match cli.command {
        Commands::Locate {
            file,
            app,
            format,
            source,
            remember,
            strict,
        } => cmd_locate(&config, &file, app, format, source, remember, strict),
        Commands::Scan {
            root,
            app,
            format,
            source,
        } => cmd_scan(&config, root, app, format, source),
        Commands::Watch {
            file,
            app,
            debounce_ms,
        } => cmd_watch(&config, file, app, debounce_ms),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "appmanifest", &mut io::stdout());
            Ok(())
        }
    }
}

fn locator_for(config: &Config, app: Option<String>) -> ApplicationNameLocator {
    ApplicationNameLocator::with_pinned(app.or_else(|| config.defaults.app.clone()))
}

fn format_for(config: &Config, format: Option<OutputFormat>) -> OutputFormat {
    format.unwrap_or_else(|| {
        config
            .defaults
            .format
            .parse()
            .unwrap_or(OutputFormat::Plain)
    })
}

fn cmd_locate(
    config: &Config,
    file: &Path,
    app: Option<String>,
    format: Option<OutputFormat>,
    source: bool,
    remember: bool,
    strict: bool,
) -> Result<()> {
    let locator = locator_for(config, app);
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read manifest {}", file.display()))?;

    let mut store = if remember {
        let cwd = std::env::current_dir()?;
        let root = config::find_repo_root(&cwd).unwrap_or(cwd);
        Some(SelectionStore::open(root)?)
    } else {
        None
    };
    let previous = store.as_ref().and_then(|store| store.get(file)).cloned();

    let manifest = LocatedManifest::from_text(
        file,
        &file.display().to_string(),
        text,
        &locator,
        previous.as_ref(),
    );
    if strict {
        locator
            .try_locate(&manifest.document, previous.as_ref())
            .with_context(|| format!("cannot analyse {}", file.display()))?;
    }

    if let Some(store) = store.as_mut() {
        match manifest.located.selection() {
            Some(selection) => store.set(file, selection),
            None => {
                store.remove(file);
            }
        }
        store.save()?;
    }

    let report = Report::build(
        std::slice::from_ref(&manifest),
        source || config.defaults.include_source,
    );
    print(&Reporter::new()?.render(&report, format_for(config, format))?)
}

fn cmd_scan(
    config: &Config,
    root: PathBuf,
    app: Option<String>,
    format: Option<OutputFormat>,
    source: bool,
) -> Result<()> {
    let locator = locator_for(config, app);
    let scan_cfg = ScannerConfig::from_root(root, config.clone());
    let result = Scanner::new().scan(&scan_cfg)?;
    let manifests = scan::locate_all(&result, &locator);

    let report = Report::build(&manifests, source || config.defaults.include_source);
    print(&Reporter::new()?.render(&report, format_for(config, format))?)
}

fn cmd_watch(
    config: &Config,
    file: PathBuf,
    app: Option<String>,
    debounce_ms: Option<u64>,
) -> Result<()> {
    let options = WatchOptions {
        path: file,
        debounce: Duration::from_millis(debounce_ms.unwrap_or(config.watch.debounce_ms)),
    };
    ManifestWatcher::new(options, locator_for(config, app)).run(|reconciled| {
        print(&describe_pass(reconciled))
    })
}

fn describe_pass(reconciled: &Reconciled) -> String {
    let mut out = String::new();
    for entry in &reconciled.diff.removed {
        out.push_str(&format!("- {} @{}\n", entry.name, entry.span.start));
    }
    for entry in &reconciled.diff.added {
        out.push_str(&format!("+ {} @{}\n", entry.name, entry.span.start));
    }
    match &reconciled.diff.selection {
        SelectionChange::Selected(selection) => {
            out.push_str(&format!("* {} @{}\n", selection.name, selection.start));
        }
        SelectionChange::Cleared => out.push_str("* (none)\n"),
        SelectionChange::Unchanged => {}
    }
    out
}

fn print(rendered: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
