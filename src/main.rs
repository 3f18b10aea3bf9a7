use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_tree::diff::{self, ObserveMode};
use review_tree::review::{FileStorage, Storage};
use review_tree::watch::{SnapshotWatcher, WatchEvent};
use review_tree::{config, ui, Bootstrap, PageSnapshot, Phase, RtConfig, Session, ViewOp};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

/// File tree, review tracking and diff normalization for code review pages
#[derive(Parser)]
#[command(name = "rtree", version, about)]
struct Cli {
    /// Config file to use instead of ./.rtree.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Never color the output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the file tree with review marks
    Tree { snapshot: PathBuf },
    /// Print the normalized diff sections
    Show {
        snapshot: PathBuf,
        /// Leave out comment counts
        #[arg(long)]
        hide_comments: bool,
        /// Leave out deleted lines
        #[arg(long)]
        hide_deletions: bool,
    },
    /// Mark a file reviewed
    Review {
        snapshot: PathBuf,
        path: String,
        /// Mark it not reviewed instead
        #[arg(long)]
        undo: bool,
        /// Apply to every file of the page
        #[arg(long)]
        all: bool,
    },
    /// Print the diff with a file collapsed, or expanded if it starts collapsed
    Collapse {
        snapshot: PathBuf,
        path: String,
        /// Apply to every file of the page
        #[arg(long)]
        all: bool,
    },
    /// Print the next file that still needs review
    Next { snapshot: PathBuf },
    /// Normalize raw diff line markup from a file or stdin
    Normalize { file: Option<PathBuf> },
    /// Follow a snapshot file as the page changes
    Watch {
        snapshot: PathBuf,
        /// Re-read the file on an interval instead of watching it
        #[arg(long)]
        poll: bool,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());
    let color = !cli.no_color && io::stdout().is_terminal();

    match cli.command {
        Command::Tree { snapshot } => {
            let (session, _) = open_session(&snapshot, &config)?;
            print(
                &ui::render_tree(session.tree(), session.review().state(), session.collapse()),
                color,
            )
        }
        Command::Show {
            snapshot,
            hide_comments,
            hide_deletions,
        } => {
            let (mut session, mut ops) = open_session(&snapshot, &config)?;
            session.set_hide_comments(hide_comments, &mut ops);
            session.set_hide_deletions(hide_deletions, &mut ops);
            print(&ui::render_diff(&session), color)
        }
        Command::Review {
            snapshot,
            path,
            undo,
            all,
        } => {
            let (mut session, mut ops) = open_session(&snapshot, &config)?;
            if !session.changes().iter().any(|c| c.path == path) {
                anyhow::bail!("'{}' is not a file of this review", path);
            }
            session.toggle_reviewed(&path, !undo, all, &mut ops);
            let (reviewed, total) = session.review().reviewed_count();
            println!("{}/{} files reviewed", reviewed, total);
            Ok(())
        }
        Command::Collapse {
            snapshot,
            path,
            all,
        } => {
            let (mut session, mut ops) = open_session(&snapshot, &config)?;
            if session.section(&path).is_none() {
                anyhow::bail!("'{}' has no diff section in this review", path);
            }
            session.toggle_collapse(&path, all, &mut ops);
            print(&ui::render_diff(&session), color)
        }
        Command::Next { snapshot } => {
            let (mut session, mut ops) = open_session(&snapshot, &config)?;
            match session.jump_to_next_unreviewed(&mut ops) {
                Some(change) => println!("{}\t{}", change.path, session.anchor_for(&change)),
                None => println!("All {} files reviewed", session.changes().len()),
            }
            Ok(())
        }
        Command::Normalize { file } => normalize(file.as_deref()),
        Command::Watch { snapshot, poll } => run_watch(&snapshot, config, poll, color),
    }
}

/// `RTREE_LOG` filter (default `warn`), written to stderr. `log` records from
/// the library modules are forwarded through the subscriber.
fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_env("RTREE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn storage_dir(config: &RtConfig) -> PathBuf {
    config
        .storage
        .dir
        .clone()
        .unwrap_or_else(FileStorage::default_dir)
}

fn open_session(snapshot: &Path, config: &RtConfig) -> Result<(Session, Vec<ViewOp>)> {
    let page = PageSnapshot::read(snapshot)?
        .with_context(|| format!("Snapshot '{}' does not exist", snapshot.display()))?;
    let mut ops: Vec<ViewOp> = Vec::new();
    let session = Session::start(
        &page,
        Box::new(FileStorage::open(storage_dir(config))?),
        config,
        ObserveMode::Active,
        Instant::now(),
        &mut ops,
    )?;
    Ok((session, ops))
}

fn print(lines: &[ui::Line], color: bool) -> Result<()> {
    ui::write_lines(&mut io::stdout().lock(), lines, color)
}

fn normalize(file: Option<&Path>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    for line in input.lines() {
        println!("{}", diff::normalize(line).normalized_html);
    }
    Ok(())
}

fn run_watch(snapshot: &Path, config: RtConfig, force_poll: bool, color: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel::<WatchEvent>();
    let watcher = if force_poll {
        None
    } else {
        match SnapshotWatcher::new(snapshot, config.bootstrap.debounce_ms, tx) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("File watching unavailable, polling instead: {:#}", e);
                None
            }
        }
    };
    let mut polling = watcher.is_none();
    let mode = if polling {
        ObserveMode::Polling
    } else {
        ObserveMode::Active
    };

    let interval = config.bootstrap.poll_interval();
    let dir = storage_dir(&config);
    let mut boot = Bootstrap::new(
        config,
        mode,
        Box::new(move || -> Result<Box<dyn Storage>> { Ok(Box::new(FileStorage::open(&dir)?)) }),
    );
    let mut ops: Vec<ViewOp> = Vec::new();
    let mut reload = true;

    eprintln!("Watching {} (Ctrl-C to stop)", snapshot.display());
    loop {
        if reload || polling {
            reload = false;
            match PageSnapshot::read(snapshot) {
                Ok(page) => {
                    let phase = boot.on_snapshot(page, Instant::now(), &mut ops);
                    report(&boot, phase, color)?;
                }
                // usually a half-written file; the next event brings the rest
                Err(e) => log::warn!("{:#}", e),
            }
        }

        boot.tick(Instant::now(), &mut ops);
        if !ops.is_empty() {
            log::debug!("{} view operation(s) emitted", ops.len());
            ops.clear();
        }

        match rx.recv_timeout(interval) {
            Ok(WatchEvent::SnapshotChanged) => reload = true,
            Ok(WatchEvent::Failed(e)) => {
                log::error!("Snapshot watcher failed, polling instead: {}", e);
                polling = true;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                polling = true;
                std::thread::sleep(interval);
            }
        }
    }
}

fn report(boot: &Bootstrap, phase: Phase, color: bool) -> Result<()> {
    match phase {
        Phase::Started | Phase::Rebuilt => {
            if let Some(session) = boot.session() {
                print(
                    &ui::render_tree(session.tree(), session.review().state(), session.collapse()),
                    color,
                )?;
            }
        }
        Phase::Updated(n) if n > 0 => log::info!("Normalized {} changed line(s)", n),
        Phase::TornDown => eprintln!("Page closed, waiting for the next one"),
        _ => {}
    }
    Ok(())
}
