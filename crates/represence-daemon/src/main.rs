//! Represence reference host.
//!
//! Runs the broadcast service outside an editor: the most recently written
//! file under the watched directory is the active document, settings come
//! from a hot-reloaded JSON file, and notifications print to the terminal.
//! Commands are read from stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use represence_core::config::{Config, Directories, warn_unknown_fields};
use represence_daemon::{Command, Host, StandaloneHost, activate, logging, watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const RELOAD_SETTLE_DELAY: Duration = Duration::from_millis(100);

const HELP: &str = "Commands: info, settings, reload, y/n (answer prompt), help. \
                    Command ids such as represence.showFileInfo also work.";

/// Represence - broadcast the active document over WebSocket
#[derive(Parser, Debug)]
#[command(name = "represence-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory whose most recently written file is the active document
    #[arg(long, value_name = "DIR", default_value = ".")]
    watch: PathBuf,

    /// Settings file (defaults to `$XDG_CONFIG_HOME/represence/config.json`)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding `fileInfo.websocketPort`
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => std::path::absolute(&path)
            .with_context(|| format!("resolving {}", path.display()))?,
        None => {
            let dirs = Directories::new();
            dirs.ensure_exists()
                .with_context(|| format!("creating {}", dirs.config.display()))?;
            dirs.config_file
        }
    };
    let content = config_path
        .exists()
        .then(|| std::fs::read_to_string(&config_path))
        .transpose()
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config = content
        .as_deref()
        .map_or_else(|| Ok(Config::default()), Config::parse)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let log_control = logging::init(config.file_info.enable_logging);
    info!("Starting represence daemon...");
    // Only now is there a subscriber to report unknown keys
    if let Some(content) = &content {
        warn_unknown_fields(content, "config.json");
    }

    let (host, mut reload_rx) =
        StandaloneHost::new(config_path.clone(), config.file_info, args.port);
    let host = Arc::new(host);

    let (config_tx, mut config_rx) = mpsc::unbounded_channel();
    let _config_watcher = watcher::watch_config(&config_path, config_tx)?;

    let watch_dir = args
        .watch
        .canonicalize()
        .with_context(|| format!("watching {}", args.watch.display()))?;
    let (workspace_tx, mut workspace_rx) = mpsc::unbounded_channel();
    let _workspace_watcher = watcher::watch_workspace(&watch_dir, workspace_tx)?;

    let session = activate(host.clone(), Some(log_control));
    println!("{HELP}");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }

            Some(()) = config_rx.recv() => {
                tokio::time::sleep(RELOAD_SETTLE_DELAY).await;
                match Config::load(&config_path) {
                    Ok(config) => {
                        let changed = host.update_settings(config.file_info);
                        debug!("Config reloaded, {} setting(s) changed", changed);
                    }
                    Err(e) => warn!("Failed to reload config: {}", e),
                }
            }

            Some(change) = workspace_rx.recv() => host.apply_workspace_change(&change),

            Some(()) = reload_rx.recv() => {
                info!("Reloading WebSocket server");
                session.restart();
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_stdin_command(&host, line.trim()),
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    session.deactivate().await;
    info!("Represence daemon stopped");
    Ok(())
}

fn run_stdin_command(host: &StandaloneHost, line: &str) {
    match line {
        "" => {}
        "info" => host.invoke(Command::ShowFileInfo),
        "settings" => host.invoke(Command::OpenSettings),
        "reload" => host.reload(),
        "y" | "yes" => {
            if !host.answer_prompt(true) {
                println!("Nothing to answer");
            }
        }
        "n" | "no" => {
            if !host.answer_prompt(false) {
                println!("Nothing to answer");
            }
        }
        other => match Command::from_id(other) {
            Some(command) => host.invoke(command),
            None => println!("{HELP}"),
        },
    }
}
