use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nudge_core::app::{App, AppBuilder};
use nudge_core::impls::{FsDocumentSource, JsonFileStateStore, LogNotifier};
use nudge_core::notified::store_settings;
use nudge_core::ports::{StateStore, StoredSettings};
use nudge_core::NudgeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// nudge: fire a one-time webhook reminder when a note's task marker comes due.
#[derive(Parser)]
#[command(name = "nudge", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "NUDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Notes directory (overrides `notes_dir` from the config file).
    #[arg(short, long)]
    notes_dir: Option<PathBuf>,

    /// Log notifications instead of posting them.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the notes, then sweep periodically and follow file changes.
    Run,

    /// Scan the notes and sweep once.
    Sweep,

    /// List extracted tasks and whether they have fired.
    Scan {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Set or clear the webhook endpoint in the persisted settings.
    SetWebhook {
        url: Option<String>,

        #[arg(long, conflicts_with = "url")]
        clear: bool,
    },

    /// Forget fired tasks that no longer appear in any note.
    ///
    /// Stop a running `nudge run` first; it rewrites the fired list on its next write.
    Prune,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nudge=info,nudge_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NudgeConfig::from_file(path)?,
        None => NudgeConfig::default(),
    };
    if let Some(dir) = cli.notes_dir.clone() {
        config.notes_dir = dir;
    }
    config.validate()?;

    let store = Arc::new(JsonFileStateStore::new(config.resolved_state_path()));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let source = document_source(&config);
            let app = build_app(&config, source.clone(), store, cli.dry_run)?;
            run(app, source).await
        }
        Command::Sweep => {
            let app = build_app(&config, document_source(&config), store, cli.dry_run)?;
            let mut evaluator = app.prepare().await?;
            let report = evaluator.sweep().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Scan { json } => {
            let app = build_app(&config, document_source(&config), store, true)?;
            let evaluator = app.prepare().await?;
            let views = evaluator.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                for view in &views {
                    let marker = match (view.state.is_terminal(), view.overdue) {
                        (true, _) => "fired",
                        (false, true) => "overdue",
                        (false, false) => "pending",
                    };
                    println!("{:<8} {}  {}", marker, view.due, view.content.replace('\n', " "));
                }
                let counts = evaluator.counts().await;
                println!(
                    "{} pending, {} overdue, {} fired",
                    counts.pending, counts.overdue, counts.fired
                );
            }
            Ok(())
        }
        Command::SetWebhook { url, clear } => {
            let webhook_url = if clear { None } else { url };
            if webhook_url.is_none() && !clear {
                anyhow::bail!("pass a webhook URL or --clear");
            }
            store_settings(store.as_ref(), StoredSettings { webhook_url })
                .with_context(|| format!("cannot update {}", store.path().display()))?;
            info!(path = %store.path().display(), "settings updated");
            Ok(())
        }
        Command::Prune => {
            let app = build_app(&config, document_source(&config), store, true)?;
            let removed = app.prune().await?;
            println!("removed {removed} fired task(s) no longer present in notes");
            Ok(())
        }
    }
}

fn document_source(config: &NudgeConfig) -> FsDocumentSource {
    FsDocumentSource::new(config.notes_dir.clone(), config.extensions.clone())
}

fn build_app(
    config: &NudgeConfig,
    source: FsDocumentSource,
    store: Arc<JsonFileStateStore>,
    dry_run: bool,
) -> anyhow::Result<App> {
    let mut builder = AppBuilder::new()
        .document_source(Arc::new(source))
        .state_store(store as Arc<dyn StateStore>)
        .grammar(config.grammar()?)
        .sweep_interval(config.sweep_interval())
        .webhook_timeout(config.request_timeout());
    if dry_run {
        builder = builder.notifier(Arc::new(LogNotifier));
    }
    Ok(builder.build()?)
}

/// Scan, sweep on an interval and follow file changes until Ctrl-C.
async fn run(app: App, source: FsDocumentSource) -> anyhow::Result<()> {
    // フルスキャン中の変更も取りこぼさないよう、先に監視を始める。
    // watcher は drop すると止まるので最後まで保持する
    let (_watcher, events) = source.watch()?;

    let running = app.start(Some(events)).await?;
    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for ctrl-c")?;
    info!("shutting down");
    running.shutdown().await?;
    Ok(())
}
