use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use stashwatch::codec::simple::SimpleCodec;
use stashwatch::config::Settings;
use stashwatch::publish::{Broadcaster, Publisher, server};
use stashwatch::watcher::SyncEngine;

#[derive(Parser)]
#[command(name = "stashwatch", version)]
#[command(about = "Keep a live aggregate of Diablo II save data: characters plus shared stash")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a save directory and keep a JSON document current on disk
    Export {
        /// Path to the save directory
        save_dir: PathBuf,
    },

    /// Watch a save directory and stream updates to WebSocket clients
    Serve {
        /// Path to the save directory
        save_dir: PathBuf,

        /// Listen address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        eprintln!("continuing with defaults");
        Settings::default()
    });
    stashwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Export { save_dir } => run_export(save_dir, settings).await,
        Commands::Serve { save_dir, bind } => run_serve(save_dir, bind, settings).await,
        Commands::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

/// File-sink mode: the engine runs in the foreground until a fatal error.
async fn run_export(save_dir: PathBuf, settings: Settings) -> anyhow::Result<()> {
    let publisher = Publisher::file(settings.output.path.clone());
    let engine = SyncEngine::new(&save_dir, Arc::new(SimpleCodec), publisher, &settings)?;
    engine.watch().await?;
    Ok(())
}

/// Broadcast mode: the engine runs as a background task feeding the
/// broadcaster; the HTTP server owns the foreground. A fatal engine error
/// takes the server down with it.
async fn run_serve(
    save_dir: PathBuf,
    bind: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
    let broadcaster = Broadcaster::new(settings.server.channel_capacity);

    let engine = SyncEngine::new(
        &save_dir,
        Arc::new(SimpleCodec),
        Publisher::broadcast(broadcaster.clone()),
        &settings,
    )?;

    let ct = CancellationToken::new();
    let engine_ct = ct.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = engine.watch() => {
                if let Err(e) = result {
                    tracing::error!("[engine] fatal: {e}");
                }
                engine_ct.cancel();
            }
            _ = engine_ct.cancelled() => {
                tracing::info!("[engine] stopped");
            }
        }
    });

    server::serve(broadcaster, &bind, &settings.server.static_dir, ct).await
}
