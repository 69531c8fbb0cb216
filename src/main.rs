use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripsync::config::Config;
use tripsync::connectivity::ConnectivitySignal;
use tripsync::store::{Document, ErrorCode, MemoryStore, RemoteStore};
use tripsync::sync::{Notice, Notifier, RenderSink, SyncController};

#[derive(Parser)]
#[command(name = "tripsync")]
#[command(version)]
#[command(about = "Trip data synchronization for the family travel planner", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync controller against a simulated store
    Demo {
        /// Seconds to run before shutting down
        #[arg(long, default_value_t = 12)]
        seconds: u64,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Demo { seconds }) => run_demo(&config, seconds).await?,
        Some(Commands::Config) => {
            println!("trip_id: {}", config.trip_id);
            println!("document_path: {}", config.document_path());
            println!("retry.max_attempts: {}", config.retry.max_attempts);
            println!("retry.base_delay_ms: {}", config.retry.base_delay_ms);
            println!("retry.multiplier: {}", config.retry.multiplier);
            println!("retry.max_delay_ms: {}", config.retry.max_delay_ms);
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

/// Prints each render as one line per section count.
#[derive(Default)]
struct StdoutRenderer;

impl RenderSink for StdoutRenderer {
    fn render(&mut self, doc: &Document) {
        let sections: Vec<&str> = doc.keys().map(String::as_str).collect();
        println!("render: {} section(s): {}", doc.len(), sections.join(", "));
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice {
            Notice::Reconnecting => tracing::info!("connection lost, reconnecting"),
            Notice::PermissionDenied => {
                tracing::warn!("access to the trip document was denied")
            }
            Notice::Misconfigured => {
                tracing::warn!("store configuration problem, showing demo data")
            }
            Notice::DemoData => tracing::info!("showing demo trip data"),
        }
    }
}

/// Runs the controller against an in-process store while a second task
/// plays the part of another family member editing the trip.
async fn run_demo(config: &Config, seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let path = config.document_path();

    store
        .write_fields(
            &path,
            fields(json!({
                "tripInfo": {
                    "title": "Demo session",
                    "destination": "Lisbon, Portugal"
                }
            })),
        )
        .await?;

    let controller = SyncController::new(
        store.clone(),
        path.clone(),
        config.retry.to_policy(),
        StdoutRenderer,
        LogNotifier,
    );

    let (signal_tx, signal_rx) = mpsc::unbounded_channel::<ConnectivitySignal>();
    let runner = tokio::spawn(async move {
        let mut controller = controller;
        controller.run(signal_rx).await;
    });

    let writer_store = store.clone();
    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = writer_store
            .write_fields(
                &writer_path,
                fields(json!({
                    "packingList": {"items": [{"name": "Passports", "packed": true}]}
                })),
            )
            .await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = writer_store
            .write_fields(
                &writer_path,
                fields(json!({
                    "chatMessages": [{
                        "from": "Ana",
                        "text": "Packed the passports!",
                        "sentAt": Utc::now().to_rfc3339()
                    }]
                })),
            )
            .await;

        // Simulated network blip to show the backoff in the logs.
        tokio::time::sleep(Duration::from_secs(1)).await;
        writer_store.emit_error(&writer_path, ErrorCode::Unavailable);
    });

    tokio::time::sleep(Duration::from_secs(seconds)).await;
    drop(signal_tx);
    let _ = writer.await;
    runner.await?;

    tracing::info!("demo finished");
    Ok(())
}

fn fields(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}
