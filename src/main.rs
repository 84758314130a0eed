//! Prens client entry point.
//!
//! Bootstraps the host and label caches from the backend, then applies
//! user events read from stdin (one command per line) until input ends or
//! Ctrl+C is received.  Rendered containers are written to the configured
//! output directory.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;

use log::{error, info, warn};
use tokio::signal;
use tokio::sync::mpsc;

mod backend;
mod config;
mod error;
mod events;
mod hierarchy;
mod hosts;
mod render;
mod session;
mod types;
mod view;

use backend::{Backend, HttpBackend};
use config::Config;
use events::UiEvent;
use session::Session;
use view::HtmlDirView;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting prens with config: {:?}", cfg);

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&cfg.api_url)?);
    let view = HtmlDirView::create(&cfg.output_dir).await?;
    let session = Arc::new(Session::new(backend, view, cfg.initial_view));

    session.bootstrap().await?;

    // Event channel
    let (event_tx, mut event_rx) = mpsc::channel(cfg.event_queue);
    // A plain thread, so a blocked stdin read never holds up shutdown.
    thread::spawn(move || read_events(event_tx));

    // Events are applied one after another, in arrival order.
    let worker_session = Arc::clone(&session);
    let mut worker = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let Err(e) = worker_session.handle(event.clone()).await {
                error!("{:?} failed: {}", event, e);
            }
        }
    });

    tokio::select! {
        joined = &mut worker => {
            match joined {
                Ok(()) => info!("Input closed, shutting down..."),
                Err(e) => error!("Event worker failed: {}", e),
            }
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C, shutting down..."),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
            // Pending and queued events are dropped.
            worker.abort();
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

/// Parse stdin lines into events.  Malformed lines are logged and skipped.
fn read_events(event_tx: mpsc::Sender<UiEvent>) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Reading input failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<UiEvent>() {
            Ok(event) => {
                if event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
            Err(e) => warn!("Ignoring input: {}", e),
        }
    }
}
