pub mod catalog;
pub mod config;
pub mod resolver;
pub mod sampler;

use crate::catalog::Catalog;
use crate::config::KnobdeckConfig;
use crate::resolver::{FilterValue, SelectionEngineHandle, SelectionEvent};
use crate::sampler::sampler_handle::SamplerHandle;
use color_eyre::eyre::{eyre, Result};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = KnobdeckConfig::load_or_default().await?;
    config.validate()?;

    let catalog_path = config.catalog_path();
    config::ensure_default_catalog(&catalog_path).await?;
    let catalog = Arc::new(
        Catalog::load(&catalog_path)
            .await
            .map_err(|e| eyre!("Failed to load catalog: {}", e))?,
    );

    info!("Starting selection engine");
    let mut engine_handle = SelectionEngineHandle::new("card-selector".to_string());
    let (mut event_rx, batch_tx) = engine_handle
        .start(
            catalog.clone(),
            config.resolver_settings(),
            config.engine_settings(),
        )
        .map_err(|e| eyre!("Failed to start selection engine: {}", e))?;

    info!("Starting sampler on stdin");
    let _sampler_handle = SamplerHandle::spawn(
        Some(config.sampler_settings()),
        Box::new(tokio::io::stdin()),
        batch_tx,
    )
    .map_err(|e| eyre!("Failed to spawn sampler: {}", e))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }

            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(event) => report_event(&catalog, event),
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                }
            }
        }
    }

    engine_handle
        .shutdown()
        .await
        .map_err(|e| eyre!("Engine shutdown failed: {}", e))?;

    Ok(())
}

/// Renders selection events into the log; the only consumer in this
/// binary. A real installation hangs its display layer on this stream.
fn report_event(catalog: &Catalog, event: SelectionEvent) {
    match event {
        SelectionEvent::FilterChanged {
            slot,
            dimension,
            value,
        } => match value {
            Some(FilterValue::Game(id)) => {
                let name = catalog
                    .game(id)
                    .map(|g| g.name.as_str())
                    .unwrap_or("unknown");
                info!("Slot {} {}: {}", slot + 1, dimension, name);
            }
            Some(value) => info!("Slot {} {}: {}", slot + 1, dimension, value),
            None => info!("Slot {} {}: no selection", slot + 1, dimension),
        },
        SelectionEvent::CardResolved { slot, card } => match card {
            Some(card) => info!("Slot {} resolved card: {}", slot + 1, card.name),
            None => info!("Slot {} has no matching card", slot + 1),
        },
        SelectionEvent::Pagination {
            slot,
            dimension,
            descriptor,
        } => {
            debug!(
                "Slot {} {} pagination: index {} of {}, window at {} {:?}",
                slot + 1,
                dimension,
                descriptor.current_index,
                descriptor.total_options,
                descriptor.window_start,
                descriptor.dots
            );
        }
        SelectionEvent::Confirmed { timestamp } => {
            info!(
                "Confirm button pressed at {}",
                timestamp.format("%H:%M:%S%.3f")
            );
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
