//! Selection engine with statum state machine for the resolve pass
//!
//! Implements a 5-state lifecycle around the knob resolver and the per-slot
//! filter chains. The engine runs in its own tokio task; every incoming
//! sample batch triggers exactly one synchronous resolve pass across all
//! slots (no await inside the pass).
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//!                     │              │           ▲
//!                     └──────────────┘           │
//!                       (activate/deactivate)    │
//!                                              (shutdown)
//! ```
//!
//! # Architecture
//!
//! ```text
//! SampleBatch ──► [Resolve Pass] ──► SelectionEvent
//!       ▲          KnobResolver           │
//!       │          SlotSelector x N       ▼
//!   Input Channel      Catalog       Output Channel
//! ```

use crate::catalog::Catalog;
use crate::resolver::chain::{SlotSelector, KNOBS_PER_SLOT};
use crate::resolver::knob::{KnobResolver, ResolverSettings};
use crate::resolver::{RateLimiter, SelectionError, SelectionEvent};
use crate::sampler::batch_processor::SampleBatch;
use statum::{machine, state};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Engine-level tuning
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of card slots; the sampler must deliver `slots * 4` values
    pub slots: usize,

    /// Minimum interval between pagination event bursts; None emits on
    /// every pass. Filter and card events are never throttled.
    pub pagination_interval_ms: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            slots: 3,
            pagination_interval_ms: Some(100),
        }
    }
}

/// States for the selection engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum SelectionEngineState {
    Initializing, // Setting up engine structure
    Configured,   // Catalog loaded and settings validated
    Active,       // Processing batches in main loop
    Deactivating, // Shutting down gracefully
    Deactivated,  // Fully stopped, ready for cleanup
}

/// Selection engine with compile-time state safety via statum
#[machine]
pub struct SelectionEngine<S: SelectionEngineState> {
    input_receiver: mpsc::Receiver<SampleBatch>,
    output_sender: mpsc::Sender<SelectionEvent>,
    name: String,
    catalog: Option<Arc<Catalog>>,
    resolver: KnobResolver,
    slots: Vec<SlotSelector>,
    pagination_limiter: Option<RateLimiter>,
}

impl<S: SelectionEngineState> SelectionEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl SelectionEngine<Initializing> {
    pub fn create(
        input_receiver: mpsc::Receiver<SampleBatch>,
        output_sender: mpsc::Sender<SelectionEvent>,
        name: String,
    ) -> Self {
        info!("Initializing new selection engine: {}", name);

        Self::new(
            input_receiver,
            output_sender,
            name,
            None,                                           // catalog
            KnobResolver::new(ResolverSettings::default()), // resolver
            Vec::new(),                                     // slots
            None,                                           // pagination_limiter
        )
    }

    /// Loads the catalog and settings and transitions to Configured
    pub fn configure(
        mut self,
        catalog: Arc<Catalog>,
        resolver_settings: ResolverSettings,
        engine_settings: EngineSettings,
    ) -> Result<SelectionEngine<Configured>, SelectionError> {
        info!("Configuring selection engine: {}", self.name);

        if engine_settings.slots == 0 {
            error!("Engine configured with zero slots");
            return Err(SelectionError::ConfigError(
                "At least one slot is required".to_string(),
            ));
        }
        if catalog.games().is_empty() {
            warn!("Catalog contains no games; every option list will be empty");
        }

        self.resolver = KnobResolver::new(resolver_settings);
        self.slots = (0..engine_settings.slots).map(SlotSelector::new).collect();
        self.pagination_limiter = engine_settings.pagination_interval_ms.map(RateLimiter::new);
        self.catalog = Some(catalog);

        info!(
            "Engine configured with {} slots: {}",
            self.slots.len(),
            self.name
        );
        Ok(self.transition())
    }
}

impl SelectionEngine<Configured> {
    pub fn activate(self) -> SelectionEngine<Active> {
        info!("Activating selection engine: {}", self.name);
        self.transition()
    }
}

impl SelectionEngine<Active> {
    /// Runs one synchronous resolve pass over every slot.
    ///
    /// Produces the pass's events in emission order: per-dimension
    /// pagination and filter changes, card resolutions, and the confirm
    /// signal when the button edge fired in this batch.
    pub fn process_batch(&mut self, batch: &SampleBatch) -> Vec<SelectionEvent> {
        let mut events = Vec::new();

        let catalog = match &self.catalog {
            Some(catalog) => Arc::clone(catalog),
            None => {
                error!("Engine has no catalog, dropping batch");
                return events;
            }
        };

        for slot in &mut self.slots {
            let base = slot.slot() * KNOBS_PER_SLOT;
            let end = base + KNOBS_PER_SLOT;
            if batch.values.len() < end {
                warn!(
                    "Batch carries {} values, slot {} needs {}..{}",
                    batch.values.len(),
                    slot.slot(),
                    base,
                    end
                );
                continue;
            }

            let changed = slot.apply_samples(
                &mut self.resolver,
                catalog.as_ref(),
                &batch.values[base..end],
                &mut events,
            );
            if changed {
                debug!("Slot {} filters changed", slot.slot());
            }
        }

        if batch.button_pressed {
            events.push(SelectionEvent::Confirmed {
                timestamp: batch.timestamp,
            });
        }

        if let Some(limiter) = &mut self.pagination_limiter {
            if !limiter.should_process() {
                events.retain(|e| !matches!(e, SelectionEvent::Pagination { .. }));
            }
        }

        events
    }

    /// Main processing loop with graceful shutdown support
    ///
    /// Runs until the shutdown signal fires or the sample channel closes.
    /// Event delivery failures are logged and never stop the loop.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<SelectionEngine<Deactivating>, SelectionError> {
        info!("Starting resolve loop for: {}", self.name);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                maybe_batch = self.input_receiver.recv() => {
                    match maybe_batch {
                        Some(batch) => {
                            let events = self.process_batch(&batch);
                            for event in events {
                                if let Err(e) = self.output_sender.try_send(event) {
                                    warn!("Failed to send selection event: {}", e);
                                }
                            }
                        }
                        None => {
                            info!("Sample channel closed, stopping engine: {}", self.name);
                            break;
                        }
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        Ok(self.transition())
    }

    pub fn deactivate(self) -> SelectionEngine<Deactivating> {
        info!("Deactivating selection engine: {}", self.name);
        self.transition()
    }
}

impl SelectionEngine<Deactivating> {
    /// Final cleanup before the task ends
    pub fn shutdown(self) -> SelectionEngine<Deactivated> {
        info!("Engine shut down successfully: {}", self.name);
        self.transition()
    }
}

impl SelectionEngine<Deactivated> {}

/// Handle for managing the selection engine in a tokio task
///
/// Provides lifecycle management for the engine running in a background
/// task: spawning, channel wiring, and graceful shutdown.
#[derive(Debug)]
pub struct SelectionEngineHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), SelectionError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SelectionEngineHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Starts the engine in a tokio task and returns its channels
    ///
    /// # Returns
    ///
    /// * Output receiver for selection events
    /// * Input sender for sample batches
    pub fn start(
        &mut self,
        catalog: Arc<Catalog>,
        resolver_settings: ResolverSettings,
        engine_settings: EngineSettings,
    ) -> Result<
        (
            mpsc::Receiver<SelectionEvent>,
            mpsc::Sender<SampleBatch>,
        ),
        SelectionError,
    > {
        let (batch_sender, batch_receiver) = mpsc::channel(100);
        let (event_sender, event_receiver) = mpsc::channel(100);
        let engine_name = self.name.clone();

        let engine = SelectionEngine::create(batch_receiver, event_sender, engine_name.clone())
            .configure(catalog, resolver_settings, engine_settings)?;

        let active_engine = engine.activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    info!("Engine entering deactivating state: {}", engine_name);
                    let _ = deactivating_engine.shutdown();
                    Ok(())
                }
                Err(e) => {
                    error!("Error running engine: {} - {}", engine_name, e);
                    Err(e)
                }
            }
        });

        self.task_handle = Some(task_handle);

        info!("Selection engine activated: {}", self.name);
        Ok((event_receiver, batch_sender))
    }

    /// Gracefully shuts down the engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), SelectionError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(SelectionError::TaskError(format!(
                        "Engine task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}
