//! Batch processing of raw sample events.
//!
//! Drains the collector queue on a fixed interval, keeps the latest value
//! per knob, detects button press edges (level 1 -> 0, active low) and
//! publishes a [`SampleBatch`] only when something actually changed. The
//! interval decouples the irregular line cadence from the resolve cadence
//! downstream.

use chrono::{DateTime, Local};
use statum::{machine, state};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::sampler::line_collector::RawSampleEvent;

/// One synchronized set of knob values handed to the selection engine
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// Latest clamped value per knob
    pub values: Vec<u16>,
    /// True when a press edge fired since the previous batch
    pub button_pressed: bool,
    pub timestamp: DateTime<Local>,
}

// Processor settings
#[derive(Clone, Debug)]
pub struct ProcessorSettings {
    /// Interval between processing cycles (milliseconds)
    pub processing_interval_ms: u64,

    /// Knob count every event must carry
    pub expected_knobs: usize,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            processing_interval_ms: 130,
            expected_knobs: 12,
        }
    }
}

// Processor errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Failed to receive events: {0}")]
    EventReceiveError(String),

    #[error("Failed to publish batch: {0}")]
    PublishError(String),
}

// Event batch for the processing state
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub events: Vec<RawSampleEvent>,
}

// Define processor states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum ProcessingState {
    Waiting,
    Processing(EventBatch),
    Publishing,
}

#[machine]
#[derive(Debug)]
pub struct BatchProcessor<S: ProcessingState> {
    // Receiver for raw events
    event_receiver: mpsc::Receiver<RawSampleEvent>,

    // Processor settings
    settings: ProcessorSettings,

    // Latest value per knob
    values: Vec<u16>,

    // Last seen button level, for edge detection
    last_button_level: u8,

    // Dirty flags for the pending publish
    changed: bool,
    button_pressed: bool,

    // Outgoing batch channel
    batch_sender: mpsc::Sender<SampleBatch>,
}

impl<S: ProcessingState> BatchProcessor<S> {
    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }
}

// Implementation for Waiting state
impl BatchProcessor<Waiting> {
    pub fn create(
        event_receiver: mpsc::Receiver<RawSampleEvent>,
        settings: Option<ProcessorSettings>,
        batch_sender: mpsc::Sender<SampleBatch>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        info!("Creating Batch Processor with settings: {:?}", settings);

        let values = vec![0; settings.expected_knobs];

        Self::new(
            event_receiver,
            settings,
            values,
            1, // last_button_level: idle
            false,
            false,
            batch_sender,
        )
    }

    // Collect all queued events without waiting
    pub fn collect(mut self) -> Result<BatchProcessor<Processing>, ProcessorError> {
        let mut events = Vec::new();

        loop {
            match self.event_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    error!("Event channel disconnected!");
                    return Err(ProcessorError::EventReceiveError(
                        "Event channel disconnected".to_string(),
                    ));
                }
            }
        }

        if !events.is_empty() {
            debug!("Collected batch of {} events for processing", events.len());
        }

        Ok(self.transition_with(EventBatch { events }))
    }
}

// Implementation for Processing state
impl BatchProcessor<Processing> {
    /// Folds the collected events into the per-knob value table and the
    /// button edge flag, newest event last
    pub fn process_events(mut self) -> Result<BatchProcessor<Publishing>, ProcessorError> {
        let events = match self.get_state_data() {
            Some(event_batch) => event_batch.events.clone(),
            None => {
                warn!("No event batch found in state data, this should not happen");
                Vec::new()
            }
        };

        for event in &events {
            if event.values.len() != self.settings.expected_knobs {
                warn!(
                    "Event carries {} values, expected {}; skipping",
                    event.values.len(),
                    self.settings.expected_knobs
                );
                continue;
            }

            for (i, &value) in event.values.iter().enumerate() {
                if self.values[i] != value {
                    self.values[i] = value;
                    self.changed = true;
                }
            }

            // Active low: a 1 -> 0 transition is one press
            if event.button_level == 0 && self.last_button_level == 1 {
                debug!("Button press edge detected");
                self.button_pressed = true;
            }
            self.last_button_level = event.button_level;
        }

        Ok(self.transition())
    }
}

// Implementation for Publishing state
impl BatchProcessor<Publishing> {
    /// Publishes the pending batch when something changed, then returns to
    /// Waiting
    pub fn publish(mut self) -> Result<BatchProcessor<Waiting>, ProcessorError> {
        if self.changed || self.button_pressed {
            let batch = SampleBatch {
                values: self.values.clone(),
                button_pressed: self.button_pressed,
                timestamp: Local::now(),
            };

            match self.batch_sender.try_send(batch) {
                Ok(_) => debug!("Published sample batch"),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Batch channel full, dropping batch");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    error!("Batch channel closed");
                    return Err(ProcessorError::PublishError(
                        "Batch channel closed".to_string(),
                    ));
                }
            }

            self.changed = false;
            self.button_pressed = false;
        }

        Ok(self.transition())
    }
}

// Public interface for spawning and running the processor
pub struct ProcessorHandle {}

impl ProcessorHandle {
    // Create a new processor and spawn it as a tokio task
    pub fn spawn(
        event_receiver: mpsc::Receiver<RawSampleEvent>,
        settings: Option<ProcessorSettings>,
        batch_sender: mpsc::Sender<SampleBatch>,
    ) -> Result<Self, ProcessorError> {
        info!("Spawning Batch Processor with settings: {:?}", settings);

        let processor = BatchProcessor::create(event_receiver, settings, batch_sender);

        tokio::spawn(async move {
            if let Err(e) = run_processor_loop(processor).await {
                error!("Processor task terminated with error: {}", e);
            }
        });

        info!("Batch Processor successfully started");
        Ok(Self {})
    }
}

// Run the processor loop
async fn run_processor_loop(
    mut processor: BatchProcessor<Waiting>,
) -> Result<(), ProcessorError> {
    let settings = processor.settings().clone();
    info!(
        "Starting processor loop with {}ms interval",
        settings.processing_interval_ms
    );

    let mut interval_timer = tokio::time::interval(tokio::time::Duration::from_millis(
        settings.processing_interval_ms,
    ));

    // Stats for performance monitoring
    let mut cycles: u64 = 0;
    let mut total_events: u64 = 0;
    let mut last_stats_time = Local::now();
    let stats_interval = chrono::Duration::seconds(30);

    loop {
        interval_timer.tick().await;

        let processing_state = processor.collect()?;

        if let Some(event_batch) = processing_state.get_state_data() {
            total_events += event_batch.events.len() as u64;
        }

        let publishing_state = processing_state.process_events()?;
        processor = publishing_state.publish()?;

        cycles += 1;

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Processor stats: {} cycles, {} events in {} seconds (avg {:.2} events/sec)",
                cycles,
                total_events,
                elapsed_seconds,
                total_events as f64 / elapsed_seconds as f64
            );
            cycles = 0;
            total_events = 0;
            last_stats_time = now;
        }
    }
}
