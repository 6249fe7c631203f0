//! Sampler Handle - Unified API for knob sample input processing
//!
//! Provides a high-level interface for the two-stage sampler architecture:
//! raw line collection and batch processing. Manages the lifecycle of both
//! subsystems and handles inter-task communication.

use tokio::sync::mpsc;
use tracing::{debug, info};

pub use super::batch_processor::{
    BatchProcessor, ProcessorError, ProcessorHandle, ProcessorSettings, SampleBatch,
};
pub use super::line_collector::{
    CollectorError, CollectorHandle, CollectorSettings, LineCollector, RawSampleEvent,
    SampleSource,
};

/// Configuration settings for the complete sampler subsystem
///
/// # Performance Impact
///
/// - `processing_interval_ms`: lower values make knob turns feel more
///   immediate but wake the resolve pipeline more often. The default is
///   matched to human reaction times.
/// - `expected_knobs`: the fixed line arity; lines with a different field
///   count are discarded at the collector.
#[derive(Clone, Debug)]
pub struct SamplerSettings {
    /// Interval between batch processing cycles (milliseconds)
    pub processing_interval_ms: u64,

    /// Knob values expected per sample line
    pub expected_knobs: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            processing_interval_ms: 130, // Based on human reaction time studies
            expected_knobs: 12,          // 3 card slots x 4 filter knobs
        }
    }
}

/// Errors that can occur during sampler initialization or operation
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// Error from the line collection subsystem
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),

    /// Error from the batch processing subsystem
    #[error("Processor error: {0}")]
    ProcessorError(#[from] ProcessorError),

    /// Inter-task communication error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Handle for managing the complete sampler subsystem lifecycle
///
/// Spawns two independent tokio tasks:
/// 1. **Collector**: reads and parses sample lines from the byte source
/// 2. **Processor**: folds lines into change-gated sample batches
///
/// Communication between the tasks uses a buffered mpsc channel; both
/// tasks are fire-and-forget and end when their channels close or the
/// source runs dry.
pub struct SamplerHandle {}

impl SamplerHandle {
    /// Spawns the complete sampler subsystem with unified settings
    ///
    /// ```text
    /// CollectorHandle ─[RawSampleEvent]→ ProcessorHandle ─[SampleBatch]→ Engine
    ///                  (mpsc::channel(1000))               (provided sender)
    /// ```
    ///
    /// # Arguments
    ///
    /// * `settings` - Optional configuration; uses defaults if None
    /// * `source` - Async byte source yielding sample lines
    /// * `sender` - Channel for sending batches to the selection engine
    pub fn spawn(
        settings: Option<SamplerSettings>,
        source: SampleSource,
        sender: mpsc::Sender<SampleBatch>,
    ) -> Result<Self, SamplerError> {
        info!("Initializing sampler system with settings: {:?}", settings);

        let settings = settings.unwrap_or_default();

        // Distribute settings to subsystem components
        let collector_settings = CollectorSettings {
            expected_knobs: settings.expected_knobs,
        };
        let processor_settings = ProcessorSettings {
            processing_interval_ms: settings.processing_interval_ms,
            expected_knobs: settings.expected_knobs,
        };

        debug!(
            "Split settings: collector={:?}, processor={:?}",
            collector_settings, processor_settings
        );

        // Create inter-task communication channel
        let (event_sender, event_receiver) = tokio::sync::mpsc::channel(1000);

        info!("Creating Line Collector");
        let _collector_handle =
            CollectorHandle::spawn(Some(collector_settings), source, event_sender)?;

        info!("Creating Batch Processor");
        let _processor_handle =
            ProcessorHandle::spawn(event_receiver, Some(processor_settings), sender)?;

        info!("Sampler system initialized successfully");
        Ok(Self {})
    }
}
