//! Raw sample line collection.
//!
//! Parses text lines of `expected_knobs` integer values plus one button
//! level into [`RawSampleEvent`]s and forwards them to the processor.
//! Malformed lines are logged and skipped; a line never tears down the
//! collector.

use chrono::{DateTime, Local};
use statum::{machine, state};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::resolver::knob::RAW_MAX;

/// Any async byte source yielding sample lines
pub type SampleSource = Box<dyn AsyncRead + Send + Unpin>;

/// One parsed sample line with a precise chrono timestamp
#[derive(Debug, Clone)]
pub struct RawSampleEvent {
    /// Clamped knob values, one per physical knob
    pub values: Vec<u16>,
    /// Button level as reported: 1 idle, 0 pressed (active low)
    pub button_level: u8,
    pub timestamp: DateTime<Local>,
}

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    /// Knob values expected per line before the button field
    pub expected_knobs: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self { expected_knobs: 12 }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to read from sample source: {0}")]
    ReadError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
pub struct LineCollector<S: CollectionState> {
    // Buffered line source
    source: BufReader<SampleSource>,

    // Collector settings
    settings: CollectorSettings,

    // Channel for sending events to processor
    event_sender: mpsc::Sender<RawSampleEvent>,
}

impl LineCollector<Initializing> {
    pub fn create(
        source: SampleSource,
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<RawSampleEvent>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        debug!("Creating Line Collector with settings: {:?}", settings);

        Self::new(BufReader::new(source), settings, event_sender)
    }

    // Transition to Collecting state
    pub fn initialize(self) -> LineCollector<Collecting> {
        info!(
            "Line Collector initialized, expecting {} knobs per line",
            self.settings.expected_knobs
        );
        self.transition()
    }
}

impl LineCollector<Collecting> {
    /// Reads lines until the source ends or the processor goes away.
    ///
    /// A full event queue drops the sample (the next line supersedes it);
    /// a closed queue ends the loop with an error.
    pub async fn run_collection_loop(&mut self) -> Result<(), CollectorError> {
        info!("Starting Line Collector loop");

        let mut line = String::new();
        let mut parsed_count: u64 = 0;
        let mut skipped_count: u64 = 0;

        loop {
            line.clear();
            match self.source.read_line(&mut line).await {
                Ok(0) => {
                    // TODO reopen the source on end-of-stream so a
                    // replugged board resumes the session
                    info!(
                        "Sample source reached end of stream ({} lines parsed, {} skipped)",
                        parsed_count, skipped_count
                    );
                    return Ok(());
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_sample_line(trimmed, self.settings.expected_knobs) {
                        Some(event) => {
                            parsed_count += 1;
                            match self.event_sender.try_send(event) {
                                Ok(_) => debug!("Sample line sent to processor queue"),
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    warn!("Processor queue full, dropping sample line");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    error!("Processor queue closed, stopping collector");
                                    return Err(CollectorError::EventSendError(
                                        "Processor queue closed".to_string(),
                                    ));
                                }
                            }
                        }
                        None => {
                            skipped_count += 1;
                            warn!("Skipping malformed sample line: {:?}", trimmed);
                        }
                    }
                }
                Err(e) => {
                    error!("Error reading from sample source: {}", e);
                    return Err(CollectorError::ReadError(e.to_string()));
                }
            }
        }
    }
}

/// Parses one sample line: `expected_knobs` integers followed by the
/// button level. Values above the ADC ceiling are clamped; any missing or
/// non-numeric field makes the whole line invalid.
pub fn parse_sample_line(line: &str, expected_knobs: usize) -> Option<RawSampleEvent> {
    let mut fields = line.split_whitespace();

    let mut values = Vec::with_capacity(expected_knobs);
    for _ in 0..expected_knobs {
        let value: u32 = fields.next()?.parse().ok()?;
        values.push(value.min(RAW_MAX as u32) as u16);
    }

    let button_level: u8 = fields.next()?.parse().ok()?;

    Some(RawSampleEvent {
        values,
        button_level,
        timestamp: Local::now(),
    })
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {}

impl CollectorHandle {
    // Create a new collector and spawn it as a tokio task
    pub fn spawn(
        settings: Option<CollectorSettings>,
        source: SampleSource,
        event_sender: mpsc::Sender<RawSampleEvent>,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Line Collector with settings: {:?}", settings);

        let collector = LineCollector::create(source, settings, event_sender);

        tokio::spawn(async move {
            let mut collecting = collector.initialize();
            if let Err(e) = collecting.run_collection_loop().await {
                error!("Collector task terminated with error: {}", e);
            } else {
                info!("Line Collector task finished");
            }
        });

        info!("Line Collector successfully started");
        Ok(Self {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_line_parses() {
        let line = "10 20 30 40 50 60 70 80 90 100 110 120 1";
        let event = parse_sample_line(line, 12).expect("line parses");
        assert_eq!(event.values.len(), 12);
        assert_eq!(event.values[0], 10);
        assert_eq!(event.values[11], 120);
        assert_eq!(event.button_level, 1);
    }

    #[test]
    fn short_line_is_rejected() {
        assert!(parse_sample_line("10 20 30", 12).is_none());
        // 12 values but no button field
        assert!(parse_sample_line("1 2 3 4 5 6 7 8 9 10 11 12", 12).is_none());
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        assert!(parse_sample_line("10 twenty 30 40 0", 4).is_none());
    }

    #[test]
    fn values_above_ceiling_are_clamped() {
        let event = parse_sample_line("2047 0 512 1023 0", 4).expect("line parses");
        assert_eq!(event.values, vec![1023, 0, 512, 1023]);
    }

    #[test]
    fn arbitrary_whitespace_is_tolerated() {
        let event = parse_sample_line("  10\t20   30 40  0 ", 4).expect("line parses");
        assert_eq!(event.values, vec![10, 20, 30, 40]);
        assert_eq!(event.button_level, 0);
    }
}
