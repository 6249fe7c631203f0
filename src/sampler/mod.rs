//! Sampler subsystem for knob input handling
//!
//! Implements a two-stage processing pipeline:
//!
//! 1. [`line_collector`] - Raw sample line parsing
//! 2. [`batch_processor`] - Change detection and batch publishing
//! 3. [`sampler_handle`] - Unified API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Line Source ──► Collector ──► Processor ──► SampleBatch
//!                 (Raw Events)  (Deduplicated)
//! ```
//!
//! The transport below the line framing (serial port, pipe, replay file)
//! is not this subsystem's concern; any async byte source that yields
//! whitespace-separated integer lines works.

pub mod batch_processor;
pub mod line_collector;
pub mod sampler_handle;
