//! Error definitions for the selection subsystem

use thiserror::Error;

/// Errors raised by the selection engine and its handle
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Invalid engine or resolver configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine could not be brought into a runnable state
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Channel communication with the engine task failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The engine task panicked or could not be joined
    #[error("Task error: {0}")]
    TaskError(String),

    /// Catalog loading or validation failed
    #[error("Catalog error: {0}")]
    CatalogError(#[from] crate::catalog::CatalogError),
}
