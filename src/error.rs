//! Error types for the capture pipeline.
//!
//! The application edge (config, export, the TUI) uses `anyhow`; the core
//! components return these typed errors so callers can decide which failures
//! are surfaced to the operator and which are swallowed.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the detection store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached or the write did not complete.
    #[error("failed to persist detection: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    /// Search input that cannot be turned into a query.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A stored row that does not parse back into a detection.
    #[error("corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

/// Failures of the recording controller.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("unable to start video recording at {}: {reason}", .path.display())]
    Unavailable { path: PathBuf, reason: String },

    #[error("a recording is already in progress: {}", .0.display())]
    AlreadyRecording(PathBuf),

    #[error("camera not available")]
    NoCamera,

    /// The sink died mid-session; the controller is back to idle.
    #[error("recording {} stopped unexpectedly: {reason}", .path.display())]
    SinkLost { path: PathBuf, reason: String },

    #[error("failed to finalize recording {}: {reason}", .path.display())]
    Finalize { path: PathBuf, reason: String },
}

/// Failures of the camera side of the capture loop.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("unable to access the camera: {0}")]
    CameraUnavailable(String),

    /// A single missed frame; the loop retries on the next tick.
    #[error("frame read failed: {0}")]
    TransientRead(String),
}
