//! Background persistence of detections.
//!
//! Each detection is written on its own short-lived thread so a slow or
//! locked database never stalls frame acquisition. Outcomes come back over a
//! channel and are collected by polling from the capture side.

pub mod manager;

use std::time::Instant;

use crate::db::NewDetection;

pub use manager::BackgroundWriter;

/// Identifies one dispatched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteId(pub u64);

impl WriteId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        WriteId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for WriteId {
    fn default() -> Self {
        Self::new()
    }
}

/// Messages sent from writer threads.
#[derive(Debug, Clone)]
pub enum WriteUpdate {
    Stored { id: WriteId, row_id: i64 },
    Failed { id: WriteId, error: String },
}

impl WriteUpdate {
    pub fn id(&self) -> WriteId {
        match self {
            WriteUpdate::Stored { id, .. } | WriteUpdate::Failed { id, .. } => *id,
        }
    }
}

/// A write that is still running.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub detection: NewDetection,
    pub started_at: Instant,
}

/// Result of polling writer updates.
#[derive(Debug, Clone)]
pub struct WriteCompletion {
    pub id: WriteId,
    pub detection: NewDetection,
    /// Row id on success, error text on failure.
    pub outcome: Result<i64, String>,
}

impl WriteCompletion {
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }
}
