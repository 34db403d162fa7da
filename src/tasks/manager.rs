//! Dispatches detection writes and collects their outcomes.

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{PendingWrite, WriteCompletion, WriteId, WriteUpdate};
use crate::db::{DetectionStore, NewDetection};

pub struct BackgroundWriter {
    store: DetectionStore,
    sender: mpsc::Sender<WriteUpdate>,
    receiver: mpsc::Receiver<WriteUpdate>,
    pending: HashMap<WriteId, PendingWrite>,
}

impl BackgroundWriter {
    pub fn new(store: DetectionStore) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            store,
            sender,
            receiver,
            pending: HashMap::new(),
        }
    }

    pub fn store(&self) -> &DetectionStore {
        &self.store
    }

    /// Hand a detection to a writer thread. Never blocks on the database.
    pub fn dispatch(&mut self, detection: NewDetection) -> WriteId {
        let id = WriteId::new();
        let store = self.store.clone();
        let tx = self.sender.clone();
        let payload = detection.clone();

        std::thread::spawn(move || {
            let update = match store.record(&payload) {
                Ok(row_id) => {
                    debug!("Stored detection {} as row {}", payload.value, row_id);
                    WriteUpdate::Stored { id, row_id }
                }
                Err(e) => {
                    warn!("Detection {} at {} was not stored: {}", payload.value, payload.detected_at, e);
                    WriteUpdate::Failed {
                        id,
                        error: e.to_string(),
                    }
                }
            };
            // The receiver is gone only if the writer was dropped; the row is
            // written regardless.
            let _ = tx.send(update);
        });

        self.pending.insert(
            id,
            PendingWrite {
                detection,
                started_at: Instant::now(),
            },
        );
        id
    }

    /// Collect every outcome that has arrived so far.
    pub fn poll_updates(&mut self) -> Vec<WriteCompletion> {
        let mut completed = Vec::new();
        while let Ok(update) = self.receiver.try_recv() {
            if let Some(done) = self.complete(update) {
                completed.push(done);
            }
        }
        completed
    }

    /// Wait up to `timeout` for in-flight writes to finish.
    pub fn drain(&mut self, timeout: Duration) -> Vec<WriteCompletion> {
        let deadline = Instant::now() + timeout;
        let mut completed = self.poll_updates();

        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("{} detection writes still running at shutdown", self.pending.len());
                break;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(update) => {
                    if let Some(done) = self.complete(update) {
                        completed.push(done);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        completed
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn complete(&mut self, update: WriteUpdate) -> Option<WriteCompletion> {
        let id = update.id();
        let pending = self.pending.remove(&id)?;
        let outcome = match update {
            WriteUpdate::Stored { row_id, .. } => Ok(row_id),
            WriteUpdate::Failed { error, .. } => Err(error),
        };
        debug!(
            "Write for {} finished after {:?}",
            pending.detection.value,
            pending.started_at.elapsed()
        );
        Some(WriteCompletion {
            id,
            detection: pending.detection,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DetectionFilter;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn detection(value: &str, sec: u32) -> NewDetection {
        NewDetection {
            value: value.to_string(),
            detected_at: NaiveDate::from_ymd_opt(2024, 8, 1)
                .unwrap()
                .and_hms_opt(14, 0, sec)
                .unwrap(),
            video_path: None,
        }
    }

    #[test]
    fn test_dispatched_writes_complete_and_persist() {
        let dir = TempDir::new().unwrap();
        let store = DetectionStore::open(&dir.path().join("records.db")).unwrap();
        let mut writer = BackgroundWriter::new(store.clone());

        let first = writer.dispatch(detection("A", 0));
        let second = writer.dispatch(detection("B", 1));
        assert_ne!(first, second);

        let done = writer.drain(Duration::from_secs(10));
        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|c| c.success()));
        assert_eq!(writer.in_flight(), 0);

        let rows = store.find(&DetectionFilter::new()).unwrap();
        let mut values: Vec<_> = rows.into_iter().map(|d| d.value).collect();
        values.sort();
        assert_eq!(values, vec!["A", "B"]);
    }

    #[test]
    fn test_failed_write_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let store = DetectionStore::open(&dir.path().join("records.db")).unwrap();
        std::fs::remove_file(store.path()).unwrap();
        std::fs::create_dir(store.path()).unwrap();

        let mut writer = BackgroundWriter::new(store);
        writer.dispatch(detection("LOST", 0));

        let done = writer.drain(Duration::from_secs(10));
        assert_eq!(done.len(), 1);
        assert!(!done[0].success());
        assert_eq!(done[0].detection.value, "LOST");
    }

    #[test]
    fn test_poll_without_writes_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = DetectionStore::open(&dir.path().join("records.db")).unwrap();
        let mut writer = BackgroundWriter::new(store);
        assert!(writer.poll_updates().is_empty());
        assert!(writer.drain(Duration::from_millis(10)).is_empty());
    }
}
