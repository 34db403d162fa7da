//! Duplicate suppression for consecutive decodes of the same barcode.

use chrono::{Duration, NaiveDateTime};

/// Default minimum time before the same value is logged again.
pub const DEFAULT_INTERVAL_SECS: u64 = 3;

/// Decide whether a decoded value counts as a new detection.
///
/// A candidate passes when it differs from the last recorded value, or when
/// strictly more than `min_interval` has elapsed since the last recording.
/// `last_value` of `None` never equals a decoded string, so fresh state always
/// passes.
pub fn should_record(
    candidate_value: &str,
    candidate_time: NaiveDateTime,
    last_value: Option<&str>,
    last_time: NaiveDateTime,
    min_interval: Duration,
) -> bool {
    if last_value != Some(candidate_value) {
        return true;
    }
    candidate_time.signed_duration_since(last_time) > min_interval
}

/// The single last-seen slot shared by every symbol the loop decodes.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    last_value: Option<String>,
    last_time: NaiveDateTime,
    min_interval: Duration,
}

impl DedupWindow {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_value: None,
            last_time: NaiveDateTime::MIN,
            min_interval,
        }
    }

    /// Intervals too large for `Duration` saturate to the longest one.
    pub fn from_secs(secs: u64) -> Self {
        let interval = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(interval)
    }

    /// Evaluate a candidate and, on a positive decision, remember it.
    pub fn observe(&mut self, value: &str, time: NaiveDateTime) -> bool {
        let record = should_record(
            value,
            time,
            self.last_value.as_deref(),
            self.last_time,
            self.min_interval,
        );
        if record {
            self.last_value = Some(value.to_string());
            self.last_time = time;
        }
        record
    }

    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::from_secs(DEFAULT_INTERVAL_SECS)
    }
}
