//! Detection store: the append-only SQLite log of barcode detections.
//!
//! Every operation opens its own connection. Detections are independent,
//! immutable rows, so concurrent writers from the background writer threads
//! only rely on SQLite's own locking (with a busy timeout).

mod filter;
mod schema;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use filter::DetectionFilter;
pub use schema::{DAY_FORMAT, SCHEMA, TIMESTAMP_FORMAT};

use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A detection that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDetection {
    pub value: String,
    pub detected_at: NaiveDateTime,
    pub video_path: Option<PathBuf>,
}

/// A stored detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub id: i64,
    pub value: String,
    pub detected_at: NaiveDateTime,
    pub video_path: Option<PathBuf>,
}

/// Number of detections on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct DetectionStore {
    path: PathBuf,
}

impl DetectionStore {
    /// Open the store at `path`, creating the directory and schema as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            path: path.to_path_buf(),
        };
        store.connect()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Idempotent, so a table dropped behind our back comes back on next use.
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    /// Append a detection and return its id.
    pub fn record(&self, detection: &NewDetection) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        let detected_at = detection.detected_at.format(TIMESTAMP_FORMAT).to_string();
        let video_path = detection
            .video_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());
        conn.execute(
            "INSERT INTO captures (barcode, detected_at, video_path) VALUES (?, ?, ?)",
            rusqlite::params![detection.value, detected_at, video_path],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Detections matching `filter`, newest first.
    pub fn find(&self, filter: &DetectionFilter) -> Result<Vec<Detection>, StoreError> {
        let mut query =
            String::from("SELECT id, barcode, detected_at, video_path FROM captures");
        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref substring) = filter.value_substring {
            // instr() is case-sensitive where LIKE is not
            conditions.push("instr(barcode, ?) > 0");
            params.push(substring.clone());
        }
        if let Some(day) = filter.exact_day {
            conditions.push("date(detected_at) = ?");
            params.push(day.format(DAY_FORMAT).to_string());
        }
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY detected_at DESC, id DESC");

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_detection).collect()
    }

    /// The newest `limit` detections.
    pub fn recent(&self, limit: usize) -> Result<Vec<Detection>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, barcode, detected_at, video_path
            FROM captures
            ORDER BY detected_at DESC, id DESC
            LIMIT ?
            "#,
        )?;
        let rows = stmt
            .query_map([limit as i64], raw_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_detection).collect()
    }

    /// Detections per calendar day, newest day first.
    pub fn daily_counts(&self) -> Result<Vec<DailyCount>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT date(detected_at) AS day, COUNT(*) AS total
            FROM captures
            GROUP BY day
            ORDER BY day DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(day, total)| {
                let day = day
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, DAY_FORMAT).ok())
                    .ok_or_else(|| StoreError::CorruptRow {
                        id: 0,
                        reason: format!("unparseable day {:?}", day),
                    })?;
                Ok(DailyCount { day, total })
            })
            .collect()
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        let total = conn.query_row("SELECT COUNT(*) FROM captures", [], |row| row.get(0))?;
        Ok(total)
    }
}

type RawRow = (i64, String, String, Option<String>);

fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_detection((id, value, detected_at, video_path): RawRow) -> Result<Detection, StoreError> {
    let detected_at = parse_timestamp(&detected_at).ok_or_else(|| StoreError::CorruptRow {
        id,
        reason: format!("unparseable timestamp '{}'", detected_at),
    })?;
    Ok(Detection {
        id,
        value,
        detected_at,
        video_path: video_path.filter(|p| !p.is_empty()).map(PathBuf::from),
    })
}

/// Parse a stored timestamp, tolerating fractional seconds.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
