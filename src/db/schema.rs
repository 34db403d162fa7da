pub const SCHEMA: &str = r#"
-- Append-only log of barcode detections
CREATE TABLE IF NOT EXISTS captures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    barcode TEXT NOT NULL,
    detected_at TEXT NOT NULL,  -- ISO 8601, local time
    video_path TEXT             -- Recording active at detection time
);

CREATE INDEX IF NOT EXISTS idx_captures_detected_at ON captures(detected_at);
"#;

/// Format used for `detected_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format SQLite's `date()` returns and the search form accepts.
pub const DAY_FORMAT: &str = "%Y-%m-%d";
