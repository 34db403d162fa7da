use anyhow::Result;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::db::{DailyCount, DetectionStore, DAY_FORMAT};

pub const REPORT_HEADER: [&str; 2] = ["Date", "Total Detections"];

/// `daily_report_<YYYYMMDD_HHMMSS>.csv` inside `data_dir`.
pub fn report_path(data_dir: &Path, now: NaiveDateTime) -> PathBuf {
    data_dir.join(format!("daily_report_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

/// Write the daily aggregate as CSV.
///
/// Returns `None` without touching the filesystem when there is nothing to
/// export.
pub fn export_daily_report(
    store: &DetectionStore,
    data_dir: &Path,
    now: NaiveDateTime,
) -> Result<Option<PathBuf>> {
    let counts = store.daily_counts()?;
    if counts.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(data_dir)?;
    let path = report_path(data_dir, now);
    write_csv(&counts, &path)?;
    tracing::info!("Exported {} days to {}", counts.len(), path.display());
    Ok(Some(path))
}

fn write_csv(counts: &[DailyCount], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(REPORT_HEADER)?;
    for row in counts {
        wtr.write_record([row.day.format(DAY_FORMAT).to_string(), row.total.to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewDetection;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_report_path_naming() {
        let path = report_path(Path::new("/root/data"), at(5, 16));
        assert_eq!(path, PathBuf::from("/root/data/daily_report_20241005_160000.csv"));
    }

    #[test]
    fn test_export_writes_header_and_days_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = DetectionStore::open(&dir.path().join("records.db")).unwrap();
        for (value, when) in [("A", at(1, 9)), ("B", at(1, 10)), ("C", at(2, 9))] {
            store
                .record(&NewDetection {
                    value: value.to_string(),
                    detected_at: when,
                    video_path: None,
                })
                .unwrap();
        }

        let data_dir = dir.path().join("data");
        let path = export_daily_report(&store, &data_dir, at(3, 12)).unwrap().unwrap();
        assert!(path.starts_with(&data_dir));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Date,Total Detections\n2024-10-02,1\n2024-10-01,2\n"
        );
    }

    #[test]
    fn test_export_with_no_data_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = DetectionStore::open(&dir.path().join("records.db")).unwrap();
        let data_dir = dir.path().join("data");

        assert_eq!(export_daily_report(&store, &data_dir, at(3, 12)).unwrap(), None);
        assert!(!data_dir.exists());
    }
}
