//! Search filter for the detection log.

use chrono::NaiveDate;

use super::schema::DAY_FORMAT;
use crate::error::StoreError;

/// Restricts `find` results. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionFilter {
    /// Case-sensitive substring of the barcode value.
    pub value_substring: Option<String>,
    /// Calendar day of `detected_at`, local time.
    pub exact_day: Option<NaiveDate>,
}

impl DetectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, substring: impl Into<String>) -> Self {
        let substring = substring.into();
        self.value_substring = if substring.is_empty() { None } else { Some(substring) };
        self
    }

    pub fn with_day(mut self, day: NaiveDate) -> Self {
        self.exact_day = Some(day);
        self
    }

    /// Build a filter from raw form input.
    ///
    /// Both fields are trimmed and blank fields are ignored. A day that is not
    /// `YYYY-MM-DD` is rejected so no partial query runs.
    pub fn parse(value_text: &str, day_text: &str) -> Result<Self, StoreError> {
        let value_text = value_text.trim();
        let day_text = day_text.trim();

        let exact_day = if day_text.is_empty() {
            None
        } else {
            let day = NaiveDate::parse_from_str(day_text, DAY_FORMAT).map_err(|_| {
                StoreError::InvalidFilter(format!("'{}' is not a date, use YYYY-MM-DD", day_text))
            })?;
            Some(day)
        };

        Ok(Self {
            exact_day,
            ..Self::new().with_value(value_text)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.value_substring.is_none() && self.exact_day.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_is_empty() {
        let filter = DetectionFilter::parse("  ", "").unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_parse_value_and_day() {
        let filter = DetectionFilter::parse(" ABC ", "2024-03-09").unwrap();
        assert_eq!(filter.value_substring.as_deref(), Some("ABC"));
        assert_eq!(filter.exact_day, NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_parse_rejects_malformed_day() {
        for bad in ["09/03/2024", "2024-13-01", "yesterday", "2024-02-30"] {
            let err = DetectionFilter::parse("ABC", bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidFilter(_)), "{bad} should be rejected");
        }
    }
}
