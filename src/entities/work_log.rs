// 📋 WorkLog Entity - one worker, one site, one day, N man-days

use super::{new_id, non_empty, Entity};
use crate::error::{Error, Result};
use crate::remote::{nullable, row_f64, row_id, row_str, Row, Table};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: String,
    pub date: NaiveDate,

    /// Soft reference; may dangle after a site is deleted
    pub site_id: String,

    /// Soft reference; may dangle after a worker is deleted
    pub worker_id: String,

    /// Man-days (0.5 .. 3.5 when entered by hand, any positive value on import)
    pub md: f64,

    pub note: Option<String>,
}

impl WorkLog {
    pub fn new(date: NaiveDate, site_id: &str, worker_id: &str, md: f64, note: Option<String>) -> Self {
        WorkLog {
            id: new_id(),
            date,
            site_id: site_id.to_string(),
            worker_id: worker_id.to_string(),
            md,
            note: note.and_then(non_empty),
        }
    }

    /// Deduplication key over (date, worker, site, md, note).
    ///
    /// NOTE: This is for DEDUPLICATION, not IDENTITY. Two logs with different
    /// ids but the same key are exact repeats.
    pub fn dedup_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.date.format("%Y-%m-%d"),
            self.worker_id,
            self.site_id,
            self.md,
            self.note.as_deref().unwrap_or("")
        ));
        format!("{:x}", hasher.finalize())
    }
}

impl Entity for WorkLog {
    const TABLE: Table = Table::WorkLogs;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("date".into(), json!(self.date.format("%Y-%m-%d").to_string()));
        row.insert("site_id".into(), json!(self.site_id));
        row.insert("worker_id".into(), json!(self.worker_id));
        row.insert("md".into(), json!(self.md));
        row.insert("note".into(), nullable(&self.note));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        let id = row_id(row, Table::WorkLogs)?;
        let date = parse_row_date(row, Table::WorkLogs)?;

        Ok(WorkLog {
            id,
            date,
            site_id: row_str(row, "site_id").unwrap_or_default(),
            worker_id: row_str(row, "worker_id").unwrap_or_default(),
            md: row_f64(row, "md")
                .filter(|md| *md != 0.0 && md.is_finite())
                .unwrap_or(1.0),
            note: row_str(row, "note").and_then(non_empty),
        })
    }
}

/// `date` column as a calendar day
pub(crate) fn parse_row_date(row: &Row, table: Table) -> Result<NaiveDate> {
    let raw = row_str(row, "date").ok_or_else(|| Error::MalformedRow {
        table: table.name(),
        reason: "missing date".to_string(),
    })?;
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(&raw), "%Y-%m-%d").map_err(|e| Error::MalformedRow {
        table: table.name(),
        reason: format!("bad date '{}': {}", raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_dedup_key_ignores_identity() {
        let a = WorkLog::new(day(1), "s1", "w1", 1.0, Some("오전 비".into()));
        let b = WorkLog::new(day(1), "s1", "w1", 1.0, Some("오전 비".into()));

        assert_ne!(a.id, b.id);
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key().len(), 64);
    }

    #[test]
    fn test_dedup_key_sensitive_to_each_field() {
        let base = WorkLog::new(day(1), "s1", "w1", 1.0, None);
        let variants = [
            WorkLog::new(day(2), "s1", "w1", 1.0, None),
            WorkLog::new(day(1), "s2", "w1", 1.0, None),
            WorkLog::new(day(1), "s1", "w2", 1.0, None),
            WorkLog::new(day(1), "s1", "w1", 1.5, None),
            WorkLog::new(day(1), "s1", "w1", 1.0, Some("야간".into())),
        ];

        for v in &variants {
            assert_ne!(base.dedup_key(), v.dedup_key());
        }
    }

    #[test]
    fn test_from_row_md_fallback_and_timestamp_date() {
        let row = json!({
            "id": "l1", "date": "2025-01-03T00:00:00", "site_id": "s1",
            "worker_id": "w1", "md": "abc", "note": null
        })
        .as_object()
        .cloned()
        .unwrap();
        let log = WorkLog::from_row(&row).unwrap();

        assert_eq!(log.date, day(3));
        assert_eq!(log.md, 1.0);
        assert_eq!(log.note, None);
    }

    #[test]
    fn test_from_row_requires_date() {
        let row = json!({"id": "l1"}).as_object().cloned().unwrap();
        assert!(WorkLog::from_row(&row).is_err());
    }
}
