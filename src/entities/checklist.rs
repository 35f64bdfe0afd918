// ✅ ChecklistItem Entity - receivables, payables and tasks

use super::work_log::parse_row_date;
use super::{new_id, non_empty, Entity};
use crate::error::{Error, Result};
use crate::remote::{nullable, row_i64, row_id, row_str, Row, Table};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistType {
    Receivable,
    Payable,
    Task,
}

impl ChecklistType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistType::Receivable => "receivable",
            ChecklistType::Payable => "payable",
            ChecklistType::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<ChecklistType> {
        match value {
            "receivable" => Some(ChecklistType::Receivable),
            "payable" => Some(ChecklistType::Payable),
            "task" => Some(ChecklistType::Task),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistStatus {
    Pending,
    Invoiced,
    Completed,
}

impl ChecklistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistStatus::Pending => "pending",
            ChecklistStatus::Invoiced => "invoiced",
            ChecklistStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<ChecklistStatus> {
        match value {
            "pending" => Some(ChecklistStatus::Pending),
            "invoiced" => Some(ChecklistStatus::Invoiced),
            "completed" => Some(ChecklistStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ChecklistType,
    pub date: NaiveDate,
    pub title: String,
    pub amount: i64,
    pub status: ChecklistStatus,
    pub memo: Option<String>,
}

impl ChecklistItem {
    pub fn new(item_type: ChecklistType, date: NaiveDate, title: &str, amount: i64) -> Self {
        ChecklistItem {
            id: new_id(),
            item_type,
            date,
            title: title.to_string(),
            amount,
            status: ChecklistStatus::Pending,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = non_empty(memo);
        self
    }
}

impl Entity for ChecklistItem {
    const TABLE: Table = Table::Checklists;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("type".into(), json!(self.item_type.as_str()));
        row.insert("date".into(), json!(self.date.format("%Y-%m-%d").to_string()));
        row.insert("title".into(), json!(self.title));
        row.insert("amount".into(), json!(self.amount));
        row.insert("status".into(), json!(self.status.as_str()));
        row.insert("memo".into(), nullable(&self.memo));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        let item_type = row_str(row, "type")
            .and_then(|t| ChecklistType::parse(&t))
            .ok_or_else(|| Error::MalformedRow {
                table: Table::Checklists.name(),
                reason: "missing or unknown type".to_string(),
            })?;

        Ok(ChecklistItem {
            id: row_id(row, Table::Checklists)?,
            item_type,
            date: parse_row_date(row, Table::Checklists)?,
            title: row_str(row, "title").unwrap_or_default(),
            amount: row_i64(row, "amount").unwrap_or(0),
            status: row_str(row, "status")
                .and_then(|s| ChecklistStatus::parse(&s))
                .unwrap_or(ChecklistStatus::Pending),
            memo: row_str(row, "memo").and_then(non_empty),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_round_trip_keeps_type_column_name() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let item = ChecklistItem::new(ChecklistType::Receivable, date, "2월 기성 청구", 12_000_000)
            .with_memo("현대건설");
        let row = item.to_row();

        assert_eq!(row["type"], json!("receivable"));
        assert_eq!(row["status"], json!("pending"));
        assert_eq!(ChecklistItem::from_row(&row).unwrap(), item);
    }

    #[test]
    fn test_status_defaults_to_pending() {
        let row = json!({"id": "c1", "type": "task", "date": "2025-02-01", "title": "안전교육"})
            .as_object()
            .cloned()
            .unwrap();
        let item = ChecklistItem::from_row(&row).unwrap();

        assert_eq!(item.status, ChecklistStatus::Pending);
        assert_eq!(item.amount, 0);
    }
}
