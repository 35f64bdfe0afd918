// 💸 Transaction Entity - an expense entry

use super::work_log::parse_row_date;
use super::{new_id, non_empty, Entity};
use crate::error::Result;
use crate::remote::{nullable, row_i64, row_id, row_str, Row, Table};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Suggested categories; free text is accepted too
pub const EXPENSE_CATEGORIES: [&str; 7] = ["아침", "점심", "저녁", "주유", "숙박", "자재", "기타"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub site_id: Option<String>,

    /// Read from the remote row when present, never written back
    pub worker_id: Option<String>,

    pub category: String,
    pub description: String,

    /// Positive amount (KRW)
    pub amount: i64,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        site_id: Option<String>,
        worker_id: Option<String>,
        category: &str,
        description: &str,
        amount: i64,
    ) -> Self {
        let description = if description.trim().is_empty() {
            category
        } else {
            description
        };

        Transaction {
            id: new_id(),
            date,
            site_id: site_id.and_then(non_empty),
            worker_id: worker_id.and_then(non_empty),
            category: category.to_string(),
            description: description.to_string(),
            amount,
        }
    }
}

impl Entity for Transaction {
    const TABLE: Table = Table::Transactions;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("date".into(), json!(self.date.format("%Y-%m-%d").to_string()));
        row.insert("site_id".into(), nullable(&self.site_id));
        row.insert("category".into(), json!(self.category));
        row.insert("amount".into(), json!(self.amount));
        row.insert("description".into(), nullable(&non_empty(self.description.clone())));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Transaction {
            id: row_id(row, Table::Transactions)?,
            date: parse_row_date(row, Table::Transactions)?,
            site_id: row_str(row, "site_id").and_then(non_empty),
            worker_id: row_str(row, "worker_id").and_then(non_empty),
            category: row_str(row, "category").unwrap_or_default(),
            description: row_str(row, "description").unwrap_or_default(),
            amount: row_i64(row, "amount").unwrap_or(0),
        })
    }
}
