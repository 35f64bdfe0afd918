// 👷 Worker Entity - name + daily wage

use super::{new_id, Entity};
use crate::config::DEFAULT_DAILY_RATE;
use crate::error::Result;
use crate::remote::{row_i64, row_id, row_str, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,

    /// Daily wage rate (KRW per man-day)
    pub daily: i64,
}

impl Worker {
    pub fn new(name: &str, daily: i64) -> Self {
        Worker {
            id: new_id(),
            name: name.trim().to_string(),
            daily,
        }
    }
}

impl Entity for Worker {
    const TABLE: Table = Table::Workers;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("name".into(), json!(self.name));
        row.insert("daily".into(), json!(self.daily));
        row
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Worker {
            id: row_id(row, Table::Workers)?,
            name: row_str(row, "name").unwrap_or_default(),
            // 0 and missing both mean "never set"
            daily: row_i64(row, "daily")
                .filter(|d| *d != 0)
                .unwrap_or(DEFAULT_DAILY_RATE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_daily_defaults() {
        let row = json!({"id": "w1", "name": "김반장"}).as_object().cloned().unwrap();
        assert_eq!(Worker::from_row(&row).unwrap().daily, 150_000);

        let row = json!({"id": "w1", "name": "김반장", "daily": 0}).as_object().cloned().unwrap();
        assert_eq!(Worker::from_row(&row).unwrap().daily, 150_000);
    }
}
