// 🌐 Remote row store interface
//
// The hosted backend is an external collaborator reached through a
// row-oriented CRUD + change-notification interface: five named tables,
// paged ordered selects, upsert-by-id, delete-by-id-set, and a change feed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// One remote row: column name → JSON value
pub type Row = serde_json::Map<String, Value>;

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Sites,
    Workers,
    WorkLogs,
    Transactions,
    Checklists,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Sites,
        Table::Workers,
        Table::WorkLogs,
        Table::Transactions,
        Table::Checklists,
    ];

    /// Remote table name
    pub fn name(&self) -> &'static str {
        match self {
            Table::Sites => "sites",
            Table::Workers => "workers",
            Table::WorkLogs => "work_logs",
            Table::Transactions => "transactions",
            Table::Checklists => "checklists",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Bulk-load ordering: (column, ascending)
    pub fn order(&self) -> (&'static str, bool) {
        match self {
            Table::Sites | Table::Workers => ("created_at", true),
            Table::WorkLogs | Table::Transactions | Table::Checklists => ("date", false),
        }
    }

    /// Columns written on upsert (`id` first)
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Sites => &["id", "name", "budget", "company_name", "status"],
            Table::Workers => &["id", "name", "daily"],
            Table::WorkLogs => &["id", "date", "site_id", "worker_id", "md", "note"],
            Table::Transactions => &["id", "date", "site_id", "category", "amount", "description"],
            Table::Checklists => &["id", "type", "date", "title", "amount", "status", "memo"],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// CHANGE FEED
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Push notification for one remote row change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,

    /// Row after the change (INSERT / UPDATE)
    pub new: Option<Row>,

    /// Row before the change (UPDATE / DELETE)
    pub old: Option<Row>,

    /// Client id of the writer, when the backend reports it
    pub origin: Option<String>,
}

impl ChangeEvent {
    /// Id of the affected row: from `new`, or from `old` for deletes
    pub fn row_id(&self) -> Option<&str> {
        let row = match self.kind {
            ChangeKind::Delete => self.old.as_ref(),
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
        }?;
        row.get("id").and_then(Value::as_str)
    }
}

// ============================================================================
// ROW STORE
// ============================================================================

/// Row-oriented CRUD + realtime interface of the remote store.
///
/// Calls are blocking; the sync engine runs them on tokio's blocking pool.
pub trait RowStore: Send + Sync {
    /// One page of rows, ordered per `Table::order`
    fn select_page(&self, table: Table, offset: usize, limit: usize) -> Result<Vec<Row>>;

    /// Insert-or-update each row by `id`
    fn upsert(&self, table: Table, rows: &[Row]) -> Result<()>;

    /// Delete every row whose id is in `ids`
    fn delete(&self, table: Table, ids: &[String]) -> Result<()>;

    /// Subscribe to change notifications for all tables
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Origin tag this handle attaches to its own writes
    fn client_id(&self) -> &str;
}

/// Page through a whole table
pub fn fetch_all(store: &dyn RowStore, table: Table, page_size: usize) -> Result<Vec<Row>> {
    if page_size == 0 {
        return Err(Error::Config("page_size must be positive".to_string()));
    }

    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.select_page(table, offset, page_size)?;
        let len = page.len();
        all.extend(page);
        if len < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(all)
}

// ============================================================================
// ROW FIELD ACCESS (lenient, mirrors what the backend hands back)
// ============================================================================

/// Non-empty string column
pub fn row_str(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer column; accepts numbers and numeric strings
pub fn row_i64(row: &Row, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

/// Float column; accepts numbers and numeric strings
pub fn row_f64(row: &Row, key: &str) -> Option<f64> {
    match row.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Required `id` column
pub fn row_id(row: &Row, table: Table) -> Result<String> {
    row_str(row, "id").ok_or_else(|| Error::MalformedRow {
        table: table.name(),
        reason: "missing id".to_string(),
    })
}

/// Optional string → JSON (empty becomes null)
pub fn nullable(value: &Option<String>) -> Value {
    match value {
        Some(s) if !s.is_empty() => Value::String(s.clone()),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.name()), Some(table));
        }
        assert_eq!(Table::from_name("payments"), None);
    }

    #[test]
    fn test_lenient_field_access() {
        let r = row(json!({"id": "a", "md": "1.5", "amount": 35000, "note": ""}));

        assert_eq!(row_f64(&r, "md"), Some(1.5));
        assert_eq!(row_i64(&r, "amount"), Some(35000));
        assert_eq!(row_str(&r, "note"), None);
        assert_eq!(row_str(&r, "missing"), None);
    }

    #[test]
    fn test_change_event_row_id() {
        let event = ChangeEvent {
            table: Table::Sites,
            kind: ChangeKind::Delete,
            new: None,
            old: Some(row(json!({"id": "s1"}))),
            origin: None,
        };
        assert_eq!(event.row_id(), Some("s1"));
    }
}
