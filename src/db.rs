// 🗄️ SQLite row store - local implementation of the remote row interface
//
// One table per entity (plus `created_at`), upsert-by-id and delete-by-id-set,
// and a broadcast change feed. Every write emits one ChangeEvent per affected
// row, tagged with the writing session's client id, after the transaction
// commits.

use crate::error::{Error, Result};
use crate::remote::{ChangeEvent, ChangeKind, Row, RowStore, Table};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered change events per subscriber before it starts lagging
const FEED_CAPACITY: usize = 1024;

/// Ids bound per DELETE statement
const DELETE_CHUNK: usize = 500;

pub struct SqliteRowStore {
    conn: Arc<Mutex<Connection>>,
    feed: broadcast::Sender<ChangeEvent>,
    client_id: String,
}

impl SqliteRowStore {
    /// Open (or create) an on-disk store
    pub fn open(path: &Path, client_id: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, client_id)
    }

    pub fn open_in_memory(client_id: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, client_id)
    }

    fn with_connection(conn: Connection, client_id: &str) -> Result<Self> {
        setup_database(&conn)?;
        let (feed, _) = broadcast::channel(FEED_CAPACITY);

        Ok(SqliteRowStore {
            conn: Arc::new(Mutex::new(conn)),
            feed,
            client_id: client_id.to_string(),
        })
    }

    /// Another session on the same database and change feed, writing under
    /// its own client id
    pub fn session(&self, client_id: &str) -> SqliteRowStore {
        SqliteRowStore {
            conn: Arc::clone(&self.conn),
            feed: self.feed.clone(),
            client_id: client_id.to_string(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Remote("database connection lock poisoned".to_string()))
    }

    /// Row count of one table
    pub fn count(&self, table: Table) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn publish(&self, events: Vec<ChangeEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.feed.send(event);
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases stay on "memory")
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sites (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            budget INTEGER,
            company_name TEXT,
            status TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS workers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            daily INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS work_logs (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            site_id TEXT,
            worker_id TEXT,
            md REAL,
            note TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            site_id TEXT,
            worker_id TEXT,
            category TEXT,
            amount INTEGER,
            description TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS checklists (
            id TEXT PRIMARY KEY,
            \"type\" TEXT NOT NULL,
            date TEXT NOT NULL,
            title TEXT,
            amount INTEGER,
            status TEXT,
            memo TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_work_logs_date ON work_logs(date);
        CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
        CREATE INDEX IF NOT EXISTS idx_checklists_date ON checklists(date);",
    )?;

    Ok(())
}

/// Columns read back on select (write columns plus read-only extras)
fn read_columns(table: Table) -> Vec<&'static str> {
    let mut cols = table.columns().to_vec();
    if table == Table::Transactions {
        cols.push("worker_id");
    }
    cols
}

fn quoted(cols: &[&str]) -> String {
    cols.iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// VALUE CONVERSION
// ============================================================================

fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(*b as i64),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn read_row(row: &rusqlite::Row<'_>, cols: &[&str]) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (i, col) in cols.iter().enumerate() {
        out.insert(col.to_string(), from_sql(row.get_ref(i)?));
    }
    Ok(out)
}

fn find_row(conn: &Connection, table: Table, id: &str) -> rusqlite::Result<Option<Row>> {
    let cols = read_columns(table);
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", quoted(&cols), table.name());
    conn.query_row(&sql, [id], |r| read_row(r, &cols)).optional()
}

// ============================================================================
// ROW STORE
// ============================================================================

impl RowStore for SqliteRowStore {
    fn select_page(&self, table: Table, offset: usize, limit: usize) -> Result<Vec<Row>> {
        let conn = self.lock()?;
        let cols = read_columns(table);
        let (order_col, ascending) = table.order();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY \"{}\" {}, rowid ASC LIMIT ?1 OFFSET ?2",
            quoted(&cols),
            table.name(),
            order_col,
            if ascending { "ASC" } else { "DESC" }
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit as i64, offset as i64], |r| read_row(r, &cols))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn upsert(&self, table: Table, rows: &[Row]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let cols = table.columns();
        let placeholders = (1..=cols.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = cols[1..]
            .iter()
            .map(|c| format!("\"{0}\" = excluded.\"{0}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
            table.name(),
            quoted(cols),
            placeholders,
            updates
        );

        let mut events = Vec::with_capacity(rows.len());
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;

            for row in rows {
                let id = row
                    .get("id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| Error::MalformedRow {
                        table: table.name(),
                        reason: "upsert without id".to_string(),
                    })?;

                let old = find_row(&tx, table, id)?;
                tx.execute(&sql, params_from_iter(cols.iter().map(|c| to_sql(row.get(*c)))))?;
                let new = find_row(&tx, table, id)?;

                events.push(ChangeEvent {
                    table,
                    kind: if old.is_some() { ChangeKind::Update } else { ChangeKind::Insert },
                    new,
                    old,
                    origin: Some(self.client_id.clone()),
                });
            }

            tx.commit()?;
        }

        debug!(table = %table, rows = rows.len(), "upserted");
        self.publish(events);
        Ok(())
    }

    fn delete(&self, table: Table, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut events = Vec::new();
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;

            for id in ids {
                if let Some(old) = find_row(&tx, table, id)? {
                    events.push(ChangeEvent {
                        table,
                        kind: ChangeKind::Delete,
                        new: None,
                        old: Some(old),
                        origin: Some(self.client_id.clone()),
                    });
                }
            }

            // Stay under SQLite's bound-parameter limit
            for chunk in ids.chunks(DELETE_CHUNK) {
                let placeholders = (1..=chunk.len())
                    .map(|i| format!("?{}", i))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!("DELETE FROM {} WHERE id IN ({})", table.name(), placeholders);
                tx.execute(&sql, params_from_iter(chunk.iter()))?;
            }

            tx.commit()?;
        }

        debug!(table = %table, rows = events.len(), "deleted");
        self.publish(events);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fetch_all;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn create_test_log(id: &str, date: &str) -> Row {
        row(json!({
            "id": id, "date": date, "site_id": "s1", "worker_id": "w1", "md": 1.0, "note": null
        }))
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        let mut site = row(json!({"id": "s1", "name": "포항 환호", "budget": 1000, "company_name": null, "status": "active"}));

        store.upsert(Table::Sites, &[site.clone()]).unwrap();
        site.insert("budget".into(), json!(2000));
        store.upsert(Table::Sites, &[site]).unwrap();

        let rows = fetch_all(&store, Table::Sites, 1000).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["budget"], json!(2000));
        assert_eq!(rows[0]["company_name"], Value::Null);
    }

    #[test]
    fn test_dated_tables_ordered_newest_first() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        store
            .upsert(
                Table::WorkLogs,
                &[
                    create_test_log("a", "2025-01-01"),
                    create_test_log("b", "2025-01-03"),
                    create_test_log("c", "2025-01-02"),
                ],
            )
            .unwrap();

        let rows = store.select_page(Table::WorkLogs, 0, 10).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_paging_walks_whole_table() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        let logs: Vec<Row> = (0..25)
            .map(|i| create_test_log(&format!("l{}", i), "2025-01-01"))
            .collect();
        store.upsert(Table::WorkLogs, &logs).unwrap();

        assert_eq!(store.select_page(Table::WorkLogs, 20, 10).unwrap().len(), 5);
        assert_eq!(fetch_all(&store, Table::WorkLogs, 10).unwrap().len(), 25);
        assert_eq!(fetch_all(&store, Table::WorkLogs, 25).unwrap().len(), 25);
    }

    #[test]
    fn test_delete_by_id_set() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        store
            .upsert(
                Table::WorkLogs,
                &[create_test_log("a", "2025-01-01"), create_test_log("b", "2025-01-02")],
            )
            .unwrap();

        store
            .delete(Table::WorkLogs, &["a".to_string(), "missing".to_string()])
            .unwrap();

        assert_eq!(store.count(Table::WorkLogs).unwrap(), 1);
    }

    #[test]
    fn test_delete_spans_several_statements() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        let logs: Vec<Row> = (0..DELETE_CHUNK * 2 + 10)
            .map(|i| create_test_log(&format!("l{}", i), "2025-01-01"))
            .collect();
        store.upsert(Table::WorkLogs, &logs).unwrap();

        let ids: Vec<String> = (0..DELETE_CHUNK * 2 + 5).map(|i| format!("l{}", i)).collect();
        store.delete(Table::WorkLogs, &ids).unwrap();

        assert_eq!(store.count(Table::WorkLogs).unwrap(), 5);
    }

    #[test]
    fn test_writes_emit_tagged_events() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        let phone = store.session("phone");
        let mut feed = store.subscribe();

        phone.upsert(Table::WorkLogs, &[create_test_log("a", "2025-01-01")]).unwrap();
        store.delete(Table::WorkLogs, &["a".to_string()]).unwrap();

        let insert = feed.try_recv().unwrap();
        assert_eq!(insert.kind, ChangeKind::Insert);
        assert_eq!(insert.origin.as_deref(), Some("phone"));
        assert_eq!(insert.row_id(), Some("a"));

        let delete = feed.try_recv().unwrap();
        assert_eq!(delete.kind, ChangeKind::Delete);
        assert_eq!(delete.origin.as_deref(), Some("office"));
        assert_eq!(delete.row_id(), Some("a"));
    }

    #[test]
    fn test_upsert_without_id_rejected() {
        let store = SqliteRowStore::open_in_memory("office").unwrap();
        let result = store.upsert(Table::Workers, &[row(json!({"name": "무명"}))]);

        assert!(matches!(result, Err(Error::MalformedRow { .. })));
        assert_eq!(store.count(Table::Workers).unwrap(), 0);
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteRowStore::open(&path, "office").unwrap();
            store
                .upsert(Table::Workers, &[row(json!({"id": "w1", "name": "박목수", "daily": 180000}))])
                .unwrap();
        }

        let store = SqliteRowStore::open(&path, "office").unwrap();
        let rows = store.select_page(Table::Workers, 0, 10).unwrap();
        assert_eq!(rows[0]["daily"], json!(180000));
    }
}
