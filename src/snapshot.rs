// 📸 Snapshot - the complete in-memory value of all five collections
//
// Snapshots are immutable values: every change builds a new one, and the store
// publishes it behind an `Arc` so readers never see a half-applied update.

use crate::entities::{ChecklistItem, Entity, Site, Transaction, WorkLog, Worker};
use crate::remote::{row_str, Row, Table};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub sites: Vec<Site>,
    pub workers: Vec<Worker>,
    pub work_logs: Vec<WorkLog>,
    pub transactions: Vec<Transaction>,
    pub checklists: Vec<ChecklistItem>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from raw remote rows, one row list per table.
    ///
    /// Missing tables load as empty collections. Rows that do not map to an
    /// entity are logged and left out; the second value counts them.
    pub fn from_rows(mut rows: HashMap<Table, Vec<Row>>) -> (Self, usize) {
        let mut take = |table: Table| rows.remove(&table).unwrap_or_default();
        let mut skipped = 0;

        let snapshot = Snapshot {
            sites: map_rows(&take(Table::Sites), &mut skipped),
            workers: map_rows(&take(Table::Workers), &mut skipped),
            work_logs: map_rows(&take(Table::WorkLogs), &mut skipped),
            transactions: map_rows(&take(Table::Transactions), &mut skipped),
            checklists: map_rows(&take(Table::Checklists), &mut skipped),
        };
        (snapshot, skipped)
    }

    /// Collection sizes in `Table::ALL` order
    pub fn counts(&self) -> [(Table, usize); 5] {
        [
            (Table::Sites, self.sites.len()),
            (Table::Workers, self.workers.len()),
            (Table::WorkLogs, self.work_logs.len()),
            (Table::Transactions, self.transactions.len()),
            (Table::Checklists, self.checklists.len()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.counts().iter().all(|(_, n)| *n == 0)
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn worker(&self, id: &str) -> Option<&Worker> {
        self.workers.iter().find(|w| w.id == id)
    }

    /// Site name, or "삭제된 현장" for a dangling reference
    pub fn site_name(&self, id: &str) -> &str {
        self.site(id).map(|s| s.name.as_str()).unwrap_or("삭제된 현장")
    }

    /// Worker name, or "미등록" for a dangling reference
    pub fn worker_name(&self, id: &str) -> &str {
        self.worker(id).map(|w| w.name.as_str()).unwrap_or("미등록")
    }
}

fn map_rows<E: Entity>(rows: &[Row], skipped: &mut usize) -> Vec<E> {
    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        match E::from_row(row) {
            Ok(entity) => entities.push(entity),
            Err(e) => {
                let id = row_str(row, "id").unwrap_or_default();
                warn!(table = %E::TABLE, id = %id, error = %e, "skipping malformed row");
                *skipped += 1;
            }
        }
    }
    entities
}
