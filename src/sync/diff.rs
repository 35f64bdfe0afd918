// 🧮 Snapshot diff - insert / update / delete sets per table
//
// Keyed by entity id and compared structurally; updates also carry the names
// of the columns that changed.

use super::{SyncSummary, TableCounts};
use crate::entities::Entity;
use crate::remote::{Row, Table};
use crate::snapshot::Snapshot;
use std::collections::{HashMap, HashSet};

/// One changed entity: its full new row plus the columns that differ
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub id: String,
    pub row: Row,
    pub changed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    pub table: Table,
    pub to_insert: Vec<Row>,
    pub to_update: Vec<RowUpdate>,
    pub to_delete: Vec<String>,
}

impl TableDiff {
    fn empty(table: Table) -> Self {
        TableDiff {
            table,
            to_insert: Vec::new(),
            to_update: Vec::new(),
            to_delete: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Rows for the single upsert call: inserts then updates
    pub fn upserts(&self) -> Vec<Row> {
        self.to_insert
            .iter()
            .cloned()
            .chain(self.to_update.iter().map(|u| u.row.clone()))
            .collect()
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            table: self.table,
            inserted: self.to_insert.len(),
            updated: self.to_update.len(),
            deleted: self.to_delete.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    pub tables: Vec<TableDiff>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(TableDiff::is_empty)
    }

    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            tables: self.tables.iter().map(TableDiff::counts).collect(),
        }
    }

    pub fn table(&self, table: Table) -> Option<&TableDiff> {
        self.tables.iter().find(|t| t.table == table)
    }
}

/// Diff every collection of `prev` against `next`
pub fn diff_snapshots(prev: &Snapshot, next: &Snapshot) -> SnapshotDiff {
    SnapshotDiff {
        tables: vec![
            diff_collection(&prev.sites, &next.sites),
            diff_collection(&prev.workers, &next.workers),
            diff_collection(&prev.work_logs, &next.work_logs),
            diff_collection(&prev.transactions, &next.transactions),
            diff_collection(&prev.checklists, &next.checklists),
        ],
    }
}

pub fn diff_collection<E: Entity>(prev: &[E], next: &[E]) -> TableDiff {
    let mut diff = TableDiff::empty(E::TABLE);
    let before: HashMap<&str, &E> = prev.iter().map(|e| (e.id(), e)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(next.len());

    for item in next {
        if !seen.insert(item.id()) {
            continue;
        }
        match before.get(item.id()) {
            None => diff.to_insert.push(item.to_row()),
            Some(old) if *old != item => {
                let row = item.to_row();
                let changed = changed_columns(&old.to_row(), &row);
                diff.to_update.push(RowUpdate {
                    id: item.id().to_string(),
                    row,
                    changed,
                });
            }
            Some(_) => {}
        }
    }

    diff.to_delete = prev
        .iter()
        .map(|e| e.id())
        .filter(|id| !seen.contains(id))
        .map(str::to_string)
        .collect();

    diff
}

fn changed_columns(old: &Row, new: &Row) -> Vec<String> {
    new.iter()
        .filter(|(col, value)| old.get(col.as_str()) != Some(*value))
        .map(|(col, _)| col.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Site, SiteStatus, WorkLog, Worker};
    use chrono::NaiveDate;

    fn create_test_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.sites = vec![
            Site::new("포항 환호", 30_000_000, None, SiteStatus::Active).unwrap(),
            Site::new("용인 둔전", 12_000_000, Some("한양".into()), SiteStatus::Scheduled).unwrap(),
        ];
        snapshot.workers = vec![Worker::new("김철수", 150_000), Worker::new("이영희", 170_000)];
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        snapshot.work_logs = vec![WorkLog::new(
            date,
            &snapshot.sites[0].id,
            &snapshot.workers[0].id,
            1.0,
            None,
        )];
        snapshot
    }

    #[test]
    fn test_identical_snapshots_produce_empty_diff() {
        let snapshot = create_test_snapshot();
        let diff = diff_snapshots(&snapshot, &snapshot.clone());

        assert!(diff.is_empty());
        assert_eq!(diff.summary().total_writes(), 0);
    }

    #[test]
    fn test_insert_update_delete_partition() {
        let prev = create_test_snapshot();
        let mut next = prev.clone();

        next.sites[0].budget = 35_000_000;
        next.sites.remove(1);
        next.workers.push(Worker::new("박민수", 160_000));

        let diff = diff_snapshots(&prev, &next);
        let sites = diff.table(Table::Sites).unwrap();
        let workers = diff.table(Table::Workers).unwrap();

        assert_eq!(sites.to_insert.len(), 0);
        assert_eq!(sites.to_update.len(), 1);
        assert_eq!(sites.to_update[0].changed, vec!["budget".to_string()]);
        assert_eq!(sites.to_delete, vec![prev.sites[1].id.clone()]);
        assert_eq!(workers.to_insert.len(), 1);
        assert!(workers.to_update.is_empty() && workers.to_delete.is_empty());
        assert!(diff.table(Table::WorkLogs).unwrap().is_empty());
    }

    #[test]
    fn test_upserts_and_unchanged_reconstruct_next() {
        let prev = create_test_snapshot();
        let mut next = prev.clone();
        next.workers[1].daily = 180_000;
        next.workers.remove(0);
        next.workers.push(Worker::new("최현우", 150_000));

        let diff = diff_collection(&prev.workers, &next.workers);
        let changed: HashSet<String> = diff
            .upserts()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();

        let mut rebuilt: Vec<Row> = prev
            .workers
            .iter()
            .filter(|w| !diff.to_delete.contains(&w.id) && !changed.contains(&w.id))
            .map(Entity::to_row)
            .collect();
        rebuilt.extend(diff.upserts());

        let mut expected: Vec<Row> = next.workers.iter().map(Entity::to_row).collect();
        let key = |r: &Row| r["id"].as_str().unwrap().to_string();
        rebuilt.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_duplicate_ids_in_next_counted_once() {
        let prev = Vec::<Worker>::new();
        let worker = Worker::new("김철수", 150_000);
        let diff = diff_collection(&prev, &[worker.clone(), worker]);

        assert_eq!(diff.to_insert.len(), 1);
    }
}
