// 🔄 Sync engine building blocks
//
// - diff: structural per-table diff between two snapshots
// - suppression: per-sync echo suppression windows
// - realtime: merging remote change events into a snapshot

pub mod diff;
pub mod realtime;
pub mod suppression;

pub use diff::{diff_snapshots, RowUpdate, SnapshotDiff, TableDiff};
pub use realtime::{apply_change, should_drop};
pub use suppression::{SuppressionGate, SyncId};

use crate::remote::Table;
use serde::Serialize;

/// Per-table write counts of one completed sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub tables: Vec<TableCounts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub table: Table,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncSummary {
    pub fn total_writes(&self) -> usize {
        self.tables
            .iter()
            .map(|t| t.inserted + t.updated + t.deleted)
            .sum()
    }
}

/// Result of the sync attached to one snapshot version
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Still running
    Pending,

    /// Nothing differed from the previous snapshot
    NoChanges,

    Synced(SyncSummary),

    /// Abandoned on the first remote failure; local state kept
    Failed { error: String },
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}
