// Site Ledger - Core Library
// Labor work logs, payroll, expenses and checklists for a construction-labor
// contractor, kept in sync with a table-per-entity row store.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod helpers;
pub mod import;
pub mod matcher;
pub mod remote;
pub mod reports;
pub mod snapshot;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::{AppConfig, ImportConfig, SuppressionPolicy, SyncConfig};
pub use db::SqliteRowStore;
pub use entities::{
    ChecklistItem, ChecklistStatus, ChecklistType, Entity, Site, SiteStatus, Transaction, WorkLog,
    Worker,
};
pub use error::{Error, Result};
pub use import::{ImportKind, ImportSummary, Imported, Sheet};
pub use matcher::{best_match, find_column, normalize, MatchRank};
pub use remote::{ChangeEvent, ChangeKind, Row, RowStore, Table};
pub use reports::{calc_payroll, payroll_report, site_stats, Payroll, PayrollFilter, PayrollReport, SiteStats};
pub use snapshot::Snapshot;
pub use store::{AppStore, Notice, NoticeLevel, SyncTicket};
pub use sync::{SyncId, SyncOutcome, SyncSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
