// Entity Models
//
// Every entity has a stable opaque id (UUID v4 for anything created locally),
// compares structurally, and maps to/from its remote row shape.

pub mod site;
pub mod worker;
pub mod work_log;
pub mod transaction;
pub mod checklist;

pub use site::{Site, SiteStatus};
pub use worker::Worker;
pub use work_log::WorkLog;
pub use transaction::{Transaction, EXPENSE_CATEGORIES};
pub use checklist::{ChecklistItem, ChecklistStatus, ChecklistType};

use crate::error::Result;
use crate::remote::{Row, Table};
use serde::Serialize;

/// Shared behaviour of the five synced collections
pub trait Entity: Clone + PartialEq + Serialize + Send + Sync + 'static {
    /// Remote table this entity lives in
    const TABLE: Table;

    /// Stable identity
    fn id(&self) -> &str;

    /// Row written on upsert
    fn to_row(&self) -> Row;

    /// Map a remote row, filling defaults for missing columns
    fn from_row(row: &Row) -> Result<Self>;
}

/// Fresh identifier for locally created entities
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Optional text: empty or whitespace-only becomes None
pub(crate) fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
