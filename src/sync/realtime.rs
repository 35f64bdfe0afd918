// 📡 Realtime change applier
//
// INSERT appends if absent, UPDATE replaces in place (or appends), DELETE
// removes if present. Rows are mapped with the same read defaults as a load.

use super::suppression::SuppressionGate;
use crate::config::SuppressionPolicy;
use crate::entities::Entity;
use crate::error::{Error, Result};
use crate::remote::{ChangeEvent, ChangeKind, Table};
use crate::snapshot::Snapshot;

/// Apply one change event.
///
/// Returns `None` when the event leaves the snapshot as it is.
pub fn apply_change(snapshot: &Snapshot, event: &ChangeEvent) -> Result<Option<Snapshot>> {
    let mut next = snapshot.clone();
    let changed = match event.table {
        Table::Sites => apply_to(&mut next.sites, event)?,
        Table::Workers => apply_to(&mut next.workers, event)?,
        Table::WorkLogs => apply_to(&mut next.work_logs, event)?,
        Table::Transactions => apply_to(&mut next.transactions, event)?,
        Table::Checklists => apply_to(&mut next.checklists, event)?,
    };

    Ok(changed.then_some(next))
}

fn apply_to<E: Entity>(items: &mut Vec<E>, event: &ChangeEvent) -> Result<bool> {
    match event.kind {
        ChangeKind::Delete => {
            let id = event.row_id().ok_or_else(|| Error::MalformedRow {
                table: E::TABLE.name(),
                reason: "delete event without old id".to_string(),
            })?;
            let before = items.len();
            items.retain(|e| e.id() != id);
            Ok(items.len() != before)
        }
        ChangeKind::Insert | ChangeKind::Update => {
            let row = event.new.as_ref().ok_or_else(|| Error::MalformedRow {
                table: E::TABLE.name(),
                reason: "change event without new row".to_string(),
            })?;
            let entity = E::from_row(row)?;

            match items.iter().position(|e| e.id() == entity.id()) {
                None => {
                    items.push(entity);
                    Ok(true)
                }
                Some(_) if event.kind == ChangeKind::Insert => Ok(false),
                Some(idx) if items[idx] == entity => Ok(false),
                Some(idx) => {
                    items[idx] = entity;
                    Ok(true)
                }
            }
        }
    }
}

/// Whether an incoming event must be dropped right now
pub fn should_drop(
    gate: &SuppressionGate,
    policy: SuppressionPolicy,
    event: &ChangeEvent,
    own_client_id: &str,
) -> bool {
    if !gate.is_active() {
        return false;
    }

    match policy {
        SuppressionPolicy::DropAll => true,
        SuppressionPolicy::ForeignOriginPasses => match event.origin.as_deref() {
            Some(origin) => origin == own_client_id,
            // Untagged events cannot be told apart from our own echoes
            None => true,
        },
    }
}
