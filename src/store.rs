// 🏪 AppStore - optimistic client state with diff-based background sync
//
// Flow:
//   update(f) ──► publish next snapshot (version + 1) ──► return SyncTicket
//                      │
//                      └─► tokio task: diff(prev, next) per table
//                              ├─ upsert(to_insert ∪ to_update)   ┐ blocking pool,
//                              └─ delete(to_delete)               ┘ tables concurrent
//
// Remote failures never roll the snapshot back; they surface as an error
// notice plus `SyncOutcome::Failed` for that version.

use crate::config::{SuppressionPolicy, SyncConfig};
use crate::error::{Error, Result};
use crate::remote::{fetch_all, ChangeEvent, Row, RowStore, Table};
use crate::snapshot::Snapshot;
use crate::sync::{
    apply_change, diff_snapshots, should_drop, SnapshotDiff, SuppressionGate, SyncId, SyncOutcome,
    SyncSummary, TableDiff,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

pub const LOAD_FAILED: &str = "데이터 로딩 실패. 새로고침 해주세요.";
pub const SAVE_FAILED: &str = "데이터 저장 실패. 다시 시도해주세요.";

/// Sync outcomes kept for this many recent versions
const OUTCOME_HISTORY: usize = 64;

// ============================================================================
// NOTICES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
        }
    }
}

// ============================================================================
// SYNC TICKET
// ============================================================================

/// Handle on the background sync started by one update
#[derive(Debug)]
pub struct SyncTicket {
    /// Snapshot version this sync belongs to
    pub version: u64,

    /// `None` when the update changed nothing and no sync ran
    pub sync_id: Option<SyncId>,

    handle: Option<JoinHandle<SyncOutcome>>,
}

impl SyncTicket {
    /// Wait for the sync to settle
    pub async fn wait(self) -> SyncOutcome {
        match self.handle {
            None => SyncOutcome::NoChanges,
            Some(handle) => handle.await.unwrap_or_else(|e| SyncOutcome::Failed {
                error: format!("sync task failed: {}", e),
            }),
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

struct Published {
    snapshot: Arc<Snapshot>,
    version: u64,
}

struct StoreInner {
    remote: Arc<dyn RowStore>,
    config: SyncConfig,
    state: RwLock<Published>,
    loading: AtomicBool,
    gate: SuppressionGate,
    outcomes: Mutex<BTreeMap<u64, SyncOutcome>>,
    notices: broadcast::Sender<Notice>,
}

/// Cheap to clone; all clones share one state
#[derive(Clone)]
pub struct AppStore {
    inner: Arc<StoreInner>,
}

impl AppStore {
    pub fn new(remote: Arc<dyn RowStore>, config: SyncConfig) -> Self {
        let (notices, _) = broadcast::channel(64);
        let gate = SuppressionGate::new(config.suppression_window());

        AppStore {
            inner: Arc::new(StoreInner {
                remote,
                config,
                state: RwLock::new(Published {
                    snapshot: Arc::new(Snapshot::new()),
                    version: 0,
                }),
                loading: AtomicBool::new(true),
                gate,
                outcomes: Mutex::new(BTreeMap::new()),
                notices,
            }),
        }
    }

    // ========================================================================
    // READ SIDE
    // ========================================================================

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.snapshot)
    }

    /// Version of the current snapshot (bumped on every publish)
    pub fn version(&self) -> u64 {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner).version
    }

    /// True until the first successful load
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn client_id(&self) -> &str {
        self.inner.remote.client_id()
    }

    pub fn is_suppressing(&self) -> bool {
        self.inner.gate.is_active()
    }

    /// Outcome of the sync started for `version`, if it is still remembered
    pub fn sync_outcome(&self, version: u64) -> Option<SyncOutcome> {
        self.inner
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&version)
            .cloned()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        // No listeners is fine
        let _ = self.inner.notices.send(Notice::new(level, message));
    }

    // ========================================================================
    // LOAD
    // ========================================================================

    /// Fetch every table from the remote store and replace the snapshot.
    ///
    /// On failure the previous snapshot stays published and an error notice
    /// is emitted.
    pub async fn load(&self) -> Result<()> {
        let remote = Arc::clone(&self.inner.remote);
        let page_size = self.inner.config.page_size;

        let fetched = tokio::task::spawn_blocking(move || -> Result<HashMap<Table, Vec<Row>>> {
            let mut rows = HashMap::new();
            for table in Table::ALL {
                rows.insert(table, fetch_all(remote.as_ref(), table, page_size)?);
            }
            Ok(rows)
        })
        .await
        .map_err(|e| Error::Remote(format!("load task failed: {}", e)))
        .and_then(|rows| rows)
        .map(Snapshot::from_rows);

        match fetched {
            Ok((snapshot, skipped)) => {
                let counts = snapshot.counts();
                let version = self.publish(|_| snapshot);
                self.inner.loading.store(false, Ordering::SeqCst);
                info!(
                    version,
                    sites = counts[0].1,
                    workers = counts[1].1,
                    work_logs = counts[2].1,
                    transactions = counts[3].1,
                    checklists = counts[4].1,
                    skipped,
                    "loaded snapshot"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "load failed");
                self.notify(NoticeLevel::Error, LOAD_FAILED);
                Err(e)
            }
        }
    }

    /// Full re-fetch, e.g. after a failed sync
    pub async fn reload(&self) -> Result<()> {
        self.load().await
    }

    // ========================================================================
    // WRITE SIDE
    // ========================================================================

    /// Replace the snapshot wholesale and sync the difference.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set(&self, next: Snapshot) -> SyncTicket {
        self.update(move |_| next)
    }

    /// Derive the next snapshot from the latest published one and sync the
    /// difference in the background.
    ///
    /// `f` runs under the writer lock, so concurrent updaters never build on
    /// a stale snapshot. `f` must not call back into the store (`snapshot`,
    /// `update`, ...): the lock is not reentrant and the thread deadlocks.
    /// Must be called from within a Tokio runtime.
    pub fn update<F>(&self, f: F) -> SyncTicket
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let (prev, next, version) = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            let prev = Arc::clone(&state.snapshot);
            let next = Arc::new(f(&prev));
            state.version += 1;
            state.snapshot = Arc::clone(&next);
            (prev, next, state.version)
        };

        self.start_sync(&prev, &next, version)
    }

    /// Fallible variant of `update`: an error leaves the snapshot untouched.
    ///
    /// Same lock rule as `update`: `f` must not call back into the store.
    /// Must be called from within a Tokio runtime.
    pub fn try_update<F>(&self, f: F) -> Result<SyncTicket>
    where
        F: FnOnce(&Snapshot) -> Result<Snapshot>,
    {
        let (prev, next, version) = {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            let prev = Arc::clone(&state.snapshot);
            let next = Arc::new(f(&prev)?);
            state.version += 1;
            state.snapshot = Arc::clone(&next);
            (prev, next, state.version)
        };

        Ok(self.start_sync(&prev, &next, version))
    }

    /// Publish a snapshot without syncing; returns the new version
    fn publish<F>(&self, f: F) -> u64
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        state.snapshot = Arc::new(f(&state.snapshot));
        state.version += 1;
        state.version
    }

    fn record(&self, version: u64, outcome: SyncOutcome) {
        let mut outcomes = self.inner.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        outcomes.insert(version, outcome);
        while outcomes.len() > OUTCOME_HISTORY {
            outcomes.pop_first();
        }
    }

    fn start_sync(&self, prev: &Snapshot, next: &Snapshot, version: u64) -> SyncTicket {
        let diff = diff_snapshots(prev, next);

        if diff.is_empty() {
            debug!(version, "no changes to sync");
            self.record(version, SyncOutcome::NoChanges);
            return SyncTicket {
                version,
                sync_id: None,
                handle: None,
            };
        }

        let sync_id = self.inner.gate.begin();
        self.record(version, SyncOutcome::Pending);

        let store = self.clone();
        let handle = tokio::spawn(async move { store.run_sync(sync_id, version, diff).await });

        SyncTicket {
            version,
            sync_id: Some(sync_id),
            handle: Some(handle),
        }
    }

    async fn run_sync(&self, sync_id: SyncId, version: u64, diff: SnapshotDiff) -> SyncOutcome {
        let mut tasks = JoinSet::new();
        for table_diff in diff.tables.into_iter().filter(|t| !t.is_empty()) {
            let remote = Arc::clone(&self.inner.remote);
            tasks.spawn_blocking(move || push_table(remote.as_ref(), &table_diff));
        }

        let mut summary = SyncSummary::default();
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(counts)) => summary.tables.push(counts),
                Ok(Err(e)) => {
                    failure = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    failure = Some(format!("sync task failed: {}", e));
                    break;
                }
            }
        }
        // Abandoned tables still run to completion; their results are ignored
        tasks.detach_all();

        self.inner.gate.finish(sync_id);

        let outcome = match failure {
            Some(error) => {
                error!(%sync_id, version, %error, "sync failed");
                self.notify(NoticeLevel::Error, SAVE_FAILED);
                SyncOutcome::Failed { error }
            }
            None => {
                summary
                    .tables
                    .sort_by_key(|c| Table::ALL.iter().position(|t| *t == c.table));
                info!(%sync_id, version, writes = summary.total_writes(), "sync complete");
                SyncOutcome::Synced(summary)
            }
        };

        self.record(version, outcome.clone());
        outcome
    }

    // ========================================================================
    // REALTIME
    // ========================================================================

    /// Merge one remote change into the snapshot.
    ///
    /// Returns whether the snapshot changed. Dropped events (suppression
    /// window open) return `Ok(false)`. Never starts a sync.
    pub fn apply_remote_change(&self, event: &ChangeEvent) -> Result<bool> {
        let policy: SuppressionPolicy = self.inner.config.suppression_policy;
        if should_drop(&self.inner.gate, policy, event, self.client_id()) {
            debug!(table = %event.table, kind = ?event.kind, id = ?event.row_id(), "realtime event dropped");
            return Ok(false);
        }

        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        match apply_change(&state.snapshot, event)? {
            Some(next) => {
                state.snapshot = Arc::new(next);
                state.version += 1;
                debug!(table = %event.table, kind = ?event.kind, version = state.version, "realtime event applied");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Consume the remote change feed until it closes
    pub fn spawn_realtime(&self) -> JoinHandle<()> {
        let mut feed = self.inner.remote.subscribe();
        let store = self.clone();

        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(event) => {
                        if let Err(e) = store.apply_remote_change(&event) {
                            warn!(error = %e, table = %event.table, "realtime event rejected");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "realtime feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// At most two remote calls for one table: upsert, then delete
fn push_table(remote: &dyn RowStore, diff: &TableDiff) -> Result<crate::sync::TableCounts> {
    let upserts = diff.upserts();
    if !upserts.is_empty() {
        remote.upsert(diff.table, &upserts)?;
    }
    if !diff.to_delete.is_empty() {
        remote.delete(diff.table, &diff.to_delete)?;
    }
    Ok(diff.counts())
}
