// 🔇 Suppression gate - per-sync echo windows
//
// Each sync gets its own id. While it runs, and for `window` after it
// finishes, the gate reports active so the realtime applier can ignore the
// echoes of our own writes. Overlapping syncs keep independent windows.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SyncId(pub u64);

impl std::fmt::Display for SyncId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sync#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: HashSet<SyncId>,
    closes_at: HashMap<SyncId, Instant>,
}

#[derive(Debug)]
pub struct SuppressionGate {
    window: Duration,
    next_id: AtomicU64,
    state: Mutex<GateState>,
}

impl SuppressionGate {
    pub fn new(window: Duration) -> Self {
        SuppressionGate {
            window,
            next_id: AtomicU64::new(1),
            state: Mutex::new(GateState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        // State stays consistent across a panicking holder
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new in-flight sync
    pub fn begin(&self) -> SyncId {
        let id = SyncId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state().in_flight.insert(id);
        id
    }

    /// Sync finished (either way): keep its window open for `window`
    pub fn finish(&self, id: SyncId) {
        let mut state = self.state();
        state.in_flight.remove(&id);
        state.closes_at.insert(id, Instant::now() + self.window);
    }

    /// True while any sync is running or any window is still open
    pub fn is_active(&self) -> bool {
        !self.active_syncs().is_empty()
    }

    /// Syncs currently suppressing echoes, oldest first
    pub fn active_syncs(&self) -> Vec<SyncId> {
        let now = Instant::now();
        let mut state = self.state();
        state.closes_at.retain(|_, closes| *closes > now);

        let mut active: Vec<SyncId> = state
            .in_flight
            .iter()
            .chain(state.closes_at.keys())
            .copied()
            .collect();
        active.sort();
        active.dedup();
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_closes_after_duration() {
        let gate = SuppressionGate::new(Duration::from_millis(2000));
        assert!(!gate.is_active());

        let id = gate.begin();
        assert!(gate.is_active());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(gate.is_active(), "in-flight syncs never expire");

        gate.finish(id);
        tokio::time::advance(Duration::from_millis(1999)).await;
        assert!(gate.is_active());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!gate.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_syncs_keep_own_windows() {
        let gate = SuppressionGate::new(Duration::from_millis(2000));
        let first = gate.begin();
        let second = gate.begin();
        assert_ne!(first, second);

        gate.finish(first);
        tokio::time::advance(Duration::from_millis(2500)).await;
        assert_eq!(gate.active_syncs(), vec![second]);

        gate.finish(second);
        tokio::time::advance(Duration::from_millis(2500)).await;
        assert!(gate.active_syncs().is_empty());
    }
}
