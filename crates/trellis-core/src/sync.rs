use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::snapshot::SnapshotStore;
use crate::store::{TaskAction, TaskState, reduce};
use crate::task::Task;

/// Where refreshed task snapshots come from. The loop only ever talks to
/// this trait, so a polling file/HTTP source can later be swapped for a
/// push-style subscription without touching the store contract.
pub trait SyncSource {
    fn fetch(&mut self) -> anyhow::Result<Vec<Task>>;
}

/// Tick-driven refresh. The caller owns the clock: it calls `tick` from its
/// event loop and the loop fires at most once per interval while enabled.
/// Disabling stops future fires; it does not abort a fetch already underway.
#[derive(Debug)]
pub struct SyncLoop {
    interval: Duration,
    enabled: bool,
    last_attempt: Option<DateTime<Utc>>,
}

pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 30;

impl SyncLoop {
    pub fn new(interval_secs: i64) -> Self {
        Self {
            interval: Duration::seconds(interval_secs.max(1)),
            enabled: true,
            last_attempt: None,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Attempts one refresh if the interval has elapsed. Returns whether a
    /// fetch was attempted. Fetch errors land in `state.error` as data; the
    /// next tick simply tries again.
    #[tracing::instrument(skip(self, state, source))]
    pub fn tick(
        &mut self,
        state: &mut TaskState,
        source: &mut dyn SyncSource,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(last) = self.last_attempt
            && now - last < self.interval
        {
            return false;
        }

        self.last_attempt = Some(now);
        reduce(state, TaskAction::SyncStarted);

        match source.fetch() {
            Ok(tasks) => {
                debug!(count = tasks.len(), "sync fetch succeeded");
                reduce(state, TaskAction::Sync { tasks, at: now });
            }
            Err(err) => {
                reduce(state, TaskAction::SyncFailed(format!("{err:#}")));
            }
        }
        true
    }
}

impl Default for SyncLoop {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL_SECS)
    }
}

/// Display bucket for "how fresh is the board". `Offline` wins outright when
/// real-time refresh is off; `Syncing` while a fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Offline,
    Syncing,
    Never,
    JustNow,
    Recent,
    Stale,
    VeryStale,
}

impl SyncStatus {
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Offline => "offline",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Never => "never synced",
            SyncStatus::JustNow => "just now",
            SyncStatus::Recent => "recent",
            SyncStatus::Stale => "stale",
            SyncStatus::VeryStale => "very stale",
        }
    }
}

pub fn sync_status(state: &TaskState, realtime: bool, now: DateTime<Utc>) -> SyncStatus {
    if !realtime {
        return SyncStatus::Offline;
    }
    if state.syncing {
        return SyncStatus::Syncing;
    }
    let Some(last) = state.last_sync else {
        return SyncStatus::Never;
    };

    let elapsed = now - last;
    if elapsed < Duration::minutes(1) {
        SyncStatus::JustNow
    } else if elapsed < Duration::minutes(5) {
        SyncStatus::Recent
    } else if elapsed < Duration::minutes(30) {
        SyncStatus::Stale
    } else {
        SyncStatus::VeryStale
    }
}

/// Polling source backed by the JSONL snapshot store.
#[derive(Debug)]
pub struct FileSyncSource {
    store: SnapshotStore,
}

impl FileSyncSource {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let store = SnapshotStore::open(data_dir)?;
        info!(data_dir = %data_dir.display(), "file sync source ready");
        Ok(Self { store })
    }
}

impl SyncSource for FileSyncSource {
    fn fetch(&mut self) -> anyhow::Result<Vec<Task>> {
        self.store.load()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{Duration, TimeZone, Utc};

    use super::{SyncLoop, SyncSource, SyncStatus, sync_status};
    use crate::store::TaskState;
    use crate::task::Task;

    struct ScriptedSource {
        responses: Vec<anyhow::Result<Vec<Task>>>,
        calls: usize,
    }

    impl SyncSource for ScriptedSource {
        fn fetch(&mut self) -> anyhow::Result<Vec<Task>> {
            self.calls += 1;
            self.responses.remove(0)
        }
    }

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).unwrap()
    }

    #[test]
    fn tick_respects_the_interval() {
        let now = fixed_now();
        let task = Task::new("a".to_string(), now);
        let mut source = ScriptedSource {
            responses: vec![Ok(vec![task.clone()]), Ok(vec![task])],
            calls: 0,
        };
        let mut state = TaskState::default();
        let mut listener = SyncLoop::new(30);

        assert!(listener.tick(&mut state, &mut source, now));
        assert!(!listener.tick(&mut state, &mut source, now + Duration::seconds(10)));
        assert!(listener.tick(&mut state, &mut source, now + Duration::seconds(30)));
        assert_eq!(source.calls, 2);
    }

    #[test]
    fn disabled_loop_never_fires() {
        let mut source = ScriptedSource {
            responses: vec![Ok(vec![])],
            calls: 0,
        };
        let mut state = TaskState::default();
        let mut listener = SyncLoop::new(1);
        listener.disable();

        assert!(!listener.tick(&mut state, &mut source, fixed_now()));
        assert_eq!(source.calls, 0);
        assert!(state.last_sync.is_none());
    }

    #[test]
    fn fetch_failure_becomes_error_state_not_a_panic() {
        let mut source = ScriptedSource {
            responses: vec![Err(anyhow!("socket closed"))],
            calls: 0,
        };
        let mut state = TaskState::default();
        let mut listener = SyncLoop::new(30);

        assert!(listener.tick(&mut state, &mut source, fixed_now()));
        assert!(state.error.as_deref().is_some_and(|e| e.contains("socket closed")));
        assert!(!state.syncing);
        assert!(state.last_sync.is_none());
    }

    #[test]
    fn status_buckets_elapsed_time() {
        let now = fixed_now();
        let mut state = TaskState::default();

        assert_eq!(sync_status(&state, false, now), SyncStatus::Offline);
        assert_eq!(sync_status(&state, true, now), SyncStatus::Never);

        state.syncing = true;
        assert_eq!(sync_status(&state, true, now), SyncStatus::Syncing);
        state.syncing = false;

        for (elapsed, expected) in [
            (Duration::seconds(20), SyncStatus::JustNow),
            (Duration::minutes(3), SyncStatus::Recent),
            (Duration::minutes(20), SyncStatus::Stale),
            (Duration::minutes(30), SyncStatus::VeryStale),
        ] {
            state.last_sync = Some(now - elapsed);
            assert_eq!(sync_status(&state, true, now), expected);
        }
    }
}
