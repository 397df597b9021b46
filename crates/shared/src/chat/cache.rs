use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::snapshot::{Snapshot, SnapshotBuilder, SnapshotError};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Single-slot, time-boxed cache in front of [`SnapshotBuilder`].
///
/// The slot lock is only taken to read or swap the `Arc`; rebuilds run unlocked,
/// so concurrent misses may each rebuild and the last writer wins.
pub struct SnapshotCache {
    builder: SnapshotBuilder,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotCache {
    pub fn new(builder: SnapshotBuilder, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            builder,
            ttl,
            clock,
            slot: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<Snapshot>, SnapshotError> {
        let now = self.clock.now();
        if let Some(snapshot) = self.current()
            && self.is_fresh(&snapshot, now)
        {
            return Ok(snapshot);
        }

        let rebuilt = Arc::new(self.builder.build(now).await?);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&rebuilt));
        debug!(built_at = %rebuilt.built_at, "portfolio snapshot cache refreshed");

        Ok(rebuilt)
    }

    /// Drops the cached snapshot so the next `get` rebuilds.
    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn is_fresh(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> bool {
        match (now - snapshot.built_at).to_std() {
            Ok(age) => age < self.ttl,
            // Built "in the future" relative to the clock; treat as fresh.
            Err(_) => true,
        }
    }
}
