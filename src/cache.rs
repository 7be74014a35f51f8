use crate::clock::Clock;
use crate::error::{DashboardError, Result};
use crate::schema::DashboardSnapshot;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: Arc<DashboardSnapshot>,
    expires_at: DateTime<Utc>,
}

impl CachedSnapshot {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Per-user dashboard snapshots with a time-to-live. Expired entries are
/// evicted lazily on lookup, or in bulk by `purge_expired`.
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, CachedSnapshot>>,
    clock: Arc<dyn Clock>,
}

impl SnapshotCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// The live snapshot for `user_id`, or `None` when absent or expired.
    pub fn get(&self, user_id: &str) -> Result<Option<Arc<DashboardSnapshot>>> {
        require_user_id(user_id)?;
        let now = self.clock.now();

        {
            let entries = self.read();
            match entries.get(user_id) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some(Arc::clone(&entry.snapshot)));
                }
                Some(_) => {}
            }
        }

        // A concurrent put may have refreshed the entry since the read lock
        // was released.
        let mut entries = self.write();
        let live = entries
            .get(user_id)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| Arc::clone(&entry.snapshot));

        if live.is_none() && entries.remove(user_id).is_some() {
            debug!("Evicted expired dashboard snapshot for user {}", user_id);
        }
        Ok(live)
    }

    /// Stores `snapshot` for `user_id`, replacing any previous entry. A ttl
    /// that is not positive or pushes the expiry past the representable range
    /// is rejected, and the cache is left untouched.
    pub fn put(&self, user_id: &str, snapshot: DashboardSnapshot, ttl: Duration) -> Result<()> {
        require_user_id(user_id)?;
        if ttl <= Duration::zero() {
            return Err(DashboardError::InvalidTtl(ttl.num_milliseconds()));
        }

        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(DashboardError::InvalidTtl(ttl.num_milliseconds()))?;
        self.write().insert(
            user_id.to_string(),
            CachedSnapshot {
                snapshot: Arc::new(snapshot),
                expires_at,
            },
        );
        debug!(
            "Cached dashboard snapshot for user {} until {}",
            user_id, expires_at
        );
        Ok(())
    }

    /// Removes the entry for `user_id`. Deleting a missing entry is not an error.
    pub fn delete(&self, user_id: &str) -> Result<()> {
        require_user_id(user_id)?;
        if self.write().remove(user_id).is_some() {
            debug!("Invalidated dashboard snapshot for user {}", user_id);
        }
        Ok(())
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired dashboard snapshots", purged);
        }
        purged
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CachedSnapshot>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CachedSnapshot>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn require_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(DashboardError::InvalidInput(
            "user id must not be empty".to_string(),
        ));
    }
    Ok(())
}
