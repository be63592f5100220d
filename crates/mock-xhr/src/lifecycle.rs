//! Enable, disable and auto-disable.
//!
//! The system is enabled while the enabled marker is present in storage.
//! Enabling also records a timestamp; once that is older than the configured
//! interval the next wrap disables the system again, so a forgotten mock
//! session does not outlive a couple of days.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::storage::KeyValueStore;
use crate::store::MockStore;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock stopped at `now_ms`.
    #[must_use]
    pub const fn new(now_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(now_ms),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    /// Move forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Mark the system enabled as of now.
///
/// # Errors
///
/// Returns an error if the store rejects a write.
pub fn enable<S: KeyValueStore>(store: &mut MockStore<S>, clock: &dyn Clock) -> Result<()> {
    store.set_enabled_markers(clock.now_ms())?;
    tracing::info!("Mock system enabled");
    Ok(())
}

/// Remove the enabled marker and timestamp.
///
/// # Errors
///
/// Returns an error if the store rejects a removal.
pub fn disable<S: KeyValueStore>(store: &mut MockStore<S>) -> Result<()> {
    store.clear_enabled_markers()?;
    tracing::info!("Mock system disabled");
    Ok(())
}

/// Disable the system if it was enabled more than `interval` ago.
///
/// A missing timestamp leaves the system alone; a timestamp that is not a
/// number is logged and reset to now. Returns whether the system was
/// disabled.
///
/// # Errors
///
/// Returns an error if the store rejects a write.
pub fn try_auto_disable<S: KeyValueStore>(
    store: &mut MockStore<S>,
    clock: &dyn Clock,
    interval: Duration,
) -> Result<bool> {
    let Some(raw) = store.enabled_at() else {
        return Ok(false);
    };

    let now = clock.now_ms();
    let Ok(enabled_at) = raw.trim().parse::<u64>() else {
        tracing::error!(value = %raw, "Last enable time is not a number, resetting it");
        store.set_enabled_at(now)?;
        return Ok(false);
    };

    let elapsed = Duration::from_millis(now.saturating_sub(enabled_at));
    if elapsed > interval {
        tracing::info!(elapsed_ms = elapsed.as_millis(), "Auto-disabling mock system");
        disable(store)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{ENABLED_AT_KEY, ENABLED_KEY};
    use crate::storage::MemoryStore;

    const DAY: Duration = Duration::from_secs(60 * 60 * 24);

    #[test]
    fn enable_sets_markers() {
        let clock = ManualClock::new(1_000);
        let mut store = MockStore::new(MemoryStore::new());
        enable(&mut store, &clock).unwrap();

        assert!(store.is_enabled());
        assert_eq!(store.storage().get(ENABLED_KEY).as_deref(), Some("true"));
        assert_eq!(store.storage().get(ENABLED_AT_KEY).as_deref(), Some("1000"));

        disable(&mut store).unwrap();
        assert!(!store.is_enabled());
        assert!(store.enabled_at().is_none());
    }

    #[test]
    fn disables_after_interval() {
        let clock = ManualClock::new(0);
        let mut store = MockStore::new(MemoryStore::new());
        enable(&mut store, &clock).unwrap();

        clock.advance(DAY);
        assert!(!try_auto_disable(&mut store, &clock, 2 * DAY).unwrap());
        assert!(store.is_enabled());

        clock.advance(DAY + Duration::from_millis(1));
        assert!(try_auto_disable(&mut store, &clock, 2 * DAY).unwrap());
        assert!(!store.is_enabled());
    }

    #[test]
    fn garbage_timestamp_is_reset() {
        let clock = ManualClock::new(5_000);
        let mut storage = MemoryStore::new();
        storage.set(ENABLED_KEY, "true").unwrap();
        storage.set(ENABLED_AT_KEY, "yesterday").unwrap();
        let mut store = MockStore::new(storage);

        assert!(!try_auto_disable(&mut store, &clock, DAY).unwrap());
        assert!(store.is_enabled());
        assert_eq!(store.enabled_at().as_deref(), Some("5000"));
    }

    #[test]
    fn missing_timestamp_is_left_alone() {
        let clock = ManualClock::new(u64::MAX);
        let mut storage = MemoryStore::new();
        storage.set(ENABLED_KEY, "true").unwrap();
        let mut store = MockStore::new(storage);

        assert!(!try_auto_disable(&mut store, &clock, DAY).unwrap());
        assert!(store.is_enabled());
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
