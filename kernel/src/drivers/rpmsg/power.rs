//! Power-management and cache-control collaborators.
//!
//! Both the cache write-back call and the power-management suspend/init
//! hooks are external collaborators; this module defines the interfaces the
//! dispatcher and startup sequence call through, plus no-op test doubles.

/// Power-management collaborator: `init()`/`suspend()`.
pub trait PowerManagement: Send + Sync {
    fn init(&self);
    fn suspend(&self);
}

/// Cache-control collaborator: `wb_all()`.
pub trait CacheControl: Send + Sync {
    fn wb_all(&self);
}

/// No-op power manager, for tests and for targets where IPC power
/// collaboration isn't wired up yet.
pub struct NoopPower;

impl PowerManagement for NoopPower {
    fn init(&self) {}
    fn suspend(&self) {}
}

/// No-op cache controller, for tests.
pub struct NoopCache;

impl CacheControl for NoopCache {
    fn wb_all(&self) {}
}

/// Period (in ticks) the reference firmware intends between cache
/// write-backs of its trace buffer.
pub const CACHE_WB_TICK_PERIOD: u64 = 5;

/// Running state for the periodic cache write-back helper below.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheWbState {
    old_ticks: u64,
}

/// Reproduces `VirtQueue_cacheWb` from the reference firmware verbatim,
/// inverted comparison and all.
///
/// The original:
/// ```c
/// if (Clock_getTicks() >= (oldticks + CACHE_WB_TICK_PERIOD)) {
///     return;
/// }
/// Cache_wbAll();
/// ```
/// returns *without* flushing exactly when a flush is due, and flushes on
/// every other tick; `oldticks` is also never updated by the original, so
/// the comparison's outcome never changes after the first call. Reproduced
/// as-is rather than fixed, to match host-side behavior exactly: returns
/// `true` when it flushed, `false` when it skipped.
pub fn cache_wb_periodic(now_ticks: u64, state: &mut CacheWbState, cache: &dyn CacheControl) -> bool {
    if now_ticks >= state.old_ticks + CACHE_WB_TICK_PERIOD {
        return false;
    }
    cache.wb_all();
    true
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCache(AtomicUsize);
    impl CacheControl for CountingCache {
        fn wb_all(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn skips_flush_once_the_period_has_elapsed() {
        let cache = CountingCache(AtomicUsize::new(0));
        let mut state = CacheWbState::default();
        assert!(!cache_wb_periodic(CACHE_WB_TICK_PERIOD, &mut state, &cache));
        assert_eq!(cache.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn flushes_before_the_period_has_elapsed() {
        let cache = CountingCache(AtomicUsize::new(0));
        let mut state = CacheWbState::default();
        assert!(cache_wb_periodic(0, &mut state, &cache));
        assert_eq!(cache.0.load(Ordering::Relaxed), 1);
    }
}
