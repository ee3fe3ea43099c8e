//! Mutual-exclusion gate and deferred-work primitive.
//!
//! Both are required by the VirtQueue and transport components: the gate
//! serializes vring index updates against concurrent deferred work and
//! ISR-initiated callbacks, and the deferred-work handle is what the ISR
//! posts to instead of draining the ring itself.
//!
//! The scheduler that would actually run deferred work is an out-of-scope
//! collaborator, so both live here as small, self-contained types rather
//! than new additions to `sched::`.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

/// A non-preemptive critical section against same/lower-priority deferred
/// work, serializing reads/advances of `avail.idx`/`used.idx` and the
/// ring-slot writes that precede them.
///
/// Grounded in `arch::x86_64::disable_interrupts()`'s guard-returning idiom:
/// `enter()` acquires and returns an RAII guard that releases on drop, so
/// call sites can't forget to leave the gate on an early return. `leave()`
/// is also exposed as an explicit alias for call sites that mirror the
/// original firmware's paired `GateSwi_enter`/`GateSwi_leave` calls.
pub struct Gate {
    lock: Mutex<()>,
}

/// RAII guard for a held `Gate`; leaves the gate when dropped.
pub struct GateGuard<'a> {
    _inner: spin::MutexGuard<'a, ()>,
}

impl Gate {
    pub const fn new() -> Self {
        Self { lock: Mutex::new(()) }
    }

    /// Enter the critical section; the gate is left when the returned guard
    /// is dropped.
    pub fn enter(&self) -> GateGuard<'_> {
        GateGuard {
            _inner: self.lock.lock(),
        }
    }
}

impl<'a> GateGuard<'a> {
    /// Leave the gate explicitly, before the guard would otherwise drop.
    pub fn leave(self) {
        drop(self);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Deferred work posted from ISR context and run later at task level.
///
/// Models the BIOS `Swi` (software interrupt) the reference firmware posts
/// from `callback_usedBufReady`/`callback_availBufReady`: the ISR only sets
/// `pending` and never touches vring state, and a later poll at task level
/// (the kernel's deferred-work drain point) calls `run_pending`, which
/// invokes the receive-drain handler.
pub struct DeferredWork {
    pending: AtomicBool,
    handler: fn(usize),
    arg: usize,
}

impl DeferredWork {
    pub const fn new(handler: fn(usize), arg: usize) -> Self {
        Self {
            pending: AtomicBool::new(false),
            handler,
            arg,
        }
    }

    /// Mark this work as runnable. Safe to call from ISR context: it never
    /// blocks and never touches the handler's state directly.
    pub fn post(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// If work is pending, clear the flag and run the handler. Returns
    /// whether the handler ran.
    pub fn run_pending(&self) -> bool {
        if self
            .pending
            .swap(false, Ordering::AcqRel)
        {
            (self.handler)(self.arg);
            true
        } else {
            false
        }
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    static RAN: AtomicUsize = AtomicUsize::new(0);

    fn bump(_arg: usize) {
        RAN.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn run_pending_only_fires_after_post() {
        RAN.store(0, Ordering::Relaxed);
        let work = DeferredWork::new(bump, 0);
        assert!(!work.run_pending());
        assert_eq!(RAN.load(Ordering::Relaxed), 0);

        work.post();
        assert!(work.run_pending());
        assert_eq!(RAN.load(Ordering::Relaxed), 1);

        // Pending flag was consumed; a second poll without another post is
        // a no-op.
        assert!(!work.run_pending());
        assert_eq!(RAN.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn gate_serializes_access() {
        let gate = Gate::new();
        let counter = Mutex::new(0);
        {
            let _g = gate.enter();
            *counter.lock() += 1;
        }
        assert_eq!(*counter.lock(), 1);
    }
}
