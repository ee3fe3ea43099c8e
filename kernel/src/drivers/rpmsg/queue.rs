//! The `VirtQueue` object: one end of one ring.
//!
//! Unlike `drivers::virtio::queue::VirtQueue` (which always plays the
//! single "driver" role against a real virtio device and owns/frees its own
//! DMA memory), this `VirtQueue` is role-agnostic: the same type serves as
//! either the host or the slave end of a ring, against memory it does not
//! own (the ring lives in a shared carveout placed by the resource table
//! and is never freed during normal operation).
//!
//! Role asymmetry is a tagged variant on the object (`Role`), not a
//! compile-time `#[cfg]` selection, because both roles coexist in one image
//! at different peer pairings (one core can be host to one peer and slave to
//! another).

use core::ptr;

use crate::arch::barriers::memory_fence;

use super::addr::AddrTranslator;
use super::vring::{
    layout, RingLayout, VringAvailHeader, VringDesc, VringUsedElem, VringUsedHeader,
    VRING_AVAIL_F_NO_INTERRUPT, VRING_USED_F_NO_NOTIFY,
};

/// Processor identifier, resolved from a symbolic name by a `ProcResolver`.
/// Opaque beyond equality -- callers never need to do arithmetic on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcId(pub u16);

/// Which side of a ring this `VirtQueue` represents.
///
/// The host always writes the available ring and reads the used ring; the
/// slave always writes the used ring and reads the available ring. The host
/// allocates and primes buffers; the slave only ever reuses slots the host
/// handed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Slave,
}

/// Failure to add a buffer because the ring has no free descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full;

/// Fixed size of every ring buffer, in bytes. One message per buffer; no
/// fragmentation or reassembly.
pub const BUF_SIZE: usize = 512;

/// Upcall invoked by the interrupt dispatcher when this queue's id is
/// signaled. Takes the queue's numeric id and its opaque argument rather
/// than a back-reference to the `VirtQueue` itself, breaking the cyclic
/// ownership between queue and transport (the transport looks itself up by
/// `arg` instead of the queue holding a pointer back into the transport).
pub type VirtQueueCallback = fn(id: u8, arg: usize);

/// One end of one ring: local-only bookkeeping plus pointers into the
/// shared ring region.
pub struct VirtQueue {
    id: u8,
    peer_id: ProcId,
    role: Role,
    n: u16,
    translator: AddrTranslator,

    desc: *mut VringDesc,
    avail: *mut VringAvailHeader,
    avail_ring: *mut u16,
    used: *mut VringUsedHeader,
    used_ring: *mut VringUsedElem,

    last_avail_idx: u16,
    last_used_idx: u16,
    num_free: u16,

    callback: Option<VirtQueueCallback>,
    arg: usize,
}

// SAFETY: `VirtQueue` holds raw pointers into a shared memory region rather
// than heap-allocated private memory, but all mutation is serialized by the
// caller through `gate::Gate` (see `transport.rs`); the type itself performs
// no implicit synchronization.
unsafe impl Send for VirtQueue {}

impl VirtQueue {
    /// Construct a `VirtQueue` for ring `id`, rooted at `base` (a local
    /// virtual address), sized `n` entries, notifying `peer_id` on kick.
    ///
    /// Does not touch memory: callers (the host side of `startup`) are
    /// responsible for zeroing the ring before either side uses it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u8,
        peer_id: ProcId,
        role: Role,
        base: u64,
        n: u16,
        align: u64,
        page_size: u64,
        translator: AddrTranslator,
        callback: Option<VirtQueueCallback>,
        arg: usize,
    ) -> Self {
        let RingLayout { desc, avail, used, .. } = layout(base, n, align, page_size);

        let desc = desc as *mut VringDesc;
        let avail_hdr = avail as *mut VringAvailHeader;
        // The avail ring follows immediately after the 4-byte avail header.
        let avail_ring = (avail + core::mem::size_of::<VringAvailHeader>() as u64) as *mut u16;
        let used_hdr = used as *mut VringUsedHeader;
        let used_ring = (used + core::mem::size_of::<VringUsedHeader>() as u64) as *mut VringUsedElem;

        Self {
            id,
            peer_id,
            role,
            n,
            translator,
            desc,
            avail: avail_hdr,
            avail_ring,
            used: used_hdr,
            used_ring,
            last_avail_idx: 0,
            last_used_idx: 0,
            num_free: n,
            callback,
            arg,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn peer_id(&self) -> ProcId {
        self.peer_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn num_free(&self) -> u16 {
        self.num_free
    }

    /// Invoke the registered callback, if any -- called by the interrupt
    /// dispatcher, never touches ring state itself.
    pub fn fire_callback(&self) {
        if let Some(cb) = self.callback {
            cb(self.id, self.arg);
        }
    }

    fn slot(idx: u16) -> usize {
        idx as usize
    }

    /// Producer-of-available side: publish a buffer for the consumer.
    ///
    /// Host calls this on its own ring to prime/recycle receive buffers, and
    /// on the slave-direction ring (under `get_used`) to send.
    pub fn add_avail(&mut self, buf_va: u64) -> Result<u16, Full> {
        if self.num_free == 0 {
            return Err(Full);
        }

        // SAFETY: `avail` and `desc` point into the shared ring region for
        // the lifetime of this `VirtQueue`; the caller serializes access via
        // `gate::Gate`.
        unsafe {
            let idx = (*self.avail).idx;
            let slot = (idx as usize) % self.n as usize;
            let d = &mut *self.desc.add(slot);
            d.addr = self.translator.to_pa(buf_va);
            d.len = BUF_SIZE as u32;
            d.flags = 0;
            d.next = 0;

            // The descriptor we just filled is always at `slot`, so the
            // avail ring entry at this same slot carries that index -- this
            // side is always both producer of the descriptor and producer
            // of the avail-ring entry naming it, never a reader of a ring
            // populated by something else.
            ptr::write(self.avail_ring.add(slot), slot as u16);

            memory_fence();

            (*self.avail).idx = idx.wrapping_add(1);
        }

        self.num_free -= 1;
        Ok(self.num_free)
    }

    /// Consumer-of-available side: take the next published buffer.
    ///
    /// Returns the descriptor index (an opaque token to hand back via
    /// `add_used`) and the translated buffer pointer.
    pub fn get_avail(&mut self) -> Option<(u16, u64)> {
        // SAFETY: see `add_avail`.
        unsafe {
            let mut idx = (*self.avail).idx;
            if self.last_avail_idx == idx {
                if matches!(self.role, Role::Host) {
                    (*self.used).flags &= !VRING_USED_F_NO_NOTIFY;
                    idx = (*self.avail).idx;
                    if self.last_avail_idx == idx {
                        return None;
                    }
                } else {
                    return None;
                }
            }

            if matches!(self.role, Role::Host) {
                (*self.used).flags |= VRING_USED_F_NO_NOTIFY;
            }

            let slot = Self::slot(self.last_avail_idx) % self.n as usize;
            let head = ptr::read(self.avail_ring.add(slot));
            self.last_avail_idx = self.last_avail_idx.wrapping_add(1);

            assert!(
                (head as usize) < self.n as usize,
                "descriptor index {head} out of range for queue of size {}",
                self.n
            );
            let pa = (*self.desc.add(head as usize)).addr;
            Some((head, self.translator.to_va(pa)))
        }
    }

    /// Consumer side: return a descriptor it has finished with.
    pub fn add_used(&mut self, head: u16) {
        assert!(
            (head as usize) < self.n as usize,
            "descriptor index {head} out of range for queue of size {}",
            self.n
        );

        // SAFETY: see `add_avail`; `head` is bounds-checked above.
        unsafe {
            let idx = (*self.used).idx;
            let slot = (idx as usize) % self.n as usize;
            let elem = &mut *self.used_ring.add(slot);
            elem.id = head as u32;
            elem.len = BUF_SIZE as u32;

            memory_fence();

            (*self.used).idx = idx.wrapping_add(1);
        }
    }

    /// Producer side: reclaim a descriptor the consumer has returned.
    pub fn get_used(&mut self) -> Option<u64> {
        // SAFETY: see `add_avail`.
        unsafe {
            let idx = (*self.used).idx;
            if self.last_used_idx == idx {
                return None;
            }

            let slot = (self.last_used_idx as usize) % self.n as usize;
            let elem = ptr::read(self.used_ring.add(slot));
            self.last_used_idx = self.last_used_idx.wrapping_add(1);
            self.num_free += 1;

            assert!(
                (elem.id as usize) < self.n as usize,
                "descriptor index {} out of range for queue of size {}",
                elem.id,
                self.n
            );
            let pa = (*self.desc.add(elem.id as usize)).addr;
            Some(self.translator.to_va(pa))
        }
    }

    /// Notify the peer that indices advanced, unless it has asked not to be
    /// interrupted.
    pub fn kick(&self, mailbox: &dyn super::mailbox::Mailbox) {
        // SAFETY: see `add_avail`.
        let suppressed = unsafe { (*self.avail).flags & VRING_AVAIL_F_NO_INTERRUPT != 0 };
        if suppressed {
            return;
        }
        mailbox.int_send(self.peer_id, self.id as u32);
    }
}

/// Total number of registry slots for vq ids, matching the reference
/// firmware's `#define NUM_QUEUES 5` -- four ids are assigned by the default
/// two-core topology, with one slot of headroom the dispatch rule in
/// `dispatch.rs` (`value < NUM_QUEUES`) relies on.
pub const NUM_QUEUES: usize = 5;

/// The reference firmware's static id assignment for a host paired with two
/// slave cores ("sysm3"/"CORE0" and "appm3"/"CORE1"): sysm3<->host uses ids
/// 0/1, appm3<->host uses ids 2/3.
pub mod standard_ids {
    pub const SYSM3_TO_HOST: u8 = 0;
    pub const HOST_TO_SYSM3: u8 = 1;
    pub const APPM3_TO_HOST: u8 = 2;
    pub const HOST_TO_APPM3: u8 = 3;
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    struct RingMem {
        ptr: *mut u8,
        layout: Layout,
    }

    impl RingMem {
        fn new(size: usize) -> Self {
            let layout = Layout::from_size_align(size, 4096).unwrap();
            // SAFETY: size is nonzero and comes from a debug-asserted power
            // of two ring layout computation.
            let ptr = unsafe { alloc_zeroed(layout) };
            assert!(!ptr.is_null());
            Self { ptr, layout }
        }

        fn base(&self) -> u64 {
            self.ptr as u64
        }
    }

    impl Drop for RingMem {
        fn drop(&mut self) {
            // SAFETY: `ptr`/`layout` are the exact pair returned by `new`.
            unsafe { dealloc(self.ptr, self.layout) };
        }
    }

    // Identity translator for host-only unit tests below: va == pa.
    const IDENTITY: AddrTranslator = AddrTranslator::new(u64::MAX, 0, 0);

    fn make_pair(n: u16) -> (VirtQueue, VirtQueue, RingMem) {
        let mem = RingMem::new(super::layout(0, n, 4096, 4096).total_size as usize);
        let host = VirtQueue::new(
            0,
            ProcId(1),
            Role::Host,
            mem.base(),
            n,
            4096,
            4096,
            IDENTITY,
            None,
            0,
        );
        let slave = VirtQueue::new(
            0,
            ProcId(0),
            Role::Slave,
            mem.base(),
            n,
            4096,
            4096,
            IDENTITY,
            None,
            0,
        );
        (host, slave, mem)
    }

    #[test]
    fn add_avail_then_get_avail_round_trips_one_buffer() {
        let (mut host, mut slave, mem) = make_pair(4);
        let buf_va = mem.base() + 4096 * 3;

        assert_eq!(host.add_avail(buf_va), Ok(3));
        let (head, got_va) = slave.get_avail().expect("buffer should be available");
        assert_eq!(got_va, buf_va);

        slave.add_used(head);
        let reclaimed = host.get_used().expect("buffer should be used");
        assert_eq!(reclaimed, buf_va);
    }

    #[test]
    fn add_avail_fails_when_ring_is_full() {
        let (mut host, _slave, mem) = make_pair(2);
        assert!(host.add_avail(mem.base()).is_ok());
        assert!(host.add_avail(mem.base() + 4096).is_ok());
        assert_eq!(host.add_avail(mem.base()), Err(Full));
    }

    #[test]
    fn get_avail_is_empty_with_nothing_published() {
        let (_host, mut slave, _mem) = make_pair(4);
        assert!(slave.get_avail().is_none());
    }

    #[test]
    fn get_used_is_empty_with_nothing_returned() {
        let (mut host, _slave, _mem) = make_pair(4);
        assert!(host.get_used().is_none());
    }

    #[test]
    fn indices_wrap_correctly_at_u16_boundary() {
        let (mut host, mut slave, mem) = make_pair(2);

        // Drive both idx counters up to the wrap point.
        for _ in 0..(u32::from(u16::MAX) + 1) {
            let buf_va = mem.base();
            host.add_avail(buf_va).unwrap();
            let (head, _) = slave.get_avail().unwrap();
            slave.add_used(head);
            host.get_used().unwrap();
        }

        // One more cycle after the wrap must behave identically.
        let buf_va = mem.base() + 4096;
        host.add_avail(buf_va).unwrap();
        let (head, got_va) = slave.get_avail().unwrap();
        assert_eq!(got_va, buf_va);
        slave.add_used(head);
        assert_eq!(host.get_used().unwrap(), buf_va);
    }

    #[test]
    #[should_panic]
    fn add_used_rejects_out_of_range_head() {
        let (_host, mut slave, _mem) = make_pair(4);
        slave.add_used(4);
    }
}
