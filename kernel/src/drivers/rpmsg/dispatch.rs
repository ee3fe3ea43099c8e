//! Interrupt dispatcher.
//!
//! Receives a single integer from the mailbox ISR, filters control messages,
//! and routes data messages to the registered `VirtQueue` by id. Stateless
//! per message aside from the one-shot sync flag consumed by the startup
//! handshake and the registry of queues/paired core it was built with.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use super::mailbox::Mailbox;
use super::power::CacheControl;
use super::queue::{ProcId, VirtQueue, NUM_QUEUES};

/// Control-message sentinels shared with the host/peer mailbox wire
/// protocol. The high 16 bits are reserved as a namespace boundary between
/// control and data: any value with the high 16 bits set is out-of-band
/// control, everything else under `NUM_QUEUES` is a vq id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlCode {
    /// Informs the slave that the host is up and running.
    Ready = 0xFFFF_FF00,
    /// Informs the receiver that a message is waiting in its own
    /// receive-side vring; currently optional/unused by the dispatch
    /// table below, kept for wire completeness.
    StateChange = 0xFFFF_FF01,
    /// The peer is unhappy; logged, not recovered.
    Crash = 0xFFFF_FF02,
    /// Requests the remote processor reply with `EchoReply`.
    EchoRequest = 0xFFFF_FF03,
    /// Reply to `EchoRequest`; completes the startup handshake.
    EchoReply = 0xFFFF_FF04,
    /// Tells the receiver to crash on demand (triggers a crash dump).
    AbortRequest = 0xFFFF_FF05,
    /// Requests a full cache write-back.
    FlushCache = 0xFFFF_FF06,
    /// Forward to the paired core and enter suspend.
    Hibernation = 0xFFFF_FF07,
}

impl ControlCode {
    fn from_u32(msg: u32) -> Option<Self> {
        match msg {
            0xFFFF_FF00 => Some(Self::Ready),
            0xFFFF_FF01 => Some(Self::StateChange),
            0xFFFF_FF02 => Some(Self::Crash),
            0xFFFF_FF03 => Some(Self::EchoRequest),
            0xFFFF_FF04 => Some(Self::EchoReply),
            0xFFFF_FF05 => Some(Self::AbortRequest),
            0xFFFF_FF06 => Some(Self::FlushCache),
            0xFFFF_FF07 => Some(Self::Hibernation),
            _ => None,
        }
    }
}

/// A registered queue slot, storing the `VirtQueue` this core owns for that
/// id so the dispatcher can invoke its upcall.
struct Slot {
    vq: Option<*const VirtQueue>,
}

// SAFETY: the raw pointer is only ever dereferenced transiently inside
// `dispatch`, which runs with the registry mutex held; the pointed-to
// `VirtQueue` outlives the dispatcher for the life of the process -- queues
// are never destroyed in normal operation.
unsafe impl Send for Slot {}

/// Routes mailbox interrupts to control handling or to a registered
/// `VirtQueue`'s upcall.
pub struct Dispatcher {
    registry: Mutex<[Slot; NUM_QUEUES]>,
    /// The host's processor id, used to address `EchoReply` when this
    /// dispatcher is running on a slave core.
    host_id: ProcId,
    /// Secondary slave core this dispatcher forwards ids >= its own queue
    /// count to, if any (the two-core pairing topology).
    paired_core: Option<ProcId>,
    local_queue_count: usize,
    sync_flag: AtomicBool,
}

impl Dispatcher {
    pub fn new(host_id: ProcId, local_queue_count: usize, paired_core: Option<ProcId>) -> Self {
        Self {
            registry: Mutex::new(core::array::from_fn(|_| Slot { vq: None })),
            host_id,
            paired_core,
            local_queue_count,
            sync_flag: AtomicBool::new(false),
        }
    }

    /// Register a queue so `dispatch` can route its id to its callback.
    ///
    /// # Safety
    /// `vq` must outlive the dispatcher (or be unregistered before it is
    /// dropped); `VirtQueue`s are process-lifetime objects, so in normal
    /// operation this is always satisfied.
    pub unsafe fn register(&self, vq: &VirtQueue) {
        let id = vq.id() as usize;
        assert!(id < NUM_QUEUES, "queue id {id} exceeds registry capacity");
        self.registry.lock()[id].vq = Some(vq as *const VirtQueue);
    }

    /// Whether the one-shot handshake flag has been set by an `EchoReply`.
    pub fn is_synced(&self) -> bool {
        self.sync_flag.load(Ordering::Acquire)
    }

    fn set_synced(&self) {
        self.sync_flag.store(true, Ordering::Release);
    }

    /// Dispatch a single integer received from the mailbox ISR.
    pub fn dispatch(
        &self,
        msg: u32,
        mailbox: &dyn Mailbox,
        cache: &dyn CacheControl,
        is_host: bool,
    ) {
        if let Some(code) = ControlCode::from_u32(msg) {
            match code {
                ControlCode::Ready => {}
                ControlCode::StateChange => {}
                ControlCode::Crash => {
                    crate::println!("[RPMSG] peer reported a crash (RP_MSG_MBOX_CRASH)");
                }
                ControlCode::EchoRequest => {
                    if !is_host {
                        mailbox.int_send(self.host_id, ControlCode::EchoReply as u32);
                    }
                }
                ControlCode::EchoReply => {
                    self.set_synced();
                }
                ControlCode::AbortRequest => {
                    panic!("[RPMSG] ABORT_REQUEST received: crashing on demand");
                }
                ControlCode::FlushCache => {
                    cache.wb_all();
                }
                ControlCode::Hibernation => {
                    if let Some(paired) = self.paired_core {
                        mailbox.int_send(paired, ControlCode::Hibernation as u32);
                    }
                    // Suspend is performed by the caller via `PowerManagement`;
                    // the dispatcher itself has no opinion on sleep states.
                }
            }
            return;
        }

        if msg & 0xFFFF_0000 != 0 {
            // Out-of-band value we don't recognize: ignore.
            return;
        }

        let id = msg as usize;
        if id >= self.local_queue_count {
            if let Some(paired) = self.paired_core {
                mailbox.int_send(paired, msg);
            }
            return;
        }

        if id >= NUM_QUEUES {
            return;
        }

        let slot = self.registry.lock();
        // SAFETY: see `register`'s contract.
        if let Some(vq) = slot[id].vq {
            let vq = unsafe { &*vq };
            vq.fire_callback();
        }
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use crate::drivers::rpmsg::mailbox::LoopbackMailbox;
    use crate::drivers::rpmsg::power::NoopCache;

    /// Records every `int_send` call instead of delivering it anywhere, so
    /// a test can assert on exactly what the dispatcher tried to send.
    struct RecordingMailbox {
        sent: std::sync::Mutex<std::vec::Vec<(ProcId, u32)>>,
    }

    impl RecordingMailbox {
        fn new() -> Self {
            Self {
                sent: std::sync::Mutex::new(std::vec::Vec::new()),
            }
        }
    }

    impl Mailbox for RecordingMailbox {
        fn int_register(&self, _handler: fn(u32)) {}

        fn int_send(&self, peer: ProcId, payload: u32) {
            self.sent.lock().unwrap().push((peer, payload));
        }
    }

    #[test]
    fn echo_request_triggers_echo_reply_back_to_host() {
        let host_id = ProcId(1);
        let dispatcher = Dispatcher::new(host_id, 2, None);
        let mailbox = RecordingMailbox::new();
        let cache = NoopCache;

        dispatcher.dispatch(ControlCode::EchoRequest as u32, &mailbox, &cache, false);

        assert_eq!(
            *mailbox.sent.lock().unwrap(),
            std::vec![(host_id, ControlCode::EchoReply as u32)]
        );
        // A slave only replies; it never sets its own sync flag on a request.
        assert!(!dispatcher.is_synced());
    }

    #[test]
    fn echo_reply_sets_the_sync_flag() {
        let dispatcher = Dispatcher::new(ProcId(1), 2, None);
        let mailbox = LoopbackMailbox::new(ProcId(0));
        let cache = NoopCache;
        dispatcher.dispatch(ControlCode::EchoReply as u32, &mailbox, &cache, true);
        assert!(dispatcher.is_synced());
    }

    #[test]
    fn crash_code_does_not_touch_registry_or_sync_flag() {
        let dispatcher = Dispatcher::new(ProcId(1), 2, None);
        let mailbox = LoopbackMailbox::new(ProcId(0));
        let cache = NoopCache;
        dispatcher.dispatch(ControlCode::Crash as u32, &mailbox, &cache, false);
        assert!(!dispatcher.is_synced());
    }

    #[test]
    fn out_of_range_data_id_with_no_paired_core_is_ignored() {
        let dispatcher = Dispatcher::new(ProcId(1), 2, None);
        let mailbox = LoopbackMailbox::new(ProcId(0));
        let cache = NoopCache;
        // id 3 is >= local_queue_count (2) and there is no paired core, so
        // this must be silently dropped rather than panicking.
        dispatcher.dispatch(3, &mailbox, &cache, false);
    }

    #[test]
    fn data_id_for_secondary_core_is_forwarded() {
        let secondary = ProcId(2);
        let dispatcher = Dispatcher::new(ProcId(1), 2, Some(secondary));
        let mailbox = LoopbackMailbox::new(ProcId(0));
        static FORWARDED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);
        mailbox.connect(secondary, |_msg| {
            FORWARDED.store(true, core::sync::atomic::Ordering::Relaxed);
        });
        let cache = NoopCache;
        dispatcher.dispatch(2, &mailbox, &cache, false);
        assert!(FORWARDED.load(core::sync::atomic::Ordering::Relaxed));
    }
}
