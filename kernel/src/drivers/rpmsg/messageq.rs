//! Upward MessageQ interface.
//!
//! The real local message-queue facility this transport delivers into is an
//! external collaborator (memory allocation for descriptor metadata and the
//! local enqueue target are both out of scope as their own subsystems) --
//! this module defines the interface shape and ships one concrete, minimal
//! implementation (`LocalMessageQueue`) so the transport is testable
//! end-to-end without the rest of `ipc::*` wired in.

#[cfg(feature = "alloc")]
extern crate alloc;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use spin::Mutex;

/// An allocated message: an opaque destination-queue-tagged byte buffer.
///
/// `dst_queue` is read back out by `get_dst_queue` after the transport has
/// copied payload bytes in, mirroring the original facility where the
/// destination queue id lives inside the message body itself rather than
/// being a separate out-of-band parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub dst_queue: u32,
    bytes: Vec<u8>,
}

impl Msg {
    fn new(dst_queue: u32, size: usize) -> Self {
        Self {
            dst_queue,
            bytes: alloc::vec![0u8; size],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Priority argument accepted by `register_transport`/`unregister_transport`;
/// the minimal implementation below ignores it, since a single transport per
/// peer is the only topology this port exercises.
pub type Priority = u32;

/// The seven operations the upward interface needs, plus `set_msg_trace` (a
/// no-op hook; message tracing itself is out of scope, but the interface
/// shape is not).
pub trait MessageQueue: Send + Sync {
    fn put(&self, queue_id: u32, msg: Msg) -> bool;
    fn alloc(&self, heap_id: u32, size: usize) -> Option<Msg>;
    fn free(&self, msg: Msg);
    fn register_transport(&self, peer_id: u16, priority: Priority) -> bool;
    fn unregister_transport(&self, peer_id: u16, priority: Priority);
    fn get_msg_size(&self, msg: &Msg) -> usize;
    fn get_dst_queue(&self, msg: &Msg) -> u32;
    fn set_msg_trace(&self, _msg: &mut Msg, _enabled: bool) {}
}

/// Minimal, in-process `MessageQueue`: one `VecDeque<Msg>` per queue id,
/// guarded by a single `spin::Mutex`, grounded in `ipc::registry`'s
/// `BTreeMap` + `Mutex` pattern for keyed process-wide state.
///
/// There is exactly one heap (`heap_id` is accepted but not consulted) --
/// only a single fixed-size buffer pool sits upstream of this layer, not
/// multiple heaps with distinct allocation policies.
pub struct LocalMessageQueue {
    queues: Mutex<BTreeMap<u32, VecDeque<Msg>>>,
    registered_transports: Mutex<BTreeMap<u16, Priority>>,
}

impl LocalMessageQueue {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(BTreeMap::new()),
            registered_transports: Mutex::new(BTreeMap::new()),
        }
    }

    /// Pop the next message delivered to `queue_id`, if any -- the
    /// consuming side of `put`, used by tests and by whatever task-level
    /// code eventually drains the local queue.
    pub fn take(&self, queue_id: u32) -> Option<Msg> {
        self.queues.lock().get_mut(&queue_id)?.pop_front()
    }

    pub fn len(&self, queue_id: u32) -> usize {
        self.queues
            .lock()
            .get(&queue_id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

impl Default for LocalMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue for LocalMessageQueue {
    fn put(&self, queue_id: u32, msg: Msg) -> bool {
        self.queues.lock().entry(queue_id).or_default().push_back(msg);
        true
    }

    fn alloc(&self, _heap_id: u32, size: usize) -> Option<Msg> {
        Some(Msg::new(0, size))
    }

    fn free(&self, _msg: Msg) {}

    fn register_transport(&self, peer_id: u16, priority: Priority) -> bool {
        self.registered_transports.lock().insert(peer_id, priority);
        true
    }

    fn unregister_transport(&self, peer_id: u16, _priority: Priority) {
        self.registered_transports.lock().remove(&peer_id);
    }

    fn get_msg_size(&self, msg: &Msg) -> usize {
        msg.bytes.len()
    }

    fn get_dst_queue(&self, msg: &Msg) -> u32 {
        msg.dst_queue
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn put_then_take_round_trips_one_message() {
        let mq = LocalMessageQueue::new();
        let mut msg = mq.alloc(0, 4).unwrap();
        msg.dst_queue = 7;
        msg.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);

        assert!(mq.put(7, msg));
        let got = mq.take(7).expect("message should be queued");
        assert_eq!(got.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(mq.get_dst_queue(&got), 7);
    }

    #[test]
    fn take_on_empty_queue_returns_none() {
        let mq = LocalMessageQueue::new();
        assert!(mq.take(3).is_none());
    }

    #[test]
    fn register_then_unregister_transport_round_trips() {
        let mq = LocalMessageQueue::new();
        assert!(mq.register_transport(5, 1));
        mq.unregister_transport(5, 1);
        assert!(mq.registered_transports.lock().get(&5).is_none());
    }

    #[test]
    fn get_msg_size_reflects_allocation_size() {
        let mq = LocalMessageQueue::new();
        let msg = mq.alloc(0, 64).unwrap();
        assert_eq!(mq.get_msg_size(&msg), 64);
    }
}
