//! Mailbox / inter-core interrupt collaborator.
//!
//! The real mailbox driver (send an integer, receive an integer in an ISR)
//! is an external collaborator -- this module only defines the interface
//! the rest of the transport calls through, mirroring the small,
//! object-safe trait shape `services::driver_framework::Driver` uses for
//! other hardware collaborators.

use super::queue::ProcId;

/// What the rest of this module needs from a mailbox driver.
pub trait Mailbox: Send + Sync {
    /// Register the function the ISR invokes with the single integer
    /// payload it received.
    fn int_register(&self, handler: fn(u32));

    /// Send a single integer payload to `peer`, triggering its mailbox ISR.
    fn int_send(&self, peer: ProcId, payload: u32);
}

#[cfg(all(test, not(target_os = "none")))]
pub use loopback::LoopbackMailbox;

#[cfg(all(test, not(target_os = "none")))]
mod loopback {
    use std::{sync::Mutex, vec::Vec};

    use super::{Mailbox, ProcId};

    /// A mailbox that delivers `int_send` synchronously to a registered
    /// handler, for wiring two in-process cores together in tests. Not
    /// compiled into the kernel binary -- production builds supply a real
    /// SoC mailbox driver implementing [`Mailbox`].
    pub struct LoopbackMailbox {
        self_id: ProcId,
        peers: Mutex<Vec<(ProcId, fn(u32))>>,
    }

    impl LoopbackMailbox {
        pub fn new(self_id: ProcId) -> Self {
            Self {
                self_id,
                peers: Mutex::new(Vec::new()),
            }
        }

        /// Wire `peer`'s handler so `int_send(peer, ..)` reaches it directly.
        pub fn connect(&self, peer: ProcId, handler: fn(u32)) {
            self.peers.lock().unwrap().push((peer, handler));
        }
    }

    impl Mailbox for LoopbackMailbox {
        fn int_register(&self, _handler: fn(u32)) {
            // Handlers are wired explicitly via `connect` in tests instead,
            // since a real ISR registration has no return path to confirm
            // which peer is asking.
        }

        fn int_send(&self, peer: ProcId, payload: u32) {
            let peers = self.peers.lock().unwrap();
            for (id, handler) in peers.iter() {
                if *id == peer {
                    handler(payload);
                }
            }
        }
    }

    /// Which processor this loopback mailbox instance represents.
    impl LoopbackMailbox {
        pub fn self_id(&self) -> ProcId {
            self.self_id
        }
    }
}
