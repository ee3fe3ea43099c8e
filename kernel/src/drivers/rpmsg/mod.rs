//! Asymmetric inter-processor RPMsg/VirtQueue message-passing transport.
//!
//! This driver family gives a control processor (the "host" role) and one
//! or more auxiliary cores (the "slave" role) a shared-memory datagram
//! transport: a pair of virtio-compatible split virtqueues per peer, framed
//! RPMsg headers, and a minimal MessageQ-style upward interface. It is
//! protocol-compatible with but independently implemented from
//! `drivers::virtio::queue::VirtQueue` (see that module's header for why a
//! second queue implementation is warranted here).
//!
//! ```text
//!   rsc_table (H)         -- static descriptor the host loader reads
//!   addr (A) + vring (B)  -- wire layout primitives
//!   queue (C)             -- VirtQueue, one end of one ring
//!   gate                  -- mutual exclusion + deferred work
//!   mailbox, power        -- downward collaborator interfaces (injected)
//!   dispatch (D)          -- control-code routing, sync handshake state
//!   startup (E)           -- bring-up sequencing
//!   messageq              -- upward collaborator interface (injected)
//!   transport (F)         -- framing, send/drain over a VirtQueue pair
//!   nameservice (G)       -- one-shot endpoint announcement
//! ```
//!
//! Everything below `transport`/`dispatch` is injected as a `dyn` trait
//! (`Mailbox`, `PowerManagement`, `CacheControl`, `MessageQueue`,
//! `ProcResolver`) rather than owned concretely by this module: the real
//! mailbox ISR wiring, cache maintenance ops, and microkernel IPC facility
//! are board/kernel-integration concerns outside this driver's boundary.
//! Board bring-up code constructs the concrete collaborators and calls
//! [`startup::startup`] directly; there is no generic `init()` that can run
//! without them (unlike e.g. `drivers::virtio::blk::init()`, which owns its
//! PCI bus scan end-to-end).

pub mod addr;
pub mod dispatch;
pub mod gate;
pub mod mailbox;
pub mod messageq;
pub mod nameservice;
pub mod power;
pub mod queue;
pub mod rsc_table;
pub mod startup;
pub mod transport;
pub mod vring;

pub use dispatch::{ControlCode, Dispatcher};
pub use mailbox::Mailbox;
pub use messageq::{LocalMessageQueue, MessageQueue, Msg};
pub use power::{CacheControl, PowerManagement};
pub use queue::{ProcId, Role, VirtQueue, BUF_SIZE, NUM_QUEUES};
pub use startup::{startup, ProcResolver};
pub use transport::{BufferPool, Transport};

use core::fmt;

/// Result alias for fallible operations across this module tree that don't
/// already have a narrower, more specific return type (`Result<u16, Full>`
/// on `VirtQueue`, `bool` on `Transport::send`/`nameservice::announce`).
/// Mirrors `kernel::ipc::error::{IpcError, Result}`'s shape; this module
/// stays self-contained rather than folding into `crate::error::KernelError`,
/// the same way `drivers::virtio`'s modules return their own `Result`
/// instead of funneling into it.
pub type Result<T> = core::result::Result<T, RpmsgError>;

/// Failure modes that cross a module boundary inside this driver family
/// rather than staying local to one ring (those use `queue::Full` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum RpmsgError {
    /// `ProcResolver::get_proc_id` had no entry for the requested peer name.
    UnknownPeer,
    /// A send/announce payload exceeded `transport::MAX_PAYLOAD`.
    PayloadTooLarge,
    /// The ring had no buffer available (maps from `queue::Full`).
    NoBuffer,
    /// The peer never echoed back during host-side startup sync.
    SyncTimeout,
}

impl RpmsgError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownPeer => "unresolvable peer name",
            Self::PayloadTooLarge => "payload exceeds maximum frame size",
            Self::NoBuffer => "ring has no free buffer",
            Self::SyncTimeout => "peer did not respond during startup sync",
        }
    }
}

impl fmt::Display for RpmsgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<queue::Full> for RpmsgError {
    fn from(_: queue::Full) -> Self {
        Self::NoBuffer
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn full_converts_to_no_buffer() {
        let err: RpmsgError = queue::Full.into();
        assert_eq!(err, RpmsgError::NoBuffer);
    }

    #[test]
    fn as_str_is_nonempty_for_every_variant() {
        for variant in [
            RpmsgError::UnknownPeer,
            RpmsgError::PayloadTooLarge,
            RpmsgError::NoBuffer,
            RpmsgError::SyncTimeout,
        ] {
            assert!(!variant.as_str().is_empty());
        }
    }
}
