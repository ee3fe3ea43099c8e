//! Name-service announcement (Component G).
//!
//! A one-shot "endpoint announce" message so the host-side stack learns a
//! firmware endpoint's name without a general registry protocol -- no
//! dynamic endpoint binding or name resolution, just a single announcement
//! sent once.

use super::mailbox::Mailbox;
use super::transport::{Transport, NAMESERVICE_PORT};

/// Longest endpoint name the fixed-size announcement payload can carry.
pub const NAME_MAX: usize = 32;
/// Total wire size of an announcement: `name[32] + addr:u32 + flags:u32`.
pub const ANNOUNCEMENT_SIZE: usize = NAME_MAX + 4 + 4;

/// Send a one-shot announcement for `name` (truncated to [`NAME_MAX`] bytes)
/// at local endpoint `addr`, with `flags`. Returns `false` if the transport
/// has no buffer available -- announcements are best-effort, not retried.
pub fn announce(transport: &mut Transport<'_>, mailbox: &dyn Mailbox, name: &str, addr: u32, flags: u32) -> bool {
    let mut payload = [0u8; ANNOUNCEMENT_SIZE];

    let name_bytes = name.as_bytes();
    let copy_len = name_bytes.len().min(NAME_MAX);
    payload[..copy_len].copy_from_slice(&name_bytes[..copy_len]);
    payload[NAME_MAX..NAME_MAX + 4].copy_from_slice(&addr.to_le_bytes());
    payload[NAME_MAX + 4..ANNOUNCEMENT_SIZE].copy_from_slice(&flags.to_le_bytes());

    transport.send(mailbox, addr, NAMESERVICE_PORT, &payload)
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use crate::drivers::rpmsg::addr::AddrTranslator;
    use crate::drivers::rpmsg::mailbox::LoopbackMailbox;
    use crate::drivers::rpmsg::messageq::LocalMessageQueue;
    use crate::drivers::rpmsg::queue::{ProcId, Role, VirtQueue, BUF_SIZE};
    use crate::drivers::rpmsg::transport::BufferPool;
    use std::alloc::{alloc_zeroed, dealloc, Layout};

    const IDENTITY: AddrTranslator = AddrTranslator::new(u64::MAX, 0, 0);

    struct RingMem {
        ptr: *mut u8,
        layout: Layout,
    }

    impl RingMem {
        fn new(size: usize) -> Self {
            let layout = Layout::from_size_align(size, 4096).unwrap();
            // SAFETY: size is nonzero; 4096 is a valid power-of-two alignment.
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

    struct Harness {
        host_mailbox: LoopbackMailbox,
        slave_mailbox: LoopbackMailbox,
        host_mq: LocalMessageQueue,
        _ring0: RingMem,
        _ring1: RingMem,
        _pool: RingMem,
    }

    fn make_pair(n: u16) -> (&'static Harness, Transport<'static>, Transport<'static>) {
        let host_id = ProcId(1);
        let slave_id = ProcId(0);

        let ring0 = RingMem::new(super::super::vring::layout(0, n, 4096, 4096).total_size as usize);
        let ring1 = RingMem::new(super::super::vring::layout(0, n, 4096, 4096).total_size as usize);
        let pool = RingMem::new(BUF_SIZE * (n as usize) * 2);
        let pool_base = pool.base();

        let host_rx = VirtQueue::new(0, slave_id, Role::Host, ring0.base(), n, 4096, 4096, IDENTITY, None, 0);
        let slave_tx = VirtQueue::new(0, host_id, Role::Slave, ring0.base(), n, 4096, 4096, IDENTITY, None, 0);
        let host_tx = VirtQueue::new(1, slave_id, Role::Host, ring1.base(), n, 4096, 4096, IDENTITY, None, 0);
        let slave_rx = VirtQueue::new(1, host_id, Role::Slave, ring1.base(), n, 4096, 4096, IDENTITY, None, 0);

        let harness: &'static Harness = Box::leak(Box::new(Harness {
            host_mailbox: LoopbackMailbox::new(host_id),
            slave_mailbox: LoopbackMailbox::new(slave_id),
            host_mq: LocalMessageQueue::new(),
            _ring0: ring0,
            _ring1: ring1,
            _pool: pool,
        }));

        let host = Transport::new_host(
            host_rx,
            host_tx,
            BufferPool::new(pool_base, n as usize),
            &harness.host_mq,
            &harness.host_mailbox,
        );
        // The slave side never delivers to a local MessageQ in these tests
        // -- it only originates the announcement -- so an unused queue is
        // fine here.
        let slave_mq: &'static LocalMessageQueue = Box::leak(Box::new(LocalMessageQueue::new()));
        let slave = Transport::new_slave(slave_rx, slave_tx, slave_mq);

        (harness, host, slave)
    }

    #[test]
    fn announcement_is_observed_on_the_nameservice_port() {
        let (h, mut host, mut slave) = make_pair(8);
        assert!(announce(&mut slave, &h.slave_mailbox, "test", 50, 7));

        let delivered = host.drain(&h.host_mailbox);
        assert_eq!(delivered, 0, "announcements are not MessageQ deliveries");
        assert_eq!(h.host_mq.len(0), 0, "no message lands on the generic MessageQ queue");

        let announcement = h.host_mq.take(NAMESERVICE_PORT).expect("announcement recorded");
        let bytes = announcement.as_slice();
        assert_eq!(&bytes[..4], b"test");
        assert_eq!(&bytes[4..NAME_MAX], &[0u8; NAME_MAX - 4]);
        assert_eq!(u32::from_le_bytes(bytes[NAME_MAX..NAME_MAX + 4].try_into().unwrap()), 50);
        assert_eq!(u32::from_le_bytes(bytes[NAME_MAX + 4..].try_into().unwrap()), 7);
    }

    #[test]
    fn announce_truncates_names_longer_than_name_max() {
        let (h, _host, mut slave) = make_pair(4);
        let long_name = "a".repeat(NAME_MAX + 10);
        assert!(announce(&mut slave, &h.slave_mailbox, &long_name, 1, 0));
    }

    #[test]
    fn announce_fails_when_send_vq_has_no_buffer() {
        let (h, _host, mut slave) = make_pair(2);
        // The host primed exactly 2 descriptors on this ring at
        // construction; nothing reclaims them in this test, so the 3rd
        // announce attempt must fail rather than block.
        for _ in 0..2 {
            assert!(announce(&mut slave, &h.slave_mailbox, "x", 1, 0));
        }
        assert!(!announce(&mut slave, &h.slave_mailbox, "x", 1, 0));
    }
}
