//! Wire-compatible virtio ring layout.
//!
//! Mirrors the layout `drivers::virtio::queue` uses for virtio-blk, but
//! computed generically from `{base, n, align}` instead of always allocating
//! `DEFAULT_QUEUE_SIZE`-sized fixed arrays, because this transport's rings
//! live in a shared carveout whose base and size are dictated by the
//! resource table (`rsc_table`), not allocated by this core.
//!
//! All fields are little-endian on the wire; since every architecture this
//! kernel targets is little-endian, plain native reads/writes already match
//! the wire format and no explicit byte-swapping is needed.

/// Descriptor flag: buffer is device-writable (unused by this transport,
/// kept for wire completeness -- every descriptor here is a single,
/// unchained, driver-readable or driver-writable buffer depending on
/// direction, never a chain).
pub const VIRTQ_DESC_F_NEXT: u16 = 1;

/// Available-ring flag: suppress `used` notifications from the peer.
pub const VRING_AVAIL_F_NO_INTERRUPT: u16 = 1;

/// Used-ring flag: suppress `avail` notifications to the peer.
pub const VRING_USED_F_NO_NOTIFY: u16 = 1;

/// One descriptor table entry: a single buffer by physical address.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VringDesc {
    pub addr: u64,
    pub len: u32,
    pub flags: u16,
    pub next: u16,
}

/// Available-ring header (driver writes, device reads).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VringAvailHeader {
    pub flags: u16,
    pub idx: u16,
}

/// Used-ring element (device writes, driver reads).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VringUsedElem {
    pub id: u32,
    pub len: u32,
}

/// Used-ring header (device writes, driver reads).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct VringUsedHeader {
    pub flags: u16,
    pub idx: u16,
}

/// Computed addresses of the three sub-regions of one ring, matching the
/// host's virtio-ring layout bit-for-bit for the same `(base, n, align)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    pub desc: u64,
    pub avail: u64,
    pub used: u64,
    pub total_size: u64,
}

/// Round `value` up to the next multiple of `align` (`align` a power of two).
const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// Compute the layout of a split virtqueue of `n` entries rooted at `base`,
/// padded to `align` between sub-regions (typically the page size, 4096).
///
/// `n` must be a power of two, as required by the virtio ring protocol --
/// this is a construction-time contract, not a runtime failure mode, so it
/// is only checked with `debug_assert!`.
pub fn layout(base: u64, n: u16, align: u64, page_size: u64) -> RingLayout {
    debug_assert!(n.is_power_of_two(), "virtqueue size must be a power of two");

    let n = n as u64;
    let desc = base;
    let desc_table_size = n * core::mem::size_of::<VringDesc>() as u64;

    let avail = align_up(base + desc_table_size, align);
    let avail_size =
        core::mem::size_of::<VringAvailHeader>() as u64 + n * 2 + 2 /* used_event */;

    let used = align_up(avail + avail_size, align);
    let used_size = core::mem::size_of::<VringUsedHeader>() as u64
        + n * core::mem::size_of::<VringUsedElem>() as u64
        + 2 /* avail_event */;

    let total_size = align_up(used + used_size, page_size);

    RingLayout {
        desc,
        avail,
        used,
        total_size,
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn reference_layout_matches_reference_topology() {
        // 256 entries, 4096-byte alignment: matches the reference firmware's
        // "3 pages" comment in the original VirtQueue.c (RP_MSG_RING_SIZE).
        let l = layout(0, 256, 4096, 4096);
        assert_eq!(l.desc, 0);
        // desc table: 256 * 16 = 4096 bytes, so avail starts at the next
        // 4096-aligned address, which is exactly 4096.
        assert_eq!(l.avail, 4096);
        // avail region: 4 + 256*2 + 2 = 518 bytes -> next 4096-aligned is 8192.
        assert_eq!(l.used, 8192);
        assert_eq!(l.total_size, 3 * 4096);
    }

    #[test]
    fn small_ring_layout_round_trips() {
        let l = layout(0x1000, 4, 16, 4096);
        assert_eq!(l.desc, 0x1000);
        let desc_size = 4 * core::mem::size_of::<VringDesc>() as u64;
        assert_eq!(l.avail, align_up(0x1000 + desc_size, 16));
        let avail_size = 4 + 4 * 2 + 2;
        assert_eq!(l.used, align_up(l.avail + avail_size, 16));
        assert!(l.total_size % 4096 == 0);
        assert!(l.total_size >= l.used);
    }

    #[test]
    #[should_panic]
    fn non_power_of_two_size_is_rejected_in_debug() {
        let _ = layout(0, 3, 4096, 4096);
    }
}
