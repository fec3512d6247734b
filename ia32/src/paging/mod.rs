//! Ordinary (CR3 rooted) paging: 32-bit and 4-level.

use crate::utils::mask;
use bitfield::bitfield;
use core::fmt;

pub mod entry;
pub mod legacy;
pub mod walk;

pub use entry::{Entry, PageEntry, TableEntry};
pub use legacy::{LegacyEntry, LegacyPageEntry, LegacyTableEntry};
pub use walk::{translate_4level, translate_legacy32, PageAccess, PageAttributes, PagingTranslation};

pub const _512GB: u64 = 512 * 1024 * 1024 * 1024;
pub const _1GB: u64 = 1024 * 1024 * 1024;
pub const _4MB: u64 = 4 * 1024 * 1024;
pub const _2MB: u64 = 2 * 1024 * 1024;
pub const _4KB: u64 = 4 * 1024;

pub const PAGE_SHIFT: u64 = 12;

/// Number of entries in every 4-level and EPT table.
pub const ENTRY_COUNT: usize = 512;

/// Width of the physical addresses the modelled layouts can hold.
pub const PHYSICAL_ADDRESS_BITS: u32 = 48;

/// Width of a page frame number at 4 KiB granularity.
pub const PFN_BITS: u32 = PHYSICAL_ADDRESS_BITS - PAGE_SHIFT as u32;

/// Mask to find the physical address of an entry in a 64-bit table.
pub const PFN_MASK: u64 = mask(PHYSICAL_ADDRESS_BITS - 1, PAGE_SHIFT as u32);

/// Bits between the modelled physical address width and bit 52.
pub(crate) const RESERVED_HIGH_MASK: u64 = mask(51, PHYSICAL_ADDRESS_BITS);

/// Converts a page frame number to the physical address of the frame.
pub const fn pa_from_pfn(pfn: u64) -> u64 {
    pfn << PAGE_SHIFT
}

/// Converts a physical address to the number of the frame containing it.
pub const fn pfn_from_pa(pa: u64) -> u64 {
    (pa & PFN_MASK) >> PAGE_SHIFT
}

/// A level of the 4-level (and EPT) hierarchy, from the root down.
///
/// 32-bit paging only uses [`Level::Pd`] and [`Level::Pt`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    #[default]
    Pml4,
    Pdpt,
    Pd,
    Pt,
}

impl Level {
    /// All levels in walk order.
    pub const ALL: [Level; 4] = [Level::Pml4, Level::Pdpt, Level::Pd, Level::Pt];

    /// Position of the lowest address bit that indexes a table of this level.
    pub const fn shift(self) -> u64 {
        match self {
            Level::Pml4 => 39,
            Level::Pdpt => 30,
            Level::Pd => 21,
            Level::Pt => 12,
        }
    }

    /// Returns the 9-bit table index this level uses for `address`.
    pub const fn index_of(self, address: u64) -> usize {
        ((address >> self.shift()) & 0x1ff) as usize
    }

    /// The level below this one, if any.
    pub const fn next(self) -> Option<Level> {
        match self {
            Level::Pml4 => Some(Level::Pdpt),
            Level::Pdpt => Some(Level::Pd),
            Level::Pd => Some(Level::Pt),
            Level::Pt => None,
        }
    }

    /// The size of the page an entry of this level maps when it is a leaf.
    pub const fn page_size(self) -> Option<PageSize> {
        match self {
            Level::Pml4 => None,
            Level::Pdpt => Some(PageSize::Size1G),
            Level::Pd => Some(PageSize::Size2M),
            Level::Pt => Some(PageSize::Size4K),
        }
    }

    /// Whether bit 7 of an entry at this level selects a large page.
    pub const fn has_large_page_bit(self) -> bool {
        matches!(self, Level::Pdpt | Level::Pd)
    }

    /// Level number as used by EPT (`3` for the PML4 down to `0` for the page
    /// table).
    pub const fn number(self) -> u8 {
        match self {
            Level::Pml4 => 3,
            Level::Pdpt => 2,
            Level::Pd => 1,
            Level::Pt => 0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Pml4 => "PML4",
            Level::Pdpt => "PDPT",
            Level::Pd => "PD",
            Level::Pt => "PT",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageSize {
    #[default]
    Size4K,
    Size2M,
    Size4M,
    Size1G,
}

impl PageSize {
    pub const fn bytes(self) -> u64 {
        match self {
            PageSize::Size4K => _4KB,
            PageSize::Size2M => _2MB,
            PageSize::Size4M => _4MB,
            PageSize::Size1G => _1GB,
        }
    }

    /// Mask of the address bits that are passed through as page offset.
    pub const fn offset_mask(self) -> u64 {
        self.bytes() - 1
    }

    /// Number of 4 KiB frames covered by a page of this size.
    pub const fn frames(self) -> u64 {
        self.bytes() >> PAGE_SHIFT
    }
}

bitfield! {
    /// See `4.5 4-Level Paging` and `4.3 32-Bit Paging`.
    ///
    /// With CR4.PCIDE=1 the low 12 bits hold the PCID instead of PWT/PCD.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Cr3(u64);
    impl Debug;
    pub write_through, _: 3;                                    // [3]
    pub cache_disable, _: 4;                                    // [4]
    pub u16, pcid, _: 11, 0;                                    // [0-11]
    pub page_frame_number, _: 47, 12;                           // [12-47]
    // reserved                                                 // [48-63]
}

impl Cr3 {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Physical address of the PML4 table.
    pub fn pml4(&self) -> u64 {
        pa_from_pfn(self.page_frame_number())
    }

    /// Physical address of the 32-bit page directory.
    pub const fn page_directory(&self) -> u64 {
        self.0 & 0xffff_f000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_extraction_uses_nine_bits_per_level() {
        // 0x0000_7fbf_dfef_f123 = indices 0xff / 0xfe / 0xfe / 0xef
        let address = (0xff << 39) | (0xfe << 30) | (0xfe << 21) | (0xef << 12) | 0x123;

        assert_eq!(Level::Pml4.index_of(address), 0xff);
        assert_eq!(Level::Pdpt.index_of(address), 0xfe);
        assert_eq!(Level::Pd.index_of(address), 0xfe);
        assert_eq!(Level::Pt.index_of(address), 0xef);
    }

    #[test]
    fn levels_walk_top_down() {
        let mut level = Level::Pml4;
        let mut visited = 1;
        while let Some(next) = level.next() {
            assert!(next > level);
            level = next;
            visited += 1;
        }

        assert_eq!(visited, Level::ALL.len());
        assert_eq!(Level::Pml4.page_size(), None);
        assert_eq!(Level::Pdpt.page_size(), Some(PageSize::Size1G));
    }

    #[test]
    fn cr3_exposes_table_bases() {
        let cr3 = Cr3::new(0x0000_1234_5678_9018);

        assert_eq!(cr3.pml4(), 0x0000_1234_5678_9000);
        assert_eq!(cr3.page_directory(), 0x5678_9000);
        assert!(cr3.write_through());
        assert!(cr3.cache_disable());
        assert_eq!(cr3.pcid(), 0x018);
    }

    #[test]
    fn pfn_conversions_are_inverse() {
        assert_eq!(pfn_from_pa(0x1234_5678), 0x12345);
        assert_eq!(pa_from_pfn(0x12345), 0x1234_5000);
        assert_eq!(PFN_BITS, 36);
    }
}
