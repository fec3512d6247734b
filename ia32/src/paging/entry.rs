//! 4-level paging entries (PML4E, PDPTE, PDE and PTE).
//!
//! See `4.5 4-Level Paging and 5-Level Paging`, Table 4-15 to Table 4-20.

use super::{Level, PageSize, PFN_BITS, RESERVED_HIGH_MASK};
use crate::{
    error::{
        LargePageNotAllowedSnafu, MisalignedFrameSnafu, ReservedBitsSetSnafu,
        TableNotAllowedSnafu,
    },
    utils::{ensure_fits, fit_u8, mask},
    Result,
};
use bitfield::bitfield;
use snafu::{ensure, OptionExt};

bitfield! {
    /// Every bit a 4-level entry can carry, regardless of level and variant.
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct RawEntry(u64);
    impl Debug;
    present, set_present: 0;
    write, set_write: 1;
    user, set_user: 2;
    write_through, set_write_through: 3;
    cache_disable, set_cache_disable: 4;
    accessed, set_accessed: 5;
    dirty, set_dirty: 6;
    large_page, set_large_page: 7;
    global, set_global: 8;
    u8, available_low, set_available_low: 11, 9;
    large_pat, set_large_pat: 12;
    frame, set_frame: 47, 12;
    u16, available_high, set_available_high: 62, 52;
    u8, leaf_available_high, set_leaf_available_high: 58, 52;
    u8, protection_key, set_protection_key: 62, 59;
    execute_disable, set_execute_disable: 63;
}

const LARGE_PAGE: u64 = 1 << 7;

/// Bits that must be zero in an entry referencing another table.
const fn table_reserved_mask(level: Level) -> u64 {
    match level {
        Level::Pml4 => RESERVED_HIGH_MASK | LARGE_PAGE,
        _ => RESERVED_HIGH_MASK,
    }
}

/// Bits that must be zero in an entry mapping a page.
const fn page_reserved_mask(size: PageSize) -> u64 {
    match size {
        PageSize::Size1G => RESERVED_HIGH_MASK | mask(29, 13),
        PageSize::Size2M => RESERVED_HIGH_MASK | mask(20, 13),
        _ => RESERVED_HIGH_MASK,
    }
}

/// An entry that references the next table of the hierarchy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub write: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub accessed: bool,
    pub execute_disable: bool,
    /// Software available bits 11:9.
    pub available_low: u8,
    /// Software available bits 62:52.
    pub available_high: u16,
    /// 4 KiB frame of the next table.
    pub frame: u64,
}

impl TableEntry {
    /// Physical address of the referenced table.
    pub const fn table_address(&self) -> u64 {
        self.frame << super::PAGE_SHIFT
    }
}

/// An entry that maps a page. Which page size depends on the level it was
/// read from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    pub write: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub global: bool,
    pub pat: bool,
    /// Protection key, only consulted with CR4.PKE or CR4.PKS.
    pub protection_key: u8,
    pub execute_disable: bool,
    /// Software available bits 11:9.
    pub available_low: u8,
    /// Software available bits 58:52.
    pub available_high: u8,
    /// 4 KiB frame of the first byte of the page. Large page frames are
    /// aligned to their page size.
    pub frame: u64,
}

impl PageEntry {
    /// Physical address of the first byte of the mapped page.
    pub const fn page_address(&self) -> u64 {
        self.frame << super::PAGE_SHIFT
    }
}

/// A decoded 4-level entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    NotPresent,
    Table(TableEntry),
    Page(PageEntry),
}

impl Entry {
    /// Decodes `raw` as read from a table at `level`.
    ///
    /// Bit 7 selects the variant at the PDPT and PD levels. A PML4 entry
    /// always references a table and a PT entry always maps a page.
    /// Reserved bits are rejected with [`crate::Error::ReservedBitsSet`]. The
    /// XD bit is decoded as is, its EFER.NXE dependency is checked by the
    /// walker.
    pub fn decode(raw: u64, level: Level) -> Result<Self> {
        let bits = RawEntry(raw);
        if !bits.present() {
            return Ok(Entry::NotPresent);
        }

        let page_size = match level {
            Level::Pt => Some(PageSize::Size4K),
            Level::Pdpt | Level::Pd if bits.large_page() => level.page_size(),
            _ => None,
        };

        let Some(page_size) = page_size else {
            ensure!(
                raw & table_reserved_mask(level) == 0,
                ReservedBitsSetSnafu { level, entry: raw }
            );

            return Ok(Entry::Table(TableEntry {
                write: bits.write(),
                user: bits.user(),
                write_through: bits.write_through(),
                cache_disable: bits.cache_disable(),
                accessed: bits.accessed(),
                execute_disable: bits.execute_disable(),
                available_low: bits.available_low(),
                available_high: bits.available_high(),
                frame: bits.frame(),
            }));
        };

        ensure!(
            raw & page_reserved_mask(page_size) == 0,
            ReservedBitsSetSnafu { level, entry: raw }
        );

        let (pat, frame) = match page_size {
            PageSize::Size4K => (bits.large_page(), bits.frame()),
            // PAT moves to bit 12 and the low frame bits are reserved.
            _ => (bits.large_pat(), bits.frame() & !(page_size.frames() - 1)),
        };

        Ok(Entry::Page(PageEntry {
            write: bits.write(),
            user: bits.user(),
            write_through: bits.write_through(),
            cache_disable: bits.cache_disable(),
            accessed: bits.accessed(),
            dirty: bits.dirty(),
            global: bits.global(),
            pat,
            protection_key: bits.protection_key(),
            execute_disable: bits.execute_disable(),
            available_low: bits.available_low(),
            available_high: bits.leaf_available_high(),
            frame,
        }))
    }

    /// Encodes the entry for a table at `level`.
    ///
    /// Fails with [`crate::Error::FieldOverflow`] instead of truncating a
    /// sub-field, and with [`crate::Error::MisalignedFrame`] when a large page
    /// frame is not aligned to the page size.
    pub fn encode(&self, level: Level) -> Result<u64> {
        let mut bits = RawEntry(0);

        match self {
            Entry::NotPresent => {}
            Entry::Table(table) => {
                ensure!(level != Level::Pt, TableNotAllowedSnafu { level });

                bits.set_present(true);
                bits.set_write(table.write);
                bits.set_user(table.user);
                bits.set_write_through(table.write_through);
                bits.set_cache_disable(table.cache_disable);
                bits.set_accessed(table.accessed);
                bits.set_execute_disable(table.execute_disable);
                bits.set_available_low(fit_u8("available_low", table.available_low, 3)?);
                let available_high = ensure_fits("available_high", table.available_high.into(), 11)?;
                bits.set_available_high(available_high as u16);
                bits.set_frame(ensure_fits("frame", table.frame, PFN_BITS)?);
            }
            Entry::Page(page) => {
                let size = level
                    .page_size()
                    .context(LargePageNotAllowedSnafu { level })?;
                let frame = ensure_fits("frame", page.frame, PFN_BITS)?;
                ensure!(
                    frame & (size.frames() - 1) == 0,
                    MisalignedFrameSnafu { level, frame }
                );

                bits.set_present(true);
                bits.set_write(page.write);
                bits.set_user(page.user);
                bits.set_write_through(page.write_through);
                bits.set_cache_disable(page.cache_disable);
                bits.set_accessed(page.accessed);
                bits.set_dirty(page.dirty);
                bits.set_global(page.global);
                bits.set_execute_disable(page.execute_disable);
                bits.set_protection_key(fit_u8("protection_key", page.protection_key, 4)?);
                bits.set_available_low(fit_u8("available_low", page.available_low, 3)?);
                bits.set_leaf_available_high(fit_u8("available_high", page.available_high, 7)?);
                bits.set_frame(frame);

                if size == PageSize::Size4K {
                    bits.set_large_page(page.pat);
                } else {
                    bits.set_large_page(true);
                    bits.set_large_pat(page.pat);
                }
            }
        }

        Ok(bits.0)
    }

    pub const fn is_present(&self) -> bool {
        !matches!(self, Entry::NotPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn decodes_reference_entries() {
        // Present, RW, US, A, bit 6 and bit 8 set (ignored), frame 0x1234
        let raw = 0x0000_0000_0123_4167;

        let Entry::Table(table) = Entry::decode(raw, Level::Pml4).unwrap() else {
            panic!("expected a table entry");
        };
        assert!(table.write && table.user && table.accessed);
        assert_eq!(table.frame, 0x1234);
        assert_eq!(table.table_address(), 0x123_4000);
    }

    #[test]
    fn pml4_entries_cannot_map_pages() {
        assert_eq!(
            Entry::decode(0x1000 | LARGE_PAGE | 1, Level::Pml4),
            Err(Error::ReservedBitsSet {
                level: Level::Pml4,
                entry: 0x1081
            })
        );

        let page = Entry::Page(PageEntry::default());
        assert_eq!(
            page.encode(Level::Pml4),
            Err(Error::LargePageNotAllowed { level: Level::Pml4 })
        );
    }

    #[test]
    fn decodes_1gb_page() {
        let raw = 0x4000_0000 | 0x1000 | LARGE_PAGE | 0b11;

        let Entry::Page(page) = Entry::decode(raw, Level::Pdpt).unwrap() else {
            panic!("expected a page entry");
        };
        assert!(page.pat);
        assert_eq!(page.page_address(), 0x4000_0000);
    }

    #[test]
    fn rejects_reserved_bits_of_large_pages() {
        let pde = 0x20_0000 | LARGE_PAGE | 1;
        assert!(Entry::decode(pde, Level::Pd).is_ok());

        for bit in [13, 20, 48, 51] {
            let raw = pde | 1 << bit;
            assert_eq!(
                Entry::decode(raw, Level::Pd),
                Err(Error::ReservedBitsSet {
                    level: Level::Pd,
                    entry: raw
                })
            );
        }

        // Bits 29:21 belong to the frame of a 2 MiB page but not of a 1 GiB page.
        assert!(Entry::decode(pde, Level::Pdpt).is_err());
    }

    #[test]
    fn pte_bit_7_is_pat() {
        let raw = 0x8000_0000_0000_5000 | 1 << 7 | 1 << 6 | 1;

        let Entry::Page(page) = Entry::decode(raw, Level::Pt).unwrap() else {
            panic!("expected a page entry");
        };
        assert!(page.pat && page.dirty && page.execute_disable);
        assert_eq!(page.frame, 5);
        assert_eq!(Entry::Page(page).encode(Level::Pt), Ok(raw));
    }

    #[test]
    fn protection_key_is_leaf_only() {
        let raw = 0x7800_0000_0000_1001;

        let Entry::Page(page) = Entry::decode(raw, Level::Pt).unwrap() else {
            panic!("expected a page entry");
        };
        assert_eq!(page.protection_key, 0xf);

        let Entry::Table(table) = Entry::decode(raw, Level::Pd).unwrap() else {
            panic!("expected a table entry");
        };
        assert_eq!(table.available_high, 0x780);
    }

    #[test]
    fn encode_rejects_out_of_range_fields() {
        let page = PageEntry {
            frame: 1 << 40,
            ..Default::default()
        };
        assert_eq!(
            Entry::Page(page).encode(Level::Pt),
            Err(Error::FieldOverflow {
                field: "frame",
                value: 1 << 40,
                bits: 36
            })
        );

        let page = PageEntry {
            protection_key: 16,
            ..Default::default()
        };
        assert!(matches!(
            Entry::Page(page).encode(Level::Pt),
            Err(Error::FieldOverflow { field: "protection_key", .. })
        ));

        let page = PageEntry {
            frame: 0x201,
            ..Default::default()
        };
        assert_eq!(
            Entry::Page(page).encode(Level::Pd),
            Err(Error::MisalignedFrame {
                level: Level::Pd,
                frame: 0x201
            })
        );

        let table = Entry::Table(TableEntry::default());
        assert_eq!(
            table.encode(Level::Pt),
            Err(Error::TableNotAllowed { level: Level::Pt })
        );
    }

    #[test]
    fn not_present_entries_encode_to_zero() {
        assert_eq!(Entry::decode(0xffff_fffe, Level::Pd), Ok(Entry::NotPresent));
        assert_eq!(Entry::NotPresent.encode(Level::Pml4), Ok(0));
    }
}
