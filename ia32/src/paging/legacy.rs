//! 32-bit paging entries, with PSE and PSE-36 large pages.
//!
//! See `4.3 32-Bit Paging`, Table 4-4 to Table 4-6.

use super::{Level, PageSize};
use crate::{
    error::{
        LargePageNotAllowedSnafu, MisalignedFrameSnafu, ReservedBitsSetSnafu,
        TableNotAllowedSnafu,
    },
    utils::{ensure_fits, fit_u8},
    Result,
};
use bitfield::bitfield;
use snafu::ensure;

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct RawLegacyEntry(u32);
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
    u8, available, set_available: 11, 9;
    large_pat, set_large_pat: 12;
    // physical address bits 39:32 of a 4 MiB page
    high_frame, set_high_frame: 20, 13;
    reserved, _: 21;
    // physical address bits 31:22 of a 4 MiB page
    large_frame, set_large_frame: 31, 22;
    frame, set_frame: 31, 12;
}

/// Width of the frame number of a page table or a 4 KiB page.
const FRAME_BITS: u32 = 20;

/// Width of the frame number of a 4 MiB page (40-bit physical addresses).
const LARGE_FRAME_BITS: u32 = 28;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LegacyTableEntry {
    pub write: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub accessed: bool,
    pub available: u8,
    pub frame: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LegacyPageEntry {
    pub write: bool,
    pub user: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub global: bool,
    pub pat: bool,
    pub available: u8,
    pub frame: u64,
}

impl LegacyPageEntry {
    pub const fn page_address(&self) -> u64 {
        self.frame << super::PAGE_SHIFT
    }
}

/// A decoded 32-bit paging entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyEntry {
    NotPresent,
    Table(LegacyTableEntry),
    Page(LegacyPageEntry),
}

impl LegacyEntry {
    /// Decodes a page directory entry. Bit 7 selects a 4 MiB page only when
    /// `pse` (CR4.PSE) is set, otherwise it is ignored.
    pub fn decode_pde(raw: u32, pse: bool) -> Result<Self> {
        let bits = RawLegacyEntry(raw);
        if !bits.present() {
            return Ok(LegacyEntry::NotPresent);
        }

        if !(pse && bits.large_page()) {
            return Ok(LegacyEntry::Table(LegacyTableEntry {
                write: bits.write(),
                user: bits.user(),
                write_through: bits.write_through(),
                cache_disable: bits.cache_disable(),
                accessed: bits.accessed(),
                available: bits.available(),
                frame: bits.frame().into(),
            }));
        }

        ensure!(
            !bits.reserved(),
            ReservedBitsSetSnafu {
                level: Level::Pd,
                entry: u64::from(raw)
            }
        );

        let frame = u64::from(bits.large_frame()) << 10 | u64::from(bits.high_frame()) << 20;
        Ok(LegacyEntry::Page(LegacyPageEntry {
            pat: bits.large_pat(),
            frame,
            ..page_flags(bits)
        }))
    }

    /// Decodes a page table entry. 32-bit page table entries have no
    /// reserved bits.
    pub fn decode_pte(raw: u32) -> Self {
        let bits = RawLegacyEntry(raw);
        if !bits.present() {
            return LegacyEntry::NotPresent;
        }

        LegacyEntry::Page(LegacyPageEntry {
            pat: bits.large_page(),
            frame: bits.frame().into(),
            ..page_flags(bits)
        })
    }

    pub fn encode_pde(&self, pse: bool) -> Result<u32> {
        let mut bits = RawLegacyEntry(0);

        match self {
            LegacyEntry::NotPresent => {}
            LegacyEntry::Table(table) => {
                bits.set_present(true);
                bits.set_write(table.write);
                bits.set_user(table.user);
                bits.set_write_through(table.write_through);
                bits.set_cache_disable(table.cache_disable);
                bits.set_accessed(table.accessed);
                bits.set_available(fit_u8("available", table.available, 3)?);
                bits.set_frame(ensure_fits("frame", table.frame, FRAME_BITS)? as u32);
            }
            LegacyEntry::Page(page) => {
                ensure!(pse, LargePageNotAllowedSnafu { level: Level::Pd });

                let frame = ensure_fits("frame", page.frame, LARGE_FRAME_BITS)?;
                ensure!(
                    frame & (PageSize::Size4M.frames() - 1) == 0,
                    MisalignedFrameSnafu {
                        level: Level::Pd,
                        frame
                    }
                );

                set_page_flags(&mut bits, page)?;
                bits.set_large_page(true);
                bits.set_large_pat(page.pat);
                bits.set_large_frame((frame >> 10) as u32);
                bits.set_high_frame((frame >> 20) as u32);
            }
        }

        Ok(bits.0)
    }

    pub fn encode_pte(&self) -> Result<u32> {
        let mut bits = RawLegacyEntry(0);

        match self {
            LegacyEntry::NotPresent => {}
            LegacyEntry::Table(_) => return TableNotAllowedSnafu { level: Level::Pt }.fail(),
            LegacyEntry::Page(page) => {
                let frame = ensure_fits("frame", page.frame, FRAME_BITS)?;

                set_page_flags(&mut bits, page)?;
                bits.set_large_page(page.pat);
                bits.set_frame(frame as u32);
            }
        }

        Ok(bits.0)
    }
}

/// Flags shared by 4 MiB and 4 KiB pages. PAT and the frame differ.
fn page_flags(bits: RawLegacyEntry) -> LegacyPageEntry {
    LegacyPageEntry {
        write: bits.write(),
        user: bits.user(),
        write_through: bits.write_through(),
        cache_disable: bits.cache_disable(),
        accessed: bits.accessed(),
        dirty: bits.dirty(),
        global: bits.global(),
        pat: false,
        available: bits.available(),
        frame: 0,
    }
}

fn set_page_flags(bits: &mut RawLegacyEntry, page: &LegacyPageEntry) -> Result<()> {
    bits.set_present(true);
    bits.set_write(page.write);
    bits.set_user(page.user);
    bits.set_write_through(page.write_through);
    bits.set_cache_disable(page.cache_disable);
    bits.set_accessed(page.accessed);
    bits.set_dirty(page.dirty);
    bits.set_global(page.global);
    bits.set_available(fit_u8("available", page.available, 3)?);

    Ok(())
}
