//! EPT paging-structure entries.
//!
//! See `29.3.2 EPT Translation Mechanism`, Table 29-1 to Table 29-6.

use super::MemoryType;
use crate::{
    error::{
        LargePageNotAllowedSnafu, MisalignedFrameSnafu, MisconfiguredMemoryTypeSnafu,
        MisconfiguredPermissionsSnafu, ReservedBitsSetSnafu, TableNotAllowedSnafu,
    },
    paging::{Level, PageSize, PAGE_SHIFT, PFN_BITS, RESERVED_HIGH_MASK},
    utils::{ensure_fits, mask},
    Result,
};
use bitfield::bitfield;
use snafu::{ensure, OptionExt};

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct RawEptEntry(u64);
    impl Debug;
    read, set_read: 0;
    write, set_write: 1;
    execute, set_execute: 2;
    u8, memory_type, set_memory_type: 5, 3;
    ignore_pat, set_ignore_pat: 6;
    large_page, set_large_page: 7;
    accessed, set_accessed: 8;
    dirty, set_dirty: 9;
    user_execute, set_user_execute: 10;
    frame, set_frame: 47, 12;
    suppress_ve, set_suppress_ve: 63;
}

impl RawEptEntry {
    /// An entry is present when any of bits 2:0 is set.
    fn present(&self) -> bool {
        self.0 & 0b111 != 0
    }
}

/// Bits that must be zero in an entry referencing another table. This
/// includes the memory type, ignore-PAT and the large page bit.
const TABLE_RESERVED_MASK: u64 = RESERVED_HIGH_MASK | mask(7, 3);

const fn page_reserved_mask(size: PageSize) -> u64 {
    match size {
        PageSize::Size1G => RESERVED_HIGH_MASK | mask(29, 12),
        PageSize::Size2M => RESERVED_HIGH_MASK | mask(20, 12),
        _ => RESERVED_HIGH_MASK,
    }
}

/// An EPT entry that references the next table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EptTableEntry {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub user_execute: bool,
    pub accessed: bool,
    pub frame: u64,
}

impl EptTableEntry {
    pub const fn table_address(&self) -> u64 {
        self.frame << PAGE_SHIFT
    }
}

/// An EPT entry that maps a page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EptPageEntry {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub user_execute: bool,
    pub memory_type: MemoryType,
    pub ignore_pat: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub suppress_ve: bool,
    pub frame: u64,
}

impl EptPageEntry {
    pub const fn page_address(&self) -> u64 {
        self.frame << PAGE_SHIFT
    }
}

/// A decoded EPT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EptEntry {
    NotPresent,
    Table(EptTableEntry),
    Page(EptPageEntry),
}

impl EptEntry {
    /// Decodes `raw` as read from an EPT table at `level`.
    ///
    /// Any of the conditions that cause an EPT misconfiguration is reported:
    /// reserved bits, write without read and a reserved memory type in a
    /// leaf. Whether the processor supports large pages or execute-only
    /// translations is checked by the walker.
    pub fn decode(raw: u64, level: Level) -> Result<Self> {
        let bits = RawEptEntry(raw);
        if !bits.present() {
            return Ok(EptEntry::NotPresent);
        }

        let page_size = match level {
            Level::Pt => Some(PageSize::Size4K),
            Level::Pdpt | Level::Pd if bits.large_page() => level.page_size(),
            _ => None,
        };

        let reserved = match page_size {
            Some(size) => page_reserved_mask(size),
            None => TABLE_RESERVED_MASK,
        };
        ensure!(raw & reserved == 0, ReservedBitsSetSnafu { level, entry: raw });
        ensure!(
            bits.read() || !bits.write(),
            MisconfiguredPermissionsSnafu { level, entry: raw }
        );

        let Some(page_size) = page_size else {
            return Ok(EptEntry::Table(EptTableEntry {
                read: bits.read(),
                write: bits.write(),
                execute: bits.execute(),
                user_execute: bits.user_execute(),
                accessed: bits.accessed(),
                frame: bits.frame(),
            }));
        };

        let memory_type = MemoryType::from_bits(bits.memory_type())
            .context(MisconfiguredMemoryTypeSnafu { level, entry: raw })?;

        Ok(EptEntry::Page(EptPageEntry {
            read: bits.read(),
            write: bits.write(),
            execute: bits.execute(),
            user_execute: bits.user_execute(),
            memory_type,
            ignore_pat: bits.ignore_pat(),
            accessed: bits.accessed(),
            dirty: bits.dirty(),
            suppress_ve: bits.suppress_ve(),
            frame: bits.frame() & !(page_size.frames() - 1),
        }))
    }

    /// Encodes the entry for a table at `level`.
    ///
    /// An entry granting none of read, write or execute encodes to a value
    /// that decodes as not present.
    pub fn encode(&self, level: Level) -> Result<u64> {
        let mut bits = RawEptEntry(0);

        match self {
            EptEntry::NotPresent => {}
            EptEntry::Table(table) => {
                ensure!(level != Level::Pt, TableNotAllowedSnafu { level });

                bits.set_read(table.read);
                bits.set_write(table.write);
                bits.set_execute(table.execute);
                bits.set_user_execute(table.user_execute);
                bits.set_accessed(table.accessed);
                bits.set_frame(ensure_fits("frame", table.frame, PFN_BITS)?);
            }
            EptEntry::Page(page) => {
                let size = level
                    .page_size()
                    .context(LargePageNotAllowedSnafu { level })?;
                let frame = ensure_fits("frame", page.frame, PFN_BITS)?;
                ensure!(
                    frame & (size.frames() - 1) == 0,
                    MisalignedFrameSnafu { level, frame }
                );

                bits.set_read(page.read);
                bits.set_write(page.write);
                bits.set_execute(page.execute);
                bits.set_user_execute(page.user_execute);
                bits.set_memory_type(page.memory_type.bits());
                bits.set_ignore_pat(page.ignore_pat);
                bits.set_large_page(size != PageSize::Size4K);
                bits.set_accessed(page.accessed);
                bits.set_dirty(page.dirty);
                bits.set_suppress_ve(page.suppress_ve);
                bits.set_frame(frame);
            }
        }

        ensure!(
            bits.read() || !bits.write(),
            MisconfiguredPermissionsSnafu { level, entry: bits.0 }
        );

        Ok(bits.0)
    }

    pub const fn is_present(&self) -> bool {
        !matches!(self, EptEntry::NotPresent)
    }
}
