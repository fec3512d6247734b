use super::{
    entry::{Entry, PageEntry},
    legacy::{LegacyEntry, LegacyPageEntry},
    Level, PageSize, PAGE_SHIFT,
};
use crate::{
    error::{
        AddressOutOfRangeSnafu, MisalignedRootSnafu, NonCanonicalAddressSnafu, NotPresentSnafu,
        ReservedBitsSetSnafu, TableNotAllowedSnafu, TableOutOfBoundsSnafu,
    },
    utils::memory::PhysicalMemory,
    walk::{WalkPath, WalkStep},
    Result,
};
use bitflags::bitflags;
use snafu::{ensure, OptionExt};
use x86::bits64::paging::PAddr;

bitflags! {
    /// Access rights granted by every level of a paging walk.
    #[derive(Default)]
    pub struct PageAccess: u8 {
        const WRITE = 1 << 0;
        const USER = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

impl PageAccess {
    fn of(write: bool, user: bool, execute_disable: bool) -> Self {
        let mut access = PageAccess::empty();
        access.set(PageAccess::WRITE, write);
        access.set(PageAccess::USER, user);
        access.set(PageAccess::EXECUTE, !execute_disable);
        access
    }
}

/// Attributes that are taken from the leaf entry only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageAttributes {
    pub accessed: bool,
    pub dirty: bool,
    pub global: bool,
    pub pat: bool,
    pub write_through: bool,
    pub cache_disable: bool,
    pub protection_key: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingTranslation {
    pub physical_address: PAddr,
    pub page_size: PageSize,
    pub access: PageAccess,
    pub attributes: PageAttributes,
    pub path: WalkPath,
}

impl PagingTranslation {
    fn new(
        address: u64,
        page_address: u64,
        page_size: PageSize,
        access: PageAccess,
        path: WalkPath,
    ) -> Self {
        Self {
            physical_address: PAddr::from(page_address | (address & page_size.offset_mask())),
            page_size,
            access,
            attributes: PageAttributes::default(),
            path,
        }
    }
}

impl From<&PageEntry> for PageAttributes {
    fn from(page: &PageEntry) -> Self {
        Self {
            accessed: page.accessed,
            dirty: page.dirty,
            global: page.global,
            pat: page.pat,
            write_through: page.write_through,
            cache_disable: page.cache_disable,
            protection_key: page.protection_key,
        }
    }
}

impl From<&LegacyPageEntry> for PageAttributes {
    fn from(page: &LegacyPageEntry) -> Self {
        Self {
            accessed: page.accessed,
            dirty: page.dirty,
            global: page.global,
            pat: page.pat,
            write_through: page.write_through,
            cache_disable: page.cache_disable,
            protection_key: 0,
        }
    }
}

/// Returns whether bits 63:47 of `address` are all equal.
pub const fn is_canonical(address: u64) -> bool {
    ((address << 16) as i64 >> 16) as u64 == address
}

/// Translates a linear address with 4-level paging.
///
/// `root` is the physical address of the PML4 table (see
/// [`super::Cr3::pml4`]). With `nxe` cleared (EFER.NXE=0) the XD bit is
/// reserved at every level.
pub fn translate_4level<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    nxe: bool,
) -> Result<PagingTranslation> {
    walk_4level(memory, root, address, nxe).inspect_err(|error| {
        log::debug!("4-level walk of {:#x} from {:#x} failed: {}", address, root, error)
    })
}

fn walk_4level<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    nxe: bool,
) -> Result<PagingTranslation> {
    ensure!(root.trailing_zeros() >= PAGE_SHIFT as u32, MisalignedRootSnafu { root });
    ensure!(is_canonical(address), NonCanonicalAddressSnafu { address });

    let mut path = WalkPath::new();
    let mut access = PageAccess::all();
    let mut table = root;
    let mut level = Level::Pml4;

    loop {
        let entry_address = table + level.index_of(address) as u64 * 8;
        let raw = memory.read_u64(entry_address).context(TableOutOfBoundsSnafu {
            level,
            address: entry_address,
        })?;
        path.push(WalkStep::new(level, entry_address, raw));

        log::trace!("{} entry at {:#x}: {:#x}", level, entry_address, raw);

        match Entry::decode(raw, level)? {
            Entry::NotPresent => return NotPresentSnafu { level }.fail(),
            Entry::Table(entry) => {
                ensure!(
                    nxe || !entry.execute_disable,
                    ReservedBitsSetSnafu { level, entry: raw }
                );

                access &= PageAccess::of(entry.write, entry.user, entry.execute_disable);
                table = entry.table_address();
                level = level.next().context(TableNotAllowedSnafu { level })?;
            }
            Entry::Page(entry) => {
                ensure!(
                    nxe || !entry.execute_disable,
                    ReservedBitsSetSnafu { level, entry: raw }
                );

                access &= PageAccess::of(entry.write, entry.user, entry.execute_disable);

                let page_size = level.page_size().unwrap_or_default();
                let mut translation =
                    PagingTranslation::new(address, entry.page_address(), page_size, access, path);
                translation.attributes = PageAttributes::from(&entry);

                log::debug!(
                    "Translated {:#x} to {:#x} ({:?}, {:?})",
                    address,
                    translation.physical_address,
                    page_size,
                    access
                );

                return Ok(translation);
            }
        }
    }
}

/// Translates a linear address with 32-bit paging.
///
/// `root` is the physical address of the page directory (see
/// [`super::Cr3::page_directory`]). With `pse` set (CR4.PSE=1) page directory
/// entries can map 4 MiB pages.
pub fn translate_legacy32<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    pse: bool,
) -> Result<PagingTranslation> {
    walk_legacy32(memory, root, address, pse).inspect_err(|error| {
        log::debug!("32-bit walk of {:#x} from {:#x} failed: {}", address, root, error)
    })
}

fn walk_legacy32<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    pse: bool,
) -> Result<PagingTranslation> {
    ensure!(root.trailing_zeros() >= PAGE_SHIFT as u32, MisalignedRootSnafu { root });
    ensure!(address <= u64::from(u32::MAX), AddressOutOfRangeSnafu { address });

    let mut path = WalkPath::new();

    let level = Level::Pd;
    let pde_address = root + ((address >> 22) & 0x3ff) * 4;
    let pde = memory.read_u32(pde_address).context(TableOutOfBoundsSnafu {
        level,
        address: pde_address,
    })?;
    path.push(WalkStep::new(level, pde_address, pde.into()));

    log::trace!("{} entry at {:#x}: {:#x}", level, pde_address, pde);

    let table = match LegacyEntry::decode_pde(pde, pse)? {
        LegacyEntry::NotPresent => return NotPresentSnafu { level }.fail(),
        LegacyEntry::Page(entry) => {
            let access = PageAccess::of(entry.write, entry.user, false);
            let page_address = entry.page_address();
            let mut translation =
                PagingTranslation::new(address, page_address, PageSize::Size4M, access, path);
            translation.attributes = PageAttributes::from(&entry);

            return Ok(translation);
        }
        LegacyEntry::Table(table) => table,
    };

    let level = Level::Pt;
    let pte_address = (table.frame << PAGE_SHIFT) + ((address >> 12) & 0x3ff) * 4;
    let pte = memory.read_u32(pte_address).context(TableOutOfBoundsSnafu {
        level,
        address: pte_address,
    })?;
    path.push(WalkStep::new(level, pte_address, pte.into()));

    log::trace!("{} entry at {:#x}: {:#x}", level, pte_address, pte);

    match LegacyEntry::decode_pte(pte) {
        LegacyEntry::Page(entry) => {
            let access = PageAccess::of(table.write, table.user, false)
                & PageAccess::of(entry.write, entry.user, false);
            let page_address = entry.page_address();
            let mut translation =
                PagingTranslation::new(address, page_address, PageSize::Size4K, access, path);
            translation.attributes = PageAttributes::from(&entry);

            log::debug!(
                "Translated {:#x} to {:#x} ({:?})",
                address,
                translation.physical_address,
                access
            );

            Ok(translation)
        }
        _ => NotPresentSnafu { level }.fail(),
    }
}
