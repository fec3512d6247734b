use super::{EptAccess, EptCapabilities, EptEntry, MemoryType};
use crate::{
    error::{
        AddressOutOfRangeSnafu, MisalignedRootSnafu, MisconfiguredPermissionsSnafu,
        NotPresentSnafu, ReservedBitsSetSnafu, TableNotAllowedSnafu, TableOutOfBoundsSnafu,
    },
    paging::{Level, PageSize, PAGE_SHIFT, PHYSICAL_ADDRESS_BITS},
    utils::memory::PhysicalMemory,
    walk::{WalkPath, WalkStep},
    Result,
};
use snafu::{ensure, OptionExt};
use x86::bits64::paging::PAddr;

/// The result of an EPT walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EptTranslation {
    pub physical_address: PAddr,
    pub page_size: PageSize,
    pub access: EptAccess,
    pub memory_type: MemoryType,
    pub ignore_pat: bool,
    pub suppress_ve: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub path: WalkPath,
}

impl EptAccess {
    fn of(read: bool, write: bool, execute: bool, user_execute: bool) -> Self {
        let mut access = EptAccess::empty();
        access.set(EptAccess::READ, read);
        access.set(EptAccess::WRITE, write);
        access.set(EptAccess::EXECUTE, execute);
        access.set(EptAccess::USER_EXECUTE, user_execute);
        access
    }
}

/// Translates a guest-physical address through the EPT hierarchy rooted at
/// `root` (see [`super::EptPointer::root`]).
///
/// Besides the misconfigurations detected by [`EptEntry::decode`], large
/// pages and execute-only entries are rejected unless `capabilities`
/// advertises them.
pub fn translate<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    capabilities: EptCapabilities,
) -> Result<EptTranslation> {
    walk(memory, root, address, capabilities).inspect_err(|error| {
        log::debug!("EPT walk of {:#x} from {:#x} failed: {}", address, root, error)
    })
}

fn walk<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    capabilities: EptCapabilities,
) -> Result<EptTranslation> {
    ensure!(root.trailing_zeros() >= PAGE_SHIFT as u32, MisalignedRootSnafu { root });
    ensure!(address >> PHYSICAL_ADDRESS_BITS == 0, AddressOutOfRangeSnafu { address });

    let mut path = WalkPath::new();
    let mut access = EptAccess::all();
    let mut table = root;
    let mut level = Level::Pml4;

    loop {
        let entry_address = table + level.index_of(address) as u64 * 8;
        let raw = memory.read_u64(entry_address).context(TableOutOfBoundsSnafu {
            level,
            address: entry_address,
        })?;
        path.push(WalkStep::new(level, entry_address, raw));

        log::trace!("EPT {} entry at {:#x}: {:#x}", level, entry_address, raw);

        match EptEntry::decode(raw, level)? {
            EptEntry::NotPresent => return NotPresentSnafu { level }.fail(),
            EptEntry::Table(entry) => {
                let granted =
                    EptAccess::of(entry.read, entry.write, entry.execute, entry.user_execute);
                check_execute_only(granted, capabilities, level, raw)?;

                access &= granted;
                table = entry.table_address();
                level = level.next().context(TableNotAllowedSnafu { level })?;
            }
            EptEntry::Page(entry) => {
                // Bit 7 is reserved at levels without large page support.
                ensure!(
                    capabilities.allows_page_at(level),
                    ReservedBitsSetSnafu { level, entry: raw }
                );

                let granted =
                    EptAccess::of(entry.read, entry.write, entry.execute, entry.user_execute);
                check_execute_only(granted, capabilities, level, raw)?;

                access &= granted;

                let page_size = level.page_size().unwrap_or_default();
                let physical_address = entry.page_address() | (address & page_size.offset_mask());

                log::debug!(
                    "Translated guest physical {:#x} to {:#x} ({:?}, {:?}, {})",
                    address,
                    physical_address,
                    page_size,
                    access,
                    entry.memory_type
                );

                return Ok(EptTranslation {
                    physical_address: PAddr::from(physical_address),
                    page_size,
                    access,
                    memory_type: entry.memory_type,
                    ignore_pat: entry.ignore_pat,
                    suppress_ve: entry.suppress_ve,
                    accessed: entry.accessed,
                    dirty: entry.dirty,
                    path,
                });
            }
        }
    }
}

/// Entries that only allow execution are a misconfiguration unless the
/// processor supports execute-only translations.
fn check_execute_only(
    granted: EptAccess,
    capabilities: EptCapabilities,
    level: Level,
    raw: u64,
) -> Result<()> {
    ensure!(
        granted.intersects(EptAccess::READ | EptAccess::WRITE)
            || capabilities.contains(EptCapabilities::EXECUTE_ONLY),
        MisconfiguredPermissionsSnafu { level, entry: raw }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// PML4 at 0x0, PDPT at 0x1000, PD at 0x2000.
    fn tables(pd_entry: u64) -> [u8; 0x3000] {
        let mut memory = [0u8; 0x3000];
        memory[..8].copy_from_slice(&0x1007u64.to_le_bytes());
        memory[0x1000..0x1008].copy_from_slice(&0x2007u64.to_le_bytes());
        memory[0x2000..0x2008].copy_from_slice(&pd_entry.to_le_bytes());
        memory
    }

    #[test]
    fn large_pages_need_capability() {
        // RWX, WB, 2 MiB page at 0x20_0000
        let pd_entry = 0x20_0000 | 1 << 7 | 6 << 3 | 0b111;
        let memory = tables(pd_entry);

        let translation =
            translate(&memory[..], 0, 0x1_2345, EptCapabilities::LARGE_PAGE_2MB).unwrap();
        assert_eq!(translation.physical_address, PAddr::from(0x21_2345u64));
        assert_eq!(translation.page_size, PageSize::Size2M);
        assert_eq!(translation.memory_type, MemoryType::WriteBack);
        assert_eq!(translation.path.len(), 3);

        assert_eq!(
            translate(&memory[..], 0, 0x1_2345, EptCapabilities::empty()),
            Err(Error::ReservedBitsSet {
                level: Level::Pd,
                entry: pd_entry
            })
        );
    }

    #[test]
    fn execute_only_needs_capability() {
        let pd_entry = 0x20_0000 | 1 << 7 | 6 << 3 | 0b100;
        let memory = tables(pd_entry);

        let capabilities = EptCapabilities::LARGE_PAGE_2MB | EptCapabilities::EXECUTE_ONLY;
        let translation = translate(&memory[..], 0, 0, capabilities).unwrap();
        assert_eq!(translation.access, EptAccess::EXECUTE);

        assert_eq!(
            translate(&memory[..], 0, 0, EptCapabilities::LARGE_PAGE_2MB),
            Err(Error::MisconfiguredPermissions {
                level: Level::Pd,
                entry: pd_entry
            })
        );
    }

    #[test]
    fn guest_physical_addresses_are_48_bits() {
        let memory = tables(0);

        assert_eq!(
            translate(&memory[..], 0, 1 << 48, EptCapabilities::all()),
            Err(Error::AddressOutOfRange { address: 1 << 48 })
        );
        assert_eq!(
            translate(&memory[..], 0, 0, EptCapabilities::all()),
            Err(Error::NotPresent { level: Level::Pd })
        );
    }
}
