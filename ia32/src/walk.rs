//! Single entry point for every supported translation hierarchy.

use crate::{
    ept::{self, EptCapabilities, EptTranslation},
    paging::{self, Level, PageSize, PagingTranslation},
    utils::memory::PhysicalMemory,
    Result,
};
use tinyvec::ArrayVec;
use x86::bits64::paging::PAddr;

/// One entry read during a walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    pub level: Level,
    /// Physical address the entry was read from.
    pub address: u64,
    /// Raw entry, zero extended for 32-bit paging.
    pub entry: u64,
}

impl WalkStep {
    pub const fn new(level: Level, address: u64, entry: u64) -> Self {
        Self {
            level,
            address,
            entry,
        }
    }
}

/// Entries visited by a walk, root first.
pub type WalkPath = ArrayVec<[WalkStep; 4]>;

/// Selects the hierarchy and the processor state it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyKind {
    /// 32-bit paging. `pse` is CR4.PSE.
    Legacy32 { pse: bool },
    /// 4-level paging. `nxe` is EFER.NXE.
    FourLevel { nxe: bool },
    Ept { capabilities: EptCapabilities },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Paging(PagingTranslation),
    Ept(EptTranslation),
}

impl Translation {
    pub fn physical_address(&self) -> PAddr {
        match self {
            Translation::Paging(translation) => translation.physical_address,
            Translation::Ept(translation) => translation.physical_address,
        }
    }

    pub fn page_size(&self) -> PageSize {
        match self {
            Translation::Paging(translation) => translation.page_size,
            Translation::Ept(translation) => translation.page_size,
        }
    }

    pub fn path(&self) -> &WalkPath {
        match self {
            Translation::Paging(translation) => &translation.path,
            Translation::Ept(translation) => &translation.path,
        }
    }
}

/// Translates `address` through the hierarchy rooted at the physical address
/// `root`.
///
/// The walk reads at most one entry per level and stops at the first fault,
/// which names the level it occurred at. Accessed and dirty flags are not
/// updated; [`Translation::path`] has the entries a caller would update.
pub fn translate<M: PhysicalMemory + ?Sized>(
    memory: &M,
    root: u64,
    address: u64,
    kind: HierarchyKind,
) -> Result<Translation> {
    match kind {
        HierarchyKind::Legacy32 { pse } => {
            paging::translate_legacy32(memory, root, address, pse).map(Translation::Paging)
        }
        HierarchyKind::FourLevel { nxe } => {
            paging::translate_4level(memory, root, address, nxe).map(Translation::Paging)
        }
        HierarchyKind::Ept { capabilities } => {
            ept::translate(memory, root, address, capabilities).map(Translation::Ept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn dispatches_by_kind() {
        // PD[0] maps a 4 MiB page at 0x40_0000 with 32-bit paging. With 4-level
        // paging or EPT the same entry is a PML4 entry that references a table
        // outside of the image.
        let mut memory = [0u8; 0x1000];
        memory[..4].copy_from_slice(&0x0040_0083u32.to_le_bytes());

        let translation =
            translate(&memory[..], 0, 0x1234, HierarchyKind::Legacy32 { pse: true }).unwrap();
        assert_eq!(translation.physical_address(), PAddr::from(0x40_1234u64));
        assert_eq!(translation.page_size(), PageSize::Size4M);
        assert_eq!(translation.path().len(), 1);

        assert_eq!(
            translate(&memory[..], 0, 0x1234, HierarchyKind::FourLevel { nxe: true }),
            Err(Error::ReservedBitsSet {
                level: Level::Pml4,
                entry: 0x0040_0083
            })
        );
        assert_eq!(
            translate(
                &memory[..],
                0,
                0x1234,
                HierarchyKind::Ept {
                    capabilities: EptCapabilities::all()
                }
            ),
            Err(Error::ReservedBitsSet {
                level: Level::Pml4,
                entry: 0x0040_0083
            })
        );
    }
}
