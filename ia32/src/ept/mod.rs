//! Extended page tables.
//!
//! See `29.3 The Extended Page Table Mechanism (EPT)` and `A.10 VPID and EPT
//! Capabilities`.

use crate::{
    error::{FieldOverflowSnafu, InvalidEptPointerSnafu, MisalignedRootSnafu},
    paging::{pa_from_pfn, Level, PAGE_SHIFT, PFN_BITS},
    Result,
};
use bitfield::bitfield;
use bitflags::bitflags;
use core::fmt;
use snafu::ensure;

pub mod entry;
pub mod violation;
pub mod walk;

pub use entry::{EptEntry, EptPageEntry, EptTableEntry};
pub use violation::{AccessKind, EptViolation};
pub use walk::{translate, EptTranslation};

/// Memory types an EPT leaf entry (bits 5:3) or an EPTP (bits 2:0) can
/// select. The remaining encodings are reserved.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    #[default]
    Uncacheable = 0,
    WriteCombining = 1,
    WriteThrough = 4,
    WriteProtected = 5,
    WriteBack = 6,
}

impl MemoryType {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(MemoryType::Uncacheable),
            1 => Some(MemoryType::WriteCombining),
            4 => Some(MemoryType::WriteThrough),
            5 => Some(MemoryType::WriteProtected),
            6 => Some(MemoryType::WriteBack),
            _ => None,
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MemoryType {
    type Error = u8;

    fn try_from(bits: u8) -> core::result::Result<Self, Self::Error> {
        MemoryType::from_bits(bits).ok_or(bits)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryType::Uncacheable => "UC",
            MemoryType::WriteCombining => "WC",
            MemoryType::WriteThrough => "WT",
            MemoryType::WriteProtected => "WP",
            MemoryType::WriteBack => "WB",
        };

        f.write_str(name)
    }
}

bitflags! {
    /// Access rights granted by every level of an EPT walk.
    #[derive(Default)]
    pub struct EptAccess: u8 {
        const READ          = 1 << 0;
        const WRITE         = 1 << 1;
        /// Supervisor-mode execute when mode-based execute control is enabled.
        const EXECUTE       = 1 << 2;
        const USER_EXECUTE  = 1 << 3;
    }

    /// Subset of `IA32_VMX_EPT_VPID_CAP` (MSR 0x48C).
    pub struct EptCapabilities: u64 {
        /// Bit 0: EPT entries may allow execute-only translations.
        const EXECUTE_ONLY                              = 1 << 0;
        /// Bit 6: page-walk length of 4.
        const PAGE_WALK_LENGTH_4                        = 1 << 6;
        /// Bit 8: the EPTP may use the uncacheable memory type.
        const MEMORY_TYPE_UC                            = 1 << 8;
        /// Bit 14: the EPTP may use the write-back memory type.
        const MEMORY_TYPE_WB                            = 1 << 14;
        /// Bit 16: PDEs may map 2 MiB pages.
        const LARGE_PAGE_2MB                            = 1 << 16;
        /// Bit 17: PDPTEs may map 1 GiB pages.
        const LARGE_PAGE_1GB                            = 1 << 17;
        const INVEPT                                    = 1 << 20;
        /// Bit 21: accessed and dirty flags for EPT.
        const ACCESSED_DIRTY                            = 1 << 21;
        /// Bit 22: advanced VM-exit information for EPT violations.
        const ADVANCED_EXIT_INFO                        = 1 << 22;
        const INVEPT_SINGLE_CONTEXT                     = 1 << 25;
        const INVEPT_ALL_CONTEXTS                       = 1 << 26;
        const INVVPID                                   = 1 << 32;
        const INVVPID_INDIVIDUAL_ADDRESS                = 1 << 40;
        const INVVPID_SINGLE_CONTEXT                    = 1 << 41;
        const INVVPID_ALL_CONTEXTS                      = 1 << 42;
        const INVVPID_SINGLE_CONTEXT_RETAINING_GLOBALS  = 1 << 43;
    }
}

impl EptCapabilities {
    pub const MSR: u32 = x86::msr::IA32_VMX_EPT_VPID_CAP;

    /// Keeps the capabilities this crate understands from the raw MSR value.
    pub const fn from_msr(value: u64) -> Self {
        Self::from_bits_truncate(value)
    }

    /// Whether a leaf entry can be placed at the given level.
    pub fn allows_page_at(&self, level: Level) -> bool {
        match level {
            Level::Pdpt => self.contains(EptCapabilities::LARGE_PAGE_1GB),
            Level::Pd => self.contains(EptCapabilities::LARGE_PAGE_2MB),
            Level::Pt => true,
            Level::Pml4 => false,
        }
    }
}

bitfield! {
    /// The extended-page-table pointer, VMCS field `EPT_POINTER` (0x201A).
    ///
    /// See `25.6.11 Extended-Page-Table Pointer (EPTP)`.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EptPointer(u64);
    impl Debug;
    pub u8, memory_type_bits, set_memory_type_bits: 2, 0;       // [0-2]
    pub u8, page_walk_length, set_page_walk_length: 5, 3;       // [3-5]
    pub accessed_dirty, set_accessed_dirty: 6;                  // [6]
    // supervisor shadow stack / reserved                       // [7-11]
    pub page_frame_number, set_page_frame_number: 47, 12;       // [12-47]
    // reserved                                                 // [48-63]
}

const_assert_eq!(core::mem::size_of::<EptPointer>(), core::mem::size_of::<u64>());

/// Value of bits 5:3 for a 4-level walk (length minus one).
const PAGE_WALK_LENGTH_4: u8 = 3;

const EPTP_RESERVED_MASK: u64 = crate::utils::mask(11, 7) | crate::utils::mask(63, 48);

impl EptPointer {
    /// Builds an EPTP for a 4-level hierarchy rooted at `root`.
    pub fn new(root: u64, memory_type: MemoryType, accessed_dirty: bool) -> Result<Self> {
        ensure!(root.trailing_zeros() >= PAGE_SHIFT as u32, MisalignedRootSnafu { root });
        ensure!(
            root >> PAGE_SHIFT >> PFN_BITS == 0,
            FieldOverflowSnafu {
                field: "root",
                value: root,
                bits: PFN_BITS + PAGE_SHIFT as u32
            }
        );

        let mut eptp = EptPointer(0);
        eptp.set_memory_type_bits(memory_type.bits());
        eptp.set_page_walk_length(PAGE_WALK_LENGTH_4);
        eptp.set_accessed_dirty(accessed_dirty);
        eptp.set_page_frame_number(root >> PAGE_SHIFT);

        ensure!(
            matches!(memory_type, MemoryType::Uncacheable | MemoryType::WriteBack),
            InvalidEptPointerSnafu { eptp: eptp.0 }
        );

        Ok(eptp)
    }

    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn memory_type(&self) -> Option<MemoryType> {
        MemoryType::from_bits(self.memory_type_bits())
    }

    /// Physical address of the EPT PML4 table.
    pub fn root(&self) -> u64 {
        pa_from_pfn(self.page_frame_number())
    }

    /// Performs the checks VM entry applies to the EPTP field.
    ///
    /// See `27.2.1.1 VM-Execution Control Fields`.
    pub fn validate(&self, capabilities: EptCapabilities) -> Result<()> {
        let memory_type_supported = match self.memory_type() {
            Some(MemoryType::Uncacheable) => capabilities.contains(EptCapabilities::MEMORY_TYPE_UC),
            Some(MemoryType::WriteBack) => capabilities.contains(EptCapabilities::MEMORY_TYPE_WB),
            _ => false,
        };

        let valid = memory_type_supported
            && self.page_walk_length() == PAGE_WALK_LENGTH_4
            && capabilities.contains(EptCapabilities::PAGE_WALK_LENGTH_4)
            && (!self.accessed_dirty() || capabilities.contains(EptCapabilities::ACCESSED_DIRTY))
            && self.0 & EPTP_RESERVED_MASK == 0;

        ensure!(valid, InvalidEptPointerSnafu { eptp: self.0 });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn capabilities() -> EptCapabilities {
        EptCapabilities::PAGE_WALK_LENGTH_4
            | EptCapabilities::MEMORY_TYPE_WB
            | EptCapabilities::ACCESSED_DIRTY
    }

    #[test]
    fn memory_types() {
        let valid: [u8; 5] = [0, 1, 4, 5, 6];

        for bits in 0..8u8 {
            assert_eq!(MemoryType::from_bits(bits).is_some(), valid.contains(&bits));
        }
        assert_eq!(MemoryType::try_from(7), Err(7));
        assert_eq!(MemoryType::WriteBack.bits(), 6);
    }

    #[test]
    fn builds_write_back_eptp() {
        let eptp = EptPointer::new(0x1234_5000, MemoryType::WriteBack, true).unwrap();

        assert_eq!(eptp.value(), 0x1234_505e);
        assert_eq!(eptp.root(), 0x1234_5000);
        assert_eq!(eptp.memory_type(), Some(MemoryType::WriteBack));
        assert_eq!(eptp.validate(capabilities()), Ok(()));
    }

    #[test]
    fn rejects_unsupported_eptp() {
        assert_eq!(
            EptPointer::new(0x1234_5010, MemoryType::WriteBack, false),
            Err(Error::MisalignedRoot { root: 0x1234_5010 })
        );
        assert_eq!(
            EptPointer::new(0x1000, MemoryType::WriteThrough, false),
            Err(Error::InvalidEptPointer { eptp: 0x101c })
        );

        // UC is not advertised
        let eptp = EptPointer::new(0x1000, MemoryType::Uncacheable, false).unwrap();
        assert!(eptp.validate(capabilities()).is_err());

        // Walk length of 5
        let eptp = EptPointer::from_raw(0x1026);
        assert_eq!(
            eptp.validate(capabilities()),
            Err(Error::InvalidEptPointer { eptp: 0x1026 })
        );

        // Reserved bit 48
        let eptp = EptPointer::from_raw(1 << 48 | 0x101e);
        assert!(eptp.validate(capabilities()).is_err());
        assert_eq!(EptPointer::from_raw(0x101e).validate(capabilities()), Ok(()));
    }

    #[test]
    fn capabilities_from_msr() {
        // Typical value: execute-only, 4-level, UC, WB, 2 MiB, 1 GiB, INVEPT, A/D
        let capabilities = EptCapabilities::from_msr(0x0000_0f01_0633_4141);

        assert!(capabilities.contains(EptCapabilities::EXECUTE_ONLY));
        assert!(capabilities.contains(EptCapabilities::PAGE_WALK_LENGTH_4));
        assert!(capabilities.contains(EptCapabilities::LARGE_PAGE_1GB));
        assert!(capabilities.contains(EptCapabilities::ACCESSED_DIRTY));
        assert!(capabilities.allows_page_at(Level::Pd));
        assert!(!capabilities.allows_page_at(Level::Pml4));
        assert_eq!(EptCapabilities::MSR, 0x48c);
    }
}
