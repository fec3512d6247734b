//! Exit qualification of EPT violations.
//!
//! See `28.2.1 Basic VM-Exit Information`, Table 28-7.

use super::{EptAccess, EptTranslation};
use bitflags::bitflags;

bitflags! {
    pub struct EptViolation: u64 {
        /// Bit 0: set if the access causing the EPT violation was a data read.
        const READ                          = 1 << 0;
        /// Bit 1: set if the access causing the EPT violation was a data write.
        const WRITE                         = 1 << 1;
        /// Bit 2: set if the access causing the EPT violation was an instruction fetch.
        const EXECUTE                       = 1 << 2;
        /// Bit 3: the logical-AND of bit 0 in the EPT entries used to translate the
        /// guest-physical address.
        const READABLE                      = 1 << 3;
        /// Bit 4: the logical-AND of bit 1 in the EPT entries.
        const WRITABLE                      = 1 << 4;
        /// Bit 5: the logical-AND of bit 2 in the EPT entries.
        const EXECUTABLE                    = 1 << 5;
        /// Bit 6: the logical-AND of bit 10 in the EPT entries, with mode-based
        /// execute control enabled.
        const USER_EXECUTABLE               = 1 << 6;
        /// Bit 7: set if the guest linear-address field is valid.
        const GUEST_LINEAR_ADDRESS_VALID    = 1 << 7;
        /// Bit 8: set if the access was to the translation of a linear address, cleared if
        /// it was to a paging-structure entry.
        const TRANSLATED_ACCESS             = 1 << 8;
        const USER_MODE_LINEAR_ADDRESS      = 1 << 9;
        const READ_WRITE_PAGE               = 1 << 10;
        const EXECUTE_DISABLE_PAGE          = 1 << 11;
        /// Bit 12: NMI unblocking due to IRET.
        const NMI_UNBLOCKING                = 1 << 12;
    }
}

/// The kind of guest access that was translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
    Execute,
}

impl AccessKind {
    /// Permission an EPT walk must grant for this access.
    pub const fn required(self) -> EptAccess {
        match self {
            AccessKind::Read => EptAccess::READ,
            AccessKind::Write => EptAccess::WRITE,
            AccessKind::Execute => EptAccess::EXECUTE,
        }
    }

    const fn qualification(self) -> EptViolation {
        match self {
            AccessKind::Read => EptViolation::READ,
            AccessKind::Write => EptViolation::WRITE,
            AccessKind::Execute => EptViolation::EXECUTE,
        }
    }
}

impl EptViolation {
    /// Builds the qualification for `access` when the walk granted `granted`.
    pub fn new(access: AccessKind, granted: EptAccess) -> Self {
        let mut qualification = access.qualification();
        qualification.set(EptViolation::READABLE, granted.contains(EptAccess::READ));
        qualification.set(EptViolation::WRITABLE, granted.contains(EptAccess::WRITE));
        qualification.set(EptViolation::EXECUTABLE, granted.contains(EptAccess::EXECUTE));
        qualification.set(
            EptViolation::USER_EXECUTABLE,
            granted.contains(EptAccess::USER_EXECUTE),
        );
        qualification
    }

    /// Qualification of an access to a guest-physical address that is not
    /// present. Bits 5:3 are cleared.
    pub fn not_present(access: AccessKind) -> Self {
        access.qualification()
    }

    /// Marks the access as the translation of a guest linear address, with
    /// `translated` cleared when a guest paging-structure entry was accessed.
    pub fn with_linear_address(mut self, translated: bool) -> Self {
        self.insert(EptViolation::GUEST_LINEAR_ADDRESS_VALID);
        self.set(EptViolation::TRANSLATED_ACCESS, translated);
        self
    }

    pub fn access(&self) -> Option<AccessKind> {
        if self.contains(EptViolation::WRITE) {
            Some(AccessKind::Write)
        } else if self.contains(EptViolation::EXECUTE) {
            Some(AccessKind::Execute)
        } else if self.contains(EptViolation::READ) {
            Some(AccessKind::Read)
        } else {
            None
        }
    }
}

impl EptTranslation {
    /// Returns the EPT violation `access` would cause, if any.
    pub fn violation(&self, access: AccessKind) -> Option<EptViolation> {
        if self.access.contains(access.required()) {
            None
        } else {
            Some(EptViolation::new(access, self.access))
        }
    }
}
