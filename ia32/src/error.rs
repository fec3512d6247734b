use crate::paging::Level;
use snafu::prelude::*;

/// Everything that can go wrong while decoding, encoding or walking the
/// structures of this crate.
///
/// None of these are fixed up. The offending level and the raw value are
/// kept so the caller can build the architectural fault (#PF, EPT violation,
/// EPT misconfiguration or VMfailValid) from it.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Entry at {} is not present", level))]
    NotPresent { level: Level },

    #[snafu(display("Reserved bits set in {} entry {:#x}", level, entry))]
    ReservedBitsSet { level: Level, entry: u64 },

    #[snafu(display("Invalid EPT memory type in {} entry {:#x}", level, entry))]
    MisconfiguredMemoryType { level: Level, entry: u64 },

    #[snafu(display("Invalid EPT permissions in {} entry {:#x}", level, entry))]
    MisconfiguredPermissions { level: Level, entry: u64 },

    #[snafu(display("Value {:#x} does not fit into the {}-bit field `{}`", value, bits, field))]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[snafu(display("Malformed VMCS field encoding {:#x}", encoding))]
    MalformedIdentifier { encoding: u32 },

    #[snafu(display("High access type used on a non 64-bit VMCS field {:#x}", encoding))]
    InvalidAccessType { encoding: u32 },

    #[snafu(display("{} entries cannot map a page", level))]
    LargePageNotAllowed { level: Level },

    #[snafu(display("{} entries cannot reference another table", level))]
    TableNotAllowed { level: Level },

    #[snafu(display("Frame {:#x} is not aligned to the page size of a {} entry", frame, level))]
    MisalignedFrame { level: Level, frame: u64 },

    #[snafu(display("Root table {:#x} is not page aligned", root))]
    MisalignedRoot { root: u64 },

    #[snafu(display("Address {:#x} is not canonical", address))]
    NonCanonicalAddress { address: u64 },

    #[snafu(display("Address {:#x} is outside of the translated address space", address))]
    AddressOutOfRange { address: u64 },

    #[snafu(display("Failed to read {} entry at {:#x}", level, address))]
    TableOutOfBounds { level: Level, address: u64 },

    #[snafu(display("Invalid EPT pointer {:#x}", eptp))]
    InvalidEptPointer { eptp: u64 },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
