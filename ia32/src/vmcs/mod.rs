//! VMCS component encodings as used by VMREAD and VMWRITE.
//!
//! See `Appendix B Field Encoding in VMCS` and `25.11.2 VMREAD, VMWRITE, and
//! Encodings of VMCS Fields`.

use crate::{
    error::{FieldOverflowSnafu, InvalidAccessTypeSnafu, MalformedIdentifierSnafu},
    Result,
};
use bitfield::bitfield;
use core::fmt;
use snafu::ensure;

pub mod fields;

pub use fields::{by_name, name_of, FIELDS};

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    struct RawEncoding(u32);
    impl Debug;
    high, _: 0;                                                 // [0]
    u16, index, _: 9, 1;                                        // [1-9]
    u8, ty, _: 11, 10;                                          // [10-11]
    must_be_zero, _: 12;                                        // [12]
    u8, width, _: 14, 13;                                       // [13-14]
    upper, _: 31, 15;                                           // [15-31]
}

const INDEX_BITS: u32 = 9;

/// Which half of a 64-bit field is accessed. `High` selects bits 63:32 and is
/// only valid for 64-bit fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    #[default]
    Full,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Control,
    /// Read-only data fields, holding VM-exit information.
    VmExitInformation,
    GuestState,
    HostState,
}

impl FieldType {
    pub const fn bits(self) -> u8 {
        match self {
            FieldType::Control => 0,
            FieldType::VmExitInformation => 1,
            FieldType::GuestState => 2,
            FieldType::HostState => 3,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => FieldType::Control,
            1 => FieldType::VmExitInformation,
            2 => FieldType::GuestState,
            _ => FieldType::HostState,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Control => "control",
            FieldType::VmExitInformation => "read-only",
            FieldType::GuestState => "guest-state",
            FieldType::HostState => "host-state",
        };

        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldWidth {
    Word,
    Quadword,
    Doubleword,
    /// 64 bits on processors supporting Intel 64, 32 bits otherwise.
    Natural,
}

impl FieldWidth {
    pub const fn bits(self) -> u8 {
        match self {
            FieldWidth::Word => 0,
            FieldWidth::Quadword => 1,
            FieldWidth::Doubleword => 2,
            FieldWidth::Natural => 3,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => FieldWidth::Word,
            1 => FieldWidth::Quadword,
            2 => FieldWidth::Doubleword,
            _ => FieldWidth::Natural,
        }
    }
}

impl fmt::Display for FieldWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldWidth::Word => "16-bit",
            FieldWidth::Quadword => "64-bit",
            FieldWidth::Doubleword => "32-bit",
            FieldWidth::Natural => "natural-width",
        };

        f.write_str(name)
    }
}

/// A decoded VMCS field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmcsField {
    ty: FieldType,
    width: FieldWidth,
    index: u16,
    access: AccessType,
}

impl VmcsField {
    pub fn new(ty: FieldType, width: FieldWidth, index: u16, access: AccessType) -> Result<Self> {
        let index = u64::from(index);
        ensure!(
            index >> INDEX_BITS == 0,
            FieldOverflowSnafu {
                field: "index",
                value: index,
                bits: INDEX_BITS
            }
        );

        let field = Self {
            ty,
            width,
            index: index as u16,
            access,
        };
        ensure!(
            access == AccessType::Full || width == FieldWidth::Quadword,
            InvalidAccessTypeSnafu {
                encoding: u32::from(field.encode())
            }
        );

        Ok(field)
    }

    /// Compile time constructor for the full access of a field.
    pub(crate) const fn full(ty: FieldType, width: FieldWidth, index: u16) -> Self {
        assert!(index < 1 << INDEX_BITS);

        Self {
            ty,
            width,
            index,
            access: AccessType::Full,
        }
    }

    /// Packs the field into its 16-bit identifier. Bit 12 is always clear.
    pub const fn encode(self) -> u16 {
        let high = match self.access {
            AccessType::Full => 0,
            AccessType::High => 1,
        };

        high | self.index << 1 | (self.ty.bits() as u16) << 10 | (self.width.bits() as u16) << 13
    }

    /// Decodes a VMREAD/VMWRITE operand.
    ///
    /// Bits 31:15 and bit 12 must be clear, and `High` is only accepted for
    /// 64-bit fields.
    pub fn decode(encoding: u32) -> Result<Self> {
        let raw = RawEncoding(encoding);
        ensure!(
            !raw.must_be_zero() && raw.upper() == 0,
            MalformedIdentifierSnafu { encoding }
        );

        let width = FieldWidth::from_bits(raw.width());
        ensure!(
            !raw.high() || width == FieldWidth::Quadword,
            InvalidAccessTypeSnafu { encoding }
        );

        Ok(Self {
            ty: FieldType::from_bits(raw.ty()),
            width,
            index: raw.index(),
            access: if raw.high() {
                AccessType::High
            } else {
                AccessType::Full
            },
        })
    }

    /// The identifier of the upper 32 bits of a 64-bit field.
    pub fn high(self) -> Option<Self> {
        (self.width == FieldWidth::Quadword).then_some(Self {
            access: AccessType::High,
            ..self
        })
    }

    /// The identifier accessing the complete field.
    pub fn full_field(self) -> Self {
        Self {
            access: AccessType::Full,
            ..self
        }
    }

    /// Architectural name of the field, ignoring the access type.
    pub fn name(&self) -> Option<&'static str> {
        name_of(*self)
    }

    pub const fn ty(&self) -> FieldType {
        self.ty
    }

    pub const fn width(&self) -> FieldWidth {
        self.width
    }

    pub const fn index(&self) -> u16 {
        self.index
    }

    pub const fn access(&self) -> AccessType {
        self.access
    }
}

impl fmt::Display for VmcsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} ({} {} #{}", self.encode(), self.width, self.ty, self.index)?;
        if self.access == AccessType::High {
            f.write_str(", high")?;
        }
        f.write_str(")")?;

        if let Some(name) = self.name() {
            write!(f, " {}", name)?;
        }

        Ok(())
    }
}

/// Packs the sub-fields into a 16-bit identifier.
pub fn encode(ty: FieldType, width: FieldWidth, index: u16, access: AccessType) -> Result<u16> {
    VmcsField::new(ty, width, index, access).map(VmcsField::encode)
}

/// Unpacks a 16-bit identifier.
pub fn decode(identifier: u16) -> Result<VmcsField> {
    VmcsField::decode(identifier.into())
}
