use crate::error::{FieldOverflowSnafu, Result};
use snafu::ensure;

pub mod memory;

/// Checks that `value` can be stored in a `bits` wide field without losing
/// any of its bits.
pub(crate) fn ensure_fits(field: &'static str, value: u64, bits: u32) -> Result<u64> {
    ensure!(
        bits >= u64::BITS || value >> bits == 0,
        FieldOverflowSnafu { field, value, bits }
    );

    Ok(value)
}

/// [`ensure_fits`] for the narrow fields stored as `u8`.
pub(crate) fn fit_u8(field: &'static str, value: u8, bits: u32) -> Result<u8> {
    ensure_fits(field, value.into(), bits).map(|value| value as u8)
}

/// Returns a mask with the bits `lsb..=msb` set.
pub(crate) const fn mask(msb: u32, lsb: u32) -> u64 {
    (u64::MAX >> (63 - msb)) & !((1u64 << lsb) - 1)
}
