//! Read-only view over the physical memory that holds the translation tables.

/// Physical memory used for table walks.
///
/// The walkers never write through this trait: reflecting accessed/dirty
/// bits back into the tables is left to the caller, which gets the address
/// of every entry it read from the walk path.
pub trait PhysicalMemory {
    /// Reads the little-endian `u64` at `address`, or `None` if the address
    /// is not backed by this view.
    fn read_u64(&self, address: u64) -> Option<u64>;

    /// Reads the little-endian `u32` at `address`, or `None` if the address
    /// is not backed by this view.
    fn read_u32(&self, address: u64) -> Option<u32>;
}

impl<T: PhysicalMemory + ?Sized> PhysicalMemory for &T {
    #[inline]
    fn read_u64(&self, address: u64) -> Option<u64> {
        <T as PhysicalMemory>::read_u64(&**self, address)
    }

    #[inline]
    fn read_u32(&self, address: u64) -> Option<u32> {
        <T as PhysicalMemory>::read_u32(&**self, address)
    }
}

/// A flat memory image where the physical address is the offset into the
/// slice.
impl PhysicalMemory for [u8] {
    fn read_u64(&self, address: u64) -> Option<u64> {
        let bytes = read_array::<8>(self, address)?;
        Some(u64::from_le_bytes(bytes))
    }

    fn read_u32(&self, address: u64) -> Option<u32> {
        let bytes = read_array::<4>(self, address)?;
        Some(u32::from_le_bytes(bytes))
    }
}

impl<const N: usize> PhysicalMemory for [u8; N] {
    #[inline]
    fn read_u64(&self, address: u64) -> Option<u64> {
        self.as_slice().read_u64(address)
    }

    #[inline]
    fn read_u32(&self, address: u64) -> Option<u32> {
        self.as_slice().read_u32(address)
    }
}

fn read_array<const N: usize>(image: &[u8], address: u64) -> Option<[u8; N]> {
    let start = usize::try_from(address).ok()?;
    let end = start.checked_add(N)?;

    image.get(start..end)?.try_into().ok()
}
