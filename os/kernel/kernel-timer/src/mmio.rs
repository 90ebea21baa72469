use kernel_memory_addresses::VirtualAddress;

/// Register-block access by byte offset.
///
/// Reads take `&self` because device registers change underneath us anyway;
/// implementations must not cache.
pub trait Mmio {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&mut self, offset: usize, value: u32);
    fn read64(&self, offset: usize) -> u64;
    fn write64(&mut self, offset: usize, value: u64);
}

/// Volatile accesses to a mapped register window.
#[derive(Debug)]
pub struct VolatileMmio {
    base: *mut u8,
    len: usize,
}

impl VolatileMmio {
    /// # Safety
    /// `[base, base + len)` must be mapped (uncached, for real devices) for
    /// as long as the value lives, and nothing else may drive the device.
    #[must_use]
    pub unsafe fn new(base: VirtualAddress, len: usize) -> Self {
        Self {
            base: base.as_u64() as *mut u8,
            len,
        }
    }

    #[must_use]
    pub fn base(&self) -> VirtualAddress {
        VirtualAddress::from_ptr(self.base.cast_const())
    }

    fn reg<T>(&self, offset: usize) -> *mut T {
        debug_assert!(offset + size_of::<T>() <= self.len);
        debug_assert!(offset.is_multiple_of(align_of::<T>()));
        // SAFETY: in bounds of the window promised by `new`.
        unsafe { self.base.add(offset).cast::<T>() }
    }
}

impl Mmio for VolatileMmio {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        unsafe { self.reg::<u32>(offset).read_volatile() }
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        unsafe { self.reg::<u32>(offset).write_volatile(value) }
    }

    #[inline]
    fn read64(&self, offset: usize) -> u64 {
        unsafe { self.reg::<u64>(offset).read_volatile() }
    }

    #[inline]
    fn write64(&mut self, offset: usize, value: u64) {
        unsafe { self.reg::<u64>(offset).write_volatile(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatile_window_over_host_memory() {
        let mut buf = vec![0u64; 4];
        let base = VirtualAddress::from_ptr(buf.as_mut_ptr());
        let mut mmio = unsafe { VolatileMmio::new(base, 32) };

        mmio.write32(4, 0xDEAD_BEEF);
        mmio.write64(16, 0x0123_4567_89AB_CDEF);
        assert_eq!(mmio.read32(4), 0xDEAD_BEEF);
        assert_eq!(mmio.read64(16), 0x0123_4567_89AB_CDEF);
        assert_eq!(mmio.base(), base);
        assert_eq!(buf[0], 0xDEAD_BEEF_0000_0000);
    }
}
