/// One bit per tracked page, most significant bit first within a byte.
///
/// Bit `i` lives in byte `i / 8` under mask `0x80 >> (i % 8)`. Indices at or
/// beyond [`bits`](Self::bits) are outside the bitmap: reads return `false`
/// and writes are ignored.
pub struct Bitmap<'a> {
    bytes: &'a mut [u8],
    bits: u64,
}

impl<'a> Bitmap<'a> {
    /// Bytes of storage needed for `bits` bits (`bits / 8 + 1`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn storage_bytes(bits: u64) -> usize {
        (bits / 8 + 1) as usize
    }

    /// Wraps `bytes` and clears it.
    ///
    /// The tracked bit count is capped to what `bytes` can hold.
    pub fn new_zeroed(bytes: &'a mut [u8], bits: u64) -> Self {
        bytes.fill(0);
        let bits = bits.min(bytes.len() as u64 * 8);
        Self { bytes, bits }
    }

    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.bits
    }

    /// Size of the backing storage in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn locate(&self, index: u64) -> Option<(usize, u8)> {
        (index < self.bits).then(|| ((index / 8) as usize, 0x80 >> (index % 8)))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: u64) -> bool {
        self.locate(index)
            .is_some_and(|(byte, mask)| self.bytes[byte] & mask != 0)
    }

    /// Sets bit `index` to `value`. Returns `false` if the index is outside
    /// the bitmap.
    #[inline]
    pub fn set(&mut self, index: u64, value: bool) -> bool {
        let Some((byte, mask)) = self.locate(index) else {
            return false;
        };
        if value {
            self.bytes[byte] |= mask;
        } else {
            self.bytes[byte] &= !mask;
        }
        true
    }

    /// First clear bit at or after `from`.
    #[must_use]
    pub fn next_clear(&self, from: u64) -> Option<u64> {
        let mut index = from;
        while index < self.bits {
            let (byte, _) = self.locate(index)?;
            // Skip whole bytes that are fully locked.
            if index % 8 == 0 && self.bytes[byte] == 0xFF {
                index += 8;
                continue;
            }
            if !self.get(index) {
                return Some(index);
            }
            index += 1;
        }
        None
    }
}
