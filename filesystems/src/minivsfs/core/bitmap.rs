// Bitmap management for MiniVSFS inode and data block allocation
// Bit 0 of byte 0 is the lowest-numbered resource; a set bit means allocated.

/// Index of the lowest clear bit below `size_bits`, or `None` when every
/// tracked bit is set.
pub fn find_free_bit(bitmap: &[u8], size_bits: u32) -> Option<u32> {
    let byte_count = (size_bits as usize + 7) / 8;

    for (byte_index, &byte) in bitmap.iter().take(byte_count).enumerate() {
        if byte == 0xFF {
            continue;
        }
        let bit = byte.trailing_ones();
        let index = byte_index as u32 * 8 + bit;
        // Clear bits past the end of the last byte do not count
        return if index < size_bits { Some(index) } else { None };
    }

    None
}

/// Mark a bit allocated. The caller guarantees `index` is in range.
pub fn set_bit(bitmap: &mut [u8], index: u32) {
    bitmap[(index / 8) as usize] |= 1 << (index % 8);
}

pub fn clear_bit(bitmap: &mut [u8], index: u32) {
    bitmap[(index / 8) as usize] &= !(1 << (index % 8));
}

pub fn is_set(bitmap: &[u8], index: u32) -> bool {
    bitmap[(index / 8) as usize] & (1 << (index % 8)) != 0
}

/// Bitmap over a borrowed region of the image buffer.
pub struct Bitmap<'a> {
    data: &'a mut [u8],
    size_bits: u32,
}

impl<'a> Bitmap<'a> {
    pub fn new(data: &'a mut [u8], size_bits: u32) -> Self {
        debug_assert!(data.len() * 8 >= size_bits as usize);
        Self { data, size_bits }
    }

    pub fn size_bits(&self) -> u32 {
        self.size_bits
    }

    pub fn find_free(&self) -> Option<u32> {
        find_free_bit(self.data, self.size_bits)
    }

    /// Find the lowest free bit and mark it allocated.
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.find_free()?;
        set_bit(self.data, index);
        Some(index)
    }

    pub fn set(&mut self, index: u32) {
        if index < self.size_bits {
            set_bit(self.data, index);
        }
    }

    pub fn clear(&mut self, index: u32) {
        if index < self.size_bits {
            clear_bit(self.data, index);
        }
    }

    pub fn is_set(&self, index: u32) -> bool {
        index < self.size_bits && is_set(self.data, index)
    }

    pub fn count_used(&self) -> u32 {
        (0..self.size_bits).filter(|&i| is_set(self.data, i)).count() as u32
    }

    pub fn count_free(&self) -> u32 {
        self.size_bits - self.count_used()
    }
}
