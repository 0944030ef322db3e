//! Low-level components dedicated to bit manipulation for packet buffers.
//! Fields seldom align with byte boundaries and are laid out most significant
//! bit first, so every access works on absolute bit positions.
use crate::core::RawBits;
use crate::error::{BitReaderError, BitWriterError};

/// Reader that extracts bit segments from a [`RawBits`] buffer without
/// copying the source.
pub struct BitReader<'a> {
    /// Shared source buffer (typically the packet handed to the model).
    buffer: &'a RawBits,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a RawBits) -> Self {
        Self { buffer }
    }

    /// Copy `num_bits` bits starting at absolute bit `start`. Bit 0 of the
    /// result is the field's most significant bit.
    pub fn read_bits_at(&self, start: usize, num_bits: usize) -> Result<RawBits, BitReaderError> {
        let buffer_len_bits = self.buffer.len();
        let read_end_bit = start.saturating_add(num_bits);

        // Prevent reading beyond the buffer.
        if read_end_bit > buffer_len_bits {
            return Err(BitReaderError::OutOfBounds {
                start,
                asked: num_bits,
                available: buffer_len_bits.saturating_sub(start),
            });
        }

        let mut field = RawBits::zeroed(num_bits);
        for i in 0..num_bits {
            if self.buffer.bit(start + i) {
                field.set_bit(i, true);
            }
        }
        Ok(field)
    }

    /// Check whether the bits at `start` equal `expected`.
    /// Out-of-range fields never match.
    pub fn matches_at(&self, start: usize, expected: &RawBits) -> bool {
        self.read_bits_at(start, expected.len())
            .is_ok_and(|field| field == *expected)
    }
}
//==================================================================================BITWRITER

/// Writer able to lay bit segments into a [`RawBits`] buffer without
/// assuming byte alignment. Used by the encoder to rebuild packets entry by entry.
pub struct BitWriter<'a> {
    /// Target buffer (typically the packet under construction).
    buffer: &'a mut RawBits,
}

impl<'a> BitWriter<'a> {
    pub fn new(buffer: &'a mut RawBits) -> Self {
        Self { buffer }
    }

    /// Overwrite the bits starting at absolute bit `start` with `field`,
    /// most significant bit first.
    pub fn write_bits_at(&mut self, start: usize, field: &RawBits) -> Result<(), BitWriterError> {
        let buffer_len_bits = self.buffer.len();
        let write_end_bit = start.saturating_add(field.len());

        if write_end_bit > buffer_len_bits {
            return Err(BitWriterError::OutOfBounds {
                start,
                asked: field.len(),
                available: buffer_len_bits.saturating_sub(start),
            });
        }

        for i in 0..field.len() {
            self.buffer.set_bit(start + i, field.bit(i));
        }
        Ok(())
    }
}
