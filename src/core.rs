//! Defines the raw-bit "data contract" shared by the schema conversions, the
//! bit reader/writer and the content-model engine.
//!
//! Every raw field value travels as a [`RawBits`]: an MSB-first bit string whose
//! bit 0 is the most significant bit of the field as it appears on the wire.
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Bit string of arbitrary length, packed MSB-first into bytes.
///
/// Bit `i` lives in `bytes[i / 8]` at position `7 - i % 8`. Bits past `len`
/// inside the last byte are always kept at zero so two equal bit strings
/// compare equal byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawBits {
    bytes: Vec<u8>,
    len: usize,
}

impl RawBits {
    /// Create an empty bit string.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            len: 0,
        }
    }

    /// Create `len` bits, all cleared.
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Wrap whole bytes; the bit length is `8 * bytes.len()`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            len: bytes.len() * 8,
        }
    }

    /// Wrap the first `len` bits of `bytes`. `len` is clamped to the
    /// available bits.
    pub fn from_bytes_with_len(bytes: &[u8], len: usize) -> Self {
        let len = len.min(bytes.len() * 8);
        let mut bits = Self {
            bytes: bytes[..len.div_ceil(8)].to_vec(),
            len,
        };
        bits.clear_tail();
        bits
    }

    /// Lay the `len` least significant bits of `value` out MSB-first.
    /// Lengths above 64 are left-padded with zeros.
    pub fn from_u64(value: u64, len: usize) -> Self {
        let mut bits = Self::zeroed(len);
        for i in 0..len {
            let shift = len - 1 - i;
            if shift < 64 && (value >> shift) & 1 == 1 {
                bits.set_bit(i, true);
            }
        }
        bits
    }

    /// Parse a hexadecimal literal (optional `0x` prefix). Each digit
    /// contributes four bits.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if digits.is_empty() {
            return None;
        }
        let mut bits = Self::zeroed(digits.len() * 4);
        for (idx, c) in digits.chars().enumerate() {
            let nibble = c.to_digit(16)?;
            for b in 0..4 {
                if (nibble >> (3 - b)) & 1 == 1 {
                    bits.set_bit(idx * 4 + b, true);
                }
            }
        }
        Some(bits)
    }

    /// Interpret the whole bit string as an unsigned big-endian integer.
    /// Returns `None` above 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.len > 64 {
            return None;
        }
        let mut value = 0u64;
        for i in 0..self.len {
            value = (value << 1) | self.bit(i) as u64;
        }
        Some(value)
    }

    /// Hexadecimal rendering, right-aligned on the last bit (leading digit
    /// padded with zeros when the length is not a multiple of four).
    pub fn to_hex(&self) -> String {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let mut out = String::new();
        let pad = (4 - self.len % 4) % 4;
        let mut nibble = 0u8;
        let mut filled = pad;
        for i in 0..self.len {
            nibble = (nibble << 1) | self.bit(i) as u8;
            filled += 1;
            if filled == 4 {
                out.push(DIGITS[nibble as usize] as char);
                nibble = 0;
                filled = 0;
            }
        }
        out
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether no bits are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read a single bit. Out-of-range bits read as `false`.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.bytes[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Set or clear a single bit. Out-of-range writes are ignored.
    #[inline]
    pub fn set_bit(&mut self, index: usize, value: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1u8 << (7 - index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    /// Packed bytes (the unused tail of the last byte is zero).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy of the bit string fitted to `len` bits as a right-aligned number:
    /// longer strings keep their least significant bits, shorter ones are
    /// left-padded with zeros.
    pub fn fitted(&self, len: usize) -> Self {
        let mut out = Self::zeroed(len);
        for i in 0..len.min(self.len) {
            let src = self.len - 1 - i;
            let dst = len - 1 - i;
            out.set_bit(dst, self.bit(src));
        }
        out
    }

    fn clear_tail(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= 0xFFu8 << (8 - used);
            }
        }
    }
}

impl fmt::Display for RawBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

//==================================================================================RAW_SIZE
/// Raw size of a typed item or layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSize {
    /// Known number of bits.
    Fixed(u64),
    /// Taken from another item's value; not resolved yet.
    Dynamic,
    /// No raw form of its own (containers, aggregates, arrays).
    Empty,
}

impl RawSize {
    /// Size in bits when fixed.
    pub fn bits(&self) -> Option<u64> {
        match self {
            RawSize::Fixed(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for RawSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawSize::Fixed(bits) => write!(f, "{bits}"),
            RawSize::Dynamic => f.write_str("dynamic"),
            RawSize::Empty => Ok(()),
        }
    }
}
