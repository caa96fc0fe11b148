//! Bit-packed arrays of unsigned integers.
//!
//! Every value occupies exactly `width` bits, where `width` is the number of
//! bits needed by the largest value in the array. Values are packed
//! least-significant bit first, so value `i` starts at bit `i * width`.
//!
//! # Serialized form
//!
//! ```text
//! width: u8 | count: u32 | ceil(count * width / 8) packed bytes
//! ```
//!
//! A loaded array is a view over the mapped bytes: [`BitPackedArray<Bytes>`]
//! holds a slice of the region, never a copy.
//!
//! # Example
//!
//! ```
//! use lexis_core::storage::BitPackedArray;
//!
//! let packed = BitPackedArray::from_values(&[1, 5, 3, 7]);
//! assert_eq!(packed.width(), 3);
//! assert_eq!(packed.get(1), Some(5));
//! ```

use std::io::Write;

use byteorder::{NativeEndian, WriteBytesExt};
use bytes::Bytes;
use lexis_common::memory::ByteCursor;
use lexis_common::utils::error::{CapacityError, Error, FormatError, Result};

/// Widest value a packed array can hold.
pub const MAX_WIDTH: u8 = 64;

/// Returns the number of bits needed to store `max_value`.
///
/// The result is at least 1, so an all-zero array still reserves storage.
#[inline]
#[must_use]
pub const fn calculate_bit_width(max_value: u64) -> u8 {
    let bits = 64 - max_value.leading_zeros();
    if bits == 0 { 1 } else { bits as u8 }
}

#[inline]
const fn width_mask(width: u8) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[inline]
fn packed_len(len: usize, width: u8) -> usize {
    (len as u64 * u64::from(width)).div_ceil(8) as usize
}

/// Fixed-width array of unsigned integers.
///
/// `B` is the backing storage: `Vec<u8>` while building, [`Bytes`] once
/// frozen or loaded from a mapped file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPackedArray<B = Bytes> {
    width: u8,
    len: usize,
    data: B,
}

impl BitPackedArray<Vec<u8>> {
    /// Creates a zeroed array of `len` values of `width` bits.
    ///
    /// # Errors
    ///
    /// Returns an error if `width` is 0 or above 64.
    pub fn with_width(width: u8, len: usize) -> Result<Self> {
        if width == 0 || width > MAX_WIDTH {
            return Err(CapacityError::FieldOverflow {
                field: "bit-packed width",
                bits: u32::from(width),
                limit: u32::from(MAX_WIDTH),
            }
            .into());
        }
        Ok(Self {
            width,
            len,
            data: vec![0; packed_len(len, width)],
        })
    }

    /// Packs `values` at the width of their bitwise OR.
    #[must_use]
    pub fn from_values(values: &[u64]) -> Self {
        let all_bits = values.iter().fold(0, |acc, &v| acc | v);
        let width = calculate_bit_width(all_bits);
        let mut data = vec![0; packed_len(values.len(), width)];
        for (i, &value) in values.iter().enumerate() {
            store(&mut data, width, i, value);
        }
        Self {
            width,
            len: values.len(),
            data,
        }
    }

    /// Stores `value` at `index`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::ValueTooWide`] if `value` does not fit the
    /// array's width, or [`Error::IndexOutOfBounds`] for a bad index.
    pub fn write(&mut self, index: usize, value: u64) -> Result<()> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if value & !width_mask(self.width) != 0 {
            return Err(CapacityError::ValueTooWide {
                value,
                width: self.width,
            }
            .into());
        }
        store(&mut self.data, self.width, index, value);
        Ok(())
    }

    /// Converts the builder into a shareable, read-only array.
    #[must_use]
    pub fn freeze(self) -> BitPackedArray<Bytes> {
        BitPackedArray {
            width: self.width,
            len: self.len,
            data: Bytes::from(self.data),
        }
    }
}

fn store(data: &mut [u8], width: u8, index: usize, value: u64) {
    let bit = index as u64 * u64::from(width);
    let start = (bit / 8) as usize;
    let shift = (bit % 8) as u32;
    let end = (bit + u64::from(width)).div_ceil(8) as usize;

    let clear = u128::from(width_mask(width)) << shift;
    let bits = u128::from(value) << shift;
    for (i, byte) in data[start..end].iter_mut().enumerate() {
        let s = 8 * i as u32;
        *byte = (*byte & !((clear >> s) as u8)) | (bits >> s) as u8;
    }
}

impl<B: AsRef<[u8]>> BitPackedArray<B> {
    /// Bits per value.
    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value at `index`, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u64> {
        if index >= self.len {
            return None;
        }
        let bit = index as u64 * u64::from(self.width);
        let start = (bit / 8) as usize;
        let shift = (bit % 8) as u32;
        let end = (bit + u64::from(self.width)).div_ceil(8) as usize;

        // At most 9 bytes: a 64-bit value starting mid-byte.
        let mut acc = 0u128;
        for (i, &byte) in self.data.as_ref().get(start..end)?.iter().enumerate() {
            acc |= u128::from(byte) << (8 * i);
        }
        Some((acc >> shift) as u64 & width_mask(self.width))
    }

    /// Returns the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] past the end.
    pub fn read(&self, index: usize) -> Result<u64> {
        self.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.len,
        })
    }

    /// Iterates all values in index order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Raw packed bytes, without the width and count prefix.
    #[must_use]
    pub fn packed_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Size of the serialized form in bytes.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        1 + 4 + self.data.as_ref().len()
    }

    /// Writes the width, the count, and the packed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the count does not fit in 32 bits or the writer
    /// fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let count = u32::try_from(self.len).map_err(|_| CapacityError::CountOverflow {
            field: "bit-packed array",
            count: self.len,
        })?;
        writer.write_u8(self.width)?;
        writer.write_u32::<NativeEndian>(count)?;
        writer.write_all(self.data.as_ref())?;
        Ok(())
    }
}

impl BitPackedArray<Bytes> {
    /// Reads an array at the cursor, sharing the cursor's bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the width is invalid or the region is too
    /// short for the declared count.
    pub fn deserialize(cursor: &mut ByteCursor) -> Result<Self> {
        let width = cursor.read_u8()?;
        if width == 0 || width > MAX_WIDTH {
            return Err(FormatError::corrupt("bit-packed array", format!("width {width}")).into());
        }
        let len = cursor.read_u32()? as usize;
        let data = cursor.read_bytes(packed_len(len, width))?;
        Ok(Self { width, len, data })
    }
}

impl Default for BitPackedArray<Bytes> {
    fn default() -> Self {
        Self {
            width: 1,
            len: 0,
            data: Bytes::new(),
        }
    }
}
