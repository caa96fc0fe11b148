//! Several small unsigned fields packed into one integer.
//!
//! Field 0 occupies the lowest bits; each following field sits directly
//! above the previous one. The total width is checked against a limit when
//! the layout is created, so packing never silently truncates.
//!
//! ```
//! use lexis_core::storage::FieldLayout;
//!
//! // [suffix index: 3 bits][grammeme index: 2 bits]
//! let layout = FieldLayout::new("inflection entry", &[2, 3], 64).unwrap();
//! let packed = layout.pack(&[1, 5]).unwrap();
//! assert_eq!(packed, 5 << 2 | 1);
//! assert_eq!(layout.unpack(packed).as_slice(), &[1, 5]);
//! ```

use lexis_common::utils::error::{CapacityError, Result};
use smallvec::SmallVec;

use super::bitpack::MAX_WIDTH;

/// Bit widths of the fields of one packed integer, lowest field first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    name: &'static str,
    widths: SmallVec<[u8; 4]>,
    shifts: SmallVec<[u32; 4]>,
    total: u32,
}

impl FieldLayout {
    /// Creates a layout whose widths must sum to at most `limit` bits.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::FieldOverflow`] if the widths exceed `limit`.
    pub fn new(name: &'static str, widths: &[u8], limit: u32) -> Result<Self> {
        let total: u32 = widths.iter().map(|&w| u32::from(w)).sum();
        if total > limit || total > u32::from(MAX_WIDTH) {
            return Err(CapacityError::FieldOverflow {
                field: name,
                bits: total,
                limit,
            }
            .into());
        }
        let mut shifts = SmallVec::new();
        let mut shift = 0;
        for &w in widths {
            shifts.push(shift);
            shift += u32::from(w);
        }
        Ok(Self {
            name,
            widths: widths.iter().copied().collect(),
            shifts,
            total,
        })
    }

    /// Total bits used by all fields.
    #[must_use]
    pub fn total_bits(&self) -> u32 {
        self.total
    }

    /// Width of field `index`.
    #[must_use]
    pub fn width(&self, index: usize) -> u8 {
        self.widths.get(index).copied().unwrap_or(0)
    }

    /// Bit offset of field `index`.
    #[must_use]
    pub fn shift(&self, index: usize) -> u32 {
        self.shifts.get(index).copied().unwrap_or(self.total)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    /// Returns true for a layout with no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Packs one value per field.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::ValueTooWide`] if a value does not fit its
    /// field, or [`CapacityError::FieldOverflow`] if the value count does
    /// not match the field count.
    pub fn pack(&self, values: &[u64]) -> Result<u64> {
        if values.len() != self.widths.len() {
            return Err(CapacityError::FieldOverflow {
                field: self.name,
                bits: u32::try_from(values.len()).unwrap_or(u32::MAX),
                limit: u32::try_from(self.widths.len()).unwrap_or(u32::MAX),
            }
            .into());
        }
        let mut packed = 0;
        for ((&value, &width), &shift) in values.iter().zip(&self.widths).zip(&self.shifts) {
            if value & !mask(width) != 0 {
                return Err(CapacityError::ValueTooWide { value, width }.into());
            }
            packed |= value << shift;
        }
        Ok(packed)
    }

    /// Extracts field `index` from `packed`.
    #[inline]
    #[must_use]
    pub fn get(&self, packed: u64, index: usize) -> u64 {
        extract(packed, self.shift(index), self.width(index))
    }

    /// Splits `packed` into its fields.
    #[must_use]
    pub fn unpack(&self, packed: u64) -> SmallVec<[u64; 4]> {
        self.widths
            .iter()
            .zip(&self.shifts)
            .map(|(&width, &shift)| extract(packed, shift, width))
            .collect()
    }
}

#[inline]
const fn mask(width: u8) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extracts `width` bits of `packed` starting at bit `shift`.
#[inline]
#[must_use]
pub const fn extract(packed: u64, shift: u32, width: u8) -> u64 {
    if shift >= 64 {
        0
    } else {
        (packed >> shift) & mask(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_common::utils::error::Error;

    #[test]
    fn test_pack_unpack() {
        let layout = FieldLayout::new("pattern prefix", &[3, 2, 4, 5], 64).unwrap();
        assert_eq!(layout.total_bits(), 14);
        assert_eq!(layout.shift(2), 5);

        let packed = layout.pack(&[5, 1, 9, 17]).unwrap();
        assert_eq!(packed, 5 | 1 << 3 | 9 << 5 | 17 << 9);
        assert_eq!(layout.unpack(packed).as_slice(), &[5, 1, 9, 17]);
        assert_eq!(layout.get(packed, 3), 17);
    }

    #[test]
    fn test_limit() {
        assert!(FieldLayout::new("word data", &[32, 31], 63).is_ok());
        let err = FieldLayout::new("word data", &[32, 32], 63).unwrap_err();
        assert!(matches!(
            err,
            Error::Capacity(CapacityError::FieldOverflow { bits: 64, limit: 63, .. })
        ));
        assert!(FieldLayout::new("suffix run", &[20, 13], 32).is_err());
    }

    #[test]
    fn test_value_too_wide() {
        let layout = FieldLayout::new("entry", &[2, 2], 64).unwrap();
        assert!(layout.pack(&[4, 0]).is_err());
        assert!(layout.pack(&[1]).is_err());
    }

    #[test]
    fn test_full_width_field() {
        let layout = FieldLayout::new("raw", &[64], 64).unwrap();
        assert_eq!(layout.pack(&[u64::MAX]).unwrap(), u64::MAX);
        assert_eq!(layout.get(u64::MAX, 0), u64::MAX);
        assert_eq!(layout.get(u64::MAX, 1), 0);
    }
}
