//! Forward-only cursor over a shared byte region.
//!
//! Every compiled structure is read front to back. [`ByteCursor`] wraps the
//! whole mapped region as a [`Bytes`] and hands out integers in host byte
//! order and zero-copy sub-slices. Each read checks the remaining length and
//! fails with [`FormatError::Truncated`] rather than reading past the end.

use byteorder::{ByteOrder, NativeEndian};
use bytes::Bytes;

use crate::utils::error::{FormatError, Result};

/// Bounds-checked reader over a [`Bytes`] region.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Creates a cursor at the start of `data`.
    #[must_use]
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the region.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if len > self.remaining() {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            }
            .into());
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a host-order `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(NativeEndian::read_u16(self.take(2)?))
    }

    /// Reads a host-order `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(NativeEndian::read_i16(self.take(2)?))
    }

    /// Reads a host-order `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(NativeEndian::read_u32(self.take(4)?))
    }

    /// Reads a host-order `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(NativeEndian::read_i32(self.take(4)?))
    }

    /// Reads a host-order `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(NativeEndian::read_u64(self.take(8)?))
    }

    /// Reads a host-order `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(NativeEndian::read_i64(self.take(8)?))
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Returns the next `len` bytes as a shared slice, without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let start = self.pos;
        self.take(len)?;
        Ok(self.data.slice(start..self.pos))
    }

    /// Reads a non-negative `i32` count as `usize`.
    pub fn read_count(&mut self, section: &'static str) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count)
            .map_err(|_| FormatError::corrupt(section, format!("negative count {count}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn region() -> Bytes {
        let mut buf = Vec::new();
        buf.write_u8(7).unwrap();
        buf.write_u16::<NativeEndian>(0xBEEF).unwrap();
        buf.write_i32::<NativeEndian>(-5).unwrap();
        buf.write_u64::<NativeEndian>(u64::MAX - 1).unwrap();
        buf.extend_from_slice(b"tail");
        Bytes::from(buf)
    }

    #[test]
    fn test_sequential_reads() {
        let mut cursor = ByteCursor::new(region());
        assert_eq!(cursor.read_u8().unwrap(), 7);
        assert_eq!(cursor.read_u16().unwrap(), 0xBEEF);
        assert_eq!(cursor.read_i32().unwrap(), -5);
        assert_eq!(cursor.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(cursor.read_bytes(4).unwrap().as_ref(), b"tail");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_overrun_is_an_error() {
        let mut cursor = ByteCursor::new(Bytes::from_static(&[1, 2, 3]));
        let err = cursor.read_u32().unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Format(FormatError::Truncated {
                offset: 0,
                needed: 4,
                available: 3
            })
        ));
        // A failed read does not advance.
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u16().unwrap(), NativeEndian::read_u16(&[1, 2]));
    }

    #[test]
    fn test_read_bytes_shares_storage() {
        let data = region();
        let base = data.as_ptr();
        let mut cursor = ByteCursor::new(data);
        cursor.read_u8().unwrap();
        let slice = cursor.read_bytes(2).unwrap();
        assert_eq!(slice.as_ptr(), base.wrapping_add(1));
    }

    proptest::proptest! {
        #[test]
        fn test_reads_never_pass_the_end(len in 0usize..64, reads in proptest::collection::vec(0usize..12, 0..16)) {
            let mut cursor = ByteCursor::new(Bytes::from(vec![0xA5u8; len]));
            for n in reads {
                let before = cursor.position();
                match cursor.read_bytes(n) {
                    Ok(bytes) => {
                        proptest::prop_assert_eq!(bytes.len(), n);
                        proptest::prop_assert_eq!(cursor.position(), before + n);
                    }
                    Err(_) => {
                        proptest::prop_assert!(n > len - before);
                        proptest::prop_assert_eq!(cursor.position(), before);
                    }
                }
                proptest::prop_assert!(cursor.position() <= len);
            }
        }
    }

    #[test]
    fn test_negative_count() {
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(-1).unwrap();
        let mut cursor = ByteCursor::new(Bytes::from(buf));
        assert!(cursor.read_count("test").is_err());
    }
}
