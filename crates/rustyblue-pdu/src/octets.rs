//! Bounds-checked octet buffers
//!
//! Four buffer flavours share the read API of [`Octets`]:
//!
//! - [`ROctets`]: borrowed, read-only view over received bytes
//! - [`WOctets`]: borrowed view that may be mutated in place
//! - [`POctets`]: owned buffer with a used `size` inside an allocated `capacity`
//! - [`OctetSlice`]: read-only window `(offset, size)` into another buffer
//!
//! All multi-byte integers are little-endian on the wire. Every checked accessor
//! validates `offset + width <= size` first and reports
//! [`OctetError::IndexOutOfBounds`] on violation. The `*_unchecked` siblings are
//! meant for offsets already covered by an earlier range check and panic
//! (slice indexing) if that assumption is wrong.

use crate::address::Eui48;
use crate::error::{OctetError, OctetResult};
use crate::uuid::{Uuid, UuidTypeSize};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Byte order selector for the few fields that are not always little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Validates that `[offset, offset + length)` lies within `size`.
pub fn check_range(size: usize, offset: usize, length: usize) -> OctetResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(OctetError::IndexOutOfBounds {
            index: offset,
            length,
            size,
        }),
    }
}

/// Read access shared by all buffer variants
pub trait Octets {
    /// The valid bytes, `size()` long
    fn as_slice(&self) -> &[u8];

    fn size(&self) -> usize {
        self.as_slice().len()
    }

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn check_range(&self, offset: usize, length: usize) -> OctetResult<()> {
        check_range(self.size(), offset, length)
    }

    fn is_range_valid(&self, offset: usize, length: usize) -> bool {
        self.check_range(offset, length).is_ok()
    }

    fn read_u8(&self, offset: usize) -> OctetResult<u8> {
        self.check_range(offset, 1)?;
        Ok(self.read_u8_unchecked(offset))
    }

    fn read_u8_unchecked(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    fn read_u16(&self, offset: usize) -> OctetResult<u16> {
        self.check_range(offset, 2)?;
        Ok(self.read_u16_unchecked(offset))
    }

    fn read_u16_unchecked(&self, offset: usize) -> u16 {
        LittleEndian::read_u16(&self.as_slice()[offset..offset + 2])
    }

    fn read_u32(&self, offset: usize) -> OctetResult<u32> {
        self.check_range(offset, 4)?;
        Ok(self.read_u32_unchecked(offset))
    }

    fn read_u32_unchecked(&self, offset: usize) -> u32 {
        LittleEndian::read_u32(&self.as_slice()[offset..offset + 4])
    }

    fn read_u64(&self, offset: usize) -> OctetResult<u64> {
        self.check_range(offset, 8)?;
        Ok(self.read_u64_unchecked(offset))
    }

    fn read_u64_unchecked(&self, offset: usize) -> u64 {
        LittleEndian::read_u64(&self.as_slice()[offset..offset + 8])
    }

    fn read_eui48(&self, offset: usize) -> OctetResult<Eui48> {
        self.check_range(offset, 6)?;
        Ok(self.read_eui48_unchecked(offset))
    }

    fn read_eui48_unchecked(&self, offset: usize) -> Eui48 {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&self.as_slice()[offset..offset + 6]);
        Eui48::new(bytes)
    }

    /// Reads a little-endian UUID of the given width.
    fn read_uuid(&self, offset: usize, type_size: UuidTypeSize) -> OctetResult<Uuid> {
        Uuid::decode(self.as_slice(), offset, type_size, Endian::Little)
    }

    /// Borrows `length` bytes starting at `offset`.
    fn read_bytes(&self, offset: usize, length: usize) -> OctetResult<&[u8]> {
        self.check_range(offset, length)?;
        Ok(&self.as_slice()[offset..offset + length])
    }

    /// Copies `N` bytes verbatim, without any byte order interpretation.
    fn read_array<const N: usize>(&self, offset: usize) -> OctetResult<[u8; N]> {
        self.check_range(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.as_slice()[offset..offset + N]);
        Ok(out)
    }

    /// Reads a string field of fixed width, cut at the first NUL if any.
    fn read_fixed_string(&self, offset: usize, length: usize) -> OctetResult<String> {
        let raw = self.read_bytes(offset, length)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Reads a NUL terminated string. The terminator must lie within the buffer.
    fn read_cstring(&self, offset: usize) -> OctetResult<String> {
        self.check_range(offset, 0)?;
        let tail = &self.as_slice()[offset..];
        match tail.iter().position(|&b| b == 0) {
            Some(end) => Ok(String::from_utf8_lossy(&tail[..end]).into_owned()),
            None => Err(OctetError::IndexOutOfBounds {
                index: offset,
                length: tail.len() + 1,
                size: self.size(),
            }),
        }
    }

    /// Read-only window into this buffer.
    fn slice(&self, offset: usize, length: usize) -> OctetResult<OctetSlice<'_>> {
        OctetSlice::new(self.as_slice(), offset, length)
    }

    fn to_hex_string(&self) -> String {
        hex::encode(self.as_slice())
    }
}

/// Write access for the mutable variants
pub trait OctetsMut: Octets {
    fn as_mut_slice(&mut self) -> &mut [u8];

    fn write_u8(&mut self, offset: usize, value: u8) -> OctetResult<()> {
        self.check_range(offset, 1)?;
        self.write_u8_unchecked(offset, value);
        Ok(())
    }

    fn write_u8_unchecked(&mut self, offset: usize, value: u8) {
        self.as_mut_slice()[offset] = value;
    }

    fn write_u16(&mut self, offset: usize, value: u16) -> OctetResult<()> {
        self.check_range(offset, 2)?;
        self.write_u16_unchecked(offset, value);
        Ok(())
    }

    fn write_u16_unchecked(&mut self, offset: usize, value: u16) {
        LittleEndian::write_u16(&mut self.as_mut_slice()[offset..offset + 2], value);
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> OctetResult<()> {
        self.check_range(offset, 4)?;
        LittleEndian::write_u32(&mut self.as_mut_slice()[offset..offset + 4], value);
        Ok(())
    }

    fn write_u64(&mut self, offset: usize, value: u64) -> OctetResult<()> {
        self.check_range(offset, 8)?;
        LittleEndian::write_u64(&mut self.as_mut_slice()[offset..offset + 8], value);
        Ok(())
    }

    fn write_eui48(&mut self, offset: usize, value: &Eui48) -> OctetResult<()> {
        self.write_bytes(offset, &value.bytes)
    }

    /// Writes a UUID little-endian in its own width.
    fn write_uuid(&mut self, offset: usize, value: &Uuid) -> OctetResult<()> {
        value.encode(self.as_mut_slice(), offset, Endian::Little)
    }

    /// Copies `bytes` verbatim to `offset`.
    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> OctetResult<()> {
        self.check_range(offset, bytes.len())?;
        self.as_mut_slice()[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn fill(&mut self, offset: usize, length: usize, value: u8) -> OctetResult<()> {
        self.check_range(offset, length)?;
        self.as_mut_slice()[offset..offset + length].fill(value);
        Ok(())
    }
}

/// Borrowed read-only octets
#[derive(Clone, Copy)]
pub struct ROctets<'a> {
    data: &'a [u8],
}

impl<'a> ROctets<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The referenced bytes with the lifetime of the source buffer.
    pub fn bytes(&self) -> &'a [u8] {
        self.data
    }
}

impl Octets for ROctets<'_> {
    fn as_slice(&self) -> &[u8] {
        self.data
    }
}

/// Borrowed octets that may be modified in place
pub struct WOctets<'a> {
    data: &'a mut [u8],
}

impl<'a> WOctets<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }
}

impl Octets for WOctets<'_> {
    fn as_slice(&self) -> &[u8] {
        self.data
    }
}

impl OctetsMut for WOctets<'_> {
    fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data
    }
}

/// Owned octets.
///
/// The allocation always spans `capacity()` bytes; only the first `size()`
/// of them are visible through [`Octets`]. Growing `size` inside the
/// capacity exposes whatever was there before, it is not cleared.
#[derive(Clone, Default)]
pub struct POctets {
    data: Vec<u8>,
    size: usize,
}

fn allocate(capacity: usize) -> OctetResult<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(capacity)
        .map_err(|e| OctetError::OutOfMemory(format!("{} bytes: {}", capacity, e)))?;
    data.resize(capacity, 0);
    Ok(data)
}

impl POctets {
    /// Zeroed buffer with `size == capacity`.
    pub fn new(size: usize) -> OctetResult<Self> {
        Self::with_capacity(size, size)
    }

    /// Zeroed buffer with room for `capacity` bytes, `size` of them in use.
    pub fn with_capacity(capacity: usize, size: usize) -> OctetResult<Self> {
        if size > capacity {
            return Err(OctetError::IllegalArgument(format!(
                "size {} > capacity {}",
                size, capacity
            )));
        }
        Ok(Self {
            data: allocate(capacity)?,
            size,
        })
    }

    /// Deep copy of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> OctetResult<Self> {
        let mut data = allocate(bytes.len())?;
        data.copy_from_slice(bytes);
        Ok(Self {
            data,
            size: bytes.len(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Changes the used size within the current capacity.
    pub fn resize(&mut self, new_size: usize) -> OctetResult<()> {
        if new_size > self.capacity() {
            return Err(OctetError::IllegalArgument(format!(
                "new size {} > capacity {}",
                new_size,
                self.capacity()
            )));
        }
        self.size = new_size;
        Ok(())
    }

    /// Reallocates to `new_capacity`, preserving the used content.
    pub fn recapacity(&mut self, new_capacity: usize) -> OctetResult<()> {
        if new_capacity < self.size {
            return Err(OctetError::IllegalArgument(format!(
                "new capacity {} < size {}",
                new_capacity, self.size
            )));
        }
        if new_capacity == self.capacity() {
            return Ok(());
        }
        let mut data = allocate(new_capacity)?;
        data[..self.size].copy_from_slice(&self.data[..self.size]);
        self.data = data;
        Ok(())
    }

    /// Appends `bytes`, doubling the capacity or growing it to the exact need,
    /// whichever is larger.
    pub fn append(&mut self, bytes: &[u8]) -> OctetResult<()> {
        let needed = self
            .size
            .checked_add(bytes.len())
            .ok_or_else(|| OctetError::OutOfMemory("size overflow".into()))?;
        if needed > self.capacity() {
            let doubled = self.capacity().saturating_mul(2);
            self.recapacity(doubled.max(needed))?;
        }
        self.data[self.size..needed].copy_from_slice(bytes);
        self.size = needed;
        Ok(())
    }

    /// Returns the used bytes, dropping spare capacity.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.data.truncate(self.size);
        self.data
    }
}

impl Octets for POctets {
    fn as_slice(&self) -> &[u8] {
        &self.data[..self.size]
    }
}

impl OctetsMut for POctets {
    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.size]
    }
}

/// Read-only window into a parent buffer
#[derive(Clone, Copy)]
pub struct OctetSlice<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> OctetSlice<'a> {
    pub fn new(parent: &'a [u8], offset: usize, size: usize) -> OctetResult<Self> {
        check_range(parent.len(), offset, size)?;
        Ok(Self {
            data: &parent[offset..offset + size],
            offset,
        })
    }

    /// Offset of this window within its parent
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn to_owned(&self) -> OctetResult<POctets> {
        POctets::from_slice(self.data)
    }
}

impl Octets for OctetSlice<'_> {
    fn as_slice(&self) -> &[u8] {
        self.data
    }
}

macro_rules! impl_octets_common {
    ($($ty:ty),*) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    self.as_slice() == other.as_slice()
                }
            }

            impl Eq for $ty {}

            impl PartialEq<[u8]> for $ty {
                fn eq(&self, other: &[u8]) -> bool {
                    self.as_slice() == other
                }
            }

            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}[size {}, {}]", stringify!($ty), self.size(), self.to_hex_string())
                }
            }
        )*
    };
}

impl_octets_common!(ROctets<'_>, WOctets<'_>, POctets, OctetSlice<'_>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_reads() {
        let raw = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let o = ROctets::new(&raw);
        assert_eq!(o.read_u8(0), Ok(0x01));
        assert_eq!(o.read_u16(0), Ok(0x0201));
        assert_eq!(o.read_u32(0), Ok(0x04030201));
        assert_eq!(o.read_u64(0), Ok(0x0807060504030201));
        assert_eq!(o.read_u16_unchecked(6), 0x0807);
    }

    #[test]
    fn test_read_out_of_bounds() {
        let raw = [0u8; 4];
        let o = ROctets::new(&raw);
        assert_eq!(
            o.read_u32(1),
            Err(OctetError::IndexOutOfBounds {
                index: 1,
                length: 4,
                size: 4
            })
        );
        assert!(o.read_u8(4).is_err());
        assert!(o.read_u64(0).is_err());
        assert!(o.read_eui48(0).is_err());
        // offset + length overflowing usize must not wrap around
        assert!(o.read_bytes(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_write_in_place() {
        let mut raw = [0u8; 6];
        {
            let mut w = WOctets::new(&mut raw);
            w.write_u16(0, 0xBEEF).unwrap();
            w.write_u32(2, 0x11223344).unwrap();
            assert!(w.write_u8(6, 1).is_err());
        }
        assert_eq!(raw, [0xEF, 0xBE, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_strings() {
        let raw = b"abc\0def\0\0";
        let o = ROctets::new(raw);
        assert_eq!(o.read_fixed_string(0, 3).unwrap(), "abc");
        assert_eq!(o.read_fixed_string(0, 6).unwrap(), "abc");
        assert_eq!(o.read_cstring(4).unwrap(), "def");
        assert!(ROctets::new(b"xyz").read_cstring(0).is_err());
        assert!(o.read_cstring(20).is_err());
    }

    #[test]
    fn test_poctets_resize_and_recapacity() {
        let mut p = POctets::with_capacity(8, 4).unwrap();
        assert_eq!(p.size(), 4);
        assert_eq!(p.capacity(), 8);
        p.write_u32(0, 0xAABBCCDD).unwrap();

        assert!(p.resize(9).is_err());
        p.resize(8).unwrap();
        assert_eq!(p.size(), 8);

        assert!(p.recapacity(4).is_err());
        p.resize(4).unwrap();
        p.recapacity(4).unwrap();
        assert_eq!(p.capacity(), 4);
        assert_eq!(p.read_u32(0), Ok(0xAABBCCDD));

        assert!(POctets::with_capacity(2, 3).is_err());
    }

    #[test]
    fn test_poctets_append_grows() {
        let mut p = POctets::with_capacity(4, 0).unwrap();
        p.append(&[1, 2, 3]).unwrap();
        assert_eq!(p.capacity(), 4);
        p.append(&[4, 5]).unwrap();
        assert_eq!(p.capacity(), 8);
        p.append(&[0; 20]).unwrap();
        assert_eq!(p.capacity(), 25);
        assert_eq!(p.size(), 25);
        assert_eq!(&p.as_slice()[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_poctets_equality_ignores_capacity() {
        let a = POctets::from_slice(&[1, 2, 3]).unwrap();
        let mut b = POctets::with_capacity(16, 0).unwrap();
        b.append(&[1, 2, 3]).unwrap();
        assert_eq!(a, b);
        b.append(&[4]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_poctets_clone_is_deep_and_take_empties() {
        let mut a = POctets::from_slice(&[9, 9]).unwrap();
        let b = a.clone();
        a.write_u8(0, 1).unwrap();
        assert_eq!(b.as_slice(), &[9, 9]);

        let moved = std::mem::take(&mut a);
        assert_eq!(moved.as_slice(), &[1, 9]);
        assert!(a.is_empty());
    }

    #[test]
    fn test_slice_window() {
        let raw = [0u8, 1, 2, 3, 4, 5];
        let o = ROctets::new(&raw);
        let s = o.slice(2, 3).unwrap();
        assert_eq!(s.offset(), 2);
        assert_eq!(s.as_slice(), &[2, 3, 4]);
        assert_eq!(s.read_u8(0), Ok(2));
        assert!(s.read_u8(3).is_err());
        assert!(o.slice(4, 3).is_err());
        assert_eq!(s.to_owned().unwrap().as_slice(), &[2, 3, 4]);
    }

    #[test]
    fn test_hex_debug() {
        let p = POctets::from_slice(&[0xDE, 0xAD]).unwrap();
        assert_eq!(p.to_hex_string(), "dead");
        assert_eq!(format!("{:?}", p), "POctets[size 2, dead]");
    }
}
