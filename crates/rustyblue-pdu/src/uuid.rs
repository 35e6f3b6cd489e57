//! Bluetooth UUIDs in their 16, 32 and 128-bit wire forms
//!
//! Unlike a plain 128-bit representation, [`Uuid`] remembers the width it was
//! created or received with. Two UUIDs are equal only if they share width and
//! value; use [`Uuid::equivalent`] to compare across widths through the
//! Bluetooth base UUID.

use crate::error::{OctetError, OctetResult};
use crate::octets::{check_range, Endian};
use rand::RngCore;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// The Bluetooth base UUID `00000000-0000-1000-8000-00805F9B34FB`,
/// little-endian byte order.
pub const BASE_UUID: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Little-endian octet index where a short UUID is spliced into the base UUID.
pub const BASE_UUID_OFFSET: usize = 12;

/// Width of a UUID on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UuidTypeSize {
    Uuid16 = 2,
    Uuid32 = 4,
    Uuid128 = 16,
}

impl UuidTypeSize {
    pub const fn byte_count(self) -> usize {
        self as usize
    }

    /// Maps a byte count of 2, 4 or 16 to its width.
    ///
    /// PDUs with an implicit UUID width (read-by-type requests, find-information
    /// responses) rely on this to tell which form is present.
    pub fn for_byte_count(count: usize) -> OctetResult<Self> {
        match count {
            2 => Ok(UuidTypeSize::Uuid16),
            4 => Ok(UuidTypeSize::Uuid32),
            16 => Ok(UuidTypeSize::Uuid128),
            n => Err(OctetError::IllegalArgument(format!(
                "UUID byte count {} not in {{2, 4, 16}}",
                n
            ))),
        }
    }
}

/// Free-standing form of [`UuidTypeSize::for_byte_count`].
pub fn type_size_for_byte_count(count: usize) -> OctetResult<UuidTypeSize> {
    UuidTypeSize::for_byte_count(count)
}

/// A Bluetooth UUID of one of the three wire widths.
///
/// 128-bit values are stored little-endian, as they appear on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Uuid {
    Uuid16(u16),
    Uuid32(u32),
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Creates a 128-bit UUID from big-endian (textual order) bytes.
    pub fn from_bytes_be(mut bytes: [u8; 16]) -> Self {
        bytes.reverse();
        Uuid::Uuid128(bytes)
    }

    /// Creates a 128-bit UUID from its numeric value.
    pub const fn from_u128(value: u128) -> Self {
        Uuid::Uuid128(value.to_le_bytes())
    }

    /// Creates a UUID from a little-endian slice of 2, 4 or 16 bytes.
    pub fn try_from_slice_le(slice: &[u8]) -> OctetResult<Self> {
        let type_size = UuidTypeSize::for_byte_count(slice.len())?;
        Uuid::decode(slice, 0, type_size, Endian::Little)
    }

    /// Generates a random (version 4) 128-bit UUID.
    pub fn new_random_v4() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        // big-endian layout: version nibble in octet 6, variant bits in octet 8
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Uuid::from_bytes_be(bytes)
    }

    pub fn type_size(&self) -> UuidTypeSize {
        match self {
            Uuid::Uuid16(_) => UuidTypeSize::Uuid16,
            Uuid::Uuid32(_) => UuidTypeSize::Uuid32,
            Uuid::Uuid128(_) => UuidTypeSize::Uuid128,
        }
    }

    /// Decodes a UUID of width `type_size` at `offset`.
    pub fn decode(
        buffer: &[u8],
        offset: usize,
        type_size: UuidTypeSize,
        endian: Endian,
    ) -> OctetResult<Self> {
        let len = type_size.byte_count();
        check_range(buffer.len(), offset, len)?;
        let raw = &buffer[offset..offset + len];
        let uuid = match type_size {
            UuidTypeSize::Uuid16 => {
                let b = [raw[0], raw[1]];
                Uuid::Uuid16(match endian {
                    Endian::Little => u16::from_le_bytes(b),
                    Endian::Big => u16::from_be_bytes(b),
                })
            }
            UuidTypeSize::Uuid32 => {
                let b = [raw[0], raw[1], raw[2], raw[3]];
                Uuid::Uuid32(match endian {
                    Endian::Little => u32::from_le_bytes(b),
                    Endian::Big => u32::from_be_bytes(b),
                })
            }
            UuidTypeSize::Uuid128 => {
                let mut b = [0u8; 16];
                b.copy_from_slice(raw);
                if endian == Endian::Big {
                    b.reverse();
                }
                Uuid::Uuid128(b)
            }
        };
        Ok(uuid)
    }

    /// Encodes this UUID in its own width at `offset`.
    pub fn encode(&self, buffer: &mut [u8], offset: usize, endian: Endian) -> OctetResult<()> {
        let len = self.type_size().byte_count();
        check_range(buffer.len(), offset, len)?;
        let out = &mut buffer[offset..offset + len];
        match (self, endian) {
            (Uuid::Uuid16(v), Endian::Little) => out.copy_from_slice(&v.to_le_bytes()),
            (Uuid::Uuid16(v), Endian::Big) => out.copy_from_slice(&v.to_be_bytes()),
            (Uuid::Uuid32(v), Endian::Little) => out.copy_from_slice(&v.to_le_bytes()),
            (Uuid::Uuid32(v), Endian::Big) => out.copy_from_slice(&v.to_be_bytes()),
            (Uuid::Uuid128(b), Endian::Little) => out.copy_from_slice(b),
            (Uuid::Uuid128(b), Endian::Big) => {
                out.copy_from_slice(b);
                out.reverse();
            }
        }
        Ok(())
    }

    /// Little-endian wire bytes in this UUID's width.
    pub fn to_bytes_le(&self) -> Vec<u8> {
        match self {
            Uuid::Uuid16(v) => v.to_le_bytes().to_vec(),
            Uuid::Uuid32(v) => v.to_le_bytes().to_vec(),
            Uuid::Uuid128(b) => b.to_vec(),
        }
    }

    /// Expands to 128 bits through the standard Bluetooth base UUID.
    pub fn to_uuid128(&self) -> Uuid {
        Uuid::Uuid128(self.expanded_bytes_le())
    }

    fn expanded_bytes_le(&self) -> [u8; 16] {
        match self {
            Uuid::Uuid128(b) => *b,
            _ => {
                let mut bytes = BASE_UUID;
                let short = self.to_bytes_le();
                bytes[BASE_UUID_OFFSET..BASE_UUID_OFFSET + short.len()].copy_from_slice(&short);
                bytes
            }
        }
    }

    /// Expands to 128 bits by copying the short value into `base` at the
    /// little-endian octet index `le_octet_index`.
    pub fn to_uuid128_with(&self, base: &[u8; 16], le_octet_index: usize) -> OctetResult<Uuid> {
        if let Uuid::Uuid128(_) = self {
            return Ok(*self);
        }
        let short = self.to_bytes_le();
        check_range(base.len(), le_octet_index, short.len()).map_err(|_| {
            OctetError::IllegalArgument(format!(
                "insertion index {} does not fit a {}-byte UUID",
                le_octet_index,
                short.len()
            ))
        })?;
        let mut bytes = *base;
        bytes[le_octet_index..le_octet_index + short.len()].copy_from_slice(&short);
        Ok(Uuid::Uuid128(bytes))
    }

    /// Compares two UUIDs after expanding both to 128 bits.
    pub fn equivalent(&self, other: &Uuid) -> bool {
        self.to_uuid128() == other.to_uuid128()
    }

    /// 16-bit value of this UUID, if it is one.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Uuid::Uuid16(v) => Some(*v),
            _ => None,
        }
    }

    /// Big-endian bytes of the 128-bit expansion.
    pub fn as_bytes_be(&self) -> [u8; 16] {
        let mut bytes = self.expanded_bytes_le();
        bytes.reverse();
        bytes
    }
}

impl From<u16> for Uuid {
    fn from(value: u16) -> Self {
        Uuid::Uuid16(value)
    }
}

impl From<u32> for Uuid {
    fn from(value: u32) -> Self {
        Uuid::Uuid32(value)
    }
}

impl From<[u8; 16]> for Uuid {
    /// Assumes bytes are in little-endian order.
    fn from(bytes: [u8; 16]) -> Self {
        Uuid::Uuid128(bytes)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uuid::Uuid16(v) => write!(f, "{:04x}", v),
            Uuid::Uuid32(v) => write!(f, "{:08x}", v),
            Uuid::Uuid128(_) => {
                let b = self.as_bytes_be();
                write!(
                    f,
                    "{}-{}-{}-{}-{}",
                    hex::encode(&b[0..4]),
                    hex::encode(&b[4..6]),
                    hex::encode(&b[6..8]),
                    hex::encode(&b[8..10]),
                    hex::encode(&b[10..16])
                )
            }
        }
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uuid::Uuid16(v) => write!(f, "Uuid16(0x{:04X})", v),
            Uuid::Uuid32(v) => write!(f, "Uuid32(0x{:08X})", v),
            Uuid::Uuid128(_) => write!(f, "Uuid128({})", self),
        }
    }
}

/// Errors from parsing a UUID string
#[derive(Debug, Error)]
pub enum UuidParseError {
    #[error("Invalid UUID length")]
    InvalidLength,

    #[error("Invalid UUID format")]
    InvalidFormat,

    #[error("Invalid hex: {0}")]
    HexError(#[from] hex::FromHexError),
}

impl From<ParseIntError> for UuidParseError {
    fn from(_: ParseIntError) -> Self {
        UuidParseError::InvalidFormat
    }
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    /// Accepts `180a`, `0000180a` or the 128-bit form with or without hyphens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(|c| c != '-' && !c.is_ascii_hexdigit()) {
            return Err(UuidParseError::InvalidFormat);
        }
        let cleaned: String = s.chars().filter(|c| *c != '-').collect();

        match cleaned.len() {
            4 => Ok(Uuid::Uuid16(u16::from_str_radix(&cleaned, 16)?)),
            8 => Ok(Uuid::Uuid32(u32::from_str_radix(&cleaned, 16)?)),
            32 => {
                let mut bytes_be = [0u8; 16];
                hex::decode_to_slice(&cleaned, &mut bytes_be)?;
                Ok(Uuid::from_bytes_be(bytes_be))
            }
            _ => Err(UuidParseError::InvalidLength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_size_for_byte_count() {
        assert_eq!(type_size_for_byte_count(2), Ok(UuidTypeSize::Uuid16));
        assert_eq!(type_size_for_byte_count(4), Ok(UuidTypeSize::Uuid32));
        assert_eq!(type_size_for_byte_count(16), Ok(UuidTypeSize::Uuid128));
        for n in [0usize, 1, 3, 5, 8, 15, 17, 32] {
            assert!(matches!(
                type_size_for_byte_count(n),
                Err(OctetError::IllegalArgument(_))
            ));
        }
    }

    #[test]
    fn test_expand_16bit_against_base() {
        let gap = Uuid::Uuid16(0x1800).to_uuid128();
        assert_eq!(gap.type_size(), UuidTypeSize::Uuid128);
        assert!(gap
            .to_string()
            .eq_ignore_ascii_case("00001800-0000-1000-8000-00805F9B34FB"));
        assert_eq!(
            gap,
            Uuid::from_u128(0x0000_1800_0000_1000_8000_0080_5F9B_34FB)
        );
    }

    #[test]
    fn test_expand_128bit_is_identity() {
        let u = Uuid::from_u128(0x12345678_9abc_def0_1122_334455667788);
        assert_eq!(u.to_uuid128(), u);
        assert_eq!(u.to_uuid128_with(&[0xAA; 16], 3), Ok(u));
    }

    #[test]
    fn test_expand_with_custom_base() {
        let u = Uuid::Uuid32(0xAABBCCDD)
            .to_uuid128_with(&[0u8; 16], 0)
            .unwrap();
        let mut expect = [0u8; 16];
        expect[..4].copy_from_slice(&[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(u, Uuid::Uuid128(expect));
        assert!(Uuid::Uuid32(1).to_uuid128_with(&BASE_UUID, 13).is_err());
    }

    #[test]
    fn test_equality_requires_same_width() {
        let short = Uuid::Uuid16(0x2800);
        let long = short.to_uuid128();
        assert_ne!(short, long);
        assert_ne!(Uuid::Uuid16(0x2800), Uuid::Uuid32(0x2800));
        assert!(short.equivalent(&long));
        assert!(short.equivalent(&Uuid::Uuid32(0x2800)));
    }

    #[test]
    fn test_decode_encode_endianness() {
        let raw = [0x00, 0x0A, 0x18, 0xFF];
        assert_eq!(
            Uuid::decode(&raw, 1, UuidTypeSize::Uuid16, Endian::Little),
            Ok(Uuid::Uuid16(0x180A))
        );
        assert_eq!(
            Uuid::decode(&raw, 1, UuidTypeSize::Uuid16, Endian::Big),
            Ok(Uuid::Uuid16(0x0A18))
        );
        assert!(Uuid::decode(&raw, 1, UuidTypeSize::Uuid32, Endian::Little).is_err());

        let u = Uuid::from_u128(0x000102030405060708090a0b0c0d0e0f);
        let mut be = [0u8; 16];
        u.encode(&mut be, 0, Endian::Big).unwrap();
        assert_eq!(be[0], 0x00);
        assert_eq!(be[15], 0x0f);
        assert_eq!(
            Uuid::decode(&be, 0, UuidTypeSize::Uuid128, Endian::Big),
            Ok(u)
        );

        let mut short = [0u8; 1];
        assert!(Uuid::Uuid16(1).encode(&mut short, 0, Endian::Little).is_err());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Uuid::Uuid16(0x180A).to_string(), "180a");
        assert_eq!(Uuid::Uuid32(0x0001180A).to_string(), "0001180a");
        assert_eq!(format!("{:?}", Uuid::Uuid16(0x180A)), "Uuid16(0x180A)");
    }

    #[test]
    fn test_parse() {
        assert_eq!("180A".parse::<Uuid>().unwrap(), Uuid::Uuid16(0x180A));
        assert_eq!("0000180a".parse::<Uuid>().unwrap(), Uuid::Uuid32(0x180A));
        let full: Uuid = "00001800-0000-1000-8000-00805f9b34fb".parse().unwrap();
        assert_eq!(full, Uuid::Uuid16(0x1800).to_uuid128());
        assert!("123".parse::<Uuid>().is_err());
        assert!("18zz".parse::<Uuid>().is_err());
    }

    #[test]
    fn test_random_v4() {
        let u = Uuid::new_random_v4();
        let be = u.as_bytes_be();
        assert_eq!(be[6] >> 4, 4);
        assert_eq!(be[8] & 0xC0, 0x80);
        assert_ne!(u, Uuid::new_random_v4());
    }

    #[test]
    fn test_try_from_slice() {
        assert_eq!(Uuid::try_from_slice_le(&[0x00, 0x28]), Ok(Uuid::Uuid16(0x2800)));
        assert!(Uuid::try_from_slice_le(&[0; 3]).is_err());
    }
}
