//! Device address types carried inside PDUs

use std::fmt;
use std::str::FromStr;

/// Address type byte as used by SMP identity address information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// Public device address
    Public,
    /// Static random device address
    RandomStatic,
    /// Any other value received from a peer
    Unknown(u8),
}

impl From<u8> for AddressType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => AddressType::Public,
            0x01 => AddressType::RandomStatic,
            v => AddressType::Unknown(v),
        }
    }
}

impl From<AddressType> for u8 {
    fn from(value: AddressType) -> Self {
        match value {
            AddressType::Public => 0x00,
            AddressType::RandomStatic => 0x01,
            AddressType::Unknown(v) => v,
        }
    }
}

/// 48-bit extended unique identifier (a Bluetooth device address).
///
/// Bytes are held in wire order, i.e. little-endian, so `bytes[5]` is the
/// most significant octet shown first in the textual form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Eui48 {
    pub bytes: [u8; 6],
}

impl Eui48 {
    /// The all-zero address
    pub const ANY: Eui48 = Eui48 { bytes: [0; 6] };

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    /// Takes the first six bytes of `slice`, little-endian.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() >= 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&slice[0..6]);
            Some(Self { bytes })
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Eui48 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Error returned when parsing an `Eui48` from text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eui48ParseError;

impl fmt::Display for Eui48ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected six colon separated hex octets")
    }
}

impl std::error::Error for Eui48ParseError {}

impl FromStr for Eui48 {
    type Err = Eui48ParseError;

    /// Parses the `01:02:03:04:05:06` form, most significant octet first.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for i in (0..6).rev() {
            let part = parts.next().ok_or(Eui48ParseError)?;
            if part.len() != 2 {
                return Err(Eui48ParseError);
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| Eui48ParseError)?;
        }
        if parts.next().is_some() {
            return Err(Eui48ParseError);
        }
        Ok(Self { bytes })
    }
}
