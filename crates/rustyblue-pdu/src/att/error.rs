//! Error handling for the ATT protocol
use super::constants::*;
use super::opcode::AttOpcode;
use crate::error::OctetError;
use std::fmt;
use thiserror::Error;

/// ATT error codes as carried by an ERROR_RSP PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttErrorCode {
    /// No error
    NoError,
    /// Invalid handle
    InvalidHandle,
    /// Read not permitted
    ReadNotPermitted,
    /// Write not permitted
    WriteNotPermitted,
    /// Invalid PDU
    InvalidPdu,
    /// Insufficient authentication
    InsufficientAuthentication,
    /// Request not supported
    RequestNotSupported,
    /// Invalid offset
    InvalidOffset,
    /// Insufficient authorization
    InsufficientAuthorization,
    /// Prepare queue full
    PrepareQueueFull,
    /// Attribute not found
    AttributeNotFound,
    /// Attribute not long
    AttributeNotLong,
    /// Insufficient encryption key size
    InsufficientEncryptionKeySize,
    /// Invalid attribute value length
    InvalidAttributeValueLength,
    /// Unlikely error
    Unlikely,
    /// Insufficient encryption
    InsufficientEncryption,
    /// Unsupported group type
    UnsupportedGroupType,
    /// Insufficient resources
    InsufficientResources,
    /// Database out of sync
    DatabaseOutOfSync,
    /// Value not allowed
    ValueNotAllowed,
    /// Application error
    ApplicationError(u8),
    /// Common profile error
    CommonProfileError(u8),
    /// Unknown error code
    Unknown(u8),
}

impl From<u8> for AttErrorCode {
    fn from(code: u8) -> Self {
        match code {
            0 => AttErrorCode::NoError,
            ATT_ERROR_INVALID_HANDLE => AttErrorCode::InvalidHandle,
            ATT_ERROR_READ_NOT_PERMITTED => AttErrorCode::ReadNotPermitted,
            ATT_ERROR_WRITE_NOT_PERMITTED => AttErrorCode::WriteNotPermitted,
            ATT_ERROR_INVALID_PDU => AttErrorCode::InvalidPdu,
            ATT_ERROR_INSUFFICIENT_AUTHENTICATION => AttErrorCode::InsufficientAuthentication,
            ATT_ERROR_REQUEST_NOT_SUPPORTED => AttErrorCode::RequestNotSupported,
            ATT_ERROR_INVALID_OFFSET => AttErrorCode::InvalidOffset,
            ATT_ERROR_INSUFFICIENT_AUTHORIZATION => AttErrorCode::InsufficientAuthorization,
            ATT_ERROR_PREPARE_QUEUE_FULL => AttErrorCode::PrepareQueueFull,
            ATT_ERROR_ATTRIBUTE_NOT_FOUND => AttErrorCode::AttributeNotFound,
            ATT_ERROR_ATTRIBUTE_NOT_LONG => AttErrorCode::AttributeNotLong,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE => {
                AttErrorCode::InsufficientEncryptionKeySize
            }
            ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH => AttErrorCode::InvalidAttributeValueLength,
            ATT_ERROR_UNLIKELY => AttErrorCode::Unlikely,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION => AttErrorCode::InsufficientEncryption,
            ATT_ERROR_UNSUPPORTED_GROUP_TYPE => AttErrorCode::UnsupportedGroupType,
            ATT_ERROR_INSUFFICIENT_RESOURCES => AttErrorCode::InsufficientResources,
            ATT_ERROR_DATABASE_OUT_OF_SYNC => AttErrorCode::DatabaseOutOfSync,
            ATT_ERROR_VALUE_NOT_ALLOWED => AttErrorCode::ValueNotAllowed,
            ATT_ERROR_APPLICATION_ERROR_START..=ATT_ERROR_APPLICATION_ERROR_END => {
                AttErrorCode::ApplicationError(code)
            }
            ATT_ERROR_COMMON_PROFILE_ERROR_START..=ATT_ERROR_COMMON_PROFILE_ERROR_END => {
                AttErrorCode::CommonProfileError(code)
            }
            _ => AttErrorCode::Unknown(code),
        }
    }
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> Self {
        match code {
            AttErrorCode::NoError => 0,
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidPdu => ATT_ERROR_INVALID_PDU,
            AttErrorCode::InsufficientAuthentication => ATT_ERROR_INSUFFICIENT_AUTHENTICATION,
            AttErrorCode::RequestNotSupported => ATT_ERROR_REQUEST_NOT_SUPPORTED,
            AttErrorCode::InvalidOffset => ATT_ERROR_INVALID_OFFSET,
            AttErrorCode::InsufficientAuthorization => ATT_ERROR_INSUFFICIENT_AUTHORIZATION,
            AttErrorCode::PrepareQueueFull => ATT_ERROR_PREPARE_QUEUE_FULL,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::AttributeNotLong => ATT_ERROR_ATTRIBUTE_NOT_LONG,
            AttErrorCode::InsufficientEncryptionKeySize => {
                ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE
            }
            AttErrorCode::InvalidAttributeValueLength => ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::InsufficientEncryption => ATT_ERROR_INSUFFICIENT_ENCRYPTION,
            AttErrorCode::UnsupportedGroupType => ATT_ERROR_UNSUPPORTED_GROUP_TYPE,
            AttErrorCode::InsufficientResources => ATT_ERROR_INSUFFICIENT_RESOURCES,
            AttErrorCode::DatabaseOutOfSync => ATT_ERROR_DATABASE_OUT_OF_SYNC,
            AttErrorCode::ValueNotAllowed => ATT_ERROR_VALUE_NOT_ALLOWED,
            AttErrorCode::ApplicationError(code) => code,
            AttErrorCode::CommonProfileError(code) => code,
            AttErrorCode::Unknown(code) => code,
        }
    }
}

impl fmt::Display for AttErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, u8::from(*self))
    }
}

/// The opcode(s) a PDU type accepts when parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedOpcodes(pub AttOpcode, pub Option<AttOpcode>);

impl fmt::Display for ExpectedOpcodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(alt) => write!(f, "{} or {}", self.0, alt),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Errors raised while constructing or accessing an ATT PDU
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttError {
    #[error(transparent)]
    Octets(#[from] OctetError),

    #[error("{name}: opcode {observed}, expected {expected}")]
    OpcodeMismatch {
        name: &'static str,
        observed: AttOpcode,
        expected: ExpectedOpcodes,
    },

    #[error("{name}: PDU size {size} < minimum {min_size}")]
    PacketSize {
        name: &'static str,
        size: usize,
        min_size: usize,
    },

    #[error("{name}: {reason}")]
    ValueSize { name: &'static str, reason: String },

    #[error("{name}: invalid format 0x{format:02X}")]
    InvalidFormat { name: &'static str, format: u8 },

    #[error("ATT error response {0} on handle 0x{1:04X}")]
    Protocol(AttErrorCode, u16),
}

/// ATT Result type
pub type AttResult<T> = Result<T, AttError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trip() {
        for raw in 0..=u8::MAX {
            assert_eq!(u8::from(AttErrorCode::from(raw)), raw);
        }
        assert_eq!(AttErrorCode::from(0x0A), AttErrorCode::AttributeNotFound);
        assert_eq!(AttErrorCode::from(0x85), AttErrorCode::ApplicationError(0x85));
        assert_eq!(AttErrorCode::from(0xFE), AttErrorCode::CommonProfileError(0xFE));
        assert_eq!(AttErrorCode::from(0x40), AttErrorCode::Unknown(0x40));
    }

    #[test]
    fn test_opcode_mismatch_message_names_both_sides() {
        let err = AttError::OpcodeMismatch {
            name: "AttExchangeMtu",
            observed: AttOpcode::ReadReq,
            expected: ExpectedOpcodes(AttOpcode::ExchangeMtuReq, Some(AttOpcode::ExchangeMtuRsp)),
        };
        let msg = err.to_string();
        assert!(msg.contains("READ_REQ"));
        assert!(msg.contains("EXCHANGE_MTU_REQ"));
        assert!(msg.contains("EXCHANGE_MTU_RSP"));
    }
}
