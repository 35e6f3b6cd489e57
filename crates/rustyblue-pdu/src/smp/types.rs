//! Type definitions for the Security Manager Protocol
use super::constants::*;
use crate::error::OctetError;
use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

/// SMP opcode, the first octet of every SMP PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpOpcode {
    PairingRequest,
    PairingResponse,
    PairingConfirm,
    PairingRandom,
    PairingFailed,
    EncryptionInformation,
    MasterIdentification,
    IdentityInformation,
    IdentityAddressInformation,
    SigningInformation,
    SecurityRequest,
    PairingPublicKey,
    PairingDhkeyCheck,
    PairingKeypressNotification,
    /// Any octet outside 0x01..=0x0E
    Unknown(u8),
}

impl From<u8> for SmpOpcode {
    fn from(raw: u8) -> Self {
        match raw {
            SMP_PAIRING_REQUEST => SmpOpcode::PairingRequest,
            SMP_PAIRING_RESPONSE => SmpOpcode::PairingResponse,
            SMP_PAIRING_CONFIRM => SmpOpcode::PairingConfirm,
            SMP_PAIRING_RANDOM => SmpOpcode::PairingRandom,
            SMP_PAIRING_FAILED => SmpOpcode::PairingFailed,
            SMP_ENCRYPTION_INFORMATION => SmpOpcode::EncryptionInformation,
            SMP_MASTER_IDENTIFICATION => SmpOpcode::MasterIdentification,
            SMP_IDENTITY_INFORMATION => SmpOpcode::IdentityInformation,
            SMP_IDENTITY_ADDRESS_INFORMATION => SmpOpcode::IdentityAddressInformation,
            SMP_SIGNING_INFORMATION => SmpOpcode::SigningInformation,
            SMP_SECURITY_REQUEST => SmpOpcode::SecurityRequest,
            SMP_PAIRING_PUBLIC_KEY => SmpOpcode::PairingPublicKey,
            SMP_PAIRING_DHK_CHECK => SmpOpcode::PairingDhkeyCheck,
            SMP_PAIRING_KEYPRESS_NOTIFICATION => SmpOpcode::PairingKeypressNotification,
            other => SmpOpcode::Unknown(other),
        }
    }
}

impl From<SmpOpcode> for u8 {
    fn from(opcode: SmpOpcode) -> Self {
        match opcode {
            SmpOpcode::PairingRequest => SMP_PAIRING_REQUEST,
            SmpOpcode::PairingResponse => SMP_PAIRING_RESPONSE,
            SmpOpcode::PairingConfirm => SMP_PAIRING_CONFIRM,
            SmpOpcode::PairingRandom => SMP_PAIRING_RANDOM,
            SmpOpcode::PairingFailed => SMP_PAIRING_FAILED,
            SmpOpcode::EncryptionInformation => SMP_ENCRYPTION_INFORMATION,
            SmpOpcode::MasterIdentification => SMP_MASTER_IDENTIFICATION,
            SmpOpcode::IdentityInformation => SMP_IDENTITY_INFORMATION,
            SmpOpcode::IdentityAddressInformation => SMP_IDENTITY_ADDRESS_INFORMATION,
            SmpOpcode::SigningInformation => SMP_SIGNING_INFORMATION,
            SmpOpcode::SecurityRequest => SMP_SECURITY_REQUEST,
            SmpOpcode::PairingPublicKey => SMP_PAIRING_PUBLIC_KEY,
            SmpOpcode::PairingDhkeyCheck => SMP_PAIRING_DHK_CHECK,
            SmpOpcode::PairingKeypressNotification => SMP_PAIRING_KEYPRESS_NOTIFICATION,
            SmpOpcode::Unknown(raw) => raw,
        }
    }
}

impl SmpOpcode {
    pub fn raw(self) -> u8 {
        self.into()
    }

    pub fn name(self) -> &'static str {
        use SmpOpcode::*;
        match self {
            PairingRequest => "PAIRING_REQUEST",
            PairingResponse => "PAIRING_RESPONSE",
            PairingConfirm => "PAIRING_CONFIRM",
            PairingRandom => "PAIRING_RANDOM",
            PairingFailed => "PAIRING_FAILED",
            EncryptionInformation => "ENCRYPTION_INFORMATION",
            MasterIdentification => "MASTER_IDENTIFICATION",
            IdentityInformation => "IDENTITY_INFORMATION",
            IdentityAddressInformation => "IDENTITY_ADDRESS_INFORMATION",
            SigningInformation => "SIGNING_INFORMATION",
            SecurityRequest => "SECURITY_REQUEST",
            PairingPublicKey => "PAIRING_PUBLIC_KEY",
            PairingDhkeyCheck => "PAIRING_DHKEY_CHECK",
            PairingKeypressNotification => "PAIRING_KEYPRESS_NOTIFICATION",
            Unknown(_) => "UNDEFINED",
        }
    }
}

impl fmt::Display for SmpOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.raw())
    }
}

/// Opcode(s) a PDU type accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedSmpOpcodes(pub SmpOpcode, pub Option<SmpOpcode>);

impl fmt::Display for ExpectedSmpOpcodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(alt) => write!(f, "{} or {}", self.0, alt),
            None => write!(f, "{}", self.0),
        }
    }
}

/// SMP Error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmpError {
    #[error(transparent)]
    Octets(#[from] OctetError),

    #[error("{name}: opcode {observed} where {expected} was expected")]
    OpcodeMismatch {
        name: &'static str,
        observed: SmpOpcode,
        expected: ExpectedSmpOpcodes,
    },

    #[error("{name}: PDU of {size} bytes, at least {min_size} required")]
    PacketSize {
        name: &'static str,
        size: usize,
        min_size: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    #[error("Pairing failed: {0}")]
    PairingFailed(SmpReasonCode),

    #[error("Operation timeout")]
    Timeout,
}

/// Result type for SMP operations
pub type SmpResult<T> = Result<T, SmpError>;

/// IO capability of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpIoCapability {
    /// Display only
    DisplayOnly,
    /// Display with yes/no buttons
    DisplayYesNo,
    /// Keyboard only
    KeyboardOnly,
    /// No input and no output
    NoInputNoOutput,
    /// Keyboard and display
    KeyboardDisplay,
    /// Not yet known, local use only
    Unset,
}

impl SmpIoCapability {
    /// The five capabilities that go on the wire, in table order.
    pub const ALL: [SmpIoCapability; 5] = [
        SmpIoCapability::DisplayOnly,
        SmpIoCapability::DisplayYesNo,
        SmpIoCapability::KeyboardOnly,
        SmpIoCapability::NoInputNoOutput,
        SmpIoCapability::KeyboardDisplay,
    ];

    pub fn to_u8(self) -> u8 {
        match self {
            SmpIoCapability::DisplayOnly => SMP_IO_CAPABILITY_DISPLAY_ONLY,
            SmpIoCapability::DisplayYesNo => SMP_IO_CAPABILITY_DISPLAY_YES_NO,
            SmpIoCapability::KeyboardOnly => SMP_IO_CAPABILITY_KEYBOARD_ONLY,
            SmpIoCapability::NoInputNoOutput => SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT,
            SmpIoCapability::KeyboardDisplay => SMP_IO_CAPABILITY_KEYBOARD_DISPLAY,
            SmpIoCapability::Unset => SMP_IO_CAPABILITY_UNSET,
        }
    }

    /// Row or column of the pairing method tables, `None` for `Unset`.
    pub fn table_index(self) -> Option<usize> {
        match self {
            SmpIoCapability::Unset => None,
            cap => Some(usize::from(cap.to_u8())),
        }
    }
}

impl TryFrom<u8> for SmpIoCapability {
    type Error = SmpError;

    fn try_from(value: u8) -> SmpResult<Self> {
        match value {
            SMP_IO_CAPABILITY_DISPLAY_ONLY => Ok(SmpIoCapability::DisplayOnly),
            SMP_IO_CAPABILITY_DISPLAY_YES_NO => Ok(SmpIoCapability::DisplayYesNo),
            SMP_IO_CAPABILITY_KEYBOARD_ONLY => Ok(SmpIoCapability::KeyboardOnly),
            SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT => Ok(SmpIoCapability::NoInputNoOutput),
            SMP_IO_CAPABILITY_KEYBOARD_DISPLAY => Ok(SmpIoCapability::KeyboardDisplay),
            SMP_IO_CAPABILITY_UNSET => Ok(SmpIoCapability::Unset),
            other => Err(SmpError::InvalidParameter(format!(
                "IO capability 0x{:02X}",
                other
            ))),
        }
    }
}

impl fmt::Display for SmpIoCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// OOB authentication data flag of a pairing request or response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SmpOobDataFlag {
    #[default]
    NotPresent,
    Present,
}

impl SmpOobDataFlag {
    pub fn is_present(self) -> bool {
        self == SmpOobDataFlag::Present
    }
}

impl From<u8> for SmpOobDataFlag {
    /// Reserved values count as absent.
    fn from(value: u8) -> Self {
        if value == SMP_OOB_AUTH_DATA_PRESENT {
            SmpOobDataFlag::Present
        } else {
            SmpOobDataFlag::NotPresent
        }
    }
}

impl From<SmpOobDataFlag> for u8 {
    fn from(flag: SmpOobDataFlag) -> Self {
        match flag {
            SmpOobDataFlag::NotPresent => SMP_OOB_AUTH_DATA_NOT_PRESENT,
            SmpOobDataFlag::Present => SMP_OOB_AUTH_DATA_PRESENT,
        }
    }
}

bitflags! {
    /// Authentication requirements octet
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SmpAuthReqs: u8 {
        const BONDING = 0x01;
        /// Second bonding flag bit, reserved
        const BONDING_RFU = 0x02;
        const MITM = 0x04;
        const SECURE_CONNECTIONS = 0x08;
        const KEYPRESS = 0x10;
        const CT2 = 0x20;
        const RFU_1 = 0x40;
        const RFU_2 = 0x80;
    }
}

impl Default for SmpAuthReqs {
    fn default() -> Self {
        SmpAuthReqs::BONDING
    }
}

impl fmt::Display for SmpAuthReqs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

bitflags! {
    /// Initiator or responder key distribution octet
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SmpKeyDist: u8 {
        /// LTK via Encryption Information and Master Identification
        const ENC_KEY = 0x01;
        /// IRK via Identity Information and Identity Address Information
        const ID_KEY = 0x02;
        /// CSRK via Signing Information
        const SIGN_KEY = 0x04;
        const LINK_KEY = 0x08;
        const RFU_1 = 0x10;
        const RFU_2 = 0x20;
        const RFU_3 = 0x40;
        const RFU_4 = 0x80;
    }
}

impl fmt::Display for SmpKeyDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Reason code of a PAIRING_FAILED PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpReasonCode {
    /// 0x00, not assigned
    Undefined,
    PasskeyEntryFailed,
    OobNotAvailable,
    AuthenticationRequirements,
    ConfirmValueFailed,
    PairingNotSupported,
    EncryptionKeySize,
    CommandNotSupported,
    UnspecifiedReason,
    RepeatedAttempts,
    InvalidParameters,
    DhKeyCheckFailed,
    NumericComparisonFailed,
    BrEdrPairingInProgress,
    CrossTransportKeyNotAllowed,
    /// Reserved for future use
    Unknown(u8),
}

impl From<u8> for SmpReasonCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SmpReasonCode::Undefined,
            SMP_REASON_PASSKEY_ENTRY_FAILED => SmpReasonCode::PasskeyEntryFailed,
            SMP_REASON_OOB_NOT_AVAILABLE => SmpReasonCode::OobNotAvailable,
            SMP_REASON_AUTHENTICATION_REQUIREMENTS => SmpReasonCode::AuthenticationRequirements,
            SMP_REASON_CONFIRM_VALUE_FAILED => SmpReasonCode::ConfirmValueFailed,
            SMP_REASON_PAIRING_NOT_SUPPORTED => SmpReasonCode::PairingNotSupported,
            SMP_REASON_ENCRYPTION_KEY_SIZE => SmpReasonCode::EncryptionKeySize,
            SMP_REASON_COMMAND_NOT_SUPPORTED => SmpReasonCode::CommandNotSupported,
            SMP_REASON_UNSPECIFIED_REASON => SmpReasonCode::UnspecifiedReason,
            SMP_REASON_REPEATED_ATTEMPTS => SmpReasonCode::RepeatedAttempts,
            SMP_REASON_INVALID_PARAMETERS => SmpReasonCode::InvalidParameters,
            SMP_REASON_DHKEY_CHECK_FAILED => SmpReasonCode::DhKeyCheckFailed,
            SMP_REASON_NUMERIC_COMPARISON_FAILED => SmpReasonCode::NumericComparisonFailed,
            SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS => SmpReasonCode::BrEdrPairingInProgress,
            SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED => {
                SmpReasonCode::CrossTransportKeyNotAllowed
            }
            other => SmpReasonCode::Unknown(other),
        }
    }
}

impl From<SmpReasonCode> for u8 {
    fn from(code: SmpReasonCode) -> Self {
        match code {
            SmpReasonCode::Undefined => 0x00,
            SmpReasonCode::PasskeyEntryFailed => SMP_REASON_PASSKEY_ENTRY_FAILED,
            SmpReasonCode::OobNotAvailable => SMP_REASON_OOB_NOT_AVAILABLE,
            SmpReasonCode::AuthenticationRequirements => SMP_REASON_AUTHENTICATION_REQUIREMENTS,
            SmpReasonCode::ConfirmValueFailed => SMP_REASON_CONFIRM_VALUE_FAILED,
            SmpReasonCode::PairingNotSupported => SMP_REASON_PAIRING_NOT_SUPPORTED,
            SmpReasonCode::EncryptionKeySize => SMP_REASON_ENCRYPTION_KEY_SIZE,
            SmpReasonCode::CommandNotSupported => SMP_REASON_COMMAND_NOT_SUPPORTED,
            SmpReasonCode::UnspecifiedReason => SMP_REASON_UNSPECIFIED_REASON,
            SmpReasonCode::RepeatedAttempts => SMP_REASON_REPEATED_ATTEMPTS,
            SmpReasonCode::InvalidParameters => SMP_REASON_INVALID_PARAMETERS,
            SmpReasonCode::DhKeyCheckFailed => SMP_REASON_DHKEY_CHECK_FAILED,
            SmpReasonCode::NumericComparisonFailed => SMP_REASON_NUMERIC_COMPARISON_FAILED,
            SmpReasonCode::BrEdrPairingInProgress => SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS,
            SmpReasonCode::CrossTransportKeyNotAllowed => {
                SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED
            }
            SmpReasonCode::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SmpReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, u8::from(*self))
    }
}

/// Keypress notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmpKeypressType {
    /// Entry started
    EntryStarted,
    /// Digit entered
    DigitEntered,
    /// Digit erased
    DigitErased,
    /// Cleared
    Cleared,
    /// Entry completed
    EntryCompleted,
    Unknown(u8),
}

impl From<u8> for SmpKeypressType {
    fn from(value: u8) -> Self {
        match value {
            SMP_KEYPRESS_ENTRY_STARTED => SmpKeypressType::EntryStarted,
            SMP_KEYPRESS_DIGIT_ENTERED => SmpKeypressType::DigitEntered,
            SMP_KEYPRESS_DIGIT_ERASED => SmpKeypressType::DigitErased,
            SMP_KEYPRESS_CLEARED => SmpKeypressType::Cleared,
            SMP_KEYPRESS_ENTRY_COMPLETED => SmpKeypressType::EntryCompleted,
            other => SmpKeypressType::Unknown(other),
        }
    }
}

impl From<SmpKeypressType> for u8 {
    fn from(value: SmpKeypressType) -> Self {
        match value {
            SmpKeypressType::EntryStarted => SMP_KEYPRESS_ENTRY_STARTED,
            SmpKeypressType::DigitEntered => SMP_KEYPRESS_DIGIT_ENTERED,
            SmpKeypressType::DigitErased => SMP_KEYPRESS_DIGIT_ERASED,
            SmpKeypressType::Cleared => SMP_KEYPRESS_CLEARED,
            SmpKeypressType::EntryCompleted => SMP_KEYPRESS_ENTRY_COMPLETED,
            SmpKeypressType::Unknown(raw) => raw,
        }
    }
}

/// Parameters exchanged by PAIRING_REQUEST and PAIRING_RESPONSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmpPairingFeatures {
    /// IO Capability
    pub io_capability: SmpIoCapability,
    /// OOB data flag
    pub oob_data_flag: SmpOobDataFlag,
    /// Authentication requirements
    pub auth_reqs: SmpAuthReqs,
    /// Maximum encryption key size (7-16)
    pub max_key_size: u8,
    /// Initiator key distribution
    pub initiator_key_dist: SmpKeyDist,
    /// Responder key distribution
    pub responder_key_dist: SmpKeyDist,
}

impl Default for SmpPairingFeatures {
    fn default() -> Self {
        let dist = SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY | SmpKeyDist::SIGN_KEY;
        Self {
            io_capability: SmpIoCapability::NoInputNoOutput,
            oob_data_flag: SmpOobDataFlag::NotPresent,
            auth_reqs: SmpAuthReqs::default(),
            max_key_size: SMP_MAX_ENCRYPTION_KEY_SIZE,
            initiator_key_dist: dist,
            responder_key_dist: dist,
        }
    }
}

impl SmpPairingFeatures {
    pub fn wants_mitm(&self) -> bool {
        self.auth_reqs.contains(SmpAuthReqs::MITM)
    }

    pub fn supports_secure_connections(&self) -> bool {
        self.auth_reqs.contains(SmpAuthReqs::SECURE_CONNECTIONS)
    }

    pub fn has_oob_data(&self) -> bool {
        self.oob_data_flag.is_present()
    }
}

/// Pairing Role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingRole {
    /// Initiator of the pairing (typically Central device)
    Initiator,
    /// Responder to pairing (typically Peripheral device)
    Responder,
}

/// Security level for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// No security (unencrypted)
    None = 0,
    /// Encryption without authentication (Just Works)
    EncryptionOnly = 1,
    /// Encryption with authentication (MITM protection)
    EncryptionWithAuthentication = 2,
    /// Secure Connections with encryption and authentication
    SecureConnections = 3,
}

impl SecurityLevel {
    /// Check if this security level includes encryption
    pub fn is_encrypted(&self) -> bool {
        *self >= SecurityLevel::EncryptionOnly
    }

    /// Check if this security level includes authentication
    pub fn is_authenticated(&self) -> bool {
        *self >= SecurityLevel::EncryptionWithAuthentication
    }

    /// Check if this security level uses Secure Connections
    pub fn is_secure_connections(&self) -> bool {
        *self >= SecurityLevel::SecureConnections
    }
}
