//! Constants for the Security Manager Protocol

// SMP command codes
pub const SMP_PAIRING_REQUEST: u8 = 0x01;
pub const SMP_PAIRING_RESPONSE: u8 = 0x02;
pub const SMP_PAIRING_CONFIRM: u8 = 0x03;
pub const SMP_PAIRING_RANDOM: u8 = 0x04;
pub const SMP_PAIRING_FAILED: u8 = 0x05;
pub const SMP_ENCRYPTION_INFORMATION: u8 = 0x06;
pub const SMP_MASTER_IDENTIFICATION: u8 = 0x07;
pub const SMP_IDENTITY_INFORMATION: u8 = 0x08;
pub const SMP_IDENTITY_ADDRESS_INFORMATION: u8 = 0x09;
pub const SMP_SIGNING_INFORMATION: u8 = 0x0A;
pub const SMP_SECURITY_REQUEST: u8 = 0x0B;
pub const SMP_PAIRING_PUBLIC_KEY: u8 = 0x0C;
pub const SMP_PAIRING_DHK_CHECK: u8 = 0x0D;
pub const SMP_PAIRING_KEYPRESS_NOTIFICATION: u8 = 0x0E;

// SMP fixed channel ID
pub const SMP_CID: u16 = 0x0006;

/// Minimum MTU of the LE security manager channel
pub const SMP_MIN_MTU: u16 = 23;
/// MTU required once LE Secure Connections public keys are exchanged
pub const SMP_SC_MTU: u16 = 65;

/// Offset of the parameters, right after the opcode
pub const SMP_DATA_OFFSET: usize = 1;

// IO Capability values
pub const SMP_IO_CAPABILITY_DISPLAY_ONLY: u8 = 0x00;
pub const SMP_IO_CAPABILITY_DISPLAY_YES_NO: u8 = 0x01;
pub const SMP_IO_CAPABILITY_KEYBOARD_ONLY: u8 = 0x02;
pub const SMP_IO_CAPABILITY_NO_INPUT_NO_OUTPUT: u8 = 0x03;
pub const SMP_IO_CAPABILITY_KEYBOARD_DISPLAY: u8 = 0x04;
/// Local marker for a capability not yet known, never sent on the wire
pub const SMP_IO_CAPABILITY_UNSET: u8 = 0xFF;

// OOB data flag
pub const SMP_OOB_AUTH_DATA_NOT_PRESENT: u8 = 0x00;
pub const SMP_OOB_AUTH_DATA_PRESENT: u8 = 0x01;

// Pairing Failed reason codes
pub const SMP_REASON_PASSKEY_ENTRY_FAILED: u8 = 0x01;
pub const SMP_REASON_OOB_NOT_AVAILABLE: u8 = 0x02;
pub const SMP_REASON_AUTHENTICATION_REQUIREMENTS: u8 = 0x03;
pub const SMP_REASON_CONFIRM_VALUE_FAILED: u8 = 0x04;
pub const SMP_REASON_PAIRING_NOT_SUPPORTED: u8 = 0x05;
pub const SMP_REASON_ENCRYPTION_KEY_SIZE: u8 = 0x06;
pub const SMP_REASON_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SMP_REASON_UNSPECIFIED_REASON: u8 = 0x08;
pub const SMP_REASON_REPEATED_ATTEMPTS: u8 = 0x09;
pub const SMP_REASON_INVALID_PARAMETERS: u8 = 0x0A;
pub const SMP_REASON_DHKEY_CHECK_FAILED: u8 = 0x0B;
pub const SMP_REASON_NUMERIC_COMPARISON_FAILED: u8 = 0x0C;
pub const SMP_REASON_BR_EDR_PAIRING_IN_PROGRESS: u8 = 0x0D;
pub const SMP_REASON_CROSS_TRANSPORT_KEY_NOT_ALLOWED: u8 = 0x0E;

// SMP encryption key size limits
pub const SMP_MIN_ENCRYPTION_KEY_SIZE: u8 = 7;
pub const SMP_MAX_ENCRYPTION_KEY_SIZE: u8 = 16;

// Keypress notification types
pub const SMP_KEYPRESS_ENTRY_STARTED: u8 = 0x00;
pub const SMP_KEYPRESS_DIGIT_ENTERED: u8 = 0x01;
pub const SMP_KEYPRESS_DIGIT_ERASED: u8 = 0x02;
pub const SMP_KEYPRESS_CLEARED: u8 = 0x03;
pub const SMP_KEYPRESS_ENTRY_COMPLETED: u8 = 0x04;

// SMP timeout values (in milliseconds)
pub const SMP_TIMEOUT_GENERAL: u64 = 30000; // 30 seconds general timeout
pub const SMP_TIMEOUT_PASSKEY: u64 = 60000; // 60 seconds for passkey entry

// Fixed payload widths
pub const SMP_PAIRING_PARAM_LEN: usize = 6;
pub const SMP_KEY_LEN: usize = 16;
pub const SMP_PUBLIC_KEY_COORD_LEN: usize = 32;
