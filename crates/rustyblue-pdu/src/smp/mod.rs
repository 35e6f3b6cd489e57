//! Security Manager Protocol (SMP) PDUs and pairing state
//!
//! This module provides typed views over the SMP PDUs exchanged on the LE
//! security manager channel, the pairing method selection tables and a
//! per-connection [`PairingSession`] that tracks one pairing sequence.
//! Cryptographic functions are left to the caller; confirm values, random
//! values, keys and public keys pass through as opaque byte arrays.

pub mod constants;
pub mod keys;
pub mod pairing;
pub mod pdu;
pub mod types;


// Re-export public API
pub use self::constants::*;
pub use self::keys::{ConnectionSignatureResolvingKey, DeviceKeys, IdentityResolvingKey, LongTermKey};
pub use self::pairing::{
    get_pairing_mode, pairing_mode_for_io, PairingMode, PairingSession, SmpPairingState,
};
pub use self::pdu::{
    parse_smp_pdu, SmpDecodeStats, SmpDecoder, SmpDecoderConfig, SmpEncInfoMsg,
    SmpIdentAddrInfoMsg, SmpIdentInfoMsg, SmpMasterIdentMsg, SmpPairConfirmMsg,
    SmpPairDhKeyCheckMsg, SmpPairFailedMsg, SmpPairPubKeyMsg, SmpPairRandMsg, SmpPairingMsg,
    SmpPasskeyNotification, SmpPdu, SmpPduMessage, SmpPduMsg, SmpPduUndefined,
    SmpSecurityReqMsg, SmpSignInfoMsg,
};
pub use self::types::*;
