//! RustyBlue PDU - Bluetooth LE protocol data units
//!
//! This library provides the wire layer of a Bluetooth Low Energy host:
//! typed views over Attribute Protocol (ATT) and Security Manager Protocol
//! (SMP) PDUs, the bounds-checked octet buffers they are built on, the
//! Bluetooth UUID codec and the SMP pairing method selection.
//!
//! Inbound frames are borrowed and decoded lazily by accessor; outbound
//! PDUs are written into owned buffers by typed constructors. Transport,
//! GATT and the SMP cryptographic toolbox are left to the caller.

pub mod address;
pub mod att;
pub mod error;
pub mod octets;
pub mod smp;
pub mod uuid;

// Re-export common types for convenience
pub use address::{AddressType, Eui48};
pub use att::{parse_att_pdu, AttDecoder, AttError, AttOpcode, AttPdu, AttPduMessage, AttResult};
pub use error::{OctetError, OctetResult};
pub use octets::{Octets, OctetsMut, POctets, ROctets};
pub use smp::{
    get_pairing_mode, parse_smp_pdu, PairingMode, PairingSession, SmpDecoder, SmpError, SmpPdu,
    SmpPduMessage, SmpPairingState, SmpResult,
};
pub use uuid::{Uuid, UuidTypeSize};
