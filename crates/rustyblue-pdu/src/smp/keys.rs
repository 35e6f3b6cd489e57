//! Keys distributed at the end of pairing
//!
//! The peer sends its Long Term Key (LTK), Identity Resolving Key (IRK)
//! and Connection Signature Resolving Key (CSRK) as pairs or single PDUs
//! during key distribution. [`DeviceKeys`] assembles them as they arrive.

use super::pdu::{SmpEncInfoMsg, SmpIdentAddrInfoMsg, SmpIdentInfoMsg, SmpMasterIdentMsg, SmpPdu};
use super::types::*;
use crate::address::{AddressType, Eui48};
use log::{debug, warn};

/// Long Term Key (LTK) information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongTermKey {
    /// Key value
    pub key: [u8; 16],
    /// EDIV (Encrypted Diversifier)
    pub ediv: u16,
    /// RAND (Random number)
    pub rand: u64,
    /// Whether this key was generated with Secure Connections pairing
    pub secure_connections: bool,
    /// Authentication level
    pub authenticated: bool,
}

impl LongTermKey {
    /// Legacy LTK from ENCRYPTION_INFORMATION and MASTER_IDENTIFICATION
    pub fn from_pdus(
        info: &SmpEncInfoMsg<'_>,
        ident: &SmpMasterIdentMsg<'_>,
        authenticated: bool,
    ) -> Self {
        Self {
            key: info.ltk(),
            ediv: ident.ediv(),
            rand: ident.rand(),
            secure_connections: false,
            authenticated,
        }
    }

    /// Create an LTK for Secure Connections, where EDIV and Rand are zero
    pub fn new_secure_connections(key: [u8; 16], authenticated: bool) -> Self {
        Self {
            key,
            ediv: 0,
            rand: 0,
            secure_connections: true,
            authenticated,
        }
    }

    /// Get the security level provided by this key
    pub fn security_level(&self) -> SecurityLevel {
        if self.secure_connections && self.authenticated {
            SecurityLevel::SecureConnections
        } else if self.authenticated {
            SecurityLevel::EncryptionWithAuthentication
        } else {
            SecurityLevel::EncryptionOnly
        }
    }
}

/// Identity Resolving Key (IRK)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolvingKey {
    /// Key value
    pub key: [u8; 16],
    /// Identity address type
    pub identity_address_type: AddressType,
    /// Identity address
    pub identity_address: Eui48,
}

impl IdentityResolvingKey {
    /// IRK from IDENTITY_INFORMATION and IDENTITY_ADDRESS_INFORMATION
    pub fn from_pdus(info: &SmpIdentInfoMsg<'_>, addr: &SmpIdentAddrInfoMsg<'_>) -> Self {
        Self {
            key: info.irk(),
            identity_address_type: addr.address_type(),
            identity_address: addr.address(),
        }
    }
}

/// Connection Signature Resolving Key (CSRK)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSignatureResolvingKey {
    /// Key value
    pub key: [u8; 16],
    /// Counter for signed data
    pub sign_counter: u32,
    /// Authentication level
    pub authenticated: bool,
}

impl ConnectionSignatureResolvingKey {
    pub fn new(key: [u8; 16], authenticated: bool) -> Self {
        Self {
            key,
            sign_counter: 0,
            authenticated,
        }
    }

    /// Increment the signing counter
    pub fn increment_counter(&mut self) -> u32 {
        self.sign_counter = self.sign_counter.wrapping_add(1);
        self.sign_counter
    }
}

/// Keys received from one device
#[derive(Debug, Clone, Default)]
pub struct DeviceKeys {
    /// Long Term Key
    pub ltk: Option<LongTermKey>,
    /// Identity Resolving Key
    pub irk: Option<IdentityResolvingKey>,
    /// Connection Signature Resolving Key
    pub csrk: Option<ConnectionSignatureResolvingKey>,
    // first halves waiting for their partner PDU
    pending_ltk: Option<[u8; 16]>,
    pending_irk: Option<[u8; 16]>,
}

impl DeviceKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes one key distribution PDU. Other PDUs are ignored.
    pub fn absorb(
        &mut self,
        pdu: &SmpPdu<'_>,
        authenticated: bool,
        secure_connections: bool,
    ) -> SmpResult<()> {
        match pdu {
            SmpPdu::EncInfo(info) => {
                if secure_connections {
                    warn!("ENCRYPTION_INFORMATION received in Secure Connections pairing");
                    return Err(SmpError::InvalidState(
                        "LTK is not distributed with Secure Connections".into(),
                    ));
                }
                self.pending_ltk = Some(info.ltk());
            }
            SmpPdu::MasterIdent(ident) => {
                let key = self.pending_ltk.take().ok_or_else(|| {
                    SmpError::InvalidState("MASTER_IDENTIFICATION before ENCRYPTION_INFORMATION".into())
                })?;
                debug!("Received LTK, EDIV 0x{:04X}", ident.ediv());
                self.ltk = Some(LongTermKey {
                    key,
                    ediv: ident.ediv(),
                    rand: ident.rand(),
                    secure_connections: false,
                    authenticated,
                });
            }
            SmpPdu::IdentInfo(info) => {
                self.pending_irk = Some(info.irk());
            }
            SmpPdu::IdentAddrInfo(addr) => {
                let key = self.pending_irk.take().ok_or_else(|| {
                    SmpError::InvalidState(
                        "IDENTITY_ADDRESS_INFORMATION before IDENTITY_INFORMATION".into(),
                    )
                })?;
                debug!("Received IRK for identity {}", addr.address());
                self.irk = Some(IdentityResolvingKey {
                    key,
                    identity_address_type: addr.address_type(),
                    identity_address: addr.address(),
                });
            }
            SmpPdu::SignInfo(info) => {
                debug!("Received CSRK");
                self.csrk = Some(ConnectionSignatureResolvingKey::new(info.csrk(), authenticated));
            }
            _ => {}
        }
        Ok(())
    }

    /// True once every key in `dist` has been assembled. The LTK is derived
    /// locally with Secure Connections and so never expected.
    pub fn is_complete(&self, dist: SmpKeyDist, secure_connections: bool) -> bool {
        let ltk = !dist.contains(SmpKeyDist::ENC_KEY) || secure_connections || self.ltk.is_some();
        let irk = !dist.contains(SmpKeyDist::ID_KEY) || self.irk.is_some();
        let csrk = !dist.contains(SmpKeyDist::SIGN_KEY) || self.csrk.is_some();
        ltk && irk && csrk
    }

    /// Get the security level based on stored keys
    pub fn security_level(&self) -> SecurityLevel {
        self.ltk
            .as_ref()
            .map_or(SecurityLevel::None, LongTermKey::security_level)
    }

    /// Check if any keys are stored
    pub fn has_keys(&self) -> bool {
        self.ltk.is_some() || self.irk.is_some() || self.csrk.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smp::pdu::{SmpPduMessage, SmpSignInfoMsg};
    use crate::smp::parse_smp_pdu;

    fn absorb(keys: &mut DeviceKeys, frame: &[u8], sc: bool) -> SmpResult<()> {
        keys.absorb(&parse_smp_pdu(frame)?, true, sc)
    }

    #[test]
    fn test_legacy_key_distribution() {
        let mut keys = DeviceKeys::new();
        let dist = SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY | SmpKeyDist::SIGN_KEY;
        assert!(!keys.is_complete(dist, false));

        let enc = SmpEncInfoMsg::new(&[0x11; 16]).unwrap();
        let ident = SmpMasterIdentMsg::new(0xBEEF, 42).unwrap();
        absorb(&mut keys, enc.as_bytes(), false).unwrap();
        absorb(&mut keys, ident.as_bytes(), false).unwrap();
        assert_eq!(
            keys.ltk,
            Some(LongTermKey::from_pdus(&enc, &ident, true))
        );

        let addr = Eui48::new([1, 2, 3, 4, 5, 0xC6]);
        let info = SmpIdentInfoMsg::new(&[0x22; 16]).unwrap();
        let addr_info = SmpIdentAddrInfoMsg::new(AddressType::RandomStatic, &addr).unwrap();
        absorb(&mut keys, info.as_bytes(), false).unwrap();
        absorb(&mut keys, addr_info.as_bytes(), false).unwrap();
        assert_eq!(keys.irk, Some(IdentityResolvingKey::from_pdus(&info, &addr_info)));
        assert!(!keys.is_complete(dist, false));

        let sign = SmpSignInfoMsg::new(&[0x33; 16]).unwrap();
        absorb(&mut keys, sign.as_bytes(), false).unwrap();
        assert!(keys.is_complete(dist, false));
        assert_eq!(keys.security_level(), SecurityLevel::EncryptionWithAuthentication);
    }

    #[test]
    fn test_out_of_order_halves_rejected() {
        let mut keys = DeviceKeys::new();
        let ident = SmpMasterIdentMsg::new(1, 2).unwrap();
        assert!(matches!(
            absorb(&mut keys, ident.as_bytes(), false),
            Err(SmpError::InvalidState(_))
        ));
        let enc = SmpEncInfoMsg::new(&[0; 16]).unwrap();
        assert!(absorb(&mut keys, enc.as_bytes(), true).is_err());
        assert!(!keys.has_keys());
    }

    #[test]
    fn test_secure_connections_needs_no_ltk() {
        let keys = DeviceKeys::new();
        assert!(keys.is_complete(SmpKeyDist::ENC_KEY, true));
        assert_eq!(
            LongTermKey::new_secure_connections([0; 16], true).security_level(),
            SecurityLevel::SecureConnections
        );
        let mut csrk = ConnectionSignatureResolvingKey::new([0; 16], false);
        assert_eq!(csrk.increment_counter(), 1);
    }
}
