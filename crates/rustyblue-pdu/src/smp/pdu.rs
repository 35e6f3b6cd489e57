//! SMP PDU views
//!
//! SMP frames are an opcode followed by a fixed block of parameters whose
//! width is known from the opcode alone. Key material (confirm, random,
//! keys, public key coordinates) is copied verbatim; only the EDIV, Rand
//! and address fields are integers.
use super::constants::*;
use super::types::*;
use crate::address::{AddressType, Eui48};
use crate::att::pdu::PduOctets;
use crate::octets::{Octets, OctetsMut, POctets, ROctets};
use log::{debug, trace, warn};
use std::fmt;
use std::time::Instant;

/// Raw SMP frame shared by all PDU types
#[derive(Debug, Clone)]
pub struct SmpPduMsg<'a> {
    pdu: PduOctets<'a>,
    ts_creation: Instant,
}

impl<'a> SmpPduMsg<'a> {
    pub fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            pdu: PduOctets::Borrowed(ROctets::new(bytes)),
            ts_creation: Instant::now(),
        }
    }

    pub fn owned(pdu: POctets) -> Self {
        Self {
            pdu: PduOctets::Owned(pdu),
            ts_creation: Instant::now(),
        }
    }

    /// Checks opcode and the fixed parameter width of an inbound frame.
    pub(crate) fn parse(
        bytes: &'a [u8],
        name: &'static str,
        expected: ExpectedSmpOpcodes,
        data_size: usize,
    ) -> SmpResult<Self> {
        let min_size = SMP_DATA_OFFSET + data_size;
        let Some(&raw) = bytes.first() else {
            return Err(SmpError::PacketSize {
                name,
                size: 0,
                min_size,
            });
        };
        let observed = SmpOpcode::from(raw);
        if observed != expected.0 && Some(observed) != expected.1 {
            return Err(SmpError::OpcodeMismatch {
                name,
                observed,
                expected,
            });
        }
        if bytes.len() < min_size {
            return Err(SmpError::PacketSize {
                name,
                size: bytes.len(),
                min_size,
            });
        }
        Ok(Self::borrowed(bytes))
    }

    pub fn opcode(&self) -> SmpOpcode {
        self.as_slice()
            .first()
            .map_or(SmpOpcode::Unknown(0), |&raw| SmpOpcode::from(raw))
    }

    pub fn octets(&self) -> &PduOctets<'a> {
        &self.pdu
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.pdu, PduOctets::Owned(_))
    }

    pub fn timestamp(&self) -> Instant {
        self.ts_creation
    }

    pub fn into_owned(self) -> SmpResult<SmpPduMsg<'static>> {
        let pdu = match self.pdu {
            PduOctets::Owned(o) => o,
            PduOctets::Borrowed(o) => POctets::from_slice(o.bytes())?,
        };
        Ok(SmpPduMsg {
            pdu: PduOctets::Owned(pdu),
            ts_creation: self.ts_creation,
        })
    }

    /// Copies the `N` byte field at `offset`, already proven in range.
    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        debug_assert!(
            self.is_range_valid(offset, N),
            "{} byte field at {} outside a {} byte frame",
            N,
            offset,
            self.size()
        );
        self.read_array::<N>(offset).unwrap_or([0u8; N])
    }
}

impl Octets for SmpPduMsg<'_> {
    fn as_slice(&self) -> &[u8] {
        self.pdu.as_slice()
    }
}

/// Outbound frame with the opcode in place and `data` following it.
fn new_pdu(opcode: SmpOpcode, data: &[u8]) -> SmpResult<SmpPduMsg<'static>> {
    let mut pdu = POctets::new(SMP_DATA_OFFSET + data.len())?;
    pdu.write_u8(0, opcode.raw())?;
    pdu.write_bytes(SMP_DATA_OFFSET, data)?;
    Ok(SmpPduMsg::owned(pdu))
}

/// Common view of all SMP PDUs.
///
/// Parameters start right after the opcode and have a width fixed by the
/// PDU type, so the minimum size is the only size check there is.
pub trait SmpPduMessage {
    fn msg(&self) -> &SmpPduMsg<'_>;

    /// Width of the parameter block
    fn data_size(&self) -> usize;

    fn name(&self) -> &'static str;

    fn opcode(&self) -> SmpOpcode {
        self.msg().opcode()
    }

    fn pdu_size(&self) -> usize {
        self.msg().size()
    }

    fn data_offset(&self) -> usize {
        SMP_DATA_OFFSET
    }

    fn min_size(&self) -> usize {
        self.data_offset() + self.data_size()
    }

    /// The parameter block without any trailing octets
    fn data(&self) -> &[u8] {
        let start = self.data_offset();
        self.msg()
            .as_slice()
            .get(start..start + self.data_size())
            .unwrap_or(&[])
    }

    fn as_bytes(&self) -> &[u8] {
        self.msg().as_slice()
    }

    fn timestamp(&self) -> Instant {
        self.msg().timestamp()
    }
}

pub(crate) fn fmt_pdu(pdu: &dyn SmpPduMessage, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{}[{}, size {}, data {}]",
        pdu.name(),
        pdu.opcode(),
        pdu.pdu_size(),
        hex::encode(pdu.data())
    )
}

/// Declares an SMP PDU view type with its opcode gate and parameter width.
macro_rules! smp_pdu {
    (@alt) => { None };
    (@alt $alt:expr) => { Some($alt) };
    (
        $(#[$meta:meta])*
        $ty:ident, data_size = $ds:expr, opcodes = [$op:expr $(, $alt:expr)?]
        $(, validate = $check:ident)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $ty<'a> {
            msg: SmpPduMsg<'a>,
        }

        impl<'a> $ty<'a> {
            pub const DATA_SIZE: usize = $ds;
            pub const EXPECTED: ExpectedSmpOpcodes =
                ExpectedSmpOpcodes($op, smp_pdu!(@alt $($alt)?));

            /// Borrows an inbound frame after checking opcode and size.
            pub fn from_bytes(bytes: &'a [u8]) -> SmpResult<Self> {
                let msg = SmpPduMsg::parse(bytes, stringify!($ty), Self::EXPECTED, $ds)?;
                let pdu = Self { msg };
                $( pdu.$check()?; )?
                Ok(pdu)
            }

            pub fn into_owned(self) -> SmpResult<$ty<'static>> {
                Ok($ty {
                    msg: self.msg.into_owned()?,
                })
            }
        }

        impl SmpPduMessage for $ty<'_> {
            fn msg(&self) -> &SmpPduMsg<'_> {
                &self.msg
            }

            fn data_size(&self) -> usize {
                $ds
            }

            fn name(&self) -> &'static str {
                stringify!($ty)
            }
        }

        impl fmt::Display for $ty<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_pdu(self, f)
            }
        }
    };
}

smp_pdu! {
    /// PAIRING_REQUEST and PAIRING_RESPONSE: IO capability, OOB flag,
    /// auth requirements, max key size, initiator and responder key
    /// distribution
    SmpPairingMsg, data_size = SMP_PAIRING_PARAM_LEN,
    opcodes = [SmpOpcode::PairingRequest, SmpOpcode::PairingResponse],
    validate = check_features
}

impl SmpPairingMsg<'static> {
    pub fn new_request(features: &SmpPairingFeatures) -> SmpResult<Self> {
        Self::new(SmpOpcode::PairingRequest, features)
    }

    pub fn new_response(features: &SmpPairingFeatures) -> SmpResult<Self> {
        Self::new(SmpOpcode::PairingResponse, features)
    }

    fn new(opcode: SmpOpcode, features: &SmpPairingFeatures) -> SmpResult<Self> {
        if features.io_capability == SmpIoCapability::Unset {
            return Err(SmpError::InvalidParameter(
                "IO capability must be set before pairing".into(),
            ));
        }
        check_key_size(features.max_key_size)?;
        let data = [
            features.io_capability.to_u8(),
            features.oob_data_flag.into(),
            features.auth_reqs.bits(),
            features.max_key_size,
            features.initiator_key_dist.bits(),
            features.responder_key_dist.bits(),
        ];
        Ok(Self {
            msg: new_pdu(opcode, &data)?,
        })
    }
}

fn check_key_size(size: u8) -> SmpResult<()> {
    if !(SMP_MIN_ENCRYPTION_KEY_SIZE..=SMP_MAX_ENCRYPTION_KEY_SIZE).contains(&size) {
        return Err(SmpError::InvalidParameter(format!(
            "maximum encryption key size {} not in {}..={}",
            size, SMP_MIN_ENCRYPTION_KEY_SIZE, SMP_MAX_ENCRYPTION_KEY_SIZE
        )));
    }
    Ok(())
}

impl SmpPairingMsg<'_> {
    fn check_features(&self) -> SmpResult<()> {
        // 0xFF is a local marker only
        if SmpIoCapability::try_from(self.msg.read_u8_unchecked(1))? == SmpIoCapability::Unset {
            return Err(SmpError::InvalidParameter("IO capability 0xFF".into()));
        }
        Ok(())
    }

    pub fn is_request(&self) -> bool {
        self.opcode() == SmpOpcode::PairingRequest
    }

    pub fn io_capability(&self) -> SmpIoCapability {
        SmpIoCapability::try_from(self.msg.read_u8_unchecked(1)).unwrap_or(SmpIoCapability::Unset)
    }

    pub fn oob_data_flag(&self) -> SmpOobDataFlag {
        SmpOobDataFlag::from(self.msg.read_u8_unchecked(2))
    }

    pub fn auth_reqs(&self) -> SmpAuthReqs {
        SmpAuthReqs::from_bits_retain(self.msg.read_u8_unchecked(3))
    }

    pub fn max_encryption_key_size(&self) -> u8 {
        self.msg.read_u8_unchecked(4)
    }

    pub fn initiator_key_dist(&self) -> SmpKeyDist {
        SmpKeyDist::from_bits_retain(self.msg.read_u8_unchecked(5))
    }

    pub fn responder_key_dist(&self) -> SmpKeyDist {
        SmpKeyDist::from_bits_retain(self.msg.read_u8_unchecked(6))
    }

    pub fn features(&self) -> SmpPairingFeatures {
        SmpPairingFeatures {
            io_capability: self.io_capability(),
            oob_data_flag: self.oob_data_flag(),
            auth_reqs: self.auth_reqs(),
            max_key_size: self.max_encryption_key_size(),
            initiator_key_dist: self.initiator_key_dist(),
            responder_key_dist: self.responder_key_dist(),
        }
    }
}

smp_pdu! {
    /// PAIRING_CONFIRM: 128-bit confirm value
    SmpPairConfirmMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::PairingConfirm]
}

impl SmpPairConfirmMsg<'static> {
    pub fn new(confirm_value: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingConfirm, confirm_value)?,
        })
    }
}

impl SmpPairConfirmMsg<'_> {
    pub fn confirm_value(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// PAIRING_RANDOM: 128-bit random value
    SmpPairRandMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::PairingRandom]
}

impl SmpPairRandMsg<'static> {
    pub fn new(random: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingRandom, random)?,
        })
    }
}

impl SmpPairRandMsg<'_> {
    pub fn rand(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// PAIRING_FAILED: reason code
    SmpPairFailedMsg, data_size = 1, opcodes = [SmpOpcode::PairingFailed]
}

impl SmpPairFailedMsg<'static> {
    pub fn new(reason: SmpReasonCode) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingFailed, &[reason.into()])?,
        })
    }
}

impl SmpPairFailedMsg<'_> {
    pub fn reason_code(&self) -> SmpReasonCode {
        SmpReasonCode::from(self.msg.read_u8_unchecked(1))
    }

    pub fn to_error(&self) -> SmpError {
        SmpError::PairingFailed(self.reason_code())
    }
}

smp_pdu! {
    /// PAIRING_PUBLIC_KEY: P-256 X and Y coordinates, 32 bytes each
    SmpPairPubKeyMsg, data_size = 2 * SMP_PUBLIC_KEY_COORD_LEN, opcodes = [SmpOpcode::PairingPublicKey]
}

impl SmpPairPubKeyMsg<'static> {
    pub fn new(x: &[u8; 32], y: &[u8; 32]) -> SmpResult<Self> {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(x);
        data[32..].copy_from_slice(y);
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingPublicKey, &data)?,
        })
    }
}

impl SmpPairPubKeyMsg<'_> {
    pub fn pub_key_x(&self) -> [u8; 32] {
        self.msg.array(1)
    }

    pub fn pub_key_y(&self) -> [u8; 32] {
        self.msg.array(1 + SMP_PUBLIC_KEY_COORD_LEN)
    }
}

smp_pdu! {
    /// PAIRING_DHKEY_CHECK: 128-bit check value
    SmpPairDhKeyCheckMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::PairingDhkeyCheck]
}

impl SmpPairDhKeyCheckMsg<'static> {
    pub fn new(check: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingDhkeyCheck, check)?,
        })
    }
}

impl SmpPairDhKeyCheckMsg<'_> {
    pub fn dhkey_check(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// PAIRING_KEYPRESS_NOTIFICATION: notification type
    SmpPasskeyNotification, data_size = 1, opcodes = [SmpOpcode::PairingKeypressNotification]
}

impl SmpPasskeyNotification<'static> {
    pub fn new(notify_type: SmpKeypressType) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::PairingKeypressNotification, &[notify_type.into()])?,
        })
    }
}

impl SmpPasskeyNotification<'_> {
    pub fn notify_type(&self) -> SmpKeypressType {
        SmpKeypressType::from(self.msg.read_u8_unchecked(1))
    }
}

smp_pdu! {
    /// ENCRYPTION_INFORMATION: the LTK
    SmpEncInfoMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::EncryptionInformation]
}

impl SmpEncInfoMsg<'static> {
    pub fn new(ltk: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::EncryptionInformation, ltk)?,
        })
    }
}

impl SmpEncInfoMsg<'_> {
    pub fn ltk(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// MASTER_IDENTIFICATION: EDIV and Rand of a legacy LTK
    SmpMasterIdentMsg, data_size = 10, opcodes = [SmpOpcode::MasterIdentification]
}

impl SmpMasterIdentMsg<'static> {
    pub fn new(ediv: u16, rand: u64) -> SmpResult<Self> {
        let mut data = [0u8; 10];
        data[..2].copy_from_slice(&ediv.to_le_bytes());
        data[2..].copy_from_slice(&rand.to_le_bytes());
        Ok(Self {
            msg: new_pdu(SmpOpcode::MasterIdentification, &data)?,
        })
    }
}

impl SmpMasterIdentMsg<'_> {
    pub fn ediv(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn rand(&self) -> u64 {
        self.msg.read_u64_unchecked(3)
    }
}

smp_pdu! {
    /// IDENTITY_INFORMATION: the IRK
    SmpIdentInfoMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::IdentityInformation]
}

impl SmpIdentInfoMsg<'static> {
    pub fn new(irk: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::IdentityInformation, irk)?,
        })
    }
}

impl SmpIdentInfoMsg<'_> {
    pub fn irk(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// IDENTITY_ADDRESS_INFORMATION: address type and identity address
    SmpIdentAddrInfoMsg, data_size = 7, opcodes = [SmpOpcode::IdentityAddressInformation]
}

impl SmpIdentAddrInfoMsg<'static> {
    pub fn new(address_type: AddressType, address: &Eui48) -> SmpResult<Self> {
        let mut data = [0u8; 7];
        data[0] = address_type.into();
        data[1..].copy_from_slice(address.as_slice());
        Ok(Self {
            msg: new_pdu(SmpOpcode::IdentityAddressInformation, &data)?,
        })
    }
}

impl SmpIdentAddrInfoMsg<'_> {
    pub fn address_type(&self) -> AddressType {
        AddressType::from(self.msg.read_u8_unchecked(1))
    }

    pub fn address(&self) -> Eui48 {
        self.msg.read_eui48_unchecked(2)
    }
}

smp_pdu! {
    /// SIGNING_INFORMATION: the CSRK
    SmpSignInfoMsg, data_size = SMP_KEY_LEN, opcodes = [SmpOpcode::SigningInformation]
}

impl SmpSignInfoMsg<'static> {
    pub fn new(csrk: &[u8; 16]) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::SigningInformation, csrk)?,
        })
    }
}

impl SmpSignInfoMsg<'_> {
    pub fn csrk(&self) -> [u8; 16] {
        self.msg.array(1)
    }
}

smp_pdu! {
    /// SECURITY_REQUEST: responder asks the initiator to start pairing
    SmpSecurityReqMsg, data_size = 1, opcodes = [SmpOpcode::SecurityRequest]
}

impl SmpSecurityReqMsg<'static> {
    pub fn new(auth_reqs: SmpAuthReqs) -> SmpResult<Self> {
        Ok(Self {
            msg: new_pdu(SmpOpcode::SecurityRequest, &[auth_reqs.bits()])?,
        })
    }
}

impl SmpSecurityReqMsg<'_> {
    pub fn auth_reqs(&self) -> SmpAuthReqs {
        SmpAuthReqs::from_bits_retain(self.msg.read_u8_unchecked(1))
    }
}

/// Sentinel for frames whose opcode is not assigned
#[derive(Debug, Clone)]
pub struct SmpPduUndefined<'a> {
    msg: SmpPduMsg<'a>,
}

impl<'a> SmpPduUndefined<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> SmpResult<Self> {
        if bytes.is_empty() {
            return Err(SmpError::PacketSize {
                name: "SmpPduUndefined",
                size: 0,
                min_size: SMP_DATA_OFFSET,
            });
        }
        Ok(Self {
            msg: SmpPduMsg::borrowed(bytes),
        })
    }

    pub fn into_owned(self) -> SmpResult<SmpPduUndefined<'static>> {
        Ok(SmpPduUndefined {
            msg: self.msg.into_owned()?,
        })
    }
}

impl SmpPduMessage for SmpPduUndefined<'_> {
    fn msg(&self) -> &SmpPduMsg<'_> {
        &self.msg
    }

    fn data_size(&self) -> usize {
        self.msg.size().saturating_sub(SMP_DATA_OFFSET)
    }

    fn name(&self) -> &'static str {
        "SmpPduUndefined"
    }
}

impl fmt::Display for SmpPduUndefined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_pdu(self, f)
    }
}

macro_rules! smp_pdu_variants {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        /// Every SMP PDU type, keyed by opcode
        #[derive(Debug, Clone)]
        pub enum SmpPdu<'a> {
            $($variant($ty<'a>),)*
        }

        impl<'a> SmpPdu<'a> {
            pub fn as_message(&self) -> &dyn SmpPduMessage {
                match self {
                    $(SmpPdu::$variant(pdu) => pdu,)*
                }
            }

            pub fn into_owned(self) -> SmpResult<SmpPdu<'static>> {
                Ok(match self {
                    $(SmpPdu::$variant(pdu) => SmpPdu::$variant(pdu.into_owned()?),)*
                })
            }
        }
    };
}

smp_pdu_variants! {
    Pairing(SmpPairingMsg),
    PairConfirm(SmpPairConfirmMsg),
    PairRand(SmpPairRandMsg),
    PairFailed(SmpPairFailedMsg),
    EncInfo(SmpEncInfoMsg),
    MasterIdent(SmpMasterIdentMsg),
    IdentInfo(SmpIdentInfoMsg),
    IdentAddrInfo(SmpIdentAddrInfoMsg),
    SignInfo(SmpSignInfoMsg),
    SecurityReq(SmpSecurityReqMsg),
    PairPubKey(SmpPairPubKeyMsg),
    PairDhKeyCheck(SmpPairDhKeyCheckMsg),
    PasskeyNotification(SmpPasskeyNotification),
    Undefined(SmpPduUndefined),
}

impl SmpPdu<'_> {
    pub fn opcode(&self) -> SmpOpcode {
        self.as_message().opcode()
    }

    pub fn name(&self) -> &'static str {
        self.as_message().name()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, SmpPdu::Undefined(_))
    }
}

impl fmt::Display for SmpPdu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_pdu(self.as_message(), f)
    }
}

/// Dispatches on the opcode octet and validates the matching PDU type.
///
/// Opcodes outside 0x01..=0x0E yield [`SmpPdu::Undefined`].
pub fn parse_smp_pdu(bytes: &[u8]) -> SmpResult<SmpPdu<'_>> {
    let Some(&raw) = bytes.first() else {
        return Err(SmpError::PacketSize {
            name: "SmpPdu",
            size: 0,
            min_size: SMP_DATA_OFFSET,
        });
    };
    use SmpOpcode::*;
    let pdu = match SmpOpcode::from(raw) {
        PairingRequest | PairingResponse => SmpPdu::Pairing(SmpPairingMsg::from_bytes(bytes)?),
        PairingConfirm => SmpPdu::PairConfirm(SmpPairConfirmMsg::from_bytes(bytes)?),
        PairingRandom => SmpPdu::PairRand(SmpPairRandMsg::from_bytes(bytes)?),
        PairingFailed => SmpPdu::PairFailed(SmpPairFailedMsg::from_bytes(bytes)?),
        EncryptionInformation => SmpPdu::EncInfo(SmpEncInfoMsg::from_bytes(bytes)?),
        MasterIdentification => SmpPdu::MasterIdent(SmpMasterIdentMsg::from_bytes(bytes)?),
        IdentityInformation => SmpPdu::IdentInfo(SmpIdentInfoMsg::from_bytes(bytes)?),
        IdentityAddressInformation => {
            SmpPdu::IdentAddrInfo(SmpIdentAddrInfoMsg::from_bytes(bytes)?)
        }
        SigningInformation => SmpPdu::SignInfo(SmpSignInfoMsg::from_bytes(bytes)?),
        SecurityRequest => SmpPdu::SecurityReq(SmpSecurityReqMsg::from_bytes(bytes)?),
        PairingPublicKey => SmpPdu::PairPubKey(SmpPairPubKeyMsg::from_bytes(bytes)?),
        PairingDhkeyCheck => SmpPdu::PairDhKeyCheck(SmpPairDhKeyCheckMsg::from_bytes(bytes)?),
        PairingKeypressNotification => {
            SmpPdu::PasskeyNotification(SmpPasskeyNotification::from_bytes(bytes)?)
        }
        Unknown(_) => SmpPdu::Undefined(SmpPduUndefined::from_bytes(bytes)?),
    };
    Ok(pdu)
}

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct SmpDecoderConfig {
    /// Channel MTU; longer frames are dropped
    pub mtu: u16,
    /// Drop frames with unassigned opcodes instead of passing the sentinel on
    pub reject_undefined: bool,
}

impl Default for SmpDecoderConfig {
    fn default() -> Self {
        Self {
            mtu: SMP_SC_MTU,
            reject_undefined: false,
        }
    }
}

/// Frame counters of an SMP decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmpDecodeStats {
    pub received: u64,
    pub decoded: u64,
    pub undefined: u64,
    pub malformed: u64,
    pub oversized: u64,
}

/// Per-connection receive side of the SMP channel.
///
/// Dropped frames leave the pairing state untouched; the caller only sees
/// the PDUs that decoded.
#[derive(Debug, Clone, Default)]
pub struct SmpDecoder {
    config: SmpDecoderConfig,
    stats: SmpDecodeStats,
}

impl SmpDecoder {
    pub fn new(config: SmpDecoderConfig) -> Self {
        Self {
            config,
            stats: SmpDecodeStats::default(),
        }
    }

    pub fn config(&self) -> &SmpDecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> SmpDecodeStats {
        self.stats
    }

    pub fn decode<'b>(&mut self, bytes: &'b [u8]) -> Option<SmpPdu<'b>> {
        self.stats.received += 1;
        if bytes.len() > usize::from(self.config.mtu) {
            self.stats.oversized += 1;
            warn!(
                "Dropping SMP frame of {} bytes, MTU is {}",
                bytes.len(),
                self.config.mtu
            );
            return None;
        }
        match parse_smp_pdu(bytes) {
            Ok(pdu) if pdu.is_undefined() => {
                self.stats.undefined += 1;
                debug!("Undefined SMP opcode {}", pdu.opcode());
                if self.config.reject_undefined {
                    None
                } else {
                    Some(pdu)
                }
            }
            Ok(pdu) => {
                self.stats.decoded += 1;
                trace!("Received {}", pdu);
                Some(pdu)
            }
            Err(e) => {
                self.stats.malformed += 1;
                warn!("Dropping malformed SMP frame {}: {}", hex::encode(bytes), e);
                None
            }
        }
    }
}
