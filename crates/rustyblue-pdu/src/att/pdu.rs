//! ATT PDU views
//!
//! Every PDU type wraps an [`AttPduMsg`], the raw frame plus its creation
//! time. Inbound PDUs borrow the receive buffer and decode fields on access;
//! outbound PDUs own a freshly allocated [`POctets`] written by their
//! constructor. Header fields are validated once in `from_bytes`, after which
//! accessors read them without further range checks.
use super::constants::*;
use super::error::{AttError, AttErrorCode, AttResult, ExpectedOpcodes};
use super::opcode::AttOpcode;
use crate::octets::{Octets, OctetsMut, POctets, ROctets};
use crate::error::OctetError;
use crate::uuid::{Uuid, UuidTypeSize};
use std::fmt;
use std::time::Instant;

/// Backing storage of a PDU, either the borrowed receive buffer or owned bytes
#[derive(Debug, Clone)]
pub enum PduOctets<'a> {
    Borrowed(ROctets<'a>),
    Owned(POctets),
}

impl Octets for PduOctets<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            PduOctets::Borrowed(o) => o.as_slice(),
            PduOctets::Owned(o) => o.as_slice(),
        }
    }
}

/// Raw ATT frame shared by all PDU types
#[derive(Debug, Clone)]
pub struct AttPduMsg<'a> {
    pdu: PduOctets<'a>,
    ts_creation: Instant,
}

impl<'a> AttPduMsg<'a> {
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

    /// Checks opcode and minimum size of an inbound frame and borrows it.
    pub(crate) fn parse(
        bytes: &'a [u8],
        name: &'static str,
        expected: ExpectedOpcodes,
        value_offset: usize,
    ) -> AttResult<Self> {
        let Some(&raw) = bytes.first() else {
            return Err(AttError::PacketSize {
                name,
                size: 0,
                min_size: value_offset,
            });
        };
        let observed = AttOpcode::from(raw);
        if observed != expected.0 && Some(observed) != expected.1 {
            return Err(AttError::OpcodeMismatch {
                name,
                observed,
                expected,
            });
        }
        let min_size = value_offset + auth_sig_size_of(observed);
        if bytes.len() < min_size {
            return Err(AttError::PacketSize {
                name,
                size: bytes.len(),
                min_size,
            });
        }
        Ok(Self::borrowed(bytes))
    }

    pub fn opcode(&self) -> AttOpcode {
        self.as_slice()
            .first()
            .map_or(AttOpcode::PduUndefined, |&raw| AttOpcode::from(raw))
    }

    pub fn octets(&self) -> &PduOctets<'a> {
        &self.pdu
    }

    /// Mutable access for PDUs under construction; received frames are read-only.
    pub(crate) fn octets_mut(&mut self) -> AttResult<&mut POctets> {
        match &mut self.pdu {
            PduOctets::Owned(o) => Ok(o),
            PduOctets::Borrowed(_) => Err(OctetError::ReadOnly.into()),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.pdu, PduOctets::Owned(_))
    }

    pub fn timestamp(&self) -> Instant {
        self.ts_creation
    }

    /// Copies a borrowed frame so it may outlive the receive buffer.
    pub fn into_owned(self) -> AttResult<AttPduMsg<'static>> {
        let pdu = match self.pdu {
            PduOctets::Owned(o) => o,
            PduOctets::Borrowed(o) => POctets::from_slice(o.bytes())?,
        };
        Ok(AttPduMsg {
            pdu: PduOctets::Owned(pdu),
            ts_creation: self.ts_creation,
        })
    }
}

impl Octets for AttPduMsg<'_> {
    fn as_slice(&self) -> &[u8] {
        self.pdu.as_slice()
    }
}

fn auth_sig_size_of(opcode: AttOpcode) -> usize {
    if opcode.has_auth_sig() {
        ATT_AUTH_SIGNATURE_LEN
    } else {
        0
    }
}

/// Zeroed outbound frame of `size` bytes with the opcode in place.
pub(crate) fn new_pdu(opcode: AttOpcode, size: usize) -> AttResult<POctets> {
    let mut pdu = POctets::new(size)?;
    pdu.write_u8(0, opcode.raw())?;
    Ok(pdu)
}

pub(crate) fn check_value_len(name: &'static str, len: usize) -> AttResult<()> {
    if len > ATT_MAX_VALUE_LEN {
        return Err(AttError::ValueSize {
            name,
            reason: format!("value length {} > {}", len, ATT_MAX_VALUE_LEN),
        });
    }
    Ok(())
}

/// Common size arithmetic of all ATT PDUs.
///
/// `value_offset` marks where the variable value segment starts; the
/// remaining sizes follow from the frame length and the opcode's
/// authentication signature flag.
pub trait AttPduMessage {
    fn msg(&self) -> &AttPduMsg<'_>;

    /// Offset of the value segment within the PDU
    fn value_offset(&self) -> usize;

    fn name(&self) -> &'static str;

    fn opcode(&self) -> AttOpcode {
        self.msg().opcode()
    }

    fn pdu_size(&self) -> usize {
        self.msg().size()
    }

    fn auth_sig_size(&self) -> usize {
        auth_sig_size_of(self.opcode())
    }

    /// Size of everything after the opcode, excluding the signature
    fn param_size(&self) -> usize {
        self.pdu_size().saturating_sub(self.auth_sig_size() + 1)
    }

    fn value_size(&self) -> usize {
        self.pdu_size()
            .saturating_sub(self.auth_sig_size() + self.value_offset())
    }

    fn min_size(&self) -> usize {
        self.value_offset() + self.auth_sig_size()
    }

    /// Largest value this PDU type can carry within `mtu`.
    fn max_value_size(&self, mtu: u16) -> usize {
        usize::from(mtu).saturating_sub(self.auth_sig_size() + self.value_offset())
    }

    fn value(&self) -> &[u8] {
        let start = self.value_offset();
        self.msg()
            .as_slice()
            .get(start..start + self.value_size())
            .unwrap_or(&[])
    }

    fn as_bytes(&self) -> &[u8] {
        self.msg().as_slice()
    }

    fn timestamp(&self) -> Instant {
        self.msg().timestamp()
    }
}

pub(crate) fn fmt_pdu(pdu: &dyn AttPduMessage, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{}[{}, size {}, value size {}]",
        pdu.name(),
        pdu.opcode(),
        pdu.pdu_size(),
        pdu.value_size()
    )
}

/// Declares a PDU view type with its opcode gate and size arithmetic.
macro_rules! att_pdu {
    (@alt) => { None };
    (@alt $alt:expr) => { Some($alt) };
    (
        $(#[$meta:meta])*
        $ty:ident, value_offset = $vo:expr, opcodes = [$op:expr $(, $alt:expr)?]
        $(, validate = $check:ident)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $ty<'a> {
            msg: $crate::att::pdu::AttPduMsg<'a>,
        }

        impl<'a> $ty<'a> {
            pub const VALUE_OFFSET: usize = $vo;
            pub const EXPECTED: $crate::att::error::ExpectedOpcodes =
                $crate::att::error::ExpectedOpcodes($op, att_pdu!(@alt $($alt)?));

            /// Borrows an inbound frame after checking opcode and size.
            pub fn from_bytes(bytes: &'a [u8]) -> $crate::att::error::AttResult<Self> {
                let msg = $crate::att::pdu::AttPduMsg::parse(
                    bytes,
                    stringify!($ty),
                    Self::EXPECTED,
                    $vo,
                )?;
                let pdu = Self { msg };
                $( pdu.$check()?; )?
                Ok(pdu)
            }

            pub fn into_owned(self) -> $crate::att::error::AttResult<$ty<'static>> {
                Ok($ty {
                    msg: self.msg.into_owned()?,
                })
            }
        }

        impl $crate::att::pdu::AttPduMessage for $ty<'_> {
            fn msg(&self) -> &$crate::att::pdu::AttPduMsg<'_> {
                &self.msg
            }

            fn value_offset(&self) -> usize {
                $vo
            }

            fn name(&self) -> &'static str {
                stringify!($ty)
            }
        }

        impl ::std::fmt::Display for $ty<'_> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                $crate::att::pdu::fmt_pdu(self, f)
            }
        }
    };
}

pub(crate) use att_pdu;

att_pdu! {
    /// ERROR_RSP: opcode, causing opcode, causing handle, error code
    AttErrorRsp, value_offset = 5, opcodes = [AttOpcode::ErrorRsp]
}

impl AttErrorRsp<'static> {
    pub fn new(error_code: AttErrorCode, cause_opcode: AttOpcode, cause_handle: u16) -> AttResult<Self> {
        let mut pdu = new_pdu(AttOpcode::ErrorRsp, 5)?;
        pdu.write_u8(1, cause_opcode.raw())?;
        pdu.write_u16(2, cause_handle)?;
        pdu.write_u8(4, error_code.into())?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttErrorRsp<'_> {
    pub fn cause_opcode(&self) -> AttOpcode {
        AttOpcode::from(self.msg.read_u8_unchecked(1))
    }

    pub fn cause_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(2)
    }

    pub fn error_code(&self) -> AttErrorCode {
        AttErrorCode::from(self.msg.read_u8_unchecked(4))
    }

    /// The response as an error value for callers propagating with `?`.
    pub fn to_error(&self) -> AttError {
        AttError::Protocol(self.error_code(), self.cause_handle())
    }
}

att_pdu! {
    /// EXCHANGE_MTU_REQ and EXCHANGE_MTU_RSP
    AttExchangeMtu, value_offset = 3,
    opcodes = [AttOpcode::ExchangeMtuReq, AttOpcode::ExchangeMtuRsp]
}

impl AttExchangeMtu<'static> {
    pub fn new_request(mtu: u16) -> AttResult<Self> {
        Self::build(AttOpcode::ExchangeMtuReq, mtu)
    }

    pub fn new_response(mtu: u16) -> AttResult<Self> {
        Self::build(AttOpcode::ExchangeMtuRsp, mtu)
    }

    fn build(opcode: AttOpcode, mtu: u16) -> AttResult<Self> {
        let mut pdu = new_pdu(opcode, 3)?;
        pdu.write_u16(1, mtu)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttExchangeMtu<'_> {
    pub fn mtu_size(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn is_request(&self) -> bool {
        self.opcode() == AttOpcode::ExchangeMtuReq
    }
}

att_pdu! {
    /// READ_REQ
    AttReadReq, value_offset = 3, opcodes = [AttOpcode::ReadReq]
}

impl AttReadReq<'static> {
    pub fn new(handle: u16) -> AttResult<Self> {
        let mut pdu = new_pdu(AttOpcode::ReadReq, 3)?;
        pdu.write_u16(1, handle)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadReq<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }
}

att_pdu! {
    /// READ_BLOB_REQ, continues a long read at a value offset
    AttReadBlobReq, value_offset = 5, opcodes = [AttOpcode::ReadBlobReq]
}

impl AttReadBlobReq<'static> {
    pub fn new(handle: u16, blob_offset: u16) -> AttResult<Self> {
        let mut pdu = new_pdu(AttOpcode::ReadBlobReq, 5)?;
        pdu.write_u16(1, handle)?;
        pdu.write_u16(3, blob_offset)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadBlobReq<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    /// Offset into the attribute value where the read continues
    pub fn blob_offset(&self) -> u16 {
        self.msg.read_u16_unchecked(3)
    }
}

att_pdu! {
    /// READ_RSP and READ_BLOB_RSP
    AttReadNRsp, value_offset = 1,
    opcodes = [AttOpcode::ReadRsp, AttOpcode::ReadBlobRsp]
}

impl AttReadNRsp<'static> {
    pub fn new_read_rsp(value: &[u8]) -> AttResult<Self> {
        Self::build(AttOpcode::ReadRsp, value)
    }

    pub fn new_blob_rsp(value: &[u8]) -> AttResult<Self> {
        Self::build(AttOpcode::ReadBlobRsp, value)
    }

    fn build(opcode: AttOpcode, value: &[u8]) -> AttResult<Self> {
        check_value_len("AttReadNRsp", value.len())?;
        let mut pdu = new_pdu(opcode, 1 + value.len())?;
        pdu.write_bytes(1, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadNRsp<'_> {
    pub fn is_blob_rsp(&self) -> bool {
        self.opcode() == AttOpcode::ReadBlobRsp
    }
}

fn build_handle_value(
    name: &'static str,
    opcode: AttOpcode,
    handle: u16,
    value: &[u8],
) -> AttResult<POctets> {
    check_value_len(name, value.len())?;
    let mut pdu = new_pdu(opcode, 3 + value.len())?;
    pdu.write_u16(1, handle)?;
    pdu.write_bytes(3, value)?;
    Ok(pdu)
}

att_pdu! {
    /// WRITE_REQ, acknowledged by WRITE_RSP
    AttWriteReq, value_offset = 3, opcodes = [AttOpcode::WriteReq]
}

impl AttWriteReq<'static> {
    pub fn new(handle: u16, value: &[u8]) -> AttResult<Self> {
        let pdu = build_handle_value("AttWriteReq", AttOpcode::WriteReq, handle, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttWriteReq<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }
}

att_pdu! {
    /// WRITE_CMD, never answered
    AttWriteCmd, value_offset = 3, opcodes = [AttOpcode::WriteCmd]
}

impl AttWriteCmd<'static> {
    pub fn new(handle: u16, value: &[u8]) -> AttResult<Self> {
        let pdu = build_handle_value("AttWriteCmd", AttOpcode::WriteCmd, handle, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttWriteCmd<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }
}

att_pdu! {
    /// SIGNED_WRITE_CMD: handle, value and a trailing 12 byte signature
    AttSignedWriteCmd, value_offset = 3, opcodes = [AttOpcode::SignedWriteCmd]
}

impl AttSignedWriteCmd<'static> {
    pub fn new(
        handle: u16,
        value: &[u8],
        signature: &[u8; ATT_AUTH_SIGNATURE_LEN],
    ) -> AttResult<Self> {
        check_value_len("AttSignedWriteCmd", value.len())?;
        let size = 3 + value.len() + ATT_AUTH_SIGNATURE_LEN;
        let mut pdu = new_pdu(AttOpcode::SignedWriteCmd, size)?;
        pdu.write_u16(1, handle)?;
        pdu.write_bytes(3, value)?;
        pdu.write_bytes(3 + value.len(), signature)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttSignedWriteCmd<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    /// Authentication signature, copied verbatim
    pub fn signature(&self) -> [u8; ATT_AUTH_SIGNATURE_LEN] {
        let mut sig = [0u8; ATT_AUTH_SIGNATURE_LEN];
        let start = self.pdu_size() - ATT_AUTH_SIGNATURE_LEN;
        sig.copy_from_slice(&self.msg.as_slice()[start..]);
        sig
    }
}

att_pdu! {
    /// WRITE_RSP
    AttWriteRsp, value_offset = 1, opcodes = [AttOpcode::WriteRsp]
}

impl AttWriteRsp<'static> {
    pub fn new() -> AttResult<Self> {
        Ok(Self {
            msg: AttPduMsg::owned(new_pdu(AttOpcode::WriteRsp, 1)?),
        })
    }
}

att_pdu! {
    /// HANDLE_VALUE_NTF and HANDLE_VALUE_IND as received from a server
    AttHandleValueRcv, value_offset = 3,
    opcodes = [AttOpcode::HandleValueNtf, AttOpcode::HandleValueInd]
}

impl AttHandleValueRcv<'static> {
    pub fn new_notification(handle: u16, value: &[u8]) -> AttResult<Self> {
        let pdu = build_handle_value("AttHandleValueRcv", AttOpcode::HandleValueNtf, handle, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }

    pub fn new_indication(handle: u16, value: &[u8]) -> AttResult<Self> {
        let pdu = build_handle_value("AttHandleValueRcv", AttOpcode::HandleValueInd, handle, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttHandleValueRcv<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn is_notification(&self) -> bool {
        self.opcode() == AttOpcode::HandleValueNtf
    }

    pub fn is_indication(&self) -> bool {
        self.opcode() == AttOpcode::HandleValueInd
    }
}

att_pdu! {
    /// HANDLE_VALUE_CFM, acknowledges an indication
    AttHandleValueCfm, value_offset = 1, opcodes = [AttOpcode::HandleValueCfm]
}

impl AttHandleValueCfm<'static> {
    pub fn new() -> AttResult<Self> {
        Ok(Self {
            msg: AttPduMsg::owned(new_pdu(AttOpcode::HandleValueCfm, 1)?),
        })
    }
}

fn build_handle_range(opcode: AttOpcode, size: usize, start: u16, end: u16) -> AttResult<POctets> {
    let mut pdu = new_pdu(opcode, size)?;
    pdu.write_u16(1, start)?;
    pdu.write_u16(3, end)?;
    Ok(pdu)
}

att_pdu! {
    /// FIND_INFORMATION_REQ over a handle range
    AttFindInfoReq, value_offset = 5, opcodes = [AttOpcode::FindInformationReq]
}

impl AttFindInfoReq<'static> {
    pub fn new(start_handle: u16, end_handle: u16) -> AttResult<Self> {
        let pdu = build_handle_range(AttOpcode::FindInformationReq, 5, start_handle, end_handle)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttFindInfoReq<'_> {
    pub fn start_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn end_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(3)
    }
}

att_pdu! {
    /// READ_BY_TYPE_REQ and READ_BY_GROUP_TYPE_REQ.
    ///
    /// The attribute type follows the handle range; its width (16 or 128 bit)
    /// is whatever remains of the PDU.
    AttReadByNTypeReq, value_offset = 5,
    opcodes = [AttOpcode::ReadByTypeReq, AttOpcode::ReadByGroupTypeReq],
    validate = check_type_width
}

impl AttReadByNTypeReq<'static> {
    pub fn new_by_type(start_handle: u16, end_handle: u16, att_type: &Uuid) -> AttResult<Self> {
        Self::build(AttOpcode::ReadByTypeReq, start_handle, end_handle, att_type)
    }

    pub fn new_by_group_type(start_handle: u16, end_handle: u16, group_type: &Uuid) -> AttResult<Self> {
        Self::build(AttOpcode::ReadByGroupTypeReq, start_handle, end_handle, group_type)
    }

    fn build(opcode: AttOpcode, start: u16, end: u16, uuid: &Uuid) -> AttResult<Self> {
        // 32 bit UUIDs are sent expanded to 128 bit
        let uuid = match uuid.type_size() {
            UuidTypeSize::Uuid32 => uuid.to_uuid128(),
            _ => *uuid,
        };
        let size = 5 + uuid.type_size().byte_count();
        let mut pdu = build_handle_range(opcode, size, start, end)?;
        pdu.write_uuid(5, &uuid)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadByNTypeReq<'_> {
    fn check_type_width(&self) -> AttResult<()> {
        match self.value_size() {
            2 | 16 => Ok(()),
            n => Err(AttError::ValueSize {
                name: "AttReadByNTypeReq",
                reason: format!("attribute type of {} bytes, expected 2 or 16", n),
            }),
        }
    }

    pub fn start_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn end_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(3)
    }

    pub fn is_group_type(&self) -> bool {
        self.opcode() == AttOpcode::ReadByGroupTypeReq
    }

    pub fn uuid(&self) -> AttResult<Uuid> {
        let type_size = UuidTypeSize::for_byte_count(self.value_size())?;
        Ok(self.msg.read_uuid(5, type_size)?)
    }
}

att_pdu! {
    /// FIND_BY_TYPE_VALUE_REQ: handle range, 16 bit attribute type, value
    AttFindByTypeValueReq, value_offset = 7, opcodes = [AttOpcode::FindByTypeValueReq]
}

impl AttFindByTypeValueReq<'static> {
    pub fn new(start_handle: u16, end_handle: u16, att_type: u16, value: &[u8]) -> AttResult<Self> {
        check_value_len("AttFindByTypeValueReq", value.len())?;
        let mut pdu = build_handle_range(
            AttOpcode::FindByTypeValueReq,
            7 + value.len(),
            start_handle,
            end_handle,
        )?;
        pdu.write_u16(5, att_type)?;
        pdu.write_bytes(7, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttFindByTypeValueReq<'_> {
    pub fn start_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn end_handle(&self) -> u16 {
        self.msg.read_u16_unchecked(3)
    }

    pub fn att_type(&self) -> Uuid {
        Uuid::Uuid16(self.msg.read_u16_unchecked(5))
    }
}

att_pdu! {
    /// FIND_BY_TYPE_VALUE_RSP: list of (found handle, group end handle)
    AttFindByTypeValueRsp, value_offset = 1, opcodes = [AttOpcode::FindByTypeValueRsp],
    validate = check_stride
}

impl AttFindByTypeValueRsp<'static> {
    pub fn new(ranges: &[(u16, u16)]) -> AttResult<Self> {
        let mut pdu = new_pdu(AttOpcode::FindByTypeValueRsp, 1 + 4 * ranges.len())?;
        for (i, &(found, group_end)) in ranges.iter().enumerate() {
            pdu.write_u16(1 + 4 * i, found)?;
            pdu.write_u16(3 + 4 * i, group_end)?;
        }
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttFindByTypeValueRsp<'_> {
    fn check_stride(&self) -> AttResult<()> {
        if self.value_size() % 4 != 0 {
            return Err(AttError::ValueSize {
                name: "AttFindByTypeValueRsp",
                reason: format!("value size {} not multiple of 4", self.value_size()),
            });
        }
        Ok(())
    }

    pub fn range_count(&self) -> usize {
        self.value_size() / 4
    }

    pub fn range(&self, index: usize) -> AttResult<(u16, u16)> {
        let offset = 1 + 4 * index;
        Ok((self.msg.read_u16(offset)?, self.msg.read_u16(offset + 2)?))
    }

    pub fn ranges(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (0..self.range_count()).map(move |i| {
            let offset = 1 + 4 * i;
            (
                self.msg.read_u16_unchecked(offset),
                self.msg.read_u16_unchecked(offset + 2),
            )
        })
    }
}

att_pdu! {
    /// PREPARE_WRITE_REQ and PREPARE_WRITE_RSP: handle, offset, part value
    AttPrepareWrite, value_offset = 5,
    opcodes = [AttOpcode::PrepareWriteReq, AttOpcode::PrepareWriteRsp]
}

impl AttPrepareWrite<'static> {
    pub fn new_request(handle: u16, write_offset: u16, value: &[u8]) -> AttResult<Self> {
        Self::build(AttOpcode::PrepareWriteReq, handle, write_offset, value)
    }

    pub fn new_response(handle: u16, write_offset: u16, value: &[u8]) -> AttResult<Self> {
        Self::build(AttOpcode::PrepareWriteRsp, handle, write_offset, value)
    }

    fn build(opcode: AttOpcode, handle: u16, write_offset: u16, value: &[u8]) -> AttResult<Self> {
        check_value_len("AttPrepareWrite", value.len())?;
        let mut pdu = new_pdu(opcode, 5 + value.len())?;
        pdu.write_u16(1, handle)?;
        pdu.write_u16(3, write_offset)?;
        pdu.write_bytes(5, value)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttPrepareWrite<'_> {
    pub fn handle(&self) -> u16 {
        self.msg.read_u16_unchecked(1)
    }

    pub fn write_offset(&self) -> u16 {
        self.msg.read_u16_unchecked(3)
    }

    pub fn is_request(&self) -> bool {
        self.opcode() == AttOpcode::PrepareWriteReq
    }

    /// The response echoing this request.
    pub fn to_response(&self) -> AttResult<AttPrepareWrite<'static>> {
        AttPrepareWrite::new_response(self.handle(), self.write_offset(), self.value())
    }
}

att_pdu! {
    /// EXECUTE_WRITE_REQ: commit or cancel the prepared queue
    AttExeWriteReq, value_offset = 2, opcodes = [AttOpcode::ExecuteWriteReq]
}

impl AttExeWriteReq<'static> {
    pub fn new(commit: bool) -> AttResult<Self> {
        let mut pdu = new_pdu(AttOpcode::ExecuteWriteReq, 2)?;
        let flags = if commit {
            ATT_EXEC_WRITE_COMMIT
        } else {
            ATT_EXEC_WRITE_CANCEL
        };
        pdu.write_u8(1, flags)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttExeWriteReq<'_> {
    pub fn flags(&self) -> u8 {
        self.msg.read_u8_unchecked(1)
    }

    pub fn is_commit(&self) -> bool {
        self.flags() == ATT_EXEC_WRITE_COMMIT
    }
}

att_pdu! {
    /// EXECUTE_WRITE_RSP
    AttExeWriteRsp, value_offset = 1, opcodes = [AttOpcode::ExecuteWriteRsp]
}

impl AttExeWriteRsp<'static> {
    pub fn new() -> AttResult<Self> {
        Ok(Self {
            msg: AttPduMsg::owned(new_pdu(AttOpcode::ExecuteWriteRsp, 1)?),
        })
    }
}

att_pdu! {
    /// READ_MULTIPLE_REQ and READ_MULTIPLE_VARIABLE_REQ, two or more handles
    AttReadMultipleReq, value_offset = 1,
    opcodes = [AttOpcode::ReadMultipleReq, AttOpcode::ReadMultipleVariableReq],
    validate = check_handles
}

impl AttReadMultipleReq<'static> {
    pub fn new(handles: &[u16]) -> AttResult<Self> {
        Self::build(AttOpcode::ReadMultipleReq, handles)
    }

    pub fn new_variable(handles: &[u16]) -> AttResult<Self> {
        Self::build(AttOpcode::ReadMultipleVariableReq, handles)
    }

    fn build(opcode: AttOpcode, handles: &[u16]) -> AttResult<Self> {
        if handles.len() < 2 {
            return Err(AttError::ValueSize {
                name: "AttReadMultipleReq",
                reason: format!("{} handles, at least 2 required", handles.len()),
            });
        }
        let mut pdu = new_pdu(opcode, 1 + 2 * handles.len())?;
        for (i, &handle) in handles.iter().enumerate() {
            pdu.write_u16(1 + 2 * i, handle)?;
        }
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadMultipleReq<'_> {
    fn check_handles(&self) -> AttResult<()> {
        let size = self.value_size();
        if size < 4 || size % 2 != 0 {
            return Err(AttError::ValueSize {
                name: "AttReadMultipleReq",
                reason: format!("handle set of {} bytes", size),
            });
        }
        Ok(())
    }

    pub fn is_variable(&self) -> bool {
        self.opcode() == AttOpcode::ReadMultipleVariableReq
    }

    pub fn handle_count(&self) -> usize {
        self.value_size() / 2
    }

    pub fn handles(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.handle_count()).map(move |i| self.msg.read_u16_unchecked(1 + 2 * i))
    }
}

att_pdu! {
    /// READ_MULTIPLE_RSP, the concatenated values
    AttReadMultipleRsp, value_offset = 1, opcodes = [AttOpcode::ReadMultipleRsp]
}

impl AttReadMultipleRsp<'static> {
    pub fn new(values: &[u8]) -> AttResult<Self> {
        check_value_len("AttReadMultipleRsp", values.len())?;
        let mut pdu = new_pdu(AttOpcode::ReadMultipleRsp, 1 + values.len())?;
        pdu.write_bytes(1, values)?;
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

att_pdu! {
    /// READ_MULTIPLE_VARIABLE_RSP: list of (length, value) tuples.
    ///
    /// The last value may be cut short by the MTU, in which case its length
    /// field still states the full attribute length.
    AttReadMultipleVariableRsp, value_offset = 1,
    opcodes = [AttOpcode::ReadMultipleVariableRsp],
    validate = check_tuples
}

impl AttReadMultipleVariableRsp<'static> {
    pub fn new(values: &[&[u8]]) -> AttResult<Self> {
        let total: usize = values.iter().map(|v| 2 + v.len()).sum();
        let mut pdu = new_pdu(AttOpcode::ReadMultipleVariableRsp, 1 + total)?;
        let mut offset = 1;
        for value in values {
            let len = u16::try_from(value.len()).map_err(|_| AttError::ValueSize {
                name: "AttReadMultipleVariableRsp",
                reason: format!("value length {} exceeds u16", value.len()),
            })?;
            pdu.write_u16(offset, len)?;
            pdu.write_bytes(offset + 2, value)?;
            offset += 2 + value.len();
        }
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttReadMultipleVariableRsp<'_> {
    fn check_tuples(&self) -> AttResult<()> {
        let size = self.pdu_size();
        let mut offset = 1;
        while offset < size {
            if offset + 2 > size {
                return Err(AttError::ValueSize {
                    name: "AttReadMultipleVariableRsp",
                    reason: format!("dangling length field at {}", offset),
                });
            }
            let len = usize::from(self.msg.read_u16_unchecked(offset));
            offset += 2 + len;
        }
        Ok(())
    }

    /// Values in order, the last possibly truncated.
    pub fn values(&self) -> Vec<&[u8]> {
        let bytes = self.msg.as_slice();
        let mut out = Vec::new();
        let mut offset = 1;
        while offset + 2 <= bytes.len() {
            let len = usize::from(self.msg.read_u16_unchecked(offset));
            let start = offset + 2;
            let end = (start + len).min(bytes.len());
            out.push(&bytes[start..end]);
            offset = start + len;
        }
        out
    }

    /// Whether the last value is shorter than its length field announces.
    pub fn is_truncated(&self) -> bool {
        let mut offset = 1;
        while offset + 2 <= self.pdu_size() {
            offset += 2 + usize::from(self.msg.read_u16_unchecked(offset));
        }
        offset > self.pdu_size()
    }
}

att_pdu! {
    /// MULTIPLE_HANDLE_VALUE_NTF: list of (handle, length, value) tuples
    AttMultipleHandleValueNtf, value_offset = 1,
    opcodes = [AttOpcode::MultipleHandleValueNtf],
    validate = check_tuples
}

impl AttMultipleHandleValueNtf<'static> {
    pub fn new(entries: &[(u16, &[u8])]) -> AttResult<Self> {
        let total: usize = entries.iter().map(|(_, v)| 4 + v.len()).sum();
        let mut pdu = new_pdu(AttOpcode::MultipleHandleValueNtf, 1 + total)?;
        let mut offset = 1;
        for &(handle, value) in entries {
            let len = u16::try_from(value.len()).map_err(|_| AttError::ValueSize {
                name: "AttMultipleHandleValueNtf",
                reason: format!("value length {} exceeds u16", value.len()),
            })?;
            pdu.write_u16(offset, handle)?;
            pdu.write_u16(offset + 2, len)?;
            pdu.write_bytes(offset + 4, value)?;
            offset += 4 + value.len();
        }
        Ok(Self {
            msg: AttPduMsg::owned(pdu),
        })
    }
}

impl AttMultipleHandleValueNtf<'_> {
    fn check_tuples(&self) -> AttResult<()> {
        let size = self.pdu_size();
        let mut offset = 1;
        while offset < size {
            self.msg.check_range(offset, 4)?;
            let len = usize::from(self.msg.read_u16_unchecked(offset + 2));
            self.msg.check_range(offset + 4, len)?;
            offset += 4 + len;
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(u16, &[u8])> {
        let bytes = self.msg.as_slice();
        let mut out = Vec::new();
        let mut offset = 1;
        while offset + 4 <= bytes.len() {
            let handle = self.msg.read_u16_unchecked(offset);
            let len = usize::from(self.msg.read_u16_unchecked(offset + 2));
            out.push((handle, &bytes[offset + 4..offset + 4 + len]));
            offset += 4 + len;
        }
        out
    }
}

/// Sentinel for frames whose opcode no PDU type claims
#[derive(Debug, Clone)]
pub struct AttPduUndefined<'a> {
    msg: AttPduMsg<'a>,
}

impl<'a> AttPduUndefined<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> AttResult<Self> {
        if bytes.is_empty() {
            return Err(AttError::PacketSize {
                name: "AttPduUndefined",
                size: 0,
                min_size: 1,
            });
        }
        Ok(Self {
            msg: AttPduMsg::borrowed(bytes),
        })
    }

    pub fn into_owned(self) -> AttResult<AttPduUndefined<'static>> {
        Ok(AttPduUndefined {
            msg: self.msg.into_owned()?,
        })
    }
}

impl AttPduMessage for AttPduUndefined<'_> {
    fn msg(&self) -> &AttPduMsg<'_> {
        &self.msg
    }

    fn value_offset(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str {
        "AttPduUndefined"
    }
}

impl fmt::Display for AttPduUndefined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_pdu(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_req_layout() {
        let req = AttReadReq::new(0x0203).unwrap();
        assert_eq!(req.as_bytes(), &[0x0A, 0x03, 0x02]);
        assert_eq!(req.value_offset(), 3);
        assert_eq!(req.param_size(), 2);
        assert_eq!(req.value_size(), 0);
        assert_eq!(req.min_size(), 3);
        assert!(req.msg().is_owned());
    }

    #[test]
    fn test_borrowed_view_decodes_lazily() {
        let raw = [0x0C, 0x34, 0x12, 0x16, 0x00];
        let req = AttReadBlobReq::from_bytes(&raw).unwrap();
        assert!(!req.msg().is_owned());
        assert_eq!(req.handle(), 0x1234);
        assert_eq!(req.blob_offset(), 22);
    }

    #[test]
    fn test_signed_write_sizes() {
        let sig = [0xA5u8; 12];
        let cmd = AttSignedWriteCmd::new(0x0010, &[1, 2, 3], &sig).unwrap();
        assert_eq!(cmd.opcode(), AttOpcode::SignedWriteCmd);
        assert_eq!(cmd.auth_sig_size(), 12);
        assert_eq!(cmd.pdu_size(), 1 + 2 + 3 + 12);
        assert_eq!(cmd.param_size(), 5);
        assert_eq!(cmd.value_size(), 3);
        assert_eq!(cmd.min_size(), 15);
        assert_eq!(cmd.value(), &[1, 2, 3]);
        assert_eq!(cmd.signature(), sig);
        assert_eq!(cmd.max_value_size(23), 23 - 12 - 3);

        let parsed = AttSignedWriteCmd::from_bytes(cmd.as_bytes()).unwrap();
        assert_eq!(parsed.handle(), 0x0010);
        assert_eq!(parsed.value(), &[1, 2, 3]);
    }

    #[test]
    fn test_signed_write_too_short_for_signature() {
        let raw = [0xD2, 0x10, 0x00, 1, 2, 3];
        assert!(matches!(
            AttSignedWriteCmd::from_bytes(&raw),
            Err(AttError::PacketSize { min_size: 15, size: 6, .. })
        ));
    }

    #[test]
    fn test_into_owned_detaches() {
        let owned = {
            let raw = vec![0x1B, 0x05, 0x00, 0xAA];
            let ntf = AttHandleValueRcv::from_bytes(&raw).unwrap();
            ntf.into_owned().unwrap()
        };
        assert!(owned.is_notification());
        assert_eq!(owned.handle(), 5);
        assert_eq!(owned.value(), &[0xAA]);
    }

    #[test]
    fn test_value_length_capped() {
        let long = vec![0u8; ATT_MAX_VALUE_LEN + 1];
        assert!(matches!(
            AttWriteReq::new(1, &long),
            Err(AttError::ValueSize { .. })
        ));
        assert!(AttWriteReq::new(1, &long[..ATT_MAX_VALUE_LEN]).is_ok());
    }

    #[test]
    fn test_read_by_type_req_uuid_width() {
        let req = AttReadByNTypeReq::new_by_type(1, 0xFFFF, &Uuid::Uuid16(0x2803)).unwrap();
        assert_eq!(req.pdu_size(), 7);
        assert_eq!(req.uuid().unwrap(), Uuid::Uuid16(0x2803));

        let req32 = AttReadByNTypeReq::new_by_group_type(1, 0xFFFF, &Uuid::Uuid32(0x2800)).unwrap();
        assert_eq!(req32.pdu_size(), 21);
        assert_eq!(req32.uuid().unwrap(), Uuid::Uuid16(0x2800).to_uuid128());

        // four byte attribute types are not valid on the wire
        let raw = [0x08, 0x01, 0x00, 0xFF, 0xFF, 0x00, 0x28, 0x00, 0x00];
        assert!(matches!(
            AttReadByNTypeReq::from_bytes(&raw),
            Err(AttError::ValueSize { .. })
        ));
    }

    #[test]
    fn test_read_multiple_variable_rsp_truncated_tail() {
        // second tuple announces 4 bytes but only 2 arrived
        let raw = [0x21, 0x01, 0x00, 0xAA, 0x04, 0x00, 0xBB, 0xCC];
        let rsp = AttReadMultipleVariableRsp::from_bytes(&raw).unwrap();
        assert_eq!(rsp.values(), vec![&[0xAAu8][..], &[0xBBu8, 0xCC][..]]);
        assert!(rsp.is_truncated());

        let raw = [0x21, 0x01, 0x00, 0xAA, 0x04];
        assert!(AttReadMultipleVariableRsp::from_bytes(&raw).is_err());
    }

    #[test]
    fn test_multiple_handle_value_ntf_bounds() {
        let ntf = AttMultipleHandleValueNtf::new(&[(1, &[0x10]), (2, &[0x20, 0x21])]).unwrap();
        let parsed = AttMultipleHandleValueNtf::from_bytes(ntf.as_bytes()).unwrap();
        let expected: Vec<(u16, &[u8])> = vec![(1, &[0x10]), (2, &[0x20, 0x21])];
        assert_eq!(parsed.entries(), expected);

        let raw = [0x23, 0x01, 0x00, 0x03, 0x00, 0x10];
        assert!(matches!(
            AttMultipleHandleValueNtf::from_bytes(&raw),
            Err(AttError::Octets(OctetError::IndexOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_display() {
        let req = AttReadReq::new(1).unwrap();
        assert_eq!(
            req.to_string(),
            "AttReadReq[READ_REQ (0x0A), size 3, value size 0]"
        );
    }
}
