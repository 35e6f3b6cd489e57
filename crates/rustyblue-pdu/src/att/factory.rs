//! Opcode dispatch for inbound ATT frames
use super::constants::*;
use super::element::{AttFindInfoRsp, AttReadByGroupTypeRsp, AttReadByTypeRsp};
use super::error::{AttError, AttResult};
use super::opcode::AttOpcode;
use super::pdu::*;
use log::{debug, trace, warn};
use std::fmt;

macro_rules! att_pdu_variants {
    ($($variant:ident($ty:ident)),* $(,)?) => {
        /// Every ATT PDU type, keyed by opcode
        #[derive(Debug, Clone)]
        pub enum AttPdu<'a> {
            $($variant($ty<'a>),)*
        }

        impl<'a> AttPdu<'a> {
            /// The common size arithmetic of the contained PDU.
            pub fn as_message(&self) -> &dyn AttPduMessage {
                match self {
                    $(AttPdu::$variant(pdu) => pdu,)*
                }
            }

            /// Copies the frame so the PDU may outlive the receive buffer.
            pub fn into_owned(self) -> AttResult<AttPdu<'static>> {
                Ok(match self {
                    $(AttPdu::$variant(pdu) => AttPdu::$variant(pdu.into_owned()?),)*
                })
            }
        }
    };
}

att_pdu_variants! {
    ErrorRsp(AttErrorRsp),
    ExchangeMtu(AttExchangeMtu),
    FindInfoReq(AttFindInfoReq),
    FindInfoRsp(AttFindInfoRsp),
    FindByTypeValueReq(AttFindByTypeValueReq),
    FindByTypeValueRsp(AttFindByTypeValueRsp),
    ReadByNTypeReq(AttReadByNTypeReq),
    ReadByTypeRsp(AttReadByTypeRsp),
    ReadByGroupTypeRsp(AttReadByGroupTypeRsp),
    ReadReq(AttReadReq),
    ReadBlobReq(AttReadBlobReq),
    ReadNRsp(AttReadNRsp),
    ReadMultipleReq(AttReadMultipleReq),
    ReadMultipleRsp(AttReadMultipleRsp),
    ReadMultipleVariableRsp(AttReadMultipleVariableRsp),
    WriteReq(AttWriteReq),
    WriteCmd(AttWriteCmd),
    SignedWriteCmd(AttSignedWriteCmd),
    WriteRsp(AttWriteRsp),
    PrepareWrite(AttPrepareWrite),
    ExeWriteReq(AttExeWriteReq),
    ExeWriteRsp(AttExeWriteRsp),
    HandleValueRcv(AttHandleValueRcv),
    HandleValueCfm(AttHandleValueCfm),
    MultipleHandleValueNtf(AttMultipleHandleValueNtf),
    Undefined(AttPduUndefined),
}

impl AttPdu<'_> {
    pub fn opcode(&self) -> AttOpcode {
        self.as_message().opcode()
    }

    pub fn name(&self) -> &'static str {
        self.as_message().name()
    }

    /// True for the sentinel returned on unassigned opcodes
    pub fn is_undefined(&self) -> bool {
        matches!(self, AttPdu::Undefined(_))
    }
}

impl fmt::Display for AttPdu<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_pdu(self.as_message(), f)
    }
}

/// Dispatches on the opcode octet and validates the matching PDU type.
///
/// Unassigned opcodes yield [`AttPdu::Undefined`] instead of an error;
/// an empty frame or a PDU failing its own validation is an error.
pub fn parse_att_pdu(bytes: &[u8]) -> AttResult<AttPdu<'_>> {
    let Some(&raw) = bytes.first() else {
        return Err(AttError::PacketSize {
            name: "AttPdu",
            size: 0,
            min_size: 1,
        });
    };
    use AttOpcode::*;
    let pdu = match AttOpcode::from(raw) {
        ErrorRsp => AttPdu::ErrorRsp(AttErrorRsp::from_bytes(bytes)?),
        ExchangeMtuReq | ExchangeMtuRsp => AttPdu::ExchangeMtu(AttExchangeMtu::from_bytes(bytes)?),
        FindInformationReq => AttPdu::FindInfoReq(AttFindInfoReq::from_bytes(bytes)?),
        FindInformationRsp => AttPdu::FindInfoRsp(AttFindInfoRsp::from_bytes(bytes)?),
        FindByTypeValueReq => {
            AttPdu::FindByTypeValueReq(AttFindByTypeValueReq::from_bytes(bytes)?)
        }
        FindByTypeValueRsp => {
            AttPdu::FindByTypeValueRsp(AttFindByTypeValueRsp::from_bytes(bytes)?)
        }
        ReadByTypeReq | ReadByGroupTypeReq => {
            AttPdu::ReadByNTypeReq(AttReadByNTypeReq::from_bytes(bytes)?)
        }
        ReadByTypeRsp => AttPdu::ReadByTypeRsp(AttReadByTypeRsp::from_bytes(bytes)?),
        ReadByGroupTypeRsp => {
            AttPdu::ReadByGroupTypeRsp(AttReadByGroupTypeRsp::from_bytes(bytes)?)
        }
        ReadReq => AttPdu::ReadReq(AttReadReq::from_bytes(bytes)?),
        ReadBlobReq => AttPdu::ReadBlobReq(AttReadBlobReq::from_bytes(bytes)?),
        ReadRsp | ReadBlobRsp => AttPdu::ReadNRsp(AttReadNRsp::from_bytes(bytes)?),
        ReadMultipleReq | ReadMultipleVariableReq => {
            AttPdu::ReadMultipleReq(AttReadMultipleReq::from_bytes(bytes)?)
        }
        ReadMultipleRsp => AttPdu::ReadMultipleRsp(AttReadMultipleRsp::from_bytes(bytes)?),
        ReadMultipleVariableRsp => {
            AttPdu::ReadMultipleVariableRsp(AttReadMultipleVariableRsp::from_bytes(bytes)?)
        }
        WriteReq => AttPdu::WriteReq(AttWriteReq::from_bytes(bytes)?),
        WriteCmd => AttPdu::WriteCmd(AttWriteCmd::from_bytes(bytes)?),
        SignedWriteCmd => AttPdu::SignedWriteCmd(AttSignedWriteCmd::from_bytes(bytes)?),
        WriteRsp => AttPdu::WriteRsp(AttWriteRsp::from_bytes(bytes)?),
        PrepareWriteReq | PrepareWriteRsp => {
            AttPdu::PrepareWrite(AttPrepareWrite::from_bytes(bytes)?)
        }
        ExecuteWriteReq => AttPdu::ExeWriteReq(AttExeWriteReq::from_bytes(bytes)?),
        ExecuteWriteRsp => AttPdu::ExeWriteRsp(AttExeWriteRsp::from_bytes(bytes)?),
        HandleValueNtf | HandleValueInd => {
            AttPdu::HandleValueRcv(AttHandleValueRcv::from_bytes(bytes)?)
        }
        HandleValueCfm => AttPdu::HandleValueCfm(AttHandleValueCfm::from_bytes(bytes)?),
        MultipleHandleValueNtf => {
            AttPdu::MultipleHandleValueNtf(AttMultipleHandleValueNtf::from_bytes(bytes)?)
        }
        PduUndefined | Unknown(_) => AttPdu::Undefined(AttPduUndefined::from_bytes(bytes)?),
    };
    Ok(pdu)
}

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Negotiated ATT_MTU; longer frames are dropped
    pub mtu: u16,
    /// Drop frames with unassigned opcodes instead of passing the sentinel on
    pub reject_undefined: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            mtu: ATT_DEFAULT_MTU,
            reject_undefined: false,
        }
    }
}

/// Frame counters of a decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub received: u64,
    pub decoded: u64,
    pub undefined: u64,
    pub malformed: u64,
    pub oversized: u64,
}

/// Per-connection receive side of the ATT channel.
///
/// Malformed frames are logged, counted and dropped so one bad PDU never
/// ends the connection.
#[derive(Debug, Clone, Default)]
pub struct AttDecoder {
    config: DecoderConfig,
    stats: DecodeStats,
}

impl AttDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            stats: DecodeStats::default(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn mtu(&self) -> u16 {
        self.config.mtu
    }

    /// Applies the outcome of an MTU exchange, clamped to the valid range.
    pub fn set_mtu(&mut self, mtu: u16) {
        let clamped = mtu.clamp(ATT_DEFAULT_MTU, ATT_MAX_MTU);
        if clamped != mtu {
            warn!("ATT MTU {} out of range, using {}", mtu, clamped);
        }
        debug!("ATT MTU {} -> {}", self.config.mtu, clamped);
        self.config.mtu = clamped;
    }

    /// Decodes one frame, or returns `None` if it was dropped.
    pub fn decode<'b>(&mut self, bytes: &'b [u8]) -> Option<AttPdu<'b>> {
        self.stats.received += 1;
        if bytes.len() > usize::from(self.config.mtu) {
            self.stats.oversized += 1;
            warn!(
                "Dropping ATT frame of {} bytes, MTU is {}",
                bytes.len(),
                self.config.mtu
            );
            return None;
        }
        match parse_att_pdu(bytes) {
            Ok(pdu) if pdu.is_undefined() => {
                self.stats.undefined += 1;
                debug!("Undefined ATT opcode 0x{:02X}", bytes[0]);
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
                warn!("Dropping malformed ATT frame {}: {}", hex::encode(bytes), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_opcode() {
        let pdu = parse_att_pdu(&[0x02, 0x05, 0x02]).unwrap();
        assert!(matches!(&pdu, AttPdu::ExchangeMtu(m) if m.mtu_size() == 517 && m.is_request()));
        assert_eq!(pdu.name(), "AttExchangeMtu");

        let pdu = parse_att_pdu(&[0x1D, 0x01, 0x00, 0x42]).unwrap();
        assert!(matches!(&pdu, AttPdu::HandleValueRcv(m) if m.is_indication()));

        let pdu = parse_att_pdu(&[0x52, 0x01, 0x00, 0x42]).unwrap();
        assert!(matches!(pdu, AttPdu::WriteCmd(_)));
    }

    #[test]
    fn test_unknown_opcode_yields_sentinel() {
        let pdu = parse_att_pdu(&[0x3F, 0x01]).unwrap();
        assert!(pdu.is_undefined());
        assert_eq!(pdu.opcode(), AttOpcode::Unknown(0x3F));
        assert!(parse_att_pdu(&[0x00]).unwrap().is_undefined());
        assert!(parse_att_pdu(&[]).is_err());
    }

    #[test]
    fn test_malformed_pdu_is_error() {
        assert!(matches!(
            parse_att_pdu(&[0x0A, 0x01]),
            Err(AttError::PacketSize { size: 2, min_size: 3, .. })
        ));
    }

    #[test]
    fn test_decoder_counts_and_drops() {
        let mut decoder = AttDecoder::default();
        assert!(decoder.decode(&[0x0A, 0x01, 0x00]).is_some());
        assert!(decoder.decode(&[0x0A, 0x01]).is_none());
        assert!(decoder.decode(&[0x7E]).is_some());
        assert!(decoder.decode(&[0x0B; 24]).is_none());
        assert_eq!(
            decoder.stats(),
            DecodeStats {
                received: 4,
                decoded: 1,
                undefined: 1,
                malformed: 1,
                oversized: 1,
            }
        );

        let mut strict = AttDecoder::new(DecoderConfig {
            reject_undefined: true,
            ..Default::default()
        });
        assert!(strict.decode(&[0x7E]).is_none());
    }

    #[test]
    fn test_set_mtu_clamps() {
        let mut decoder = AttDecoder::default();
        decoder.set_mtu(247);
        assert_eq!(decoder.mtu(), 247);
        decoder.set_mtu(10);
        assert_eq!(decoder.mtu(), ATT_DEFAULT_MTU);
        decoder.set_mtu(u16::MAX);
        assert_eq!(decoder.mtu(), ATT_MAX_MTU);
    }

    #[test]
    fn test_owned_pdu_outlives_buffer() {
        let owned = {
            let buf = vec![0x0B, 1, 2, 3];
            parse_att_pdu(&buf).unwrap().into_owned().unwrap()
        };
        assert_eq!(owned.as_message().value(), &[1, 2, 3]);
    }
}
