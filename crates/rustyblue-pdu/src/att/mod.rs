//! Attribute Protocol (ATT) PDUs
//!
//! This module provides typed views over ATT PDUs, the wire format used by
//! GATT clients and servers. Inbound frames are dispatched by opcode through
//! [`parse_att_pdu`] or an [`AttDecoder`]; outbound PDUs are built by the
//! typed constructors of each PDU type.

pub mod constants;
pub mod element;
pub mod error;
pub mod factory;
pub mod opcode;
pub mod pdu;

#[cfg(test)]
mod tests;

// Re-export the public API
pub use self::constants::*;
pub use self::element::{AttElementList, AttFindInfoRsp, AttReadByGroupTypeRsp, AttReadByTypeRsp};
pub use self::error::{AttError, AttErrorCode, AttResult, ExpectedOpcodes};
pub use self::factory::{parse_att_pdu, AttDecoder, AttPdu, DecodeStats, DecoderConfig};
pub use self::opcode::{AttOpcode, AttOpcodeType};
pub use self::pdu::{
    AttErrorRsp, AttExchangeMtu, AttExeWriteReq, AttExeWriteRsp, AttFindByTypeValueReq,
    AttFindByTypeValueRsp, AttFindInfoReq, AttHandleValueCfm, AttHandleValueRcv,
    AttMultipleHandleValueNtf, AttPduMessage, AttPduMsg, AttPduUndefined, AttPrepareWrite,
    AttReadBlobReq, AttReadByNTypeReq, AttReadMultipleReq, AttReadMultipleRsp,
    AttReadMultipleVariableRsp, AttReadNRsp, AttReadReq, AttSignedWriteCmd, AttWriteCmd,
    AttWriteReq, AttWriteRsp, PduOctets,
};
