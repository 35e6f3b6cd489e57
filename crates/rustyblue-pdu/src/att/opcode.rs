//! ATT opcodes and their protocol classification
use super::constants::*;
use std::fmt;

/// ATT opcode, the first octet of every ATT PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttOpcode {
    PduUndefined,
    ErrorRsp,
    ExchangeMtuReq,
    ExchangeMtuRsp,
    FindInformationReq,
    FindInformationRsp,
    FindByTypeValueReq,
    FindByTypeValueRsp,
    ReadByTypeReq,
    ReadByTypeRsp,
    ReadReq,
    ReadRsp,
    ReadBlobReq,
    ReadBlobRsp,
    ReadMultipleReq,
    ReadMultipleRsp,
    ReadByGroupTypeReq,
    ReadByGroupTypeRsp,
    WriteReq,
    WriteRsp,
    WriteCmd,
    SignedWriteCmd,
    PrepareWriteReq,
    PrepareWriteRsp,
    ExecuteWriteReq,
    ExecuteWriteRsp,
    HandleValueNtf,
    HandleValueInd,
    HandleValueCfm,
    ReadMultipleVariableReq,
    ReadMultipleVariableRsp,
    MultipleHandleValueNtf,
    /// Any octet not assigned by the Core Specification
    Unknown(u8),
}

/// Protocol role of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttOpcodeType {
    Undefined,
    /// Client to server, including commands that expect no response
    Request,
    /// Server to client answer, including error responses and confirmations
    Response,
    Notification,
    Indication,
}

impl From<u8> for AttOpcode {
    fn from(raw: u8) -> Self {
        match raw {
            ATT_PDU_UNDEFINED => AttOpcode::PduUndefined,
            ATT_ERROR_RSP => AttOpcode::ErrorRsp,
            ATT_EXCHANGE_MTU_REQ => AttOpcode::ExchangeMtuReq,
            ATT_EXCHANGE_MTU_RSP => AttOpcode::ExchangeMtuRsp,
            ATT_FIND_INFO_REQ => AttOpcode::FindInformationReq,
            ATT_FIND_INFO_RSP => AttOpcode::FindInformationRsp,
            ATT_FIND_BY_TYPE_VALUE_REQ => AttOpcode::FindByTypeValueReq,
            ATT_FIND_BY_TYPE_VALUE_RSP => AttOpcode::FindByTypeValueRsp,
            ATT_READ_BY_TYPE_REQ => AttOpcode::ReadByTypeReq,
            ATT_READ_BY_TYPE_RSP => AttOpcode::ReadByTypeRsp,
            ATT_READ_REQ => AttOpcode::ReadReq,
            ATT_READ_RSP => AttOpcode::ReadRsp,
            ATT_READ_BLOB_REQ => AttOpcode::ReadBlobReq,
            ATT_READ_BLOB_RSP => AttOpcode::ReadBlobRsp,
            ATT_READ_MULTIPLE_REQ => AttOpcode::ReadMultipleReq,
            ATT_READ_MULTIPLE_RSP => AttOpcode::ReadMultipleRsp,
            ATT_READ_BY_GROUP_TYPE_REQ => AttOpcode::ReadByGroupTypeReq,
            ATT_READ_BY_GROUP_TYPE_RSP => AttOpcode::ReadByGroupTypeRsp,
            ATT_WRITE_REQ => AttOpcode::WriteReq,
            ATT_WRITE_RSP => AttOpcode::WriteRsp,
            ATT_WRITE_CMD => AttOpcode::WriteCmd,
            ATT_SIGNED_WRITE_CMD => AttOpcode::SignedWriteCmd,
            ATT_PREPARE_WRITE_REQ => AttOpcode::PrepareWriteReq,
            ATT_PREPARE_WRITE_RSP => AttOpcode::PrepareWriteRsp,
            ATT_EXECUTE_WRITE_REQ => AttOpcode::ExecuteWriteReq,
            ATT_EXECUTE_WRITE_RSP => AttOpcode::ExecuteWriteRsp,
            ATT_HANDLE_VALUE_NTF => AttOpcode::HandleValueNtf,
            ATT_HANDLE_VALUE_IND => AttOpcode::HandleValueInd,
            ATT_HANDLE_VALUE_CONF => AttOpcode::HandleValueCfm,
            ATT_READ_MULTIPLE_VARIABLE_REQ => AttOpcode::ReadMultipleVariableReq,
            ATT_READ_MULTIPLE_VARIABLE_RSP => AttOpcode::ReadMultipleVariableRsp,
            ATT_MULTIPLE_HANDLE_VALUE_NTF => AttOpcode::MultipleHandleValueNtf,
            other => AttOpcode::Unknown(other),
        }
    }
}

impl From<AttOpcode> for u8 {
    fn from(opcode: AttOpcode) -> Self {
        match opcode {
            AttOpcode::PduUndefined => ATT_PDU_UNDEFINED,
            AttOpcode::ErrorRsp => ATT_ERROR_RSP,
            AttOpcode::ExchangeMtuReq => ATT_EXCHANGE_MTU_REQ,
            AttOpcode::ExchangeMtuRsp => ATT_EXCHANGE_MTU_RSP,
            AttOpcode::FindInformationReq => ATT_FIND_INFO_REQ,
            AttOpcode::FindInformationRsp => ATT_FIND_INFO_RSP,
            AttOpcode::FindByTypeValueReq => ATT_FIND_BY_TYPE_VALUE_REQ,
            AttOpcode::FindByTypeValueRsp => ATT_FIND_BY_TYPE_VALUE_RSP,
            AttOpcode::ReadByTypeReq => ATT_READ_BY_TYPE_REQ,
            AttOpcode::ReadByTypeRsp => ATT_READ_BY_TYPE_RSP,
            AttOpcode::ReadReq => ATT_READ_REQ,
            AttOpcode::ReadRsp => ATT_READ_RSP,
            AttOpcode::ReadBlobReq => ATT_READ_BLOB_REQ,
            AttOpcode::ReadBlobRsp => ATT_READ_BLOB_RSP,
            AttOpcode::ReadMultipleReq => ATT_READ_MULTIPLE_REQ,
            AttOpcode::ReadMultipleRsp => ATT_READ_MULTIPLE_RSP,
            AttOpcode::ReadByGroupTypeReq => ATT_READ_BY_GROUP_TYPE_REQ,
            AttOpcode::ReadByGroupTypeRsp => ATT_READ_BY_GROUP_TYPE_RSP,
            AttOpcode::WriteReq => ATT_WRITE_REQ,
            AttOpcode::WriteRsp => ATT_WRITE_RSP,
            AttOpcode::WriteCmd => ATT_WRITE_CMD,
            AttOpcode::SignedWriteCmd => ATT_SIGNED_WRITE_CMD,
            AttOpcode::PrepareWriteReq => ATT_PREPARE_WRITE_REQ,
            AttOpcode::PrepareWriteRsp => ATT_PREPARE_WRITE_RSP,
            AttOpcode::ExecuteWriteReq => ATT_EXECUTE_WRITE_REQ,
            AttOpcode::ExecuteWriteRsp => ATT_EXECUTE_WRITE_RSP,
            AttOpcode::HandleValueNtf => ATT_HANDLE_VALUE_NTF,
            AttOpcode::HandleValueInd => ATT_HANDLE_VALUE_IND,
            AttOpcode::HandleValueCfm => ATT_HANDLE_VALUE_CONF,
            AttOpcode::ReadMultipleVariableReq => ATT_READ_MULTIPLE_VARIABLE_REQ,
            AttOpcode::ReadMultipleVariableRsp => ATT_READ_MULTIPLE_VARIABLE_RSP,
            AttOpcode::MultipleHandleValueNtf => ATT_MULTIPLE_HANDLE_VALUE_NTF,
            AttOpcode::Unknown(raw) => raw,
        }
    }
}

impl AttOpcode {
    pub fn raw(self) -> u8 {
        self.into()
    }

    /// Method bits 0-5
    pub fn method(self) -> u8 {
        self.raw() & ATT_OPCODE_METHOD_MASK
    }

    /// Command flag, bit 6
    pub fn is_command(self) -> bool {
        self.raw() & ATT_OPCODE_COMMAND_FLAG != 0
    }

    /// Authentication signature flag, bit 7
    pub fn has_auth_sig(self) -> bool {
        self.raw() & ATT_OPCODE_AUTH_SIG_FLAG != 0
    }

    pub fn opcode_type(self) -> AttOpcodeType {
        use AttOpcode::*;
        match self {
            ExchangeMtuReq | FindInformationReq | FindByTypeValueReq | ReadByTypeReq | ReadReq
            | ReadBlobReq | ReadMultipleReq | ReadByGroupTypeReq | WriteReq | WriteCmd
            | SignedWriteCmd | PrepareWriteReq | ExecuteWriteReq | ReadMultipleVariableReq => {
                AttOpcodeType::Request
            }
            ErrorRsp | ExchangeMtuRsp | FindInformationRsp | FindByTypeValueRsp
            | ReadByTypeRsp | ReadRsp | ReadBlobRsp | ReadMultipleRsp | ReadByGroupTypeRsp
            | WriteRsp | PrepareWriteRsp | ExecuteWriteRsp | HandleValueCfm
            | ReadMultipleVariableRsp => AttOpcodeType::Response,
            HandleValueNtf | MultipleHandleValueNtf => AttOpcodeType::Notification,
            HandleValueInd => AttOpcodeType::Indication,
            PduUndefined | Unknown(_) => AttOpcodeType::Undefined,
        }
    }

    /// Whether the peer must answer this PDU (requests and indications).
    ///
    /// Commands carry the command flag and are never answered.
    pub fn expects_response(self) -> bool {
        match self.opcode_type() {
            AttOpcodeType::Request => !self.is_command(),
            AttOpcodeType::Indication => true,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        use AttOpcode::*;
        match self {
            PduUndefined => "PDU_UNDEFINED",
            ErrorRsp => "ERROR_RSP",
            ExchangeMtuReq => "EXCHANGE_MTU_REQ",
            ExchangeMtuRsp => "EXCHANGE_MTU_RSP",
            FindInformationReq => "FIND_INFORMATION_REQ",
            FindInformationRsp => "FIND_INFORMATION_RSP",
            FindByTypeValueReq => "FIND_BY_TYPE_VALUE_REQ",
            FindByTypeValueRsp => "FIND_BY_TYPE_VALUE_RSP",
            ReadByTypeReq => "READ_BY_TYPE_REQ",
            ReadByTypeRsp => "READ_BY_TYPE_RSP",
            ReadReq => "READ_REQ",
            ReadRsp => "READ_RSP",
            ReadBlobReq => "READ_BLOB_REQ",
            ReadBlobRsp => "READ_BLOB_RSP",
            ReadMultipleReq => "READ_MULTIPLE_REQ",
            ReadMultipleRsp => "READ_MULTIPLE_RSP",
            ReadByGroupTypeReq => "READ_BY_GROUP_TYPE_REQ",
            ReadByGroupTypeRsp => "READ_BY_GROUP_TYPE_RSP",
            WriteReq => "WRITE_REQ",
            WriteRsp => "WRITE_RSP",
            WriteCmd => "WRITE_CMD",
            SignedWriteCmd => "SIGNED_WRITE_CMD",
            PrepareWriteReq => "PREPARE_WRITE_REQ",
            PrepareWriteRsp => "PREPARE_WRITE_RSP",
            ExecuteWriteReq => "EXECUTE_WRITE_REQ",
            ExecuteWriteRsp => "EXECUTE_WRITE_RSP",
            HandleValueNtf => "HANDLE_VALUE_NTF",
            HandleValueInd => "HANDLE_VALUE_IND",
            HandleValueCfm => "HANDLE_VALUE_CFM",
            ReadMultipleVariableReq => "READ_MULTIPLE_VARIABLE_REQ",
            ReadMultipleVariableRsp => "READ_MULTIPLE_VARIABLE_RSP",
            MultipleHandleValueNtf => "MULTIPLE_HANDLE_VALUE_NTF",
            Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for AttOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip_for_every_octet() {
        for raw in 0..=u8::MAX {
            assert_eq!(u8::from(AttOpcode::from(raw)), raw);
        }
    }

    #[test]
    fn test_write_variants_share_method() {
        assert_eq!(AttOpcode::WriteCmd.method(), AttOpcode::WriteReq.method());
        assert_eq!(AttOpcode::SignedWriteCmd.method(), AttOpcode::WriteReq.method());
        assert!(AttOpcode::WriteCmd.is_command());
        assert!(!AttOpcode::WriteCmd.has_auth_sig());
        assert!(AttOpcode::SignedWriteCmd.has_auth_sig());
        assert_eq!(AttOpcode::from(0x52), AttOpcode::WriteCmd);
        assert_eq!(AttOpcode::from(0xD2), AttOpcode::SignedWriteCmd);
    }

    #[test]
    fn test_classification() {
        assert_eq!(AttOpcode::ReadReq.opcode_type(), AttOpcodeType::Request);
        assert_eq!(AttOpcode::ErrorRsp.opcode_type(), AttOpcodeType::Response);
        assert_eq!(AttOpcode::HandleValueNtf.opcode_type(), AttOpcodeType::Notification);
        assert_eq!(AttOpcode::HandleValueInd.opcode_type(), AttOpcodeType::Indication);
        assert_eq!(AttOpcode::from(0x14).opcode_type(), AttOpcodeType::Undefined);
        assert_eq!(AttOpcode::PduUndefined.opcode_type(), AttOpcodeType::Undefined);

        assert!(AttOpcode::WriteReq.expects_response());
        assert!(!AttOpcode::WriteCmd.expects_response());
        assert!(AttOpcode::HandleValueInd.expects_response());
        assert!(!AttOpcode::HandleValueNtf.expects_response());
    }

    #[test]
    fn test_display() {
        assert_eq!(AttOpcode::ReadBlobReq.to_string(), "READ_BLOB_REQ (0x0C)");
        assert_eq!(AttOpcode::from(0x7F).to_string(), "UNKNOWN (0x7F)");
    }
}
