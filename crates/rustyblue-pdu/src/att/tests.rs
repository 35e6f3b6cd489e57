//! Tests for the ATT PDU layer

use super::*;
use crate::uuid::Uuid;
use proptest::prelude::*;

fn assert_mismatch(result: AttResult<impl std::fmt::Debug>, observed: AttOpcode) {
    match result {
        Err(AttError::OpcodeMismatch { observed: o, .. }) => assert_eq!(o, observed),
        other => panic!("expected opcode mismatch, got {:?}", other),
    }
}

#[test]
fn test_opcode_gate() {
    let blob = [0x0C, 0x01, 0x00, 0x00, 0x00];
    assert_mismatch(AttReadReq::from_bytes(&blob), AttOpcode::ReadBlobReq);
    assert_mismatch(AttWriteReq::from_bytes(&blob), AttOpcode::ReadBlobReq);
    assert_mismatch(AttExchangeMtu::from_bytes(&blob), AttOpcode::ReadBlobReq);
    assert_mismatch(AttReadByTypeRsp::from_bytes(&blob), AttOpcode::ReadBlobReq);
    assert_mismatch(AttFindInfoRsp::from_bytes(&blob), AttOpcode::ReadBlobReq);

    // WRITE_CMD differs from WRITE_REQ only by the command flag
    let cmd = [0x52, 0x01, 0x00, 0xFF];
    assert_mismatch(AttWriteReq::from_bytes(&cmd), AttOpcode::WriteCmd);
    assert_mismatch(AttSignedWriteCmd::from_bytes(&cmd), AttOpcode::WriteCmd);
    assert!(AttWriteCmd::from_bytes(&cmd).is_ok());
}

#[test]
fn test_short_frames_are_size_errors() {
    let cases: [(&[u8], usize); 6] = [
        (&[0x01, 0x0A, 0x01, 0x00], 5),
        (&[0x02, 0x17], 3),
        (&[0x0C, 0x01, 0x00, 0x00], 5),
        (&[0x10, 0x01, 0x00, 0xFF], 5),
        (&[0x06, 0x01, 0x00, 0xFF, 0xFF, 0x00], 7),
        (&[0x16, 0x01, 0x00, 0x00], 5),
    ];
    for (raw, min) in cases {
        match parse_att_pdu(raw) {
            Err(AttError::PacketSize { size, min_size, .. }) => {
                assert_eq!(size, raw.len());
                assert_eq!(min_size, min);
            }
            other => panic!("expected size error for {:02X?}, got {:?}", raw, other),
        }
    }
    assert!(AttReadReq::from_bytes(&[]).is_err());
}

#[test]
fn test_error_rsp_round_trip() {
    let rsp = AttErrorRsp::new(AttErrorCode::AttributeNotLong, AttOpcode::ReadBlobReq, 0x002A).unwrap();
    assert_eq!(rsp.as_bytes(), &[0x01, 0x0C, 0x2A, 0x00, 0x0B]);

    let parsed = AttErrorRsp::from_bytes(rsp.as_bytes()).unwrap();
    assert_eq!(parsed.cause_opcode(), AttOpcode::ReadBlobReq);
    assert_eq!(parsed.cause_handle(), 0x002A);
    assert_eq!(parsed.error_code(), AttErrorCode::AttributeNotLong);
    assert_eq!(parsed.value_size(), 0);
    assert_eq!(
        parsed.to_error(),
        AttError::Protocol(AttErrorCode::AttributeNotLong, 0x002A)
    );
}

#[test]
fn test_size_arithmetic_per_type() {
    let mtu = AttExchangeMtu::new_request(517).unwrap();
    assert_eq!((mtu.value_offset(), mtu.param_size(), mtu.value_size()), (3, 2, 0));

    let rsp = AttReadNRsp::new_read_rsp(&[1, 2, 3, 4]).unwrap();
    assert_eq!((rsp.value_offset(), rsp.param_size(), rsp.value_size()), (1, 4, 4));
    assert_eq!(rsp.max_value_size(23), 22);

    let cfm = AttHandleValueCfm::new().unwrap();
    assert_eq!((cfm.pdu_size(), cfm.param_size(), cfm.value_size()), (1, 0, 0));

    let exe = AttExeWriteReq::new(true).unwrap();
    assert!(exe.is_commit());
    assert_eq!(exe.as_bytes(), &[0x18, 0x01]);
    assert!(!AttExeWriteReq::new(false).unwrap().is_commit());

    assert_eq!(AttWriteRsp::new().unwrap().as_bytes(), &[0x13]);
    assert_eq!(AttExeWriteRsp::new().unwrap().as_bytes(), &[0x19]);
}

#[test]
fn test_find_by_type_value() {
    let req = AttFindByTypeValueReq::new(0x0001, 0xFFFF, PRIMARY_SERVICE_UUID, &[0x0D, 0x18]).unwrap();
    let parsed = AttFindByTypeValueReq::from_bytes(req.as_bytes()).unwrap();
    assert_eq!(parsed.start_handle(), 0x0001);
    assert_eq!(parsed.end_handle(), 0xFFFF);
    assert_eq!(parsed.att_type(), Uuid::Uuid16(0x2800));
    assert_eq!(parsed.value(), &[0x0D, 0x18]);

    let rsp = AttFindByTypeValueRsp::new(&[(0x0010, 0x0017), (0x0020, 0xFFFF)]).unwrap();
    let parsed = AttFindByTypeValueRsp::from_bytes(rsp.as_bytes()).unwrap();
    assert_eq!(parsed.range_count(), 2);
    assert_eq!(parsed.range(1).unwrap(), (0x0020, 0xFFFF));
    assert!(parsed.range(2).is_err());
    let ranges: Vec<(u16, u16)> = parsed.ranges().collect();
    assert_eq!(ranges, [(0x0010, 0x0017), (0x0020, 0xFFFF)]);

    assert!(AttFindByTypeValueRsp::from_bytes(&[0x07, 0x01, 0x00, 0x02]).is_err());
}

#[test]
fn test_read_multiple() {
    let req = AttReadMultipleReq::new(&[3, 5, 7]).unwrap();
    let parsed = AttReadMultipleReq::from_bytes(req.as_bytes()).unwrap();
    assert!(!parsed.is_variable());
    let handles: Vec<u16> = parsed.handles().collect();
    assert_eq!(handles, [3, 5, 7]);

    let var = AttReadMultipleReq::new_variable(&[1, 2]).unwrap();
    assert_eq!(var.opcode(), AttOpcode::ReadMultipleVariableReq);
    assert!(AttReadMultipleReq::new(&[1]).is_err());
    assert!(AttReadMultipleReq::from_bytes(&[0x0E, 0x01, 0x00]).is_err());
    assert!(AttReadMultipleReq::from_bytes(&[0x0E, 0x01, 0x00, 0x02, 0x00, 0x03]).is_err());

    let rsp = AttReadMultipleRsp::new(&[0xAA, 0xBB]).unwrap();
    assert_eq!(rsp.value(), &[0xAA, 0xBB]);

    let vrsp = AttReadMultipleVariableRsp::new(&[&[1, 2, 3], &[], &[4]]).unwrap();
    let parsed = AttReadMultipleVariableRsp::from_bytes(vrsp.as_bytes()).unwrap();
    let expected: Vec<&[u8]> = vec![&[1, 2, 3], &[], &[4]];
    assert_eq!(parsed.values(), expected);
    assert!(!parsed.is_truncated());
}

#[test]
fn test_prepare_write_echo() {
    let req = AttPrepareWrite::new_request(0x0021, 18, b"tail").unwrap();
    assert!(req.is_request());
    let rsp = req.to_response().unwrap();
    assert!(!rsp.is_request());
    assert_eq!(rsp.handle(), 0x0021);
    assert_eq!(rsp.write_offset(), 18);
    assert_eq!(rsp.value(), b"tail");
    assert!(matches!(parse_att_pdu(rsp.as_bytes()).unwrap(), AttPdu::PrepareWrite(_)));
}

#[test]
fn test_factory_covers_every_assigned_opcode() {
    for raw in 0..=u8::MAX {
        let opcode = AttOpcode::from(raw);
        let mut frame = vec![raw];
        frame.extend_from_slice(&[0u8; 40]);
        match parse_att_pdu(&frame) {
            Ok(pdu) => {
                let undefined = matches!(opcode, AttOpcode::Unknown(_) | AttOpcode::PduUndefined);
                assert_eq!(pdu.is_undefined(), undefined, "opcode {}", opcode);
                if !undefined {
                    assert_eq!(pdu.opcode(), opcode);
                }
            }
            // zero filled frames are legitimately malformed for some types
            Err(e) => assert!(
                !matches!(e, AttError::OpcodeMismatch { .. }),
                "dispatch picked wrong type for {}: {}",
                opcode,
                e
            ),
        }
    }
}

proptest! {
    #[test]
    fn prop_handle_fields_round_trip(handle in any::<u16>(), offset in any::<u16>()) {
        let req = AttReadReq::new(handle).unwrap();
        prop_assert_eq!(AttReadReq::from_bytes(req.as_bytes()).unwrap().handle(), handle);

        let blob = AttReadBlobReq::new(handle, offset).unwrap();
        let parsed = AttReadBlobReq::from_bytes(blob.as_bytes()).unwrap();
        prop_assert_eq!((parsed.handle(), parsed.blob_offset()), (handle, offset));

        let info = AttFindInfoReq::new(handle, offset).unwrap();
        let parsed = AttFindInfoReq::from_bytes(info.as_bytes()).unwrap();
        prop_assert_eq!((parsed.start_handle(), parsed.end_handle()), (handle, offset));
    }

    #[test]
    fn prop_handle_value_round_trip(
        handle in any::<u16>(),
        value in proptest::collection::vec(any::<u8>(), 0..=ATT_MAX_VALUE_LEN),
    ) {
        let ntf = AttHandleValueRcv::new_notification(handle, &value).unwrap();
        let parsed = AttHandleValueRcv::from_bytes(ntf.as_bytes()).unwrap();
        prop_assert!(parsed.is_notification());
        prop_assert_eq!(parsed.handle(), handle);
        prop_assert_eq!(parsed.value(), &value[..]);
        prop_assert_eq!(parsed.value_size(), value.len());

        let write = AttWriteReq::new(handle, &value).unwrap();
        let parsed = AttWriteReq::from_bytes(write.as_bytes()).unwrap();
        prop_assert_eq!(parsed.handle(), handle);
        prop_assert_eq!(parsed.value(), &value[..]);
    }

    #[test]
    fn prop_element_count_requires_whole_elements(
        element_size in 2usize..=32,
        count in 0usize..8,
        extra in 0usize..32,
    ) {
        let extra = extra % element_size;
        let mut raw = vec![ATT_READ_BY_TYPE_RSP, element_size as u8];
        raw.resize(2 + element_size * count + extra, 0x5A);
        match AttReadByTypeRsp::from_bytes(&raw) {
            Ok(rsp) => {
                prop_assert_eq!(extra, 0);
                prop_assert_eq!(rsp.element_count(), count);
                prop_assert_eq!(rsp.value_size() / element_size, count);
            }
            Err(e) => {
                prop_assert!(extra != 0);
                let is_value_size = matches!(e, AttError::ValueSize { .. });
                prop_assert!(is_value_size);
            }
        }
    }
}
