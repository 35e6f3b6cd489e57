//! End to end exchanges between a simulated client and server

use rustyblue_pdu::att::*;
use rustyblue_pdu::smp::*;
use rustyblue_pdu::uuid::{type_size_for_byte_count, Uuid, UuidTypeSize, BASE_UUID};

/// Server side of a read: answers READ_REQ and READ_BLOB_REQ for one attribute.
fn serve_read(frame: &[u8], handle: u16, value: &[u8], mtu: u16) -> AttPdu<'static> {
    let reply = match parse_att_pdu(frame).unwrap() {
        AttPdu::ReadReq(req) => {
            assert_eq!(req.handle(), handle);
            let chunk = &value[..value.len().min(usize::from(mtu) - 1)];
            AttReadNRsp::new_read_rsp(chunk).unwrap()
        }
        AttPdu::ReadBlobReq(req) => {
            assert_eq!(req.handle(), handle);
            let start = usize::from(req.blob_offset()).min(value.len());
            let end = value.len().min(start + usize::from(mtu) - 1);
            AttReadNRsp::new_blob_rsp(&value[start..end]).unwrap()
        }
        other => panic!("unexpected request {}", other),
    };
    AttPdu::ReadNRsp(reply)
}

#[test]
fn mtu_exchange() {
    let req = AttExchangeMtu::new_request(517).unwrap();
    let mut server = AttDecoder::default();
    let client_mtu = match server.decode(req.as_bytes()) {
        Some(AttPdu::ExchangeMtu(m)) if m.is_request() => m.mtu_size(),
        other => panic!("expected MTU request, got {:?}", other),
    };
    assert_eq!(client_mtu, 517);

    let server_mtu = 247;
    let rsp = AttExchangeMtu::new_response(server_mtu).unwrap();
    let mut client = AttDecoder::default();
    let agreed = match client.decode(rsp.as_bytes()) {
        Some(AttPdu::ExchangeMtu(m)) if !m.is_request() => m.mtu_size().min(client_mtu),
        other => panic!("expected MTU response, got {:?}", other),
    };
    server.set_mtu(client_mtu.min(server_mtu));
    client.set_mtu(agreed);
    assert_eq!(server.mtu(), 247);
    assert_eq!(client.mtu(), 247);

    let ntf = AttHandleValueRcv::new_notification(0x0010, &[]).unwrap();
    assert_eq!(ntf.value_offset(), 3);
    assert_eq!(ntf.auth_sig_size(), 0);
    assert_eq!(ntf.max_value_size(247), 244);

    // a 247 byte frame now passes, a 248 byte one is dropped
    let full = AttHandleValueRcv::new_notification(0x0010, &[0x5A; 244]).unwrap();
    assert!(client.decode(full.as_bytes()).is_some());
    let mut too_long = full.as_bytes().to_vec();
    too_long.push(0);
    assert!(client.decode(&too_long).is_none());
    assert_eq!(client.stats().oversized, 1);
}

#[test]
fn long_read() {
    let mtu = ATT_DEFAULT_MTU;
    let handle = 0x002A;
    let value: Vec<u8> = (0..600u32).map(|i| (i * 7 % 251) as u8).collect();

    let req = AttReadReq::new(handle).unwrap();
    let mut reassembled = match serve_read(req.as_bytes(), handle, &value, mtu) {
        AttPdu::ReadNRsp(rsp) => {
            assert!(!rsp.is_blob_rsp());
            assert_eq!(rsp.value_size(), rsp.max_value_size(mtu));
            rsp.value().to_vec()
        }
        other => panic!("unexpected {}", other),
    };

    let chunk = usize::from(mtu) - 1;
    let mut requests = 1;
    loop {
        let offset = u16::try_from(reassembled.len()).unwrap();
        let blob = AttReadBlobReq::new(handle, offset).unwrap();
        requests += 1;
        let rsp = match serve_read(blob.as_bytes(), handle, &value, mtu) {
            AttPdu::ReadNRsp(rsp) => rsp,
            other => panic!("unexpected {}", other),
        };
        assert!(rsp.is_blob_rsp());
        reassembled.extend_from_slice(rsp.value());
        if rsp.value_size() < chunk {
            break;
        }
    }
    assert_eq!(reassembled.len(), 600);
    assert_eq!(reassembled, value);
    assert_eq!(requests, 600 / chunk + 1);
}

#[test]
fn pairing_failure() {
    let mut initiator = PairingSession::new_initiator(SmpPairingFeatures::default());
    let req = initiator.start_pairing().unwrap();

    let mut responder = PairingSession::new_responder(SmpPairingFeatures::default());
    let mut decoder = SmpDecoder::default();
    let inbound = decoder.decode(req.as_bytes()).unwrap();
    let rsp = responder.on_pdu(&inbound).unwrap().unwrap();
    initiator.on_pdu(&parse_smp_pdu(rsp.as_bytes()).unwrap()).unwrap();
    assert_eq!(initiator.mode(), PairingMode::JustWorks);
    assert!(initiator.state().is_active());

    // confirm value check failed on the responder
    let failed = SmpPairFailedMsg::new(SmpReasonCode::ConfirmValueFailed).unwrap();
    responder.fail(SmpReasonCode::ConfirmValueFailed);
    let inbound = parse_smp_pdu(failed.as_bytes()).unwrap();
    match &inbound {
        SmpPdu::PairFailed(msg) => assert_eq!(msg.reason_code(), SmpReasonCode::ConfirmValueFailed),
        other => panic!("unexpected {}", other),
    }
    initiator.on_pdu(&inbound).unwrap();

    for session in [&initiator, &responder] {
        assert_eq!(session.state(), SmpPairingState::Failed);
        assert!(session.state().has_finished());
        assert!(!session.state().is_active());
        assert_eq!(session.failure_reason(), Some(SmpReasonCode::ConfirmValueFailed));
        assert_eq!(session.security_level(), SecurityLevel::None);
    }

    // a late PDU does not revive the sequence
    let late = SmpPairRandMsg::new(&[0; 16]).unwrap();
    assert!(initiator.on_pdu(&parse_smp_pdu(late.as_bytes()).unwrap()).is_err());
    assert_eq!(initiator.state(), SmpPairingState::Failed);
}

#[test]
fn legacy_pairing_with_key_distribution() {
    let local = SmpPairingFeatures {
        io_capability: SmpIoCapability::KeyboardOnly,
        auth_reqs: SmpAuthReqs::BONDING | SmpAuthReqs::MITM,
        ..Default::default()
    };
    let remote = SmpPairingFeatures {
        io_capability: SmpIoCapability::DisplayOnly,
        responder_key_dist: SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY,
        ..Default::default()
    };
    let mut session = PairingSession::new_initiator(local);
    session.start_pairing().unwrap();
    let rsp = SmpPairingMsg::new_response(&remote).unwrap();
    session.on_pdu(&SmpPdu::Pairing(rsp)).unwrap();
    assert_eq!(session.mode(), PairingMode::PasskeyEntryInitiator);
    assert_eq!(session.state(), SmpPairingState::PasskeyExpected);
    assert!(session.state().is_allowing_input(SmpPairingState::PasskeyExpected));
    assert_eq!(
        session.expected_remote_keys(),
        Some(SmpKeyDist::ENC_KEY | SmpKeyDist::ID_KEY)
    );

    let addr = rustyblue_pdu::Eui48::new([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    let frames = [
        SmpPdu::EncInfo(SmpEncInfoMsg::new(&[0xA5; 16]).unwrap()),
        SmpPdu::MasterIdent(SmpMasterIdentMsg::new(0x4321, 0x1122_3344_5566_7788).unwrap()),
        SmpPdu::IdentInfo(SmpIdentInfoMsg::new(&[0x5A; 16]).unwrap()),
        SmpPdu::IdentAddrInfo(
            SmpIdentAddrInfoMsg::new(rustyblue_pdu::AddressType::Public, &addr).unwrap(),
        ),
    ];
    // keys only flow once the link is encrypted
    assert!(session.on_pdu(&frames[0]).is_err());
    session.set_state(SmpPairingState::KeyDistribution).unwrap();
    for frame in &frames {
        assert!(!session.remote_keys_complete());
        session.on_pdu(frame).unwrap();
        assert_eq!(session.state(), SmpPairingState::KeyDistribution);
    }
    assert!(session.remote_keys_complete());
    session.set_state(SmpPairingState::Completed).unwrap();

    let keys = session.remote_keys();
    let ltk = keys.ltk.as_ref().unwrap();
    assert_eq!((ltk.ediv, ltk.rand), (0x4321, 0x1122_3344_5566_7788));
    assert!(ltk.authenticated);
    assert_eq!(keys.irk.as_ref().unwrap().identity_address, addr);
    assert_eq!(session.security_level(), SecurityLevel::EncryptionWithAuthentication);
}

#[test]
fn uuid_width_and_expansion() {
    assert_eq!(type_size_for_byte_count(2).unwrap(), UuidTypeSize::Uuid16);
    assert_eq!(type_size_for_byte_count(4).unwrap(), UuidTypeSize::Uuid32);
    assert_eq!(type_size_for_byte_count(16).unwrap(), UuidTypeSize::Uuid128);
    for bad in [0, 1, 3, 8, 17] {
        assert!(type_size_for_byte_count(bad).is_err());
    }

    let gap = Uuid::Uuid16(0x1800).to_uuid128();
    assert_eq!(gap.to_string().to_uppercase(), "00001800-0000-1000-8000-00805F9B34FB");
    assert_eq!(gap.to_uuid128(), gap);
    assert_eq!(Uuid::Uuid128(BASE_UUID).to_uuid128(), Uuid::Uuid128(BASE_UUID));
}
