//! Example: SMP feature exchange between two pairing sessions
//!
//! Runs the PAIRING_REQUEST / PAIRING_RESPONSE exchange between an initiator
//! and a responder in memory and prints the frames and the negotiated method.

use rustyblue_pdu::smp::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("SMP Pairing Example");
    println!("-----------------");

    let auth = SmpAuthReqs::BONDING | SmpAuthReqs::MITM | SmpAuthReqs::SECURE_CONNECTIONS;
    let mut central = PairingSession::new_initiator(SmpPairingFeatures {
        io_capability: SmpIoCapability::KeyboardDisplay,
        auth_reqs: auth,
        ..Default::default()
    });
    let mut peripheral = PairingSession::new_responder(SmpPairingFeatures {
        io_capability: SmpIoCapability::DisplayOnly,
        auth_reqs: auth,
        ..Default::default()
    });

    let req = central.start_pairing()?;
    println!("central    -> {}", req);

    let mut decoder = SmpDecoder::default();
    let Some(inbound) = decoder.decode(req.as_bytes()) else {
        return Err("pairing request was dropped".into());
    };
    let Some(rsp) = peripheral.on_pdu(&inbound)? else {
        return Err("responder did not answer".into());
    };
    println!("peripheral -> {}", rsp);

    central.on_pdu(&parse_smp_pdu(rsp.as_bytes())?)?;

    for (name, session) in [("central", &central), ("peripheral", &peripheral)] {
        println!(
            "{}: state {}, method {}, secure connections {}, key size {:?}",
            name,
            session.state(),
            session.mode(),
            session.is_secure_connections(),
            session.negotiated_key_size()
        );
    }

    println!("Method table (Secure Connections, rows responder, columns initiator):");
    for resp in SmpIoCapability::ALL {
        let row: Vec<String> = SmpIoCapability::ALL
            .iter()
            .map(|init| match pairing_mode_for_io(true, *init, resp) {
                Ok(mode) => format!("{:?}", mode),
                Err(e) => e.to_string(),
            })
            .collect();
        println!("  {:<16} {}", resp.to_string(), row.join(", "));
    }

    Ok(())
}
