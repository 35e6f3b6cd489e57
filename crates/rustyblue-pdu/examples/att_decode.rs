//! Example: decoding ATT frames given as hex strings
//!
//! Usage: cargo run --example att_decode -- 0a2a00 0c2a001600 1b100048656c6c6f

use rustyblue_pdu::att::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut frames: Vec<String> = std::env::args().skip(1).collect();
    if frames.is_empty() {
        frames = vec![
            "02f501".into(),
            "0a2a00".into(),
            "1b100048656c6c6f".into(),
            "0906030001280a00".into(),
        ];
    }

    let mut decoder = AttDecoder::new(DecoderConfig {
        mtu: ATT_MAX_MTU,
        ..Default::default()
    });
    for frame in &frames {
        let bytes = hex::decode(frame)?;
        match decoder.decode(&bytes) {
            Some(pdu) => {
                let msg = pdu.as_message();
                println!("{} -> {}", frame, pdu);
                println!(
                    "    param size {}, value {}",
                    msg.param_size(),
                    hex::encode(msg.value())
                );
            }
            None => println!("{} -> dropped", frame),
        }
    }
    println!("{:?}", decoder.stats());
    Ok(())
}
