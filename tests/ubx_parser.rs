use fc_gnss::ubx::packets;
use fc_gnss::ubx::UbxParser;

fn feed_all(parser: &mut UbxParser, bytes: &[u8]) -> Vec<(u8, u8, Vec<u8>)> {
    let mut frames = Vec::new();
    for &b in bytes {
        if let Ok(Some(frame)) = parser.feed_byte(b) {
            frames.push((frame.class, frame.id, frame.payload.to_vec()));
        }
    }
    frames
}

#[test]
fn bad_preamble_byte_recognised_as_fresh_sync1() {
    // 0xB5 0xB5 0x62 ...: the second 0xB5 must start a fresh frame.
    let mut payload = vec![0u8; 92];
    payload[24..28].copy_from_slice(&1_234_i32.to_le_bytes());
    let mut frame_bytes = vec![0xb5, 0x62, 0x01, 0x07];
    frame_bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame_bytes.extend_from_slice(&payload);
    let mut calc_a = 0u8;
    let mut calc_b = 0u8;
    for &b in &frame_bytes[2..] {
        calc_a = calc_a.wrapping_add(b);
        calc_b = calc_b.wrapping_add(calc_a);
    }
    frame_bytes.push(calc_a);
    frame_bytes.push(calc_b);

    let mut bytes = vec![0xb5, 0xb5];
    bytes.extend_from_slice(&frame_bytes[1..]);

    let mut parser = UbxParser::new();
    let frames = feed_all(&mut parser, &bytes);
    assert_eq!(frames.len(), 1);
    assert_eq!((frames[0].0, frames[0].1), (0x01, 0x07));
}

#[test]
fn oversize_length_does_not_corrupt_the_next_frame() {
    let mut parser = UbxParser::new();
    let mut bytes = vec![0xb5, 0x62, 0x01, 0x07, 0xff, 0xff];
    bytes.extend(std::iter::repeat(0xAA).take(20));
    let _ = feed_all(&mut parser, &bytes);

    let frame = packets::poll_mon_ver();
    let frames = feed_all(&mut parser, &frame);
    assert_eq!(frames.len(), 1);
    assert_eq!((frames[0].0, frames[0].1), (0x0A, 0x04));
}

#[test]
fn every_accepted_frame_has_a_matching_checksum() {
    let frame = packets::cfg_msg_rate(0x01, 0x07, 1);
    let mut parser = UbxParser::new();
    let frames = feed_all(&mut parser, &frame);
    assert_eq!(frames.len(), 1);
    // Reconstructing and re-checksumming the same frame must agree with what
    // was transmitted: `cfg_msg_rate` itself computed ckA/ckB over the frame.
    let (_, _, payload) = &frames[0];
    assert_eq!(payload, &vec![0x01, 0x07, 1, 0, 0, 0, 0, 0]);
}
