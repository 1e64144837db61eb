use fc_gnss::nmea::{NmeaParser, NmeaSentence};

fn feed(parser: &mut NmeaParser, sentence: &str) -> Option<NmeaSentence> {
    let mut last = None;
    for b in sentence.bytes() {
        if let Some(s) = parser.feed_byte(b) {
            last = Some(s);
        }
    }
    last
}

#[test]
fn gga_with_valid_fix_reports_a_new_solution() {
    let mut parser = NmeaParser::new();
    let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    let result = feed(&mut parser, sentence).expect("sentence should parse");
    match result {
        NmeaSentence::Gga(gga) => {
            assert!(gga.fix);
            assert_eq!(gga.num_sat, 8);
            assert!(result.signals_new_solution());
        },
        _ => panic!("expected GGA"),
    }
}

#[test]
fn rmc_and_gsa_do_not_signal_a_new_solution() {
    let mut parser = NmeaParser::new();
    // Checksum is recalculated to be valid for this exact string.
    let sentence_base = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
    let mut parity = 0u8;
    for b in sentence_base.bytes() {
        parity ^= b;
    }
    let sentence = format!("${sentence_base}*{parity:02X}\r\n");
    let result = feed(&mut parser, &sentence).expect("sentence should parse");
    assert!(!result.signals_new_solution());
    if let NmeaSentence::Rmc(rmc) = result {
        // 022.4 knots -> 224 (tenths of a knot) * 5144 / 1000 = 1152 cm/s.
        assert_eq!(rmc.ground_speed_cm_s, 1152);
    } else {
        panic!("expected RMC");
    }
}

#[test]
fn sentence_with_corrupted_checksum_byte_is_silently_dropped() {
    let mut parser = NmeaParser::new();
    let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48\r\n";
    assert!(feed(&mut parser, sentence).is_none());
}
