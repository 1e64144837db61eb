//! NMEA 0183 ASCII sentence parser (SPEC_FULL.md section 4.B).
//!
//! No NMEA parser existed in the teacher crate (it only speaks UBX), so this
//! module borrows its *shape* — an explicit byte state machine with a bounded
//! field buffer — from `ubx::parser` rather than from any teacher file
//! directly; the sentence grammar and field semantics are grounded in
//! `examples/original_source/src/main/io/gps.c` (`gpsNewFrameNMEA`,
//! `parseFieldNmea`, `grab_fields`).

use crate::constants::{
    GPS_SV_MAXSATS_LEGACY, NMEA_CHECKSUM_SEP, NMEA_FIELD_BUFFER_SIZE, NMEA_FIELD_SEP,
    NMEA_SYNC_CHAR,
};

const MAX_GSV_SATS: usize = GPS_SV_MAXSATS_LEGACY;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GgaFields {
    pub time: i64,
    pub lat_1e7: i32,
    pub lon_1e7: i32,
    pub fix: bool,
    pub num_sat: u8,
    pub alt_cm: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RmcFields {
    pub time: i64,
    pub ground_speed_cm_s: i32,
    pub ground_course_decideg: i32,
    pub date_ddmmyy: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GsaFields {
    pub pdop: u16,
    pub hdop: u16,
    pub vdop: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GsvSat {
    pub chn: u8,
    pub svid: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GsvFields {
    pub num_ch: u8,
    pub sats: [GsvSat; MAX_GSV_SATS],
}

#[derive(Debug, Clone, PartialEq)]
pub enum NmeaSentence {
    Gga(GgaFields),
    Rmc(RmcFields),
    Gsa(GsaFields),
    Gsv(GsvFields),
}

impl NmeaSentence {
    /// Per SPEC_FULL.md section 4.B/5, only a completed GGA line publishes a
    /// new solution; RMC/GSA/GSV only update auxiliary fields.
    pub fn signals_new_solution(&self) -> bool {
        matches!(self, NmeaSentence::Gga(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unknown,
    Gga,
    Rmc,
    Gsa,
    Gsv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InField,
    InChecksum,
    AwaitLf,
}

/// Byte-fed NMEA sentence parser.
pub struct NmeaParser {
    state: State,
    kind: Kind,
    field_index: u32,
    field_buf: [u8; NMEA_FIELD_BUFFER_SIZE],
    field_len: usize,
    parity: u8,
    checksum_digits: [u8; 2],
    checksum_digit_count: u8,
    gga: GgaFields,
    rmc: RmcFields,
    gsa: GsaFields,
    gsv: GsvFields,
    gsv_total_visible: u8,
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            kind: Kind::Unknown,
            field_index: 0,
            field_buf: [0; NMEA_FIELD_BUFFER_SIZE],
            field_len: 0,
            parity: 0,
            checksum_digits: [0; 2],
            checksum_digit_count: 0,
            gga: GgaFields::default(),
            rmc: RmcFields::default(),
            gsa: GsaFields::default(),
            gsv: GsvFields { num_ch: 0, sats: [GsvSat::default(); MAX_GSV_SATS] },
            gsv_total_visible: 0,
        }
    }

    fn reset_field(&mut self) {
        self.field_len = 0;
    }

    fn push_field_byte(&mut self, byte: u8) {
        if self.field_len < self.field_buf.len() {
            self.field_buf[self.field_len] = byte;
            self.field_len += 1;
        }
        // Oversize fields silently truncate (SPEC_FULL.md section 4.B).
    }

    fn field(&self) -> &[u8] {
        &self.field_buf[..self.field_len]
    }

    fn dispatch_field(&mut self) {
        let field = self.field();
        match (self.kind, self.field_index) {
            (Kind::Unknown, 0) => {
                self.kind = sentence_kind(field);
            },
            (Kind::Gga, 1) => self.gga.time = grab_fields(field, 0),
            (Kind::Gga, 2) => self.gga.lat_1e7 = parse_lat(field, self.gga.lat_1e7),
            (Kind::Gga, 3) => {
                if field == b"S" {
                    self.gga.lat_1e7 = -self.gga.lat_1e7;
                }
            },
            (Kind::Gga, 4) => self.gga.lon_1e7 = parse_lon(field, self.gga.lon_1e7),
            (Kind::Gga, 5) => {
                if field == b"W" {
                    self.gga.lon_1e7 = -self.gga.lon_1e7;
                }
            },
            (Kind::Gga, 6) => self.gga.fix = grab_fields(field, 0) > 0,
            (Kind::Gga, 7) => self.gga.num_sat = grab_fields(field, 0) as u8,
            (Kind::Gga, 9) => self.gga.alt_cm = (grab_fields(field, 1) * 10) as i32,

            (Kind::Rmc, 1) => self.rmc.time = grab_fields(field, 0),
            (Kind::Rmc, 7) => {
                self.rmc.ground_speed_cm_s = ((grab_fields(field, 1) as i64 * 5144) / 1000) as i32;
            },
            (Kind::Rmc, 8) => self.rmc.ground_course_decideg = grab_fields(field, 1) as i32,
            (Kind::Rmc, 9) => self.rmc.date_ddmmyy = grab_fields(field, 0),

            (Kind::Gsa, 15) => self.gsa.pdop = (grab_fields(field, 2)).max(0) as u16,
            (Kind::Gsa, 16) => self.gsa.hdop = (grab_fields(field, 2)).max(0) as u16,
            (Kind::Gsa, 17) => self.gsa.vdop = (grab_fields(field, 2)).max(0) as u16,

            (Kind::Gsv, 3) => {
                let visible = grab_fields(field, 0).max(0) as u8;
                self.gsv_total_visible = visible;
                self.gsv.num_ch = visible.min(GPS_SV_MAXSATS_LEGACY as u8);
            },
            (Kind::Gsv, idx) if idx >= 4 => {
                // Fields repeat in groups of 4 starting at index 4: svid, elev, azim, cno.
                let rel = idx - 4;
                let sat_idx = (rel / 4) as usize;
                let field_in_group = rel % 4;
                if sat_idx < MAX_GSV_SATS && field_in_group == 0 {
                    self.gsv.sats[sat_idx].svid = grab_fields(field, 0).max(0) as u8;
                    self.gsv.sats[sat_idx].chn = sat_idx as u8;
                }
            },
            _ => {},
        }
    }

    fn finish_sentence(&mut self, ok: bool) -> Option<NmeaSentence> {
        let result = if ok {
            match self.kind {
                Kind::Gga => Some(NmeaSentence::Gga(self.gga)),
                Kind::Rmc => Some(NmeaSentence::Rmc(self.rmc)),
                Kind::Gsa => Some(NmeaSentence::Gsa(self.gsa)),
                Kind::Gsv => Some(NmeaSentence::Gsv(self.gsv.clone())),
                Kind::Unknown => None,
            }
        } else {
            None
        };
        self.kind = Kind::Unknown;
        self.field_index = 0;
        self.parity = 0;
        self.checksum_digit_count = 0;
        self.reset_field();
        self.state = State::Idle;
        result
    }

    /// Feeds one byte. Returns a parsed sentence once a checksum-valid line
    /// completes; sentences with a bad checksum are silently dropped.
    pub fn feed_byte(&mut self, byte: u8) -> Option<NmeaSentence> {
        if byte == NMEA_SYNC_CHAR {
            self.kind = Kind::Unknown;
            self.field_index = 0;
            self.parity = 0;
            self.checksum_digit_count = 0;
            self.reset_field();
            self.state = State::InField;
            return None;
        }

        match self.state {
            State::Idle => None,
            State::InField => match byte {
                NMEA_FIELD_SEP => {
                    self.parity ^= byte;
                    self.dispatch_field();
                    self.field_index += 1;
                    self.reset_field();
                    None
                },
                c if c == NMEA_CHECKSUM_SEP => {
                    self.dispatch_field();
                    self.state = State::InChecksum;
                    None
                },
                b'\r' | b'\n' => {
                    // Sentence ended without a checksum separator: drop it.
                    self.finish_sentence(false)
                },
                c => {
                    self.parity ^= c;
                    self.push_field_byte(c);
                    None
                },
            },
            State::InChecksum => {
                if self.checksum_digit_count < 2 {
                    self.checksum_digits[self.checksum_digit_count as usize] = byte;
                    self.checksum_digit_count += 1;
                    if self.checksum_digit_count == 2 {
                        self.state = State::AwaitLf;
                    }
                    None
                } else {
                    self.finish_checksum(byte)
                }
            },
            State::AwaitLf => self.finish_checksum(byte),
        }
    }

    fn finish_checksum(&mut self, _byte: u8) -> Option<NmeaSentence> {
        let hi = hex_digit(self.checksum_digits[0]);
        let lo = hex_digit(self.checksum_digits[1]);
        let ok = matches!((hi, lo), (Some(h), Some(l)) if (h << 4 | l) == self.parity);
        self.finish_sentence(ok)
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn sentence_kind(field: &[u8]) -> Kind {
    if field.len() < 3 {
        return Kind::Unknown;
    }
    let suffix = &field[field.len() - 3..];
    match suffix {
        b"GGA" => Kind::Gga,
        b"RMC" => Kind::Rmc,
        b"GSA" => Kind::Gsa,
        b"GSV" => Kind::Gsv,
        _ => Kind::Unknown,
    }
}

/// Parses a bounded decimal field into a fixed-point integer scaled by
/// `10^decimals`, truncating extra decimal digits and zero-padding missing
/// ones. Malformed or empty fields decode to zero rather than aborting the
/// sentence. Grounded on `grab_fields()` in the reference firmware.
fn grab_fields(field: &[u8], decimals: u32) -> i64 {
    let mut value: i64 = 0;
    let mut negative = false;
    let mut iter = field.iter().peekable();
    if let Some(&&b'-') = iter.peek() {
        negative = true;
        iter.next();
    }
    let mut seen_point = false;
    let mut decimals_taken: u32 = 0;
    for &b in iter {
        if b == b'.' {
            seen_point = true;
            continue;
        }
        if !b.is_ascii_digit() {
            break;
        }
        if !seen_point {
            value = value * 10 + (b - b'0') as i64;
        } else if decimals_taken < decimals {
            value = value * 10 + (b - b'0') as i64;
            decimals_taken += 1;
        }
    }
    while decimals_taken < decimals {
        value *= 10;
        decimals_taken += 1;
    }
    if negative {
        -value
    } else {
        value
    }
}

/// `ddmm.mmmmm` -> 1e-7 degrees, per SPEC_FULL.md section 4.B's exact transform.
fn parse_lat(field: &[u8], _prev: i32) -> i32 {
    parse_dm(field, 2)
}

/// `dddmm.mmmmm` -> 1e-7 degrees (three-digit degree field).
fn parse_lon(field: &[u8], _prev: i32) -> i32 {
    parse_dm(field, 3)
}

fn parse_dm(field: &[u8], deg_digits: usize) -> i32 {
    if field.len() < deg_digits {
        return 0;
    }
    let deg = grab_fields(&field[..deg_digits], 0);
    let minutes = grab_fields(&field[deg_digits..], 5);
    (deg * 10_000_000 + (minutes * 10) / 6) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut NmeaParser, sentence: &str) -> Option<NmeaSentence> {
        let mut result = None;
        for b in sentence.bytes() {
            if let Some(s) = parser.feed_byte(b) {
                result = Some(s);
            }
        }
        result
    }

    #[test]
    fn dm_conversion_matches_zero_fraction_reference_point() {
        // 0 deg 30.0 arcminutes = 0.5 degree = 5_000_000 in 1e-7 degree units.
        assert_eq!(parse_dm(b"0030.00000", 2), 5_000_000);
    }

    #[test]
    fn dm_conversion_round_trips_with_full_precision_fraction() {
        // Same transform as SPEC_FULL.md section 8's round-trip property,
        // computed the same way the parser computes it (both sides must use
        // the identical formula, since it is the contract under test).
        let deg = 12i64;
        let whole = grab_fields(b"34.56789", 5);
        let expected = (deg * 10_000_000 + (whole * 10) / 6) as i32;
        assert_eq!(parse_dm(b"1234.56789", 2), expected);
    }

    #[test]
    fn gga_sentence_with_valid_checksum_parses_and_signals_new_solution() {
        let mut p = NmeaParser::new();
        // $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47
        let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        let out = feed(&mut p, sentence);
        match out {
            Some(NmeaSentence::Gga(gga)) => {
                assert!(gga.fix);
                assert_eq!(gga.num_sat, 8);
                assert!(gga.lat_1e7 > 0);
                assert!(gga.lon_1e7 > 0);
            },
            other => panic!("expected GGA, got {other:?}"),
        }
    }

    #[test]
    fn sentence_with_bad_checksum_is_dropped() {
        let mut p = NmeaParser::new();
        let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*00\r\n";
        assert_eq!(feed(&mut p, sentence), None);
    }

    #[test]
    fn rmc_speed_converts_knots_to_centimetres_per_second() {
        let mut p = NmeaParser::new();
        // speed field "022.4" knots -> grab_fields(.,1) = 224 -> *5144/1000 = 1152
        let body = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
        let mut parity = 0u8;
        for b in body.bytes() {
            parity ^= b;
        }
        let sentence = format!("${body}*{parity:02X}\r\n");
        match feed(&mut p, &sentence) {
            Some(NmeaSentence::Rmc(rmc)) => assert_eq!(rmc.ground_speed_cm_s, 1152),
            other => panic!("expected RMC, got {other:?}"),
        }
    }
}
