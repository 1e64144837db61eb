//! Zero-copy UBX payload views and outbound command builders.
//!
//! Every inbound message is a `XxxRef<'a>(&'a [u8])` newtype with a `validate()`
//! associated function and plain accessor methods reading fields with
//! `{u,i}NN::from_le_bytes`. This mirrors the pattern the `#[ubx_packet_recv]`
//! derive macro in the teacher crate generates (see `mon_ver.rs` there); it is
//! hand-written here because this driver's message catalogue is a small, fixed
//! subset rather than the hundreds of message types the macro is built to cover.

use bitflags::bitflags;

use crate::error::ParserError;

bitflags! {
    /// `gpsFixOk` and friends: bit 0 of NAV-STATUS/NAV-SOL/NAV-PVT's `flags`
    /// byte, the one bit every fix-validity check in this driver actually
    /// reads. The upper bits (diffSoln, psmState, headVehValid, carrSoln) are
    /// not consumed by anything this driver exports, so they're left unnamed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GpsFixFlags: u8 {
        const GPS_FIX_OK = 0x01;
    }
}

bitflags! {
    /// NAV-PVT's `valid` byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NavPvtValid: u8 {
        const VALID_DATE = 0x01;
        const VALID_TIME = 0x02;
        const FULLY_RESOLVED = 0x04;
        const VALID_MAG = 0x08;
    }
}

macro_rules! le_field {
    ($name:ident, $ty:ty, $offset:expr) => {
        pub fn $name(&self) -> $ty {
            <$ty>::from_le_bytes(self.0[$offset..$offset + core::mem::size_of::<$ty>()].try_into().unwrap())
        }
    };
}

fn check_len(packet: &'static str, payload: &[u8], expect: usize) -> Result<(), ParserError> {
    if payload.len() < expect {
        Err(ParserError::InvalidPacketLen { packet, expect, got: payload.len() })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MON-VER (0x0A, 0x04)
// ---------------------------------------------------------------------------

pub struct MonVerRef<'a>(pub &'a [u8]);

impl<'a> MonVerRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("MON-VER", payload, 40)
    }

    pub fn software_version(&self) -> &str {
        cstr(&self.0[0..30])
    }

    pub fn hardware_version(&self) -> &str {
        cstr(&self.0[30..40])
    }

    /// Extended info strings, 30 bytes each, following the fixed header.
    pub fn extensions(&self) -> impl Iterator<Item = &'a str> {
        self.0[40..].chunks(30).filter(|c| c.len() == 30).map(cstr)
    }
}

fn cstr(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("")
}

// ---------------------------------------------------------------------------
// NAV-POSLLH (0x01, 0x02)
// ---------------------------------------------------------------------------

pub struct NavPosllhRef<'a>(pub &'a [u8]);

impl<'a> NavPosllhRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-POSLLH", payload, 28)
    }
    le_field!(itow, u32, 0);
    le_field!(lon, i32, 4);
    le_field!(lat, i32, 8);
    le_field!(height_ellipsoid_mm, i32, 12);
    le_field!(height_msl_mm, i32, 16);
    le_field!(h_acc_mm, u32, 20);
    le_field!(v_acc_mm, u32, 24);
}

// ---------------------------------------------------------------------------
// NAV-STATUS (0x01, 0x03)
// ---------------------------------------------------------------------------

pub struct NavStatusRef<'a>(pub &'a [u8]);

impl<'a> NavStatusRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-STATUS", payload, 16)
    }
    le_field!(itow, u32, 0);

    pub fn fix_type(&self) -> u8 {
        self.0[4]
    }

    pub fn flags(&self) -> GpsFixFlags {
        GpsFixFlags::from_bits_truncate(self.0[5])
    }

    /// `gpsFixOk` bit: the fix, if any, is valid for navigation.
    pub fn fix_valid(&self) -> bool {
        self.flags().contains(GpsFixFlags::GPS_FIX_OK)
    }
}

// ---------------------------------------------------------------------------
// NAV-DOP (0x01, 0x04)
// ---------------------------------------------------------------------------

pub struct NavDopRef<'a>(pub &'a [u8]);

impl<'a> NavDopRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-DOP", payload, 18)
    }
    le_field!(itow, u32, 0);
    le_field!(g_dop, u16, 4);
    le_field!(p_dop, u16, 6);
    le_field!(t_dop, u16, 8);
    le_field!(v_dop, u16, 10);
    le_field!(h_dop, u16, 12);
    le_field!(n_dop, u16, 14);
    le_field!(e_dop, u16, 16);
}

// ---------------------------------------------------------------------------
// NAV-SOL (0x01, 0x06) — deprecated from M8 onward but still spoken by M7 and
// earlier modules.
// ---------------------------------------------------------------------------

pub struct NavSolRef<'a>(pub &'a [u8]);

impl<'a> NavSolRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-SOL", payload, 52)
    }
    le_field!(itow, u32, 0);
    le_field!(ftow_ns, i32, 4);
    le_field!(week, i16, 8);

    pub fn fix_type(&self) -> u8 {
        self.0[10]
    }

    pub fn flags(&self) -> GpsFixFlags {
        GpsFixFlags::from_bits_truncate(self.0[11])
    }

    pub fn num_sv(&self) -> u8 {
        self.0[47]
    }

    pub fn fix_valid(&self) -> bool {
        self.flags().contains(GpsFixFlags::GPS_FIX_OK)
    }
}

// ---------------------------------------------------------------------------
// NAV-VELNED (0x01, 0x12)
// ---------------------------------------------------------------------------

pub struct NavVelnedRef<'a>(pub &'a [u8]);

impl<'a> NavVelnedRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-VELNED", payload, 36)
    }
    le_field!(itow, u32, 0);
    le_field!(vel_n_cm_s, i32, 4);
    le_field!(vel_e_cm_s, i32, 8);
    le_field!(vel_d_cm_s, i32, 12);
    le_field!(speed_3d_cm_s, u32, 16);
    le_field!(g_speed_cm_s, u32, 20);
    /// Heading, 1e-5 degrees.
    le_field!(heading, i32, 24);
    le_field!(s_acc_cm_s, u32, 28);
    le_field!(c_acc, u32, 32);
}

// ---------------------------------------------------------------------------
// NAV-PVT (0x01, 0x07)
// ---------------------------------------------------------------------------

pub struct NavPvtRef<'a>(pub &'a [u8]);

impl<'a> NavPvtRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-PVT", payload, 92)
    }
    le_field!(itow, u32, 0);
    le_field!(year, u16, 4);

    pub fn month(&self) -> u8 {
        self.0[6]
    }
    pub fn day(&self) -> u8 {
        self.0[7]
    }
    pub fn hour(&self) -> u8 {
        self.0[8]
    }
    pub fn min(&self) -> u8 {
        self.0[9]
    }
    pub fn sec(&self) -> u8 {
        self.0[10]
    }
    pub fn valid(&self) -> NavPvtValid {
        NavPvtValid::from_bits_truncate(self.0[11])
    }

    le_field!(nano, i32, 16);

    pub fn fix_type(&self) -> u8 {
        self.0[20]
    }
    pub fn flags(&self) -> GpsFixFlags {
        GpsFixFlags::from_bits_truncate(self.0[21])
    }
    pub fn num_sv(&self) -> u8 {
        self.0[23]
    }

    le_field!(lon, i32, 24);
    le_field!(lat, i32, 28);
    le_field!(height_mm, i32, 32);
    le_field!(height_msl_mm, i32, 36);
    le_field!(h_acc_mm, u32, 40);
    le_field!(v_acc_mm, u32, 44);
    le_field!(vel_n_mm_s, i32, 48);
    le_field!(vel_e_mm_s, i32, 52);
    le_field!(vel_d_mm_s, i32, 56);
    le_field!(g_speed_mm_s, i32, 60);
    /// Heading of motion, 1e-5 degrees.
    le_field!(head_mot, i32, 64);
    le_field!(s_acc_mm_s, u32, 68);
    le_field!(head_acc, u32, 72);
    le_field!(p_dop, u16, 76);

    /// `gnssFixOk` bit of the `flags` byte.
    pub fn fix_valid(&self) -> bool {
        self.flags().contains(GpsFixFlags::GPS_FIX_OK)
    }
}

// ---------------------------------------------------------------------------
// NAV-SVINFO (0x01, 0x30) — legacy satellite list, cap 16 in this driver.
// ---------------------------------------------------------------------------

pub struct NavSvinfoRef<'a>(pub &'a [u8]);

pub struct SvinfoChannel<'a>(&'a [u8]);

impl<'a> SvinfoChannel<'a> {
    pub fn chn(&self) -> u8 {
        self.0[0]
    }
    pub fn svid(&self) -> u8 {
        self.0[1]
    }
    pub fn flags(&self) -> u8 {
        self.0[2]
    }
    pub fn quality(&self) -> u8 {
        self.0[3]
    }
    pub fn cno(&self) -> u8 {
        self.0[4]
    }
}

impl<'a> NavSvinfoRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-SVINFO", payload, 8)
    }

    pub fn num_ch(&self) -> u8 {
        self.0[4]
    }

    pub fn channels(&self) -> impl Iterator<Item = SvinfoChannel<'a>> {
        self.0[8..].chunks(12).filter(|c| c.len() == 12).map(SvinfoChannel)
    }
}

// ---------------------------------------------------------------------------
// NAV-SAT (0x01, 0x35) — modern satellite list, cap 32.
// ---------------------------------------------------------------------------

pub struct NavSatRef<'a>(pub &'a [u8]);

pub struct SatEntry<'a>(&'a [u8]);

impl<'a> SatEntry<'a> {
    pub fn gnss_id(&self) -> u8 {
        self.0[0]
    }
    pub fn sv_id(&self) -> u8 {
        self.0[1]
    }
    pub fn cno(&self) -> u8 {
        self.0[2]
    }
    le_field!(flags, u32, 8);
}

impl<'a> NavSatRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("NAV-SAT", payload, 8)
    }

    pub fn num_svs(&self) -> u8 {
        self.0[5]
    }

    pub fn satellites(&self) -> impl Iterator<Item = SatEntry<'a>> {
        self.0[8..].chunks(12).filter(|c| c.len() == 12).map(SatEntry)
    }
}

// ---------------------------------------------------------------------------
// ACK-ACK / ACK-NAK (0x05, 0x01 / 0x05, 0x00)
// ---------------------------------------------------------------------------

pub struct AckRef<'a>(pub &'a [u8]);

impl<'a> AckRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("ACK", payload, 2)
    }
    pub fn cls_id(&self) -> u8 {
        self.0[0]
    }
    pub fn msg_id(&self) -> u8 {
        self.0[1]
    }
}

// ---------------------------------------------------------------------------
// CFG-GNSS (0x06, 0x3E)
// ---------------------------------------------------------------------------

pub struct CfgGnssRef<'a>(pub &'a [u8]);

bitflags! {
    /// CFG-GNSS per-block `flags` field. Only the enable bit is consulted by
    /// this driver's CFG-GNSS echo/rewrite (SPEC_FULL.md section 10.5); the
    /// signal-band bits above it are preserved untouched when re-encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GnssBlockFlags: u32 {
        const ENABLE = 0x0000_0001;
    }
}

pub struct GnssConfigBlock<'a>(&'a [u8]);

impl<'a> GnssConfigBlock<'a> {
    pub fn gnss_id(&self) -> u8 {
        self.0[0]
    }
    le_field!(flags, u32, 4);

    pub fn enabled(&self) -> bool {
        GnssBlockFlags::from_bits_truncate(self.flags()).contains(GnssBlockFlags::ENABLE)
    }
}

impl<'a> CfgGnssRef<'a> {
    pub fn validate(payload: &[u8]) -> Result<(), ParserError> {
        check_len("CFG-GNSS", payload, 4)
    }

    pub fn num_config_blocks(&self) -> u8 {
        self.0[3]
    }

    pub fn blocks(&self) -> impl Iterator<Item = GnssConfigBlock<'a>> {
        self.0[4..].chunks(8).filter(|c| c.len() == 8).map(GnssConfigBlock)
    }
}

/// Rewrites a decoded CFG-GNSS payload's per-GNSS enable bit per `wanted`,
/// returning the new payload only if at least one bit actually changed
/// (SPEC_FULL.md section 10.5: don't re-send CFG-GNSS on every poll if
/// nothing would move). `wanted(gnss_id)` returns `None` to leave a GNSS
/// block untouched.
pub fn cfg_gnss_rewrite(payload: &[u8], wanted: impl Fn(u8) -> Option<bool>) -> Option<Vec<u8>> {
    let num_blocks = *payload.get(3)? as usize;
    let mut out = payload.to_vec();
    let mut changed = false;
    for i in 0..num_blocks {
        let base = 4 + i * 8;
        let block = out.get(base..base + 8)?;
        let gnss_id = block[0];
        let Some(want) = wanted(gnss_id) else { continue };
        let flags_bytes: [u8; 4] = block[4..8].try_into().unwrap();
        let mut bits = GnssBlockFlags::from_bits_truncate(u32::from_le_bytes(flags_bytes));
        if bits.contains(GnssBlockFlags::ENABLE) != want {
            bits.set(GnssBlockFlags::ENABLE, want);
            out[base + 4..base + 8].copy_from_slice(&bits.bits().to_le_bytes());
            changed = true;
        }
    }
    changed.then_some(out)
}

// ---------------------------------------------------------------------------
// Outbound command encoders. Each returns the full `0xB5 0x62 .. ckA ckB`
// frame ready to hand to the byte source adapter.
// ---------------------------------------------------------------------------

pub fn encode(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + payload.len());
    frame.push(crate::constants::UBX_SYNC_CHAR_1);
    frame.push(crate::constants::UBX_SYNC_CHAR_2);
    frame.push(class);
    frame.push(id);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    let mut calc = crate::ubx::checksum::UbxChecksum::new();
    calc.update(&frame[2..]);
    let (a, b) = calc.result();
    frame.push(a);
    frame.push(b);
    frame
}

pub fn poll_mon_ver() -> Vec<u8> {
    encode(0x0A, 0x04, &[])
}

pub fn cfg_msg_rate(msg_class: u8, msg_id: u8, rate_on_current_port: u8) -> Vec<u8> {
    let payload = [msg_class, msg_id, rate_on_current_port, 0, 0, 0, 0, 0];
    encode(0x06, 0x01, &payload)
}

pub fn cfg_rate(meas_rate_ms: u16, nav_rate_cycles: u16, time_ref: u16) -> Vec<u8> {
    let mut payload = [0u8; 6];
    payload[0..2].copy_from_slice(&meas_rate_ms.to_le_bytes());
    payload[2..4].copy_from_slice(&nav_rate_cycles.to_le_bytes());
    payload[4..6].copy_from_slice(&time_ref.to_le_bytes());
    encode(0x06, 0x08, &payload)
}

/// CFG-NAV5 with only the dynamic model and UTC standard set; everything else
/// uses the module's existing configuration (mask bits select which fields
/// the receiver should actually apply).
pub fn cfg_nav5_dynamic_model(dyn_model_wire: u8, utc_standard_wire: u8) -> Vec<u8> {
    let mut payload = [0u8; 36];
    // mask: bit0 dyn, bit10 utc
    let mask: u16 = 0x0001 | 0x0400;
    payload[0..2].copy_from_slice(&mask.to_le_bytes());
    payload[2] = dyn_model_wire;
    payload[3] = 0; // fixMode: unchanged
    payload[29] = utc_standard_wire;
    encode(0x06, 0x24, &payload)
}

pub fn cfg_sbas(enabled: bool, test_mode: bool, integrity: bool, scanmode1: u32) -> Vec<u8> {
    let mode = if enabled { 0x01 } else { 0x00 } | if test_mode { 0x02 } else { 0x00 };
    let usage = 0x04u8 | if integrity { 0x01 } else { 0x00 } | 0x02; // differential + range
    let mut payload = [0u8; 8];
    payload[0] = mode;
    payload[1] = usage;
    payload[2] = 3; // maxSBAS
    payload[3] = 0; // scanmode2
    payload[4..8].copy_from_slice(&scanmode1.to_le_bytes());
    encode(0x06, 0x16, &payload)
}

pub fn cfg_pms(power_setup_value: u8) -> Vec<u8> {
    let payload = [0u8, power_setup_value, 0, 0, 0, 0, 0, 0];
    encode(0x06, 0x86, &payload)
}

pub struct ValSetItem {
    pub key: u32,
    pub value: Vec<u8>,
}

/// CFG-VALSET targeting the RAM layer only (this driver never persists
/// configuration to the module's flash/BBR, per SPEC_FULL.md section 6).
pub fn cfg_valset(items: &[ValSetItem]) -> Vec<u8> {
    let mut payload = vec![0u8, 0x01, 0x00, 0x00]; // version=0, layers=RAM, reserved
    for item in items {
        payload.extend_from_slice(&item.key.to_le_bytes());
        payload.extend_from_slice(&item.value);
    }
    encode(0x06, 0x8A, &payload)
}
