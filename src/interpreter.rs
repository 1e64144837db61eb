//! Message interpreter (SPEC_FULL.md section 4.D): dispatches parsed UBX/NMEA
//! messages into the solution record, satellite list and ACK state.
//!
//! Grounded on the reference firmware's `UBLOX_parse_gps()` switch and
//! `gpsNewFrameNMEA` dispatch for message-to-effect mapping; the
//! `haveNewPosition`/`haveNewSpeed` atomic-publish rule comes from the same
//! source's `GPS_NewData()` gating.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::config::GpsConfig;
use crate::constants::{GPS_SV_MAXSATS_LEGACY, GPS_SV_MAXSATS_M8N};
use crate::driver_state::{AckState, DriverState, PlatformVersion};
use crate::nmea::NmeaSentence;
use crate::solution::{SatelliteInfo, Solution};
use crate::ubx::packets::{
    AckRef, CfgGnssRef, MonVerRef, NavDopRef, NavPosllhRef, NavPvtRef, NavPvtValid, NavSatRef,
    NavSolRef, NavStatusRef, NavSvinfoRef, NavVelnedRef,
};
use crate::ubx::UbxFrame;

const GPS_UNIX_EPOCH_OFFSET_MS: i64 = 315_964_800_000 - 18_000;

/// u-blox CFG-GNSS `gnssId` values this driver ever toggles.
const GNSS_ID_SBAS: u8 = 1;
const GNSS_ID_GALILEO: u8 = 2;

/// Modulus used for the week-wrap interval calculation on UBX messages
/// (itow is milliseconds since the start of the current GPS week).
pub const WEEK_MS: u32 = 604_800_000;
/// Modulus used for the equivalent wrap on NMEA, whose GGA time field only
/// carries time-of-day.
pub const DAY_MS: u32 = 86_400_000;

/// Unix epoch milliseconds computed from a GNSS time source, handed to an
/// external RTC collaborator. The core never writes an RTC itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcCandidate {
    pub unix_epoch_ms: i64,
}

/// Dispatches parsed frames into a `Solution`/satellite list/ack state,
/// tracking the `haveNewPosition`/`haveNewSpeed` latch needed to publish a
/// solution only once both halves of an update cycle have arrived.
#[derive(Debug, Default)]
pub struct MessageInterpreter {
    have_new_position: bool,
    have_new_speed: bool,
    ubx_have_new_valid_fix: bool,
    rtc_candidate: Option<RtcCandidate>,
    /// (value, modulus) of the most recent message's own time field, used by
    /// the task driver's `navIntervalMs` week/day-wrap calculation.
    time_basis: Option<(u32, u32)>,
    /// A fully framed CFG-GNSS frame awaiting send, built by the
    /// enable-bit rewrite in `handle_ubx` (SPEC_FULL.md section 10.5).
    pending_outbound: Option<Vec<u8>>,
}

impl MessageInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_rtc_candidate(&mut self) -> Option<RtcCandidate> {
        self.rtc_candidate.take()
    }

    pub fn take_time_basis(&mut self) -> Option<(u32, u32)> {
        self.time_basis.take()
    }

    /// Takes the CFG-GNSS rewrite queued by the last `handle_ubx` call, if
    /// any block's enable bit actually needed to change.
    pub fn take_pending_outbound(&mut self) -> Option<Vec<u8>> {
        self.pending_outbound.take()
    }

    /// True once both position and speed have been updated since the last
    /// call; clears the latch either way.
    pub fn take_new_solution(&mut self) -> bool {
        let ready = self.have_new_position && self.have_new_speed;
        if ready {
            self.have_new_position = false;
            self.have_new_speed = false;
        }
        ready
    }

    pub fn handle_ubx(
        &mut self,
        frame: &UbxFrame<'_>,
        solution: &mut Solution,
        satellites: &mut crate::solution::SatelliteList,
        driver: &mut DriverState,
        config: &GpsConfig,
        now_ms: u32,
    ) {
        match (frame.class, frame.id) {
            (0x0A, 0x04) => {
                if MonVerRef::validate(frame.payload).is_ok() {
                    let view = MonVerRef(frame.payload);
                    driver.platform_version = PlatformVersion::from_hw_version(view.hardware_version());
                    log::debug!("MON-VER: hwVersion={}", view.hardware_version());
                }
            },
            (0x01, 0x02) => {
                if NavPosllhRef::validate(frame.payload).is_ok() {
                    let view = NavPosllhRef(frame.payload);
                    if self.ubx_have_new_valid_fix {
                        solution.lat_1e7 = view.lat();
                        solution.lon_1e7 = view.lon();
                        solution.alt_cm = view.height_msl_mm() / 10;
                        solution.fix_valid = true;
                    } else {
                        solution.fix_valid = false;
                    }
                    self.have_new_position = true;
                    self.time_basis = Some((view.itow(), WEEK_MS));
                    log::trace!("NAV-POSLLH dispatched");
                }
            },
            (0x01, 0x03) => {
                if NavStatusRef::validate(frame.payload).is_ok() {
                    let view = NavStatusRef(frame.payload);
                    self.ubx_have_new_valid_fix = view.fix_valid() && view.fix_type() == 3;
                    if !self.ubx_have_new_valid_fix {
                        solution.fix_valid = false;
                    }
                }
            },
            (0x01, 0x04) => {
                if NavDopRef::validate(frame.payload).is_ok() {
                    let view = NavDopRef(frame.payload);
                    solution.dop.p_dop = view.p_dop();
                    solution.dop.h_dop = view.h_dop();
                    solution.dop.v_dop = view.v_dop();
                }
            },
            (0x01, 0x06) => {
                if NavSolRef::validate(frame.payload).is_ok() {
                    let view = NavSolRef(frame.payload);
                    self.ubx_have_new_valid_fix = view.fix_valid() && view.fix_type() == 3;
                    solution.fix_valid = self.ubx_have_new_valid_fix;
                    solution.num_sat = view.num_sv();
                    self.time_basis = Some((view.itow(), WEEK_MS));
                    if view.week() >= 0 {
                        let unix_ms = view.week() as i64 * 604_800_000
                            + view.itow() as i64
                            + (view.ftow_ns() as i64) / 1_000_000
                            + GPS_UNIX_EPOCH_OFFSET_MS;
                        self.rtc_candidate = Some(RtcCandidate { unix_epoch_ms: unix_ms });
                    }
                }
            },
            (0x01, 0x12) => {
                if NavVelnedRef::validate(frame.payload).is_ok() {
                    let view = NavVelnedRef(frame.payload);
                    solution.ground_speed_cm_s = view.g_speed_cm_s() as u16;
                    solution.speed_3d_cm_s = view.speed_3d_cm_s() as u16;
                    solution.ground_course_decideg = (view.heading() / 10_000) as u16;
                    self.have_new_speed = true;
                    self.time_basis = Some((view.itow(), WEEK_MS));
                }
            },
            (0x01, 0x07) => {
                if NavPvtRef::validate(frame.payload).is_ok() {
                    let view = NavPvtRef(frame.payload);
                    let fix_valid = view.fix_valid() && view.fix_type() == 3;
                    solution.fix_valid = fix_valid;
                    solution.num_sat = view.num_sv();
                    if fix_valid {
                        solution.lat_1e7 = view.lat();
                        solution.lon_1e7 = view.lon();
                        solution.alt_cm = view.height_msl_mm() / 10;
                    }
                    solution.ground_speed_cm_s = (view.g_speed_mm_s() / 10) as u16;
                    solution.ground_course_decideg = (view.head_mot() / 10_000) as u16;
                    // speed3d: per-axis division before squaring loses precision
                    // versus dividing the combined magnitude once, but this is
                    // preserved to match observed existing behaviour exactly.
                    let g_speed_cm = (view.g_speed_mm_s() / 10) as f32;
                    let vel_d_cm = (view.vel_d_mm_s() / 10) as f32;
                    solution.speed_3d_cm_s = (g_speed_cm * g_speed_cm + vel_d_cm * vel_d_cm).sqrt() as u16;
                    solution.accuracy.horizontal_cm = view.h_acc_mm() / 10;
                    solution.accuracy.vertical_cm = view.v_acc_mm() / 10;
                    solution.dop.p_dop = view.p_dop();
                    self.have_new_position = true;
                    self.have_new_speed = true;
                    self.time_basis = Some((view.itow(), WEEK_MS));

                    if view.valid().contains(NavPvtValid::VALID_DATE) {
                        let nano_ms = if view.nano() > 0 { view.nano() / 1_000_000 } else { 0 };
                        if let Some(base_ms) =
                            utc_to_unix_ms(view.year(), view.month(), view.day(), view.hour(), view.min(), view.sec())
                        {
                            self.rtc_candidate = Some(RtcCandidate { unix_epoch_ms: base_ms + nano_ms as i64 });
                        }
                    }
                }
            },
            (0x01, 0x30) => {
                if NavSvinfoRef::validate(frame.payload).is_ok() {
                    let view = NavSvinfoRef(frame.payload);
                    satellites.clear();
                    // Legacy receivers report far more channels than a downstream
                    // consumer can display; cap at GPS_SV_MAXSATS_LEGACY and drop
                    // the rest (gps.c:2294, `MIN(numCh, GPS_SV_MAXSATS_LEGACY)`).
                    for ch in view.channels().take(GPS_SV_MAXSATS_LEGACY) {
                        satellites.push(SatelliteInfo {
                            channel: ch.chn(),
                            svid: ch.svid(),
                            quality: ch.quality(),
                            cno: ch.cno(),
                            flags: ch.flags(),
                        });
                    }
                }
            },
            (0x01, 0x35) => {
                if NavSatRef::validate(frame.payload).is_ok() {
                    let view = NavSatRef(frame.payload);
                    satellites.clear();
                    for sat in view.satellites().take(GPS_SV_MAXSATS_M8N) {
                        satellites.push(SatelliteInfo {
                            channel: sat.gnss_id(),
                            svid: sat.sv_id(),
                            quality: sat.flags() as u8,
                            cno: sat.cno(),
                            flags: sat.flags() as u8,
                        });
                    }
                    // Pad to the full 32-slot list with `chn = 255` sentinels and
                    // force the count to 32: Configurator-style downstream
                    // consumers use numCh > GPS_SV_MAXSATS_LEGACY as the marker
                    // that this is the enhanced NAV-SAT list, not legacy SVINFO
                    // (gps.c:2335-2341), and the full-length list with sentinel
                    // slots lets them clear sats that dropped out of view.
                    while satellites.len() < GPS_SV_MAXSATS_M8N {
                        satellites.push(SatelliteInfo { channel: 255, ..Default::default() });
                    }
                }
            },
            (0x06, 0x3E) => {
                if CfgGnssRef::validate(frame.payload).is_ok() {
                    log::debug!("CFG-GNSS echoed back");
                    let sbas_wanted = config.sbas_mode.enabled();
                    let galileo_wanted = config.use_galileo;
                    let wanted = |gnss_id: u8| match gnss_id {
                        GNSS_ID_SBAS => Some(sbas_wanted),
                        GNSS_ID_GALILEO => Some(galileo_wanted),
                        _ => None,
                    };
                    if let Some(rewritten) = crate::ubx::packets::cfg_gnss_rewrite(frame.payload, wanted) {
                        log::debug!("CFG-GNSS rewrite: re-sending with updated enable bits");
                        self.pending_outbound = Some(crate::ubx::packets::encode(0x06, 0x3E, &rewritten));
                    }
                }
            },
            (0x05, 0x01) | (0x05, 0x00) => {
                if AckRef::validate(frame.payload).is_ok() {
                    let view = AckRef(frame.payload);
                    let acked_id = (view.cls_id() as u16) << 8 | view.msg_id() as u16;
                    if driver.ack_state == AckState::Waiting && acked_id == driver.ack_waiting_msg_id {
                        driver.ack_state =
                            if frame.id == 0x01 { AckState::GotAck } else { AckState::GotNack };
                    }
                }
            },
            _ => {},
        }
        solution.hw_timestamp_ms = now_ms;
        driver.last_message_ms = now_ms;
    }

    pub fn handle_nmea(&mut self, sentence: &NmeaSentence, solution: &mut Solution, now_ms: u32) {
        match sentence {
            NmeaSentence::Gga(gga) => {
                solution.fix_valid = gga.fix;
                solution.num_sat = gga.num_sat;
                if gga.fix {
                    solution.lat_1e7 = gga.lat_1e7;
                    solution.lon_1e7 = gga.lon_1e7;
                    solution.alt_cm = gga.alt_cm;
                }
                self.have_new_position = true;
                self.have_new_speed = true;
                let hhmmss = gga.time.max(0) as u32;
                let time_of_day_ms =
                    (hhmmss / 10_000) * 3_600_000 + ((hhmmss / 100) % 100) * 60_000 + (hhmmss % 100) * 1_000;
                self.time_basis = Some((time_of_day_ms, DAY_MS));
            },
            NmeaSentence::Rmc(rmc) => {
                solution.ground_speed_cm_s = rmc.ground_speed_cm_s.max(0) as u16;
                solution.ground_course_decideg = rmc.ground_course_decideg.max(0) as u16;
            },
            NmeaSentence::Gsa(gsa) => {
                solution.dop.p_dop = gsa.pdop;
                solution.dop.h_dop = gsa.hdop;
                solution.dop.v_dop = gsa.vdop;
            },
            NmeaSentence::Gsv(_) => {},
        }
        solution.hw_timestamp_ms = now_ms;
    }
}

/// Turns NAV-PVT's broken-down UTC fields into a Unix epoch millisecond
/// value. Returns `None` if the receiver reported a calendar date/time that
/// doesn't actually exist (possible even with `validDate`/`validTime` set,
/// since those bits only mean "the receiver trusts this value", not "this
/// value passed a calendar check").
fn utc_to_unix_ms(year: u16, month: u8, day: u8, hour: u8, min: u8, sec: u8) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?;
    let time = NaiveTime::from_hms_opt(u32::from(hour), u32::from(min), u32::from(sec))?;
    let dt = DateTime::<Utc>::from_naive_utc_and_offset(NaiveDateTime::new(date, time), Utc);
    Some(dt.timestamp_millis())
}
