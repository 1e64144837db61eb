pub const UBX_SYNC_CHAR_1: u8 = 0xb5;
pub const UBX_SYNC_CHAR_2: u8 = 0x62;

/// Sanity bound on an advertised payload length; beyond this the frame is abandoned.
/// Matches `UBLOX_MAX_PAYLOAD_SANITY_SIZE` in the reference firmware.
pub(crate) const UBX_MAX_PAYLOAD_SANITY_SIZE: u16 = 776;

/// Capture buffer size: large enough for UBX-NAV-SAT at 32 channels (8 + 12*32).
/// Payload bytes beyond this still count toward the checksum but are not stored.
pub(crate) const UBX_PAYLOAD_CAPTURE_SIZE: usize = 8 + 12 * 32;

pub const NMEA_SYNC_CHAR: u8 = b'$';
pub const NMEA_FIELD_SEP: u8 = b',';
pub const NMEA_CHECKSUM_SEP: u8 = b'*';

/// Bound on a single NMEA field's buffered length; longer fields silently truncate.
pub(crate) const NMEA_FIELD_BUFFER_SIZE: usize = 15;

/// Legacy (pre-NAV-SAT) satellite list capacity.
pub const GPS_SV_MAXSATS_LEGACY: usize = 16;
/// NAV-SAT / NAV-SVINFO capacity on modern modules.
pub const GPS_SV_MAXSATS_M8N: usize = 32;

pub const GPS_TIMEOUT_MS: u32 = 2500;
pub const UBLOX_ACK_TIMEOUT_MS: u32 = 150;
pub const GPS_CONFIG_BAUD_CHANGE_INTERVAL_MS: u32 = 330;
pub const GPS_CONFIG_CHANGE_INTERVAL_MS: u32 = 110;
pub const GPS_CONFIG_ENTRY_GRACE_MS: u32 = 1000;
pub const GPS_RECV_TIME_MAX_US: u32 = 25;

pub const GPS_DISTANCE_FLOWN_MIN_SPEED_CM_S: i32 = 15;
pub const GPS_LED_BLINK_MS: u32 = 150;

/// NMEA configurator's hard-coded post-reconfigure baud (open question, preserved
/// exactly regardless of user-selected baud; see SPEC_FULL.md section 9).
pub const NMEA_CONFIGURED_BAUD: u32 = 57600;
