use core::fmt;

/// Error that can occur while framing and checksumming a UBX or NMEA byte stream.
///
/// Nothing in the driver's tick loop ever sees one of these: per the core's error
/// handling design, framing errors are recovered from in place (resync) rather than
/// surfaced. This type exists for the parser's own unit/property tests and for any
/// host code auditing dropped frames instead of only counting them.
#[derive(Debug, PartialEq, Eq)]
pub enum ParserError {
    InvalidChecksum { expect: (u8, u8), got: (u8, u8) },
    InvalidPacketLen { packet: &'static str, expect: usize, got: usize },
    InvalidField { packet: &'static str, field: &'static str },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::InvalidChecksum { expect, got } => {
                write!(f, "invalid UBX checksum, expected {expect:?}, got {got:?}")
            },
            ParserError::InvalidPacketLen { packet, expect, got } => {
                write!(f, "invalid {packet} length, expected {expect}, got {got}")
            },
            ParserError::InvalidField { packet, field } => {
                write!(f, "invalid field {field} of packet {packet}")
            },
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParserError {}

/// Error raised while constructing or validating a [`crate::config::GpsConfig`].
///
/// Unlike `ParserError`, this can be hit by ordinary use: a host application builds a
/// config from user input before the driver ever sees a byte.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    EmptyCustomCommandToken,
    InvalidUpdateRateHz(u16),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyCustomCommandToken => {
                f.write_str("nmeaCustomCommands contained an empty token")
            },
            ConfigError::InvalidUpdateRateHz(hz) => {
                write!(f, "gps_update_rate_hz {hz} is out of the supported range")
            },
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
