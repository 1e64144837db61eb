//! External configuration surface (SPEC_FULL.md section 6 and 10.3).
//!
//! `GpsConfig` is plain data: it can be built and validated without a serial
//! port or a running driver, the way the reference firmware's CLI settings
//! exist independently of whether a GPS is even plugged in.

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Provider {
    Nmea,
    Ublox,
    Msp,
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SbasMode {
    None,
    Auto,
    Egnos,
    Waas,
    Msas,
    Gagan,
}

impl SbasMode {
    /// PRN set as legacy CFG-SBAS `scanmode1` bitmask (SPEC_FULL.md section 6).
    pub fn legacy_scanmode1(self) -> u32 {
        match self {
            SbasMode::None | SbasMode::Auto => 0x0000_0000,
            SbasMode::Egnos => 0x0001_0048,
            SbasMode::Waas => 0x0004_A800,
            SbasMode::Msas => 0x0002_0200,
            SbasMode::Gagan => 0x0000_1180,
        }
    }

    /// Same PRN set as a `CFG_SBAS_PRNSCANMASK` bitmask (bit N = PRN 120+N),
    /// for M9+ modules.
    pub fn prn_scan_mask(self) -> u32 {
        let prns: &[u32] = match self {
            SbasMode::None => &[],
            SbasMode::Auto => &[],
            SbasMode::Egnos => &[123, 126, 136],
            SbasMode::Waas => &[131, 133, 135, 138],
            SbasMode::Msas => &[129, 137],
            SbasMode::Gagan => &[127, 128, 132],
        };
        prns.iter().fold(0u32, |mask, &prn| mask | (1 << (prn - 120)))
    }

    pub fn enabled(self) -> bool {
        !matches!(self, SbasMode::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UtcStandard {
    Auto,
    Usno,
    Eu,
    Su,
    Ntsc,
}

impl UtcStandard {
    pub(crate) fn wire_value(self) -> u8 {
        match self {
            UtcStandard::Auto => 0,
            UtcStandard::Usno => 3,
            UtcStandard::Eu => 5,
            UtcStandard::Su => 6,
            UtcStandard::Ntsc => 7,
        }
    }
}

/// Dynamic model catalogue, supplemented from the reference firmware's full
/// enum (SPEC_FULL.md section 10.5) rather than the bare integer the
/// distilled spec implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynamicModel {
    Portable,
    Stationary,
    Pedestrian,
    Automotive,
    Sea,
    Airborne1g,
    Airborne2g,
    Airborne4g,
    WristWornWatch,
    Bike,
}

impl DynamicModel {
    /// Model id as the reference firmware numbers it (before the reserved-id
    /// offset is applied).
    fn model_id(self) -> u8 {
        match self {
            DynamicModel::Portable => 0,
            DynamicModel::Stationary => 2,
            DynamicModel::Pedestrian => 3,
            DynamicModel::Automotive => 4,
            DynamicModel::Sea => 5,
            DynamicModel::Airborne1g => 6,
            DynamicModel::Airborne2g => 7,
            DynamicModel::Airborne4g => 8,
            DynamicModel::WristWornWatch => 9,
            DynamicModel::Bike => 10,
        }
    }

    /// Wire value sent to the receiver: model id 1 is reserved, so any
    /// non-zero model is shifted up by one (SPEC_FULL.md section 6).
    pub fn wire_value(self) -> u8 {
        let id = self.model_id();
        if id == 0 {
            0
        } else {
            id + 1
        }
    }
}

pub const BAUD_TABLE: [u32; 6] = [230_400, 115_200, 57_600, 38_400, 19_200, 9_600];

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsConfig {
    pub provider: Provider,
    pub baudrate_index: usize,
    pub update_rate_hz: u16,
    pub auto_config: bool,
    pub sbas_mode: SbasMode,
    pub sbas_integrity: bool,
    pub utc_standard: UtcStandard,
    pub use_galileo: bool,
    pub acquire_model: DynamicModel,
    pub flight_model: DynamicModel,
    pub use_3d_speed: bool,
    pub set_home_point_once: bool,
    pub nmea_custom_commands: Vec<String>,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ublox,
            baudrate_index: 1, // 115200
            update_rate_hz: 10,
            auto_config: true,
            sbas_mode: SbasMode::Auto,
            sbas_integrity: false,
            utc_standard: UtcStandard::Auto,
            use_galileo: false,
            acquire_model: DynamicModel::Portable,
            flight_model: DynamicModel::Airborne4g,
            use_3d_speed: false,
            set_home_point_once: false,
            nmea_custom_commands: Vec::new(),
        }
    }
}

impl GpsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_rate_hz == 0 || self.update_rate_hz > 200 {
            return Err(ConfigError::InvalidUpdateRateHz(self.update_rate_hz));
        }
        if self.nmea_custom_commands.iter().any(|tok| tok.trim().is_empty()) {
            return Err(ConfigError::EmptyCustomCommandToken);
        }
        Ok(())
    }

    /// Whitespace-separated custom command tokens, per SPEC_FULL.md section
    /// 4.E's NMEA configurator.
    pub fn custom_command_tokens(&self) -> Vec<&str> {
        self.nmea_custom_commands
            .iter()
            .flat_map(|s| s.split_whitespace())
            .filter(|tok| !tok.is_empty())
            .collect()
    }
}
