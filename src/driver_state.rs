//! Driver run state: the receiver lifecycle, ack tracking, and detected
//! hardware generation (SPEC_FULL.md section 3 and 4.E).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsState {
    Unknown,
    Initialized,
    DetectBaud,
    ChangeBaud,
    Configure,
    ReceivingData,
    LostCommunication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    Idle,
    Waiting,
    GotAck,
    GotNack,
}

/// Hardware generation, detected from MON-VER's `hwVersion` string against
/// `PlatformVersion::from_hw_version`'s table (SPEC_FULL.md section 4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlatformVersion {
    Undef,
    M5,
    M6,
    M7,
    M8,
    M9,
    M10,
}

impl PlatformVersion {
    /// `ubloxVersionMap[]`: hwVersion hex strings resolve to one of these
    /// representative codes; anything unrecognised stays `Undef`.
    pub fn from_hw_version(hw_version: &str) -> PlatformVersion {
        let trimmed = hw_version.trim_end_matches('\0').trim();
        match trimmed {
            "00040005" => PlatformVersion::M5,
            "00040007" => PlatformVersion::M6,
            "00070000" => PlatformVersion::M7,
            "00080000" => PlatformVersion::M8,
            "00190000" => PlatformVersion::M9,
            "000A0000" => PlatformVersion::M10,
            _ => PlatformVersion::Undef,
        }
    }

    pub fn at_least_m7(self) -> bool {
        self >= PlatformVersion::M7
    }

    pub fn at_least_m8(self) -> bool {
        self >= PlatformVersion::M8
    }

    pub fn at_least_m9(self) -> bool {
        self >= PlatformVersion::M9
    }

    /// M9 and newer speak CFG-VALSET; everything older needs the classic
    /// per-subsystem CFG-* messages (SPEC_FULL.md section 4.E).
    pub fn uses_valset(self) -> bool {
        self.at_least_m9()
    }
}

/// Mutable run state threaded through the configurator and task driver.
/// Not `Copy`: it owns timing/ack bookkeeping that must be mutated in place.
#[derive(Debug, Clone)]
pub struct DriverState {
    pub state: GpsState,
    pub state_position: usize,
    pub ack_state: AckState,
    pub ack_waiting_msg_id: u16,
    pub state_ts_ms: u32,
    pub last_message_ms: u32,
    pub baud_index: usize,
    pub platform_version: PlatformVersion,
    pub update_rate_hz: u16,
    pub ublox_using_flight_model: bool,
    pub timeout_count: u32,
}

impl Default for DriverState {
    fn default() -> Self {
        Self {
            state: GpsState::Unknown,
            state_position: 0,
            ack_state: AckState::Idle,
            ack_waiting_msg_id: 0,
            state_ts_ms: 0,
            last_message_ms: 0,
            baud_index: 0,
            platform_version: PlatformVersion::Undef,
            update_rate_hz: 10,
            ublox_using_flight_model: false,
            timeout_count: 0,
        }
    }
}

impl DriverState {
    pub fn enter(&mut self, state: GpsState, now_ms: u32) {
        self.state = state;
        self.state_position = 0;
        self.state_ts_ms = now_ms;
        self.ack_state = AckState::Idle;
    }

    pub fn elapsed_since_state_entry(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.state_ts_ms)
    }

    pub fn elapsed_since_last_message(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_message_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hw_version_strings_map_to_expected_generation() {
        assert_eq!(PlatformVersion::from_hw_version("00080000"), PlatformVersion::M8);
        assert_eq!(PlatformVersion::from_hw_version("000A0000"), PlatformVersion::M10);
        assert_eq!(PlatformVersion::from_hw_version("ffffffff"), PlatformVersion::Undef);
    }

    #[test]
    fn platform_ordering_drives_valset_selection() {
        assert!(!PlatformVersion::M8.uses_valset());
        assert!(PlatformVersion::M9.uses_valset());
        assert!(PlatformVersion::M10.uses_valset());
    }

    #[test]
    fn enter_resets_position_and_ack_state() {
        let mut state = DriverState::default();
        state.state_position = 7;
        state.ack_state = AckState::Waiting;
        state.enter(GpsState::Configure, 1_000);
        assert_eq!(state.state_position, 0);
        assert_eq!(state.ack_state, AckState::Idle);
        assert_eq!(state.state_ts_ms, 1_000);
    }
}
