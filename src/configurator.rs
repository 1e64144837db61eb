//! Configurator (SPEC_FULL.md section 4.E): a single function driven each
//! task tick, dispatching on `DriverState::state`. Never blocks; only acts
//! when `tx_buffer_empty()` is true.
//!
//! Modelled as the explicit step-list + predicate pattern from SPEC_FULL.md
//! section 9 ("Cooperative await pattern") rather than the reference
//! firmware's switch-on-integer cursor (`gpsConfigureUblox`/
//! `gpsConfigureNmea`), while preserving every transition rule: NAK-at-
//! DETECT_UNIT restart, 150ms implicit ACK, 110ms inter-step spacing, baud
//! cycling direction.

use crate::commands::Commands;
use crate::config::{GpsConfig, Provider, BAUD_TABLE};
use crate::constants::{
    GPS_CONFIG_BAUD_CHANGE_INTERVAL_MS, GPS_CONFIG_CHANGE_INTERVAL_MS, GPS_CONFIG_ENTRY_GRACE_MS,
    GPS_TIMEOUT_MS, NMEA_CONFIGURED_BAUD, UBLOX_ACK_TIMEOUT_MS,
};
use crate::driver_state::{AckState, DriverState, GpsState};
use crate::serial::GpsPort;
use crate::solution::{SatelliteList, Solution};
use crate::ubx::packets;

/// Fixed ASCII `$PUBX,41,...` strings with precomputed checksums, indexed the
/// same way as `config::BAUD_TABLE` (SPEC_FULL.md section 6). The candidate
/// set is closed, so these are literals rather than runtime-computed.
const PUBX_BAUD_SWITCH: [&str; 6] = [
    "$PUBX,41,1,0003,0001,230400,0*1C\r\n",
    "$PUBX,41,1,0003,0001,115200,0*1E\r\n",
    "$PUBX,41,1,0003,0001,57600,0*2D\r\n",
    "$PUBX,41,1,0003,0001,38400,0*26\r\n",
    "$PUBX,41,1,0003,0001,19200,0*23\r\n",
    "$PUBX,41,1,0003,0001,9600,0*16\r\n",
];

const CONFIGURE_STEP_COUNT: usize = 21;

#[derive(Debug, Default)]
pub struct Configurator {
    last_action_ms: u32,
    entry_ms: u32,
    baud_poll_count: u8,
    nmea_custom_sent: usize,
}

impl Configurator {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready_to_send(&self, port: &dyn GpsPort, now_ms: u32, min_gap_ms: u32) -> bool {
        port.tx_buffer_empty() && now_ms.wrapping_sub(self.last_action_ms) >= min_gap_ms
    }

    fn send(&mut self, port: &mut dyn GpsPort, frame: &[u8], now_ms: u32) {
        port.write_all(frame);
        self.last_action_ms = now_ms;
    }

    /// Runs one tick of the configurator. Call after the byte pump has
    /// drained incoming bytes for this tick.
    pub fn tick(
        &mut self,
        config: &GpsConfig,
        port: &mut dyn GpsPort,
        driver: &mut DriverState,
        solution: &mut Solution,
        satellites: &mut SatelliteList,
        now_ms: u32,
    ) {
        match driver.state {
            GpsState::Unknown => {
                driver.baud_index = config.baudrate_index;
                driver.enter(GpsState::Initialized, now_ms);
            },
            GpsState::Initialized => match config.provider {
                Provider::Nmea => {
                    self.nmea_custom_sent = 0;
                    driver.enter(GpsState::Configure, now_ms);
                },
                Provider::Ublox => {
                    port.set_baud(BAUD_TABLE[driver.baud_index]);
                    self.baud_poll_count = 0;
                    driver.enter(GpsState::DetectBaud, now_ms);
                },
                Provider::Msp | Provider::Virtual => {
                    driver.enter(GpsState::ReceivingData, now_ms);
                },
            },
            GpsState::DetectBaud => self.tick_detect_baud(config, port, driver, now_ms),
            GpsState::ChangeBaud => self.tick_change_baud(config, port, driver, now_ms),
            GpsState::Configure => match config.provider {
                Provider::Nmea => self.tick_configure_nmea(config, port, driver, now_ms),
                _ => self.tick_configure_ubx(config, port, driver, now_ms),
            },
            GpsState::ReceivingData => self.tick_receiving(config, port, driver, solution, satellites, now_ms),
            GpsState::LostCommunication => {
                solution.num_sat = 0;
                solution.fix_valid = false;
                satellites.clear();
                driver.timeout_count += 1;
                driver.enter(GpsState::DetectBaud, now_ms);
            },
        }
    }

    fn tick_detect_baud(&mut self, config: &GpsConfig, port: &mut dyn GpsPort, driver: &mut DriverState, now_ms: u32) {
        if driver.platform_version == crate::driver_state::PlatformVersion::Undef {
            if self.ready_to_send(port, now_ms, GPS_CONFIG_BAUD_CHANGE_INTERVAL_MS) {
                self.send(port, &packets::poll_mon_ver(), now_ms);
                self.baud_poll_count += 1;
            }
            if self.baud_poll_count >= 3 {
                self.baud_poll_count = 0;
                driver.baud_index = (driver.baud_index + 1) % BAUD_TABLE.len();
                port.set_baud(BAUD_TABLE[driver.baud_index]);
            }
            return;
        }

        // MON-VER answered: switch the module to the user's baud over NMEA,
        // record the working index, move on.
        let target_index = config.baudrate_index;
        self.send(port, PUBX_BAUD_SWITCH[target_index].as_bytes(), now_ms);
        driver.baud_index = target_index;
        driver.enter(GpsState::ChangeBaud, now_ms);
    }

    fn tick_change_baud(&mut self, config: &GpsConfig, port: &mut dyn GpsPort, driver: &mut DriverState, now_ms: u32) {
        if driver.elapsed_since_state_entry(now_ms) < 3 * GPS_CONFIG_BAUD_CHANGE_INTERVAL_MS {
            return;
        }
        port.set_baud(BAUD_TABLE[config.baudrate_index]);
        if config.auto_config {
            driver.enter(GpsState::Configure, now_ms);
        } else {
            driver.update_rate_hz = config.update_rate_hz;
            driver.enter(GpsState::ReceivingData, now_ms);
        }
    }

    /// Advances to the next step without touching `ack_state`: callers that
    /// just sent a command and set `Waiting` must not have that immediately
    /// clobbered back to `Idle`, or a genuine ACK/NAK arriving afterward
    /// would never match (the interpreter only updates `ack_state` while
    /// it's `Waiting`).
    fn advance_step(&mut self, driver: &mut DriverState, now_ms: u32) {
        driver.state_position += 1;
        self.last_action_ms = now_ms;
        if driver.state_position >= CONFIGURE_STEP_COUNT {
            driver.enter(GpsState::ReceivingData, now_ms);
        }
    }

    /// True once the current step's command may be considered acknowledged:
    /// an explicit ACK arrived, or the 150ms implicit-ack timeout elapsed.
    fn step_acked(&self, driver: &DriverState, now_ms: u32) -> bool {
        matches!(driver.ack_state, AckState::GotAck | AckState::GotNack)
            || now_ms.wrapping_sub(self.last_action_ms) >= UBLOX_ACK_TIMEOUT_MS
    }

    fn tick_configure_ubx(
        &mut self,
        config: &GpsConfig,
        port: &mut dyn GpsPort,
        driver: &mut DriverState,
        now_ms: u32,
    ) {
        if driver.elapsed_since_state_entry(now_ms) < GPS_CONFIG_ENTRY_GRACE_MS {
            return;
        }
        if driver.state_position > 0 {
            if driver.ack_state == AckState::GotNack && driver.state_position == 1 {
                // NAK at DETECT_UNIT: restart the whole sequence.
                driver.state_position = 0;
                driver.ack_state = AckState::Idle;
                return;
            }
            if !self.step_acked(driver, now_ms) {
                return;
            }
        }
        if !self.ready_to_send(port, now_ms, GPS_CONFIG_CHANGE_INTERVAL_MS) {
            return;
        }

        let cmd = Commands::new(driver.platform_version);
        let m9 = driver.platform_version.uses_valset();
        let m8 = driver.platform_version.at_least_m8();
        let m7 = driver.platform_version.at_least_m7();

        let frame: Option<Vec<u8>> = match driver.state_position {
            0 => Some(cmd.poll_mon_ver()), // detect unit
            1 => Some(cmd.set_nav_rate(1000, 1)), // slow nav rate to 1 Hz
            2 => {
                if m9 {
                    None // M9+ skips the bulk "disable NMEA set" shortcut
                } else {
                    Some(cmd.set_message_rate(0xF0, 0x00, 0))
                }
            },
            3 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_VTG_UART1, false)),
            4 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_GSV_UART1, false)),
            5 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_GLL_UART1, false)),
            6 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_GGA_UART1, false)),
            7 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_GSA_UART1, false)),
            8 => Some(cmd.set_nmea_message(crate::ubx::cfg_val::CFG_MSGOUT_NMEA_ID_RMC_UART1, false)),
            9 => Some(cmd.set_dynamic_model(config.acquire_model.wire_value())),
            10 => Some(cmd.set_utc_standard(config.utc_standard.wire_value())),
            11 => Some(cmd.set_sbas(
                config.sbas_mode.enabled(),
                config.sbas_integrity,
                config.sbas_mode.legacy_scanmode1(),
                config.sbas_mode.prn_scan_mask(),
            )),
            12 => {
                if m8 {
                    Some(cmd.set_power_mode(0))
                } else {
                    None
                }
            },
            13 => {
                if m7 {
                    Some(cmd.set_ubx_nav_message(crate::ubx::cfg_val::CFG_MSGOUT_UBX_NAV_PVT_UART1, true))
                } else {
                    Some(cmd.set_message_rate(0x01, 0x06, 1)) // NAV-SOL on legacy modules
                }
            },
            14 => {
                if m7 {
                    Some(cmd.set_message_rate(0x01, 0x06, 0)) // disable superseded NAV-SOL
                } else {
                    Some(cmd.set_message_rate(0x01, 0x02, 1)) // NAV-POSLLH on legacy
                }
            },
            15 => Some(cmd.set_ubx_nav_message(crate::ubx::cfg_val::CFG_MSGOUT_UBX_NAV_DOP_UART1, true)),
            16 => Some(cmd.set_message_rate(0x01, 0x04, 1)),
            17 => Some(cmd.set_ubx_nav_message(crate::ubx::cfg_val::CFG_MSGOUT_UBX_NAV_SAT_UART1, true)),
            18 => Some(cmd.set_nav_rate(1000 / config.update_rate_hz.max(1) as u16, 1)),
            19 => {
                if config.sbas_mode.enabled() || config.use_galileo {
                    Some(packets::encode(0x06, 0x3E, &[]))
                } else {
                    None
                }
            },
            20 => {
                driver.update_rate_hz = config.update_rate_hz;
                driver.enter(GpsState::ReceivingData, now_ms);
                return;
            },
            _ => None,
        };

        if let Some(frame) = frame {
            // Every encoded frame is `sync1 sync2 class id ...`; the ACK/NAK
            // this step waits on echoes back that same (class, id) pair.
            driver.ack_waiting_msg_id = (frame[2] as u16) << 8 | frame[3] as u16;
            driver.ack_state = AckState::Waiting;
            self.send(port, &frame, now_ms);
        } else {
            driver.ack_state = AckState::Idle;
        }
        self.advance_step(driver, now_ms);
    }

    fn tick_configure_nmea(
        &mut self,
        config: &GpsConfig,
        port: &mut dyn GpsPort,
        driver: &mut DriverState,
        now_ms: u32,
    ) {
        if !self.ready_to_send(port, now_ms, GPS_CONFIG_CHANGE_INTERVAL_MS) {
            return;
        }
        let tokens = config.custom_command_tokens();
        if self.nmea_custom_sent < tokens.len() {
            let token = tokens[self.nmea_custom_sent];
            let mut line = token.to_string();
            if !line.ends_with("\r\n") {
                line.push_str("\r\n");
            }
            self.send(port, line.as_bytes(), now_ms);
            self.nmea_custom_sent += 1;
            return;
        }
        // Open question, resolved: hard-coded regardless of user baud choice.
        port.set_baud(NMEA_CONFIGURED_BAUD);
        driver.update_rate_hz = config.update_rate_hz;
        driver.enter(GpsState::ReceivingData, now_ms);
    }

    fn tick_receiving(
        &mut self,
        config: &GpsConfig,
        port: &mut dyn GpsPort,
        driver: &mut DriverState,
        solution: &mut Solution,
        satellites: &mut SatelliteList,
        now_ms: u32,
    ) {
        let _ = satellites;
        if driver.elapsed_since_last_message(now_ms) > GPS_TIMEOUT_MS {
            driver.enter(GpsState::LostCommunication, now_ms);
            return;
        }
        if solution.fix_valid && !driver.ublox_using_flight_model && self.ready_to_send(port, now_ms, GPS_CONFIG_CHANGE_INTERVAL_MS) {
            let cmd = Commands::new(driver.platform_version);
            self.send(port, &cmd.set_dynamic_model(config.flight_model.wire_value()), now_ms);
            driver.ublox_using_flight_model = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver_state::PlatformVersion;
    use crate::serial::LoopbackPort;

    #[test]
    fn unknown_to_initialized_to_detect_baud_for_ublox() {
        let mut configurator = Configurator::new();
        let config = GpsConfig::default();
        let mut driver = DriverState::default();
        let mut port = LoopbackPort::new(115_200);
        let mut solution = Solution::default();
        let mut sats = SatelliteList::default();

        configurator.tick(&config, &mut port, &mut driver, &mut solution, &mut sats, 0);
        assert_eq!(driver.state, GpsState::Initialized);
        configurator.tick(&config, &mut port, &mut driver, &mut solution, &mut sats, 1);
        assert_eq!(driver.state, GpsState::DetectBaud);
    }

    #[test]
    fn configure_completes_after_21_steps_and_enters_receiving_data() {
        let mut configurator = Configurator::new();
        let config = GpsConfig::default();
        let mut driver = DriverState::default();
        driver.platform_version = PlatformVersion::M8;
        driver.state = GpsState::Configure;
        driver.state_ts_ms = 0;
        let mut port = LoopbackPort::new(115_200);
        let mut solution = Solution::default();
        let mut sats = SatelliteList::default();

        let mut now = GPS_CONFIG_ENTRY_GRACE_MS + 1;
        for _ in 0..(CONFIGURE_STEP_COUNT * 2) {
            configurator.tick(&config, &mut port, &mut driver, &mut solution, &mut sats, now);
            now += UBLOX_ACK_TIMEOUT_MS + GPS_CONFIG_CHANGE_INTERVAL_MS;
            if driver.state == GpsState::ReceivingData {
                break;
            }
        }
        assert_eq!(driver.state, GpsState::ReceivingData);
    }

    #[test]
    fn auto_config_off_skips_configure_and_goes_straight_to_receiving_data() {
        let mut configurator = Configurator::new();
        let mut config = GpsConfig::default();
        config.auto_config = false;
        let mut driver = DriverState::default();
        driver.state = GpsState::ChangeBaud;
        driver.state_ts_ms = 0;
        let mut port = LoopbackPort::new(115_200);
        let mut solution = Solution::default();
        let mut sats = SatelliteList::default();

        let now = 3 * GPS_CONFIG_BAUD_CHANGE_INTERVAL_MS + 1;
        configurator.tick(&config, &mut port, &mut driver, &mut solution, &mut sats, now);
        assert_eq!(driver.state, GpsState::ReceivingData);
    }

    #[test]
    fn lost_communication_clears_fix_and_returns_to_detect_baud() {
        let mut configurator = Configurator::new();
        let config = GpsConfig::default();
        let mut driver = DriverState::default();
        driver.state = GpsState::LostCommunication;
        let mut port = LoopbackPort::new(115_200);
        let mut solution = Solution::default();
        solution.fix_valid = true;
        solution.num_sat = 8;
        let mut sats = SatelliteList::default();

        configurator.tick(&config, &mut port, &mut driver, &mut solution, &mut sats, 0);
        assert_eq!(driver.state, GpsState::DetectBaud);
        assert!(!solution.fix_valid);
        assert_eq!(solution.num_sat, 0);
        assert_eq!(driver.timeout_count, 1);
    }
}
