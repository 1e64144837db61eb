//! Task driver (SPEC_FULL.md section 4.F): the single per-tick entry point.
//! Grounded on the reference firmware's `gpsUpdate()`; EMA decay/step
//! shift (1/512) taken as specified.

use crate::commands::Commands;
use crate::config::GpsConfig;
use crate::configurator::Configurator;
use crate::constants::{GPS_LED_BLINK_MS, GPS_RECV_TIME_MAX_US};
use crate::driver_state::{DriverState, GpsState};
use crate::geo::{FlownDistance, GeoPoint, HomePoint};
use crate::interpreter::MessageInterpreter;
use crate::nmea::NmeaParser;
use crate::serial::GpsPort;
use crate::solution::{SatelliteList, Solution};
use crate::ubx::UbxParser;

/// Scheduler pacing hint: the task driver publishes this so an external
/// scheduler can re-pace its own calls without polling at a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePeriod {
    Fast,
    Slow,
}

/// Everything the task driver owns across ticks: parsers, configurator,
/// solution/satellite state, and the EMA scheduler hint.
pub struct GpsDriver {
    config: GpsConfig,
    driver_state: DriverState,
    configurator: Configurator,
    interpreter: MessageInterpreter,
    ubx_parser: UbxParser,
    nmea_parser: NmeaParser,
    solution: Solution,
    satellites: SatelliteList,
    home: HomePoint,
    flown: FlownDistance,
    stamp: u16,
    ema_state_time_us: u32,
    led_on: bool,
    led_last_toggle_ms: u32,
    beeped_for_current_fix: bool,
    armed: bool,
    last_time_basis: Option<(u32, u32)>,
    last_tick_us: Option<u64>,
}

impl GpsDriver {
    pub fn new(config: GpsConfig) -> Self {
        Self {
            config,
            driver_state: DriverState::default(),
            configurator: Configurator::new(),
            interpreter: MessageInterpreter::new(),
            ubx_parser: UbxParser::new(),
            nmea_parser: NmeaParser::new(),
            solution: Solution::default(),
            satellites: SatelliteList::default(),
            home: HomePoint::default(),
            flown: FlownDistance::default(),
            stamp: 0,
            ema_state_time_us: 0,
            led_on: false,
            led_last_toggle_ms: 0,
            beeped_for_current_fix: false,
            armed: false,
            last_time_basis: None,
            last_tick_us: None,
        }
    }

    /// Byte-count form of the `GPS_RECV_TIME_MAX_US` budget: a conservative
    /// 500ns-per-byte processing cost estimate, since the byte pump doesn't
    /// resample a clock per iteration.
    fn max_bytes_this_tick() -> u32 {
        const ASSUMED_NS_PER_BYTE: u32 = 500;
        (GPS_RECV_TIME_MAX_US * 1000) / ASSUMED_NS_PER_BYTE
    }

    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    pub fn satellites(&self) -> &SatelliteList {
        &self.satellites
    }

    pub fn is_healthy(&self) -> bool {
        self.driver_state.state == GpsState::ReceivingData
    }

    pub fn has_new_data(&self, last_seen_stamp: u16) -> bool {
        self.stamp != last_seen_stamp
    }

    pub fn stamp(&self) -> u16 {
        self.stamp
    }

    pub fn flown_distance_cm(&self) -> u64 {
        self.flown.total_cm()
    }

    pub fn set_armed(&mut self, armed: bool) {
        if armed && !self.armed {
            self.reset_home();
        }
        if !armed {
            self.beeped_for_current_fix = false;
            if !self.config.set_home_point_once {
                self.home.clear();
            }
        }
        self.armed = armed;
    }

    /// Per-tick entry point. Returns the scheduler pacing hint for the next
    /// call.
    ///
    /// `now_us` is the caller-sampled entry time; the byte pump doesn't
    /// resample a clock per byte, so the 25µs budget is expressed as a byte
    /// count bound (`max_bytes_this_tick`) rather than a wall-clock loop.
    /// Since `tick` never samples a clock itself, it measures its own cost as
    /// the elapsed time since the *previous* call's entry timestamp and feeds
    /// that into the scheduler-time EMA (SPEC_FULL.md section 4.F step 5).
    pub fn tick(&mut self, port: &mut dyn GpsPort, now_ms: u32, now_us: u64) -> SchedulePeriod {
        if let Some(last_us) = self.last_tick_us {
            self.record_state_time_us(now_us.wrapping_sub(last_us) as u32);
        }
        self.last_tick_us = Some(now_us);

        let mut any_byte_read = false;
        let mut solution_ready = false;

        for _ in 0..Self::max_bytes_this_tick() {
            let Some(byte) = port.read_byte() else { break };
            any_byte_read = true;
            match self.config.provider {
                crate::config::Provider::Ublox => match self.ubx_parser.feed_byte(byte) {
                    Ok(Some(frame)) => {
                        self.interpreter.handle_ubx(
                            &frame,
                            &mut self.solution,
                            &mut self.satellites,
                            &mut self.driver_state,
                            &self.config,
                            now_ms,
                        );
                        if self.interpreter.take_new_solution() {
                            solution_ready = true;
                        }
                        if let Some(frame) = self.interpreter.take_pending_outbound() {
                            port.write_all(&frame);
                        }
                    },
                    Ok(None) => {},
                    Err(err) => log::warn!("UBX framing error: {err}"),
                },
                crate::config::Provider::Nmea => {
                    if let Some(sentence) = self.nmea_parser.feed_byte(byte) {
                        let signals_new = sentence.signals_new_solution();
                        self.interpreter.handle_nmea(&sentence, &mut self.solution, now_ms);
                        if signals_new {
                            solution_ready = true;
                        }
                    }
                },
                crate::config::Provider::Msp | crate::config::Provider::Virtual => {},
            }
        }

        if solution_ready {
            self.on_new_data();
        }

        self.configurator.tick(
            &self.config,
            port,
            &mut self.driver_state,
            &mut self.solution,
            &mut self.satellites,
            now_ms,
        );

        self.update_led_and_beep(now_ms);

        if any_byte_read {
            SchedulePeriod::Fast
        } else {
            SchedulePeriod::Slow
        }
    }

    /// EMA update for a state's observed execution time, per SPEC_FULL.md
    /// section 4.F: decay 1/512 down, step 2/512 up.
    pub fn record_state_time_us(&mut self, observed_us: u32) {
        if observed_us > self.ema_state_time_us {
            let delta = observed_us - self.ema_state_time_us;
            self.ema_state_time_us += (delta * 2) >> 9;
        } else {
            let delta = self.ema_state_time_us - observed_us;
            self.ema_state_time_us -= delta >> 9;
        }
    }

    pub fn next_state_time_hint_us(&self) -> u32 {
        self.ema_state_time_us
    }

    fn on_new_data(&mut self) {
        self.stamp = self.stamp.wrapping_add(1);

        let new_basis = self.interpreter.take_time_basis();
        let interval_ms = match (self.last_time_basis, new_basis) {
            (Some((last, modulus)), Some((new, _))) => {
                (modulus as i64 + new as i64 - last as i64).rem_euclid(modulus as i64) as u32
            },
            _ => self.solution.nav_interval_ms as u32,
        };
        if new_basis.is_some() {
            self.last_time_basis = new_basis;
        }
        self.solution.nav_interval_ms = Solution::clamp_nav_interval(interval_ms);

        let point = GeoPoint {
            lat_1e7: self.solution.lat_1e7,
            lon_1e7: self.solution.lon_1e7,
            alt_cm: self.solution.alt_cm,
        };
        if self.solution.fix_valid {
            if self.armed {
                let speed = if self.config.use_3d_speed {
                    self.solution.speed_3d_cm_s as i32
                } else {
                    self.solution.ground_speed_cm_s as i32
                };
                self.flown.update(point, speed);
            }
        }
    }

    /// Latches the current position as home if `FIX` and enough sats are
    /// present (SPEC_FULL.md section 4.G); called on arming.
    pub fn reset_home(&mut self) {
        const MIN_SATS_FOR_HOME: u8 = 5;
        if self.solution.fix_valid && self.solution.num_sat >= MIN_SATS_FOR_HOME {
            let point = GeoPoint {
                lat_1e7: self.solution.lat_1e7,
                lon_1e7: self.solution.lon_1e7,
                alt_cm: self.solution.alt_cm,
            };
            self.home.latch(point, self.config.set_home_point_once);
        }
        self.flown.reset();
    }

    pub fn distance_cm_bearing_to_home(&self, in_3d: bool) -> Option<(u32, u16)> {
        let current = GeoPoint {
            lat_1e7: self.solution.lat_1e7,
            lon_1e7: self.solution.lon_1e7,
            alt_cm: self.solution.alt_cm,
        };
        self.home.distance_bearing_to(current, in_3d)
    }

    /// Bridges the GPS port to a user-facing serial port unmodified in both
    /// directions, while still feeding the GPS→user bytes through the
    /// parser so dashboard/packet-log hooks keep ticking.
    pub fn passthrough(&mut self, gps: &mut dyn GpsPort, user: &mut dyn GpsPort) {
        while let Some(byte) = gps.read_byte() {
            user.write_all(&[byte]);
            match self.config.provider {
                crate::config::Provider::Ublox => {
                    let _ = self.ubx_parser.feed_byte(byte);
                },
                crate::config::Provider::Nmea => {
                    let _ = self.nmea_parser.feed_byte(byte);
                },
                _ => {},
            }
        }
        while let Some(byte) = user.read_byte() {
            gps.write_all(&[byte]);
        }
    }

    fn update_led_and_beep(&mut self, now_ms: u32) {
        if self.solution.fix_valid {
            if now_ms.wrapping_sub(self.led_last_toggle_ms) >= GPS_LED_BLINK_MS {
                self.led_on = !self.led_on;
                self.led_last_toggle_ms = now_ms;
            }
            if !self.armed && !self.beeped_for_current_fix {
                self.beeped_for_current_fix = true;
                // beep hook: left to the host, the core only exposes the edge.
            }
        } else {
            self.led_on = false;
            self.beeped_for_current_fix = false;
        }
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    pub fn driver_state(&self) -> &DriverState {
        &self.driver_state
    }

    pub fn commands(&self) -> Commands {
        Commands::new(self.driver_state.platform_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::LoopbackPort;

    #[test]
    fn tick_with_no_bytes_reports_slow_schedule_period() {
        let mut driver = GpsDriver::new(GpsConfig::default());
        let mut port = LoopbackPort::new(115_200);
        let period = driver.tick(&mut port, 0, 0);
        assert_eq!(period, SchedulePeriod::Slow);
    }

    #[test]
    fn ema_increases_faster_than_it_decays() {
        let mut driver = GpsDriver::new(GpsConfig::default());
        driver.record_state_time_us(1000);
        let after_up = driver.next_state_time_hint_us();
        assert!(after_up > 0 && after_up < 1000);
        driver.record_state_time_us(0);
        let after_down = driver.next_state_time_hint_us();
        assert!(after_down < after_up);
    }

    #[test]
    fn reset_home_does_nothing_without_a_valid_fix() {
        let mut driver = GpsDriver::new(GpsConfig::default());
        driver.reset_home();
        assert!(driver.distance_cm_bearing_to_home(false).is_none());
    }
}
