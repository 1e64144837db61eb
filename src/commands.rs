//! Generation-dispatched outbound commands (SPEC_FULL.md section 4.E/9).
//!
//! `Commands` hides the classic-CFG-vs-CFG-VALSET split behind one call per
//! logical setting: callers ask for "set the dynamic model", not "which wire
//! form does this module generation want". Mirrors the way the teacher
//! crate's `ubx_packets` module draws the line between wire encoding and
//! call-site semantics, just re-pointed at this driver's narrower command
//! set instead of the full upstream catalogue.

use crate::driver_state::PlatformVersion;
use crate::ubx::{cfg_val, packets};

pub struct Commands {
    pub platform: PlatformVersion,
}

impl Commands {
    pub fn new(platform: PlatformVersion) -> Self {
        Self { platform }
    }

    pub fn poll_mon_ver(&self) -> Vec<u8> {
        packets::poll_mon_ver()
    }

    pub fn set_message_rate(&self, msg_class: u8, msg_id: u8, rate: u8) -> Vec<u8> {
        packets::cfg_msg_rate(msg_class, msg_id, rate)
    }

    /// Enables/disables one UBX NAV message over UART1 on M9+; classic
    /// modules use `set_message_rate` for the same purpose instead.
    pub fn set_ubx_nav_message(&self, key: u32, enabled: bool) -> Vec<u8> {
        packets::cfg_valset(&[cfg_val::val_bool(key, enabled)])
    }

    pub fn set_nmea_message(&self, key: u32, enabled: bool) -> Vec<u8> {
        packets::cfg_valset(&[cfg_val::val_bool(key, enabled)])
    }

    pub fn set_nav_rate(&self, meas_rate_ms: u16, nav_rate_cycles: u16) -> Vec<u8> {
        if self.platform.uses_valset() {
            packets::cfg_valset(&[
                cfg_val::val_u32(cfg_val::CFG_RATE_MEAS, meas_rate_ms as u32),
                cfg_val::val_u32(cfg_val::CFG_RATE_NAV, nav_rate_cycles as u32),
                cfg_val::val_u8(cfg_val::CFG_RATE_TIMEREF, 0),
            ])
        } else {
            packets::cfg_rate(meas_rate_ms, nav_rate_cycles, 0)
        }
    }

    pub fn set_dynamic_model(&self, model_wire: u8) -> Vec<u8> {
        if self.platform.uses_valset() {
            packets::cfg_valset(&[cfg_val::val_u8(cfg_val::CFG_NAVSPG_DYNMODEL, model_wire)])
        } else {
            packets::cfg_nav5_dynamic_model(model_wire, 0)
        }
    }

    pub fn set_utc_standard(&self, utc_wire: u8) -> Vec<u8> {
        if self.platform.uses_valset() {
            packets::cfg_valset(&[cfg_val::val_u8(cfg_val::CFG_NAVSPG_UTCSTANDARD, utc_wire)])
        } else {
            packets::cfg_nav5_dynamic_model(0, utc_wire)
        }
    }

    pub fn set_sbas(&self, enabled: bool, integrity: bool, legacy_scanmode1: u32, prn_scan_mask: u32) -> Vec<u8> {
        if self.platform.uses_valset() {
            packets::cfg_valset(&[
                cfg_val::val_bool(cfg_val::CFG_SBAS_USE_RANGING, enabled),
                cfg_val::val_bool(cfg_val::CFG_SBAS_USE_DIFFCORR, enabled),
                cfg_val::val_bool(cfg_val::CFG_SBAS_USE_INTEGRITY, integrity),
                cfg_val::val_u32(cfg_val::CFG_SBAS_PRNSCANMASK, prn_scan_mask),
            ])
        } else {
            packets::cfg_sbas(enabled, false, integrity, legacy_scanmode1)
        }
    }

    pub fn set_power_mode(&self, power_setup_value: u8) -> Vec<u8> {
        if self.platform.uses_valset() {
            packets::cfg_valset(&[cfg_val::val_u8(cfg_val::CFG_PM_OPERATEMODE, power_setup_value)])
        } else {
            packets::cfg_pms(power_setup_value)
        }
    }
}
