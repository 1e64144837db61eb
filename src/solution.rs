//! Solution and satellite-list data model (SPEC_FULL.md section 3).

use crate::constants::{GPS_SV_MAXSATS_LEGACY, GPS_SV_MAXSATS_M8N};

/// One tracked satellite, per the legacy NAV-SVINFO/NMEA GSV channel model
/// plus the additive `flags` byte NAV-SAT supplies (SPEC_FULL.md section 10.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SatelliteInfo {
    pub channel: u8,
    pub svid: u8,
    pub quality: u8,
    pub cno: u8,
    pub flags: u8,
}

/// Fixed-capacity satellite list: legacy receivers report at most
/// `GPS_SV_MAXSATS_LEGACY`, M8N+ up to `GPS_SV_MAXSATS_M8N`.
#[derive(Debug, Clone)]
pub struct SatelliteList {
    sats: [SatelliteInfo; GPS_SV_MAXSATS_M8N],
    len: usize,
}

impl Default for SatelliteList {
    fn default() -> Self {
        Self { sats: [SatelliteInfo::default(); GPS_SV_MAXSATS_M8N], len: 0 }
    }
}

impl SatelliteList {
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends a satellite, capped at `GPS_SV_MAXSATS_M8N`. Extra entries
    /// beyond capacity are silently dropped, mirroring the fixed-size arrays
    /// the reference firmware walks these into.
    pub fn push(&mut self, sat: SatelliteInfo) {
        if self.len < self.sats.len() {
            self.sats[self.len] = sat;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[SatelliteInfo] {
        &self.sats[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn legacy_capacity() -> usize {
        GPS_SV_MAXSATS_LEGACY
    }
}

/// Dilution-of-precision group, tenths of a unit as the wire protocols report
/// it (NAV-DOP, or GSA's pdop/hdop/vdop fields).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DopGroup {
    pub p_dop: u16,
    pub h_dop: u16,
    pub v_dop: u16,
}

/// Horizontal/vertical accuracy estimate, centimetres (NAV-PVT only; zero
/// when the active message set doesn't supply it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccuracyGroup {
    pub horizontal_cm: u32,
    pub vertical_cm: u32,
}

/// The fix currently published to the rest of the flight controller.
///
/// Fields are only overwritten once a full position+velocity pair has both
/// arrived for the same epoch (see `MessageInterpreter::take_solution` in
/// `interpreter.rs`) — never partially, per spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    pub fix_valid: bool,
    pub num_sat: u8,
    pub lat_1e7: i32,
    pub lon_1e7: i32,
    pub alt_cm: i32,
    pub ground_speed_cm_s: u16,
    pub speed_3d_cm_s: u16,
    pub ground_course_decideg: u16,
    pub dop: DopGroup,
    pub accuracy: AccuracyGroup,
    pub hw_timestamp_ms: u32,
    pub nav_interval_ms: u16,
}

impl Solution {
    /// Clamp applied to every accepted `nav_interval_ms` update
    /// (SPEC_FULL.md section 8 invariant).
    pub fn clamp_nav_interval(ms: u32) -> u16 {
        ms.clamp(50, 2500) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satellite_list_drops_entries_past_m8n_capacity() {
        let mut list = SatelliteList::default();
        for i in 0..40u8 {
            list.push(SatelliteInfo { channel: i, ..Default::default() });
        }
        assert_eq!(list.len(), GPS_SV_MAXSATS_M8N);
    }

    #[test]
    fn nav_interval_clamp_respects_both_bounds() {
        assert_eq!(Solution::clamp_nav_interval(10), 50);
        assert_eq!(Solution::clamp_nav_interval(5000), 2500);
        assert_eq!(Solution::clamp_nav_interval(200), 200);
    }
}
