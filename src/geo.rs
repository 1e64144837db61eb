//! Home-point, distance and bearing helpers (SPEC_FULL.md section 4.G).
//!
//! Grounded on the reference firmware's `GPS_distance_cm_bearing` and home-point
//! latch logic: a local tangent-plane approximation scaled by a cached cosine of
//! latitude, accurate for the distances a flight controller actually cares about.

use crate::constants::GPS_DISTANCE_FLOWN_MIN_SPEED_CM_S;
use num_traits::cast::ToPrimitive;

/// `cos(lat)` scaling factor cached per-home-point so the hot path in the task
/// loop never calls a trig function. Recomputed only when the home point is
/// re-latched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongitudeScale(f32);

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
/// Metres per degree of latitude, times 100 for centimetres, times 1e-7 for
/// the coordinate's fixed-point scale.
const CM_PER_LAT_UNIT: f32 = 1.113_195e-2;

impl LongitudeScale {
    pub fn for_latitude(lat_1e7: i32) -> Self {
        let lat_deg = lat_1e7.to_f32().unwrap_or(0.0) * 1e-7;
        Self((lat_deg * DEG_TO_RAD).cos())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoPoint {
    pub lat_1e7: i32,
    pub lon_1e7: i32,
    pub alt_cm: i32,
}

/// Planar distance (cm) and bearing (centidegrees, 0..36000) from `from` to
/// `to`. `in_3d` folds altitude difference into the distance via Pythagoras;
/// bearing is always the horizontal component.
pub fn distance_cm_bearing(from: GeoPoint, to: GeoPoint, scale: LongitudeScale, in_3d: bool) -> (u32, u16) {
    let dlat = (to.lat_1e7 - from.lat_1e7) as f32;
    let dlon = (to.lon_1e7 - from.lon_1e7) as f32 * scale.0;

    let north_cm = dlat * CM_PER_LAT_UNIT;
    let east_cm = dlon * CM_PER_LAT_UNIT;

    let horizontal_cm = (north_cm * north_cm + east_cm * east_cm).sqrt();
    let distance_cm = if in_3d {
        let dalt = (to.alt_cm - from.alt_cm) as f32;
        (horizontal_cm * horizontal_cm + dalt * dalt).sqrt()
    } else {
        horizontal_cm
    };

    let mut bearing_centideg = (east_cm.atan2(north_cm) / DEG_TO_RAD) * 100.0;
    if bearing_centideg < 0.0 {
        bearing_centideg += 36000.0;
    }

    (distance_cm.round() as u32, bearing_centideg.round() as u16)
}

/// Home point latch: set once on first fix (or every fix, if
/// `set_home_point_once` is false), cleared on disarm.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomePoint {
    point: Option<GeoPoint>,
    scale: LongitudeScale,
}

impl HomePoint {
    pub fn set(&mut self, point: GeoPoint) {
        self.scale = LongitudeScale::for_latitude(point.lat_1e7);
        self.point = Some(point);
    }

    pub fn clear(&mut self) {
        self.point = None;
    }

    pub fn is_set(&self) -> bool {
        self.point.is_some()
    }

    pub fn get(&self) -> Option<GeoPoint> {
        self.point
    }

    /// Latches `point` as home if unset, or always if `once` is false.
    pub fn latch(&mut self, point: GeoPoint, once: bool) {
        if !once || !self.is_set() {
            self.set(point);
        }
    }

    pub fn distance_bearing_to(&self, current: GeoPoint, in_3d: bool) -> Option<(u32, u16)> {
        self.point.map(|home| distance_cm_bearing(home, current, self.scale, in_3d))
    }
}

/// Accumulates total flown distance, gated on a minimum ground speed so GPS
/// jitter while stationary doesn't add up over a long flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlownDistance {
    total_cm: u64,
    last: Option<GeoPoint>,
}

impl FlownDistance {
    pub fn reset(&mut self) {
        self.total_cm = 0;
        self.last = None;
    }

    pub fn total_cm(&self) -> u64 {
        self.total_cm
    }

    /// Accumulates the distance moved since the last sample, only if ground
    /// speed is at or above `GPS_DISTANCE_FLOWN_MIN_SPEED_CM_S`.
    pub fn update(&mut self, point: GeoPoint, ground_speed_cm_s: i32) {
        if let Some(last) = self.last {
            if ground_speed_cm_s >= GPS_DISTANCE_FLOWN_MIN_SPEED_CM_S {
                let scale = LongitudeScale::for_latitude(last.lat_1e7);
                let (dist_cm, _) = distance_cm_bearing(last, point, scale, false);
                self.total_cm += dist_cm as u64;
            }
        }
        self.last = Some(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_along_pure_north_line_matches_latitude_delta() {
        let from = GeoPoint { lat_1e7: 0, lon_1e7: 0, alt_cm: 0 };
        let to = GeoPoint { lat_1e7: 1_000_000, lon_1e7: 0, alt_cm: 0 };
        let scale = LongitudeScale::for_latitude(0);
        let (dist, bearing) = distance_cm_bearing(from, to, scale, false);
        // 0.1 degree of latitude is roughly 11132 metres.
        assert!((1_113_195..1_113_196).contains(&dist), "dist={dist}");
        assert_eq!(bearing, 0);
    }

    #[test]
    fn home_latch_once_ignores_later_points_until_cleared() {
        let mut home = HomePoint::default();
        home.latch(GeoPoint { lat_1e7: 10, lon_1e7: 10, alt_cm: 0 }, true);
        home.latch(GeoPoint { lat_1e7: 99, lon_1e7: 99, alt_cm: 0 }, true);
        assert_eq!(home.get().unwrap().lat_1e7, 10);
        home.clear();
        home.latch(GeoPoint { lat_1e7: 99, lon_1e7: 99, alt_cm: 0 }, true);
        assert_eq!(home.get().unwrap().lat_1e7, 99);
    }

    #[test]
    fn flown_distance_ignores_samples_below_speed_threshold() {
        let mut flown = FlownDistance::default();
        let a = GeoPoint { lat_1e7: 0, lon_1e7: 0, alt_cm: 0 };
        let b = GeoPoint { lat_1e7: 1_000_000, lon_1e7: 0, alt_cm: 0 };
        flown.update(a, 0);
        flown.update(b, 5); // below 15 cm/s threshold
        assert_eq!(flown.total_cm(), 0);
        flown.update(a, 20);
        assert!(flown.total_cm() > 0);
    }
}
