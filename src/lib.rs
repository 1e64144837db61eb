//! GNSS receiver acquisition, UBX/NMEA decoding and configuration for a
//! flight controller.
//!
//! The task driver (`task_driver::GpsDriver`) is the single entry point a
//! host application calls once per scheduler tick; everything else is a
//! supporting module it composes.

pub mod commands;
pub mod config;
pub mod configurator;
pub mod constants;
pub mod driver_state;
pub mod error;
pub mod geo;
pub mod interpreter;
pub mod nmea;
pub mod serial;
pub mod solution;
pub mod task_driver;
pub mod ubx;

pub use config::GpsConfig;
pub use driver_state::{DriverState, GpsState};
pub use error::{ConfigError, ParserError};
pub use serial::GpsPort;
pub use solution::{SatelliteInfo, Solution};
pub use task_driver::{GpsDriver, SchedulePeriod};
