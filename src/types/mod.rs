//! Data types for P-Pump state and readings.
//!
//! This module contains the decoded forms of the pump registers:
//! - Operating mode, control type and fault codes
//! - Sensor identity and pressure/temperature readings

pub mod mode;
pub mod sensor;

pub use mode::{ControlType, ErrorCode, PumpMode};
pub use sensor::{Pressures, SensorDescriptor, Temperatures};
