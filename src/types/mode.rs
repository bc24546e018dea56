//! Pump state types.

use std::fmt;

/// Operating mode reported by register 81.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PumpMode {
    /// Chamber vented, not pumping.
    Idle = 0,
    /// Controlling towards the target (pumping).
    Control = 1,
    /// Tare in progress.
    Taring = 2,
    /// Internal fault; register 82 holds the code.
    Error = 3,
    /// Leak test in progress.
    LeakTest = 4,
}

impl PumpMode {
    /// Parses a mode from a register value.
    #[must_use]
    pub const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Control),
            2 => Some(Self::Taring),
            3 => Some(Self::Error),
            4 => Some(Self::LeakTest),
            _ => None,
        }
    }
}

impl fmt::Display for PumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Control => "control",
            Self::Taring => "taring",
            Self::Error => "error",
            Self::LeakTest => "leak test",
        })
    }
}

/// Control loop selected by register 77.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlType {
    /// Hold a chamber pressure (mbar gauge).
    Pressure = 0,
    /// Hold a flow rate (pl/s), requires a flow sensor.
    Flow = 1,
}

impl ControlType {
    /// Parses a control type from a register value.
    #[must_use]
    pub const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Pressure),
            1 => Some(Self::Flow),
            _ => None,
        }
    }
}

impl From<ControlType> for i32 {
    fn from(kind: ControlType) -> Self {
        kind as Self
    }
}

/// Fault code reported by register 82 while the mode is [`PumpMode::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Supply above maximum pressure.
    SupplyOverpressure,
    /// Tare timed out.
    TareTimeout,
    /// Tare attempted with the supply still connected.
    TareSupplyConnected,
    /// Valves opened but chamber pressure did not change.
    ControlStartTimeout,
    /// Target below the attainable range.
    TargetTooLow,
    /// Target above the attainable range.
    TargetTooHigh,
    /// Supply pressure too low for a leak test.
    LeakTestSupplyLow,
    /// Leak test could not reach its target pressure.
    LeakTestTimeout,
    /// Flow sensor disappeared during flow control.
    FlowSensorLost,
    /// Code not documented by the manufacturer.
    Other(u32),
}

impl ErrorCode {
    /// Parses an error code from a register value.
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            1 => Self::SupplyOverpressure,
            2 => Self::TareTimeout,
            3 => Self::TareSupplyConnected,
            4 => Self::ControlStartTimeout,
            5 => Self::TargetTooLow,
            6 => Self::TargetTooHigh,
            7 => Self::LeakTestSupplyLow,
            8 => Self::LeakTestTimeout,
            9 => Self::FlowSensorLost,
            other => Self::Other(other),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::SupplyOverpressure => "supply > maximum pressure",
            Self::TareTimeout => "tare: timed out",
            Self::TareSupplyConnected => "tare: supply still connected",
            Self::ControlStartTimeout => {
                "control start timed out, opening valves but chamber pressure unchanged"
            }
            Self::TargetTooLow => "target too low",
            Self::TargetTooHigh => "target too high",
            Self::LeakTestSupplyLow => "leak test: supply pressure too low",
            Self::LeakTestTimeout => "leak test: pressure cannot reach target",
            Self::FlowSensorLost => "flow sensor lost during flow control",
            Self::Other(_) => "undocumented error code",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "{} ({code})", self.description()),
            _ => f.write_str(self.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_value() {
        assert_eq!(PumpMode::from_value(0), Some(PumpMode::Idle));
        assert_eq!(PumpMode::from_value(1), Some(PumpMode::Control));
        assert_eq!(PumpMode::from_value(2), Some(PumpMode::Taring));
        assert_eq!(PumpMode::from_value(3), Some(PumpMode::Error));
        assert_eq!(PumpMode::from_value(4), Some(PumpMode::LeakTest));
        assert_eq!(PumpMode::from_value(5), None);
    }

    #[test]
    fn test_control_type_from_value() {
        assert_eq!(ControlType::from_value(0), Some(ControlType::Pressure));
        assert_eq!(ControlType::from_value(1), Some(ControlType::Flow));
        assert_eq!(ControlType::from_value(2), None);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes: Vec<_> = (1..=9).map(ErrorCode::from_value).collect();
        for (i, a) in codes.iter().enumerate() {
            assert!(!matches!(a, ErrorCode::Other(_)));
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(a.description(), b.description());
            }
        }
        assert_eq!(ErrorCode::from_value(5), ErrorCode::TargetTooLow);
        assert_eq!(ErrorCode::from_value(0), ErrorCode::Other(0));
        assert_eq!(ErrorCode::from_value(42), ErrorCode::Other(42));
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::TargetTooLow.to_string(), "target too low");
        assert_eq!(
            ErrorCode::Other(12).to_string(),
            "undocumented error code (12)"
        );
    }
}
