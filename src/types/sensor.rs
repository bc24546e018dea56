//! Sensor readings and flow sensor identity.

use std::fmt;

/// Divisor for registers reported in tenths.
pub const TENTHS: f64 = 10.0;

/// Flow sensor installed on the pump (register 88).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorDescriptor {
    /// No flow sensor connected.
    None,
    /// LG16-0025, 0.07-1.5 µl/min.
    Lg16_0025,
    /// LG16-0150, 0.4-7 µl/min.
    Lg16_0150,
    /// LG16-0480, 1-50 µl/min.
    Lg16_0480,
    /// LG16-1000, 30-1000 µl/min.
    Lg16_1000,
    /// LG16-2000, 200-5000 µl/min.
    Lg16_2000,
    /// Sensor id not in the manufacturer table.
    Unknown(u32),
}

impl SensorDescriptor {
    /// Parses a sensor id.
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::Lg16_0025,
            2 => Self::Lg16_0150,
            3 => Self::Lg16_0480,
            4 => Self::Lg16_1000,
            5 => Self::Lg16_2000,
            other => Self::Unknown(other),
        }
    }

    /// Sensor model number, if a known sensor is connected.
    #[must_use]
    pub const fn model(&self) -> Option<&'static str> {
        match self {
            Self::Lg16_0025 => Some("LG16-0025"),
            Self::Lg16_0150 => Some("LG16-0150"),
            Self::Lg16_0480 => Some("LG16-0480"),
            Self::Lg16_1000 => Some("LG16-1000"),
            Self::Lg16_2000 => Some("LG16-2000"),
            Self::None | Self::Unknown(_) => None,
        }
    }

    /// Measurable range in µl/min.
    #[must_use]
    pub const fn range_ul_per_min(&self) -> Option<(f64, f64)> {
        match self {
            Self::Lg16_0025 => Some((0.07, 1.5)),
            Self::Lg16_0150 => Some((0.4, 7.0)),
            Self::Lg16_0480 => Some((1.0, 50.0)),
            Self::Lg16_1000 => Some((30.0, 1000.0)),
            Self::Lg16_2000 => Some((200.0, 5000.0)),
            Self::None | Self::Unknown(_) => None,
        }
    }

    /// Unit the sensor reports in.
    #[must_use]
    pub const fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Lg16_2000 => Some("ml/min"),
            Self::None | Self::Unknown(_) => None,
            _ => Some("ul/min"),
        }
    }
}

impl fmt::Display for SensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.model(), self.range_ul_per_min(), self.unit()) {
            (Some(model), Some((low, high)), Some(unit)) => {
                write!(f, "{model}, {low}-{high}ul/min, unit={unit}")
            }
            _ => match self {
                Self::Unknown(id) => write!(f, "unknown sensor ({id})"),
                _ => f.write_str("none connected"),
            },
        }
    }
}

/// Temperatures of the three pressure sensors, degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    /// Atmospheric pressure sensor.
    pub atmospheric: f64,
    /// Supply pressure sensor.
    pub supply: f64,
    /// Chamber pressure sensor.
    pub chamber: f64,
}

/// Readings of the three pressure sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pressures {
    /// Atmospheric pressure, mbar absolute.
    pub atmospheric_mbar: f64,
    /// Supply pressure, mbar gauge.
    pub supply_mbar: f64,
    /// Chamber pressure, mbar gauge.
    pub chamber_mbar: f64,
}
