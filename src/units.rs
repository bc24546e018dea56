//! Flow unit and hold duration conversions.
//!
//! The pump works in picoliters per second for flow and whole seconds for
//! timing; these types turn operator-facing strings into those encodings.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Flow rate units accepted by [`crate::PPump::set_flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowUnit {
    PicolitersPerSecond,
    PicolitersPerMinute,
    NanolitersPerSecond,
    NanolitersPerMinute,
    MicrolitersPerSecond,
    MicrolitersPerMinute,
    MillilitersPerSecond,
    MillilitersPerMinute,
}

impl FlowUnit {
    /// Accepted literals, in conversion-table order.
    pub const LITERALS: [&'static str; 8] = [
        "pl/s", "pl/m", "nl/s", "nl/m", "ul/s", "ul/m", "ml/s", "ml/m",
    ];

    /// Literal used on the command line and in protocols.
    #[must_use]
    pub const fn literal(self) -> &'static str {
        match self {
            Self::PicolitersPerSecond => "pl/s",
            Self::PicolitersPerMinute => "pl/m",
            Self::NanolitersPerSecond => "nl/s",
            Self::NanolitersPerMinute => "nl/m",
            Self::MicrolitersPerSecond => "ul/s",
            Self::MicrolitersPerMinute => "ul/m",
            Self::MillilitersPerSecond => "ml/s",
            Self::MillilitersPerMinute => "ml/m",
        }
    }

    /// Picoliters in one unit of volume.
    const fn picoliters(self) -> f64 {
        match self {
            Self::PicolitersPerSecond | Self::PicolitersPerMinute => 1.0,
            Self::NanolitersPerSecond | Self::NanolitersPerMinute => 1e3,
            Self::MicrolitersPerSecond | Self::MicrolitersPerMinute => 1e6,
            Self::MillilitersPerSecond | Self::MillilitersPerMinute => 1e9,
        }
    }

    /// Seconds in one unit of time.
    const fn seconds(self) -> f64 {
        match self {
            Self::PicolitersPerSecond
            | Self::NanolitersPerSecond
            | Self::MicrolitersPerSecond
            | Self::MillilitersPerSecond => 1.0,
            _ => 60.0,
        }
    }

    /// Multiplier from this unit to pl/s.
    #[must_use]
    pub fn factor(self) -> f64 {
        self.picoliters() / self.seconds()
    }

    /// Converts `speed` in this unit to the pump's native pl/s, truncating
    /// toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetOutOfRange`] if the result does not fit a
    /// signed 32-bit register.
    pub fn to_picoliters_per_second(self, speed: f64) -> Result<i32> {
        // scale before dividing so whole-minute rates stay exact
        let native = (speed * self.picoliters() / self.seconds()).trunc();
        if !native.is_finite() || native < f64::from(i32::MIN) || native > f64::from(i32::MAX) {
            return Err(Error::TargetOutOfRange { value: native });
        }
        Ok(native as i32)
    }
}

impl FromStr for FlowUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pl/s" => Ok(Self::PicolitersPerSecond),
            "pl/m" => Ok(Self::PicolitersPerMinute),
            "nl/s" => Ok(Self::NanolitersPerSecond),
            "nl/m" => Ok(Self::NanolitersPerMinute),
            "ul/s" => Ok(Self::MicrolitersPerSecond),
            "ul/m" => Ok(Self::MicrolitersPerMinute),
            "ml/s" => Ok(Self::MillilitersPerSecond),
            "ml/m" => Ok(Self::MillilitersPerMinute),
            _ => Err(Error::InvalidUnit { unit: s.to_owned() }),
        }
    }
}

impl fmt::Display for FlowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// How long to hold a control action before returning to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HoldDuration {
    /// Keep pumping until the next command.
    #[default]
    Indefinite,
    /// Pump for this long, then idle.
    For(Duration),
}

impl HoldDuration {
    /// Sentinel string meaning "hold indefinitely".
    pub const INDEFINITE: &'static str = "00:00:00:00";

    /// Returns the finite hold time, if any.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Indefinite => None,
            Self::For(d) => Some(d),
        }
    }
}

impl FromStr for HoldDuration {
    type Err = Error;

    /// Parses `dd:hh:mm:ss`. Fields are not range-checked, so `00:00:90:00`
    /// is ninety minutes.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidDuration {
            input: s.to_owned(),
            reason,
        };

        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 4 {
            return Err(invalid("expected dd:hh:mm:ss"));
        }

        let mut total: u64 = 0;
        for (field, weight) in fields.iter().zip([86_400u64, 3_600, 60, 1]) {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("fields must be unsigned integers"));
            }
            let value: u64 = field.parse().map_err(|_| invalid("field too large"))?;
            total = value
                .checked_mul(weight)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(|| invalid("duration too large"))?;
        }

        if total == 0 {
            Ok(Self::Indefinite)
        } else {
            Ok(Self::For(Duration::from_secs(total)))
        }
    }
}

impl fmt::Display for HoldDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indefinite => f.write_str(Self::INDEFINITE),
            Self::For(d) => {
                let secs = d.as_secs();
                write!(
                    f,
                    "{:02}:{:02}:{:02}:{:02}",
                    secs / 86_400,
                    (secs % 86_400) / 3_600,
                    (secs % 3_600) / 60,
                    secs % 60
                )
            }
        }
    }
}
