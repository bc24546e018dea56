//! Message types and register addresses of the P-Pump protocol.
//!
//! Every frame names a message type (byte 2) and, for reads and writes, a
//! single-byte register address (byte 4).

/// Message type of an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Write a value to a register.
    Write = 0x01,
    /// Read a value from a register.
    Read = 0x02,
    /// Error frame.
    Error = 0x03,
    /// Stream up to four registers (not used by this driver).
    Stream = 0x04,
}

impl MessageType {
    /// Parses a message type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Write),
            0x02 => Some(Self::Read),
            0x03 => Some(Self::Error),
            0x04 => Some(Self::Stream),
            _ => None,
        }
    }

    /// Returns true if the frame carries a register location and value.
    #[must_use]
    pub const fn addresses_register(self) -> bool {
        matches!(self, Self::Write | Self::Read)
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as Self
    }
}

/// Register addresses used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Atmospheric pressure, tenths of mbar.
    AtmosphericPressure = 64,
    /// Supply pressure, mbar gauge.
    SupplyPressure = 65,
    /// Chamber pressure, mbar gauge.
    ChamberPressure = 66,
    /// Atmospheric sensor temperature, tenths of a degree Celsius.
    AtmosphericTemperature = 67,
    /// Supply sensor temperature, tenths of a degree Celsius.
    SupplyTemperature = 68,
    /// Chamber sensor temperature, tenths of a degree Celsius.
    ChamberTemperature = 69,
    /// Control type (pressure or flow).
    ControlType = 77,
    /// Run command (idle, control, tare).
    RunCommand = 78,
    /// Pressure (mbar gauge) or flow (pl/s) target.
    Target = 79,
    /// Current pump mode.
    Mode = 81,
    /// Error code, meaningful while the mode is error.
    ErrorCode = 82,
    /// Installed flow sensor identity.
    SensorId = 88,
}

impl Register {
    /// Returns the wire address of the register.
    #[must_use]
    pub const fn address(self) -> u8 {
        self as u8
    }
}

impl From<Register> for u8 {
    fn from(register: Register) -> Self {
        register as Self
    }
}

/// Values written to [`Register::RunCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RunCommand {
    /// Vent the chamber and stop.
    Idle = 0,
    /// Start controlling towards the target.
    Control = 1,
    /// Zero the sensors against atmospheric pressure.
    Tare = 2,
}

impl From<RunCommand> for i32 {
    fn from(command: RunCommand) -> Self {
        command as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        for kind in [
            MessageType::Write,
            MessageType::Read,
            MessageType::Error,
            MessageType::Stream,
        ] {
            assert_eq!(MessageType::from_byte(u8::from(kind)), Some(kind));
        }
        assert_eq!(MessageType::from_byte(0), None);
        assert_eq!(MessageType::from_byte(5), None);
    }

    #[test]
    fn test_register_addresses() {
        assert_eq!(Register::ControlType.address(), 77);
        assert_eq!(Register::RunCommand.address(), 78);
        assert_eq!(Register::Target.address(), 79);
        assert_eq!(Register::Mode.address(), 81);
        assert_eq!(Register::ErrorCode.address(), 82);
        assert_eq!(u8::from(Register::SensorId), 88);
    }
}
