//! Command identifiers carried in the byte after the `':'` token.

/// Command id of a UNER frame.
///
/// The set is open: any id the firmware does not know is carried as
/// [`Command::Other`] so the dispatcher can still answer it (usually with
/// [`Command::NoCmd`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Command {
    /// Acknowledge (`0x0D`).
    Ack,
    /// Unknown command reply (`0x1D`).
    NoCmd,
    /// Debug message (`0xDE`).
    Debugger,
    /// System error, carries an explicit length byte (`0xEE`).
    SysError,
    /// System warning (`0xEF`).
    SysWarning,
    /// Keep-alive request (`0xF0`).
    GetAlive,
    /// Firmware version query (`0xF1`).
    Firmware,
    /// PID gains update (`0xC0`).
    SetPid,
    /// User text, carries an explicit length byte (`0xB1`).
    UserText,
    /// User number (`0xB2`).
    UserNumber,
    /// Single ADC reading (`0xA0`).
    AdcSingle,
    /// Block of filtered ADC readings (`0xA1`).
    AdcBlock,
    /// Motor speed set-point (`0xA2`).
    SetMotor,
    /// Encoder counts query (`0xA3`).
    GetEncoder,
    /// Block of IMU readings (`0xA4`).
    MpuBlock,
    /// IMU offsets (`0xA5`).
    MpuOffset,
    /// Any id not listed above.
    Other(u8),
}

impl Command {
    /// Maps a wire id to a command.
    pub const fn from_id(id: u8) -> Self {
        match id {
            0x0D => Self::Ack,
            0x1D => Self::NoCmd,
            0xDE => Self::Debugger,
            0xEE => Self::SysError,
            0xEF => Self::SysWarning,
            0xF0 => Self::GetAlive,
            0xF1 => Self::Firmware,
            0xC0 => Self::SetPid,
            0xB1 => Self::UserText,
            0xB2 => Self::UserNumber,
            0xA0 => Self::AdcSingle,
            0xA1 => Self::AdcBlock,
            0xA2 => Self::SetMotor,
            0xA3 => Self::GetEncoder,
            0xA4 => Self::MpuBlock,
            0xA5 => Self::MpuOffset,
            other => Self::Other(other),
        }
    }

    /// The wire id of this command.
    pub const fn id(self) -> u8 {
        match self {
            Self::Ack => 0x0D,
            Self::NoCmd => 0x1D,
            Self::Debugger => 0xDE,
            Self::SysError => 0xEE,
            Self::SysWarning => 0xEF,
            Self::GetAlive => 0xF0,
            Self::Firmware => 0xF1,
            Self::SetPid => 0xC0,
            Self::UserText => 0xB1,
            Self::UserNumber => 0xB2,
            Self::AdcSingle => 0xA0,
            Self::AdcBlock => 0xA1,
            Self::SetMotor => 0xA2,
            Self::GetEncoder => 0xA3,
            Self::MpuBlock => 0xA4,
            Self::MpuOffset => 0xA5,
            Self::Other(id) => id,
        }
    }

    /// `true` for the commands whose payload is preceded by its own length byte.
    pub const fn needs_length_byte(self) -> bool {
        matches!(self, Self::UserText | Self::SysError)
    }
}

impl From<u8> for Command {
    fn from(id: u8) -> Self {
        Self::from_id(id)
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_map_back_to_themselves() {
        for id in [
            0x0D, 0x1D, 0xDE, 0xEE, 0xEF, 0xF0, 0xF1, 0xC0, 0xB1, 0xB2, 0xA0, 0xA1, 0xA2, 0xA3,
            0xA4, 0xA5,
        ] {
            let cmd = Command::from_id(id);
            assert!(!matches!(cmd, Command::Other(_)), "{id:#04x} should be known");
            assert_eq!(cmd.id(), id);
        }
    }

    #[test]
    fn test_unknown_id_is_carried() {
        assert_eq!(Command::from(0x42), Command::Other(0x42));
        assert_eq!(u8::from(Command::Other(0x42)), 0x42);
    }

    #[test]
    fn test_length_byte_commands() {
        assert!(Command::UserText.needs_length_byte());
        assert!(Command::SysError.needs_length_byte());
        assert!(!Command::SysWarning.needs_length_byte());
        assert!(!Command::Other(0xB1 ^ 1).needs_length_byte());
    }
}
