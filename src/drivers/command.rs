// Command vocabulary understood by the controller
//
// Seven commands, one per backend operation, no batching. CommandId is
// the integer identifier external callers use; Command carries the
// typed payload, Reply the typed result.

use core::fmt;

use crate::drivers::charger::{ChargerHealth, ChargerStatus, InputCurrentLimit, OperateParam};
use crate::error::{ChargerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    GetState = 1,
    GetHealth = 2,
    GetOnline = 3,
    SetVoltage = 4,
    SetCurrent = 5,
    SetInputCurrentLimit = 6,
    Operate = 7,
}

impl CommandId {
    pub const fn is_read(self) -> bool {
        matches!(self, Self::GetState | Self::GetHealth | Self::GetOnline)
    }
}

impl TryFrom<u8> for CommandId {
    type Error = ChargerError;

    fn try_from(raw: u8) -> core::result::Result<Self, Self::Error> {
        Ok(match raw {
            1 => Self::GetState,
            2 => Self::GetHealth,
            3 => Self::GetOnline,
            4 => Self::SetVoltage,
            5 => Self::SetCurrent,
            6 => Self::SetInputCurrentLimit,
            7 => Self::Operate,
            _ => return Err(ChargerError::InvalidArgument),
        })
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GetState => "GET_STATE",
            Self::GetHealth => "GET_HEALTH",
            Self::GetOnline => "GET_ONLINE",
            Self::SetVoltage => "SET_VOLTAGE",
            Self::SetCurrent => "SET_CURRENT",
            Self::SetInputCurrentLimit => "SET_INPUT_CURRENT_LIMIT",
            Self::Operate => "OPERATE",
        })
    }
}

#[derive(Debug)]
pub enum Command<'a> {
    GetState,
    GetHealth,
    GetOnline,
    SetVoltage(i32),
    SetCurrent(i32),
    SetInputCurrentLimit(InputCurrentLimit),
    Operate(OperateParam<'a>),
}

impl Command<'_> {
    pub fn id(&self) -> CommandId {
        match self {
            Command::GetState => CommandId::GetState,
            Command::GetHealth => CommandId::GetHealth,
            Command::GetOnline => CommandId::GetOnline,
            Command::SetVoltage(_) => CommandId::SetVoltage,
            Command::SetCurrent(_) => CommandId::SetCurrent,
            Command::SetInputCurrentLimit(_) => CommandId::SetInputCurrentLimit,
            Command::Operate(_) => CommandId::Operate,
        }
    }
}

impl Command<'static> {
    /// Decode an integer command. `arg` is ignored by the reads.
    /// OPERATE needs a reference and cannot be expressed this way.
    pub fn from_raw(id: u8, arg: i32) -> Result<Self> {
        Ok(match CommandId::try_from(id)? {
            CommandId::GetState => Command::GetState,
            CommandId::GetHealth => Command::GetHealth,
            CommandId::GetOnline => Command::GetOnline,
            CommandId::SetVoltage => Command::SetVoltage(arg),
            CommandId::SetCurrent => Command::SetCurrent(arg),
            CommandId::SetInputCurrentLimit => {
                Command::SetInputCurrentLimit(InputCurrentLimit::from_raw(arg))
            }
            CommandId::Operate => return Err(ChargerError::InvalidArgument),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    State(ChargerStatus),
    Health(ChargerHealth),
    Online(bool),
    /// write accepted by the backend
    Done,
}

impl Reply {
    // integer result: enum wire value, 1/0 for online, 0 for writes
    pub fn as_raw(self) -> i32 {
        match self {
            Reply::State(s) => s.as_raw() as i32,
            Reply::Health(h) => h.as_raw() as i32,
            Reply::Online(on) => on as i32,
            Reply::Done => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ids_map_one_to_one() {
        for raw in 1u8..=6 {
            let cmd = Command::from_raw(raw, 0).unwrap();
            assert_eq!(cmd.id() as u8, raw);
        }
        assert_eq!(CommandId::try_from(0), Err(ChargerError::InvalidArgument));
        assert_eq!(CommandId::try_from(8), Err(ChargerError::InvalidArgument));
    }

    #[test]
    fn operate_has_no_integer_form() {
        assert_eq!(CommandId::try_from(7), Ok(CommandId::Operate));
        assert!(matches!(
            Command::from_raw(7, 0x1000),
            Err(ChargerError::InvalidArgument)
        ));
    }

    #[test]
    fn raw_payloads_are_kept() {
        assert!(matches!(
            Command::from_raw(5, 1500),
            Ok(Command::SetCurrent(1500))
        ));
        assert!(matches!(
            Command::from_raw(6, -1),
            Ok(Command::SetInputCurrentLimit(InputCurrentLimit::External))
        ));
        assert!(CommandId::GetOnline.is_read());
        assert!(!CommandId::SetVoltage.is_read());
    }

    #[test]
    fn reply_integers() {
        assert_eq!(Reply::State(ChargerStatus::Full).as_raw(), 3);
        assert_eq!(Reply::Health(ChargerHealth::Cold).as_raw(), 6);
        assert_eq!(Reply::Online(true).as_raw(), 1);
        assert_eq!(Reply::Done.as_raw(), 0);
    }
}
