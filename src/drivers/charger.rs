// Charger data model shared by the controller and every backend
//
// Status and health are two orthogonal axes reported by the chip:
// a pack can be Charging and Overheat at the same time. Values are
// passed through as reported, never derived or cached.
// Wire values are the integers external callers see (u8 discriminants).

use core::any::Any;
use core::fmt;

use crate::error::ChargerError;

/// Input-current sentinel: defer to an externally negotiated limit
/// (e.g. USB PD or BC1.2 detection) instead of a numeric cap.
pub const EXTERNAL_LIMIT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChargerStatus {
    #[default]
    Unknown = 0,
    /// charger reported a fault; query health for details
    Fault = 1,
    /// not full, not charging, not discharging
    Idle = 2,
    Full = 3,
    Charging = 4,
    Discharging = 5,
}

impl ChargerStatus {
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fault => "fault",
            Self::Idle => "idle",
            Self::Full => "full",
            Self::Charging => "charging",
            Self::Discharging => "discharging",
        }
    }
}

impl TryFrom<u8> for ChargerStatus {
    type Error = ChargerError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Unknown,
            1 => Self::Fault,
            2 => Self::Idle,
            3 => Self::Full,
            4 => Self::Charging,
            5 => Self::Discharging,
            _ => return Err(ChargerError::InvalidArgument),
        })
    }
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChargerHealth {
    #[default]
    Unknown = 0,
    Good = 1,
    /// nothing left to recover
    Dead = 2,
    Overheat = 3,
    Overvoltage = 4,
    UnspecifiedFailure = 5,
    Cold = 6,
    WatchdogExpired = 7,
    SafetyTimerExpired = 8,
    Disconnected = 9,
}

impl ChargerHealth {
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Good => "good",
            Self::Dead => "dead",
            Self::Overheat => "overheat",
            Self::Overvoltage => "overvoltage",
            Self::UnspecifiedFailure => "unspecified failure",
            Self::Cold => "cold",
            Self::WatchdogExpired => "watchdog expired",
            Self::SafetyTimerExpired => "safety timer expired",
            Self::Disconnected => "disconnected",
        }
    }
}

impl TryFrom<u8> for ChargerHealth {
    type Error = ChargerError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Unknown,
            1 => Self::Good,
            2 => Self::Dead,
            3 => Self::Overheat,
            4 => Self::Overvoltage,
            5 => Self::UnspecifiedFailure,
            6 => Self::Cold,
            7 => Self::WatchdogExpired,
            8 => Self::SafetyTimerExpired,
            9 => Self::Disconnected,
            _ => return Err(ChargerError::InvalidArgument),
        })
    }
}

impl fmt::Display for ChargerHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed view of the SET_INPUT_CURRENT_LIMIT payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCurrentLimit {
    Milliamps(i32),
    /// [`EXTERNAL_LIMIT`]; only valid for backends that support it
    External,
}

impl InputCurrentLimit {
    pub const fn from_raw(raw: i32) -> Self {
        if raw == EXTERNAL_LIMIT {
            Self::External
        } else {
            Self::Milliamps(raw)
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Milliamps(ma) => ma,
            Self::External => EXTERNAL_LIMIT,
        }
    }

    pub const fn is_external(self) -> bool {
        matches!(self, Self::External)
    }
}

impl fmt::Display for InputCurrentLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Milliamps(ma) => write!(f, "{} mA", ma),
            Self::External => f.write_str("external"),
        }
    }
}

// Generic OPERATE message: a type tag plus 8 payload bytes.
// Backends are free to accept this or any other type of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperateMsg {
    pub operate_type: u8,
    pub data: [u8; 8],
}

impl OperateMsg {
    pub const fn new(operate_type: u8) -> Self {
        Self {
            operate_type,
            data: [0u8; 8],
        }
    }

    pub const fn with_u32(operate_type: u8, value: u32) -> Self {
        let b = value.to_le_bytes();
        Self {
            operate_type,
            data: [b[0], b[1], b[2], b[3], 0, 0, 0, 0],
        }
    }

    // little-endian view of the first four payload bytes
    pub fn u32(&self) -> u32 {
        u32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    pub fn set_u32(&mut self, value: u32) {
        self.data[..4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Opaque OPERATE parameter.
///
/// The controller moves it to the backend without looking inside. A
/// backend recovers its own message type with [`OperateParam::downcast_mut`]
/// and may write results back through it.
pub struct OperateParam<'a>(&'a mut dyn Any);

impl<'a> OperateParam<'a> {
    pub fn new<T: Any>(value: &'a mut T) -> Self {
        OperateParam(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.downcast_mut::<T>()
    }

    // address of the referenced value, for tracing only
    pub fn addr(&self) -> usize {
        (&*self.0 as *const _ as *const ()) as usize
    }
}

impl fmt::Debug for OperateParam<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperateParam({:#x})", self.addr())
    }
}
