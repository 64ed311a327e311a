// Lower-half contract: what a chip-specific charger driver supplies
//
// The controller calls these with its mutex held, one call at a time.
// Implementations must not touch the hardware from anywhere else.
// Failures are returned as-is to whoever dispatched the command.

use crate::drivers::charger::{ChargerHealth, ChargerStatus, InputCurrentLimit, OperateParam};
use crate::error::{ChargerError, Result};

/// Chip-specific battery charger operations.
///
/// Object safe; the controller holds a `&mut dyn ChargerBackend`. `Send` so
/// a controller behind a `CriticalSectionRawMutex` can be shared between
/// executors, threads or interrupt priorities.
pub trait ChargerBackend: Send {
    fn state(&mut self) -> Result<ChargerStatus>;

    fn health(&mut self) -> Result<ChargerHealth>;

    /// Whether a power source is connected.
    fn online(&mut self) -> Result<bool>;

    /// Target charge voltage in millivolts.
    fn set_voltage(&mut self, mv: i32) -> Result<()>;

    /// Target charge current in milliamps.
    fn set_current(&mut self, ma: i32) -> Result<()>;

    /// Input current ceiling. Chips without external-limit support must
    /// reject [`InputCurrentLimit::External`] with `InvalidArgument`
    /// before writing anything.
    fn set_input_current_limit(&mut self, limit: InputCurrentLimit) -> Result<()>;

    /// Device-specific action. The parameter's type is whatever the
    /// backend documents; unknown types should be rejected.
    fn operate(&mut self, param: OperateParam<'_>) -> Result<()>;

    fn supports_external_limit(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "charger"
    }
}

// Bus parameters every chip initializer takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// 7-bit bus address
    pub address: u8,
    /// bus clock in Hz
    pub frequency: u32,
    /// input current the supply can deliver, mA (or EXTERNAL_LIMIT)
    pub input_current: i32,
}

impl BusConfig {
    pub const STANDARD_MODE_HZ: u32 = 100_000;
    pub const FAST_MODE_HZ: u32 = 400_000;

    pub const fn new(address: u8, frequency: u32, input_current: i32) -> Self {
        Self {
            address,
            frequency,
            input_current,
        }
    }

    // 0x00..=0x07 and 0x78..=0x7F are reserved addresses on I2C
    pub fn validate(&self) -> Result<()> {
        if !(0x08..=0x77).contains(&self.address) {
            return Err(ChargerError::InvalidArgument);
        }
        if self.frequency == 0 {
            return Err(ChargerError::InvalidArgument);
        }
        if self.input_current < 0
            && !InputCurrentLimit::from_raw(self.input_current).is_external()
        {
            return Err(ChargerError::InvalidArgument);
        }
        Ok(())
    }

    pub const fn input_limit(&self) -> InputCurrentLimit {
        InputCurrentLimit::from_raw(self.input_current)
    }
}

/// Constructor shape shared by chip families.
///
/// Returns `None` when the chip could not be brought up; the result feeds
/// straight into `ChargerController::register`, which rejects `None`.
pub trait ChargerInit<BUS>: ChargerBackend + Sized {
    fn initialize(bus: BUS, config: BusConfig) -> Option<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_config_rejects_reserved_addresses() {
        assert!(BusConfig::new(0x6a, BusConfig::FAST_MODE_HZ, 500).validate().is_ok());
        assert_eq!(
            BusConfig::new(0x03, BusConfig::FAST_MODE_HZ, 500).validate(),
            Err(ChargerError::InvalidArgument)
        );
        assert_eq!(
            BusConfig::new(0x7c, BusConfig::FAST_MODE_HZ, 500).validate(),
            Err(ChargerError::InvalidArgument)
        );
    }

    #[test]
    fn bus_config_input_current() {
        assert_eq!(
            BusConfig::new(0x6b, 0, 500).validate(),
            Err(ChargerError::InvalidArgument)
        );
        assert_eq!(
            BusConfig::new(0x6b, BusConfig::STANDARD_MODE_HZ, -5).validate(),
            Err(ChargerError::InvalidArgument)
        );

        let ext = BusConfig::new(0x6b, BusConfig::STANDARD_MODE_HZ, -1);
        assert!(ext.validate().is_ok());
        assert!(ext.input_limit().is_external());
    }
}
