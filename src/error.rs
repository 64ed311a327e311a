// Charger error taxonomy
//
// Backends report failures as ChargerError; the controller hands them
// back to the caller untouched. Busy is never surfaced: acquisition
// blocks (or times out when configured) instead of failing fast.

use core::fmt;

use embedded_hal::i2c;

pub type Result<T> = core::result::Result<T, ChargerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerError {
    /// Malformed payload, unknown command or enum value, unsupported
    /// external input-current limit, or a missing backend at registration.
    InvalidArgument,
    /// Hardware transaction failed.
    Backend(BackendFault),
    /// Backend was released; the controller has nothing to drive.
    Unbound,
    /// Bounded acquisition expired before the controller became free.
    Timeout,
    /// Registry already holds a controller at this path.
    AlreadyRegistered,
    /// Registry table is full.
    NoSpace,
}

/// Failure cause reported by a backend. Opaque to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFault {
    /// Bus-level failure (NACK, arbitration loss, overrun, ...).
    Bus(i2c::ErrorKind),
    /// Chip-specific code, e.g. a fault register value.
    Device(u16),
}

impl BackendFault {
    pub fn from_i2c<E: i2c::Error>(err: E) -> Self {
        BackendFault::Bus(err.kind())
    }
}

impl From<BackendFault> for ChargerError {
    fn from(fault: BackendFault) -> Self {
        ChargerError::Backend(fault)
    }
}

impl From<i2c::ErrorKind> for ChargerError {
    fn from(kind: i2c::ErrorKind) -> Self {
        ChargerError::Backend(BackendFault::Bus(kind))
    }
}

impl fmt::Display for BackendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFault::Bus(kind) => write!(f, "bus error ({:?})", kind),
            BackendFault::Device(code) => write!(f, "device fault 0x{:04x}", code),
        }
    }
}

impl fmt::Display for ChargerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargerError::InvalidArgument => write!(f, "invalid argument"),
            ChargerError::Backend(fault) => write!(f, "backend failure: {}", fault),
            ChargerError::Unbound => write!(f, "no backend bound"),
            ChargerError::Timeout => write!(f, "timed out waiting for charger"),
            ChargerError::AlreadyRegistered => write!(f, "path already registered"),
            ChargerError::NoSpace => write!(f, "registry full"),
        }
    }
}

impl core::error::Error for ChargerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_errors_keep_their_kind() {
        let err: ChargerError = i2c::ErrorKind::ArbitrationLoss.into();
        assert_eq!(
            err,
            ChargerError::Backend(BackendFault::Bus(i2c::ErrorKind::ArbitrationLoss))
        );

        let nack = i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address);
        assert_eq!(BackendFault::from_i2c(nack), BackendFault::Bus(nack));
    }

    #[test]
    fn display_names_the_fault() {
        let err = ChargerError::Backend(BackendFault::Device(0x2a));
        assert_eq!(err.to_string(), "backend failure: device fault 0x002a");
        assert_eq!(ChargerError::Unbound.to_string(), "no backend bound");
    }
}
