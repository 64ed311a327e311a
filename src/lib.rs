// Battery-charger device layer: one command surface for many charger chips
//
// A ChargerController (upper half) owns a chip-specific ChargerBackend
// (lower half), serializes every command against it and returns what
// the chip reported. Registration publishes controllers by path.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod drivers;
pub mod error;
pub mod kernel;

pub use config::ChargerConfig;
pub use drivers::backend::{BusConfig, ChargerBackend, ChargerInit};
pub use drivers::charger::{
    ChargerHealth, ChargerStatus, EXTERNAL_LIMIT, InputCurrentLimit, OperateMsg, OperateParam,
};
pub use drivers::command::{Command, CommandId, Reply};
pub use drivers::controller::{BackendHandle, ChargerController, MAX_WAITERS};
pub use error::{BackendFault, ChargerError, Result};
pub use kernel::ChargerRegistry;
