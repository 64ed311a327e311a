// Device publication for charger controllers
//
// Drivers bind a backend to a ChargerController at boot; the registry
// makes each controller reachable by path ("/dev/bat0", ...) for the
// rest of the system. No allocation: slots are fixed at compile time.

pub mod registry;

pub use registry::{ChargerRegistry, MAX_PATH_LEN};
