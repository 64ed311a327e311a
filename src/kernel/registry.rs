// Path-keyed table of published charger controllers
// NOTE: No dynamic allocation; fixed number of slots chosen by the board.
//
// Duplicate paths are rejected rather than replaced: a second driver
// claiming "/dev/bat0" is a wiring bug, not an update. Unregistering
// frees the slot for reuse.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{info, warn};

use crate::drivers::controller::ChargerController;
use crate::error::{ChargerError, Result};

pub const MAX_PATH_LEN: usize = 32;

struct Entry<'a, 'd, M: RawMutex> {
    path: &'a str,
    controller: &'a ChargerController<'d, M>,
}

pub struct ChargerRegistry<'a, 'd, M: RawMutex, const N: usize> {
    slots: Mutex<M, RefCell<[Option<Entry<'a, 'd, M>>; N]>>,
}

impl<'a, 'd, M: RawMutex, const N: usize> ChargerRegistry<'a, 'd, M, N> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([const { None }; N])),
        }
    }

    /// Publish `controller` under `path` (e.g. "/dev/bat0").
    pub fn register(&self, path: &'a str, controller: &'a ChargerController<'d, M>) -> Result<()> {
        if !is_valid_path(path) {
            warn!("charger: invalid path {:?}", path);
            return Err(ChargerError::InvalidArgument);
        }

        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();

            if slots.iter().flatten().any(|e| e.path == path) {
                warn!("charger: {} already registered", path);
                return Err(ChargerError::AlreadyRegistered);
            }

            let Some(free) = slots.iter_mut().find(|s| s.is_none()) else {
                warn!("charger: registry full, dropping {}", path);
                return Err(ChargerError::NoSpace);
            };
            *free = Some(Entry { path, controller });
            info!("charger: registered {}", path);
            Ok(())
        })
    }

    pub fn lookup(&self, path: &str) -> Option<&'a ChargerController<'d, M>> {
        self.slots.lock(|slots| {
            slots
                .borrow()
                .iter()
                .flatten()
                .find(|e| e.path == path)
                .map(|e| e.controller)
        })
    }

    /// Remove the entry for `path` and return its controller.
    pub fn unregister(&self, path: &str) -> Option<&'a ChargerController<'d, M>> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let slot = slots
                .iter_mut()
                .find(|s| matches!(s, Some(e) if e.path == path))?;
            let entry = slot.take()?;
            info!("charger: unregistered {}", path);
            Some(entry.controller)
        })
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock(|slots| slots.borrow().iter().filter(|s| s.is_some()).count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, const N: usize> Default for ChargerRegistry<'_, '_, M, N> {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_path(path: &str) -> bool {
    path.len() > 1 && path.len() <= MAX_PATH_LEN && path.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
    use static_cell::StaticCell;

    use crate::drivers::charger::ChargerStatus;
    use crate::drivers::command::{Command, Reply};
    use crate::drivers::mock::{MockCharger, MockProbe};

    #[test]
    fn register_and_lookup() {
        let probe = MockProbe::new();
        probe.set_status(ChargerStatus::Charging);
        let mut mock = MockCharger::new(&probe);
        let ctl = ChargerController::<NoopRawMutex>::new(&mut mock);

        let registry: ChargerRegistry<'_, '_, NoopRawMutex, 4> = ChargerRegistry::new();
        assert!(registry.is_empty());
        registry.register("/dev/bat0", &ctl).unwrap();
        assert_eq!(registry.len(), 1);

        let found = registry.lookup("/dev/bat0").unwrap();
        assert_eq!(
            found.dispatch_blocking(Command::GetState),
            Ok(Reply::State(ChargerStatus::Charging))
        );
        assert!(registry.lookup("/dev/bat1").is_none());
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let (p0, p1) = (MockProbe::new(), MockProbe::new());
        let (mut m0, mut m1) = (MockCharger::new(&p0), MockCharger::new(&p1));
        let c0 = ChargerController::<NoopRawMutex>::new(&mut m0);
        let c1 = ChargerController::<NoopRawMutex>::new(&mut m1);

        let registry: ChargerRegistry<'_, '_, NoopRawMutex, 4> = ChargerRegistry::new();
        registry.register("/dev/bat0", &c0).unwrap();
        assert_eq!(
            registry.register("/dev/bat0", &c1),
            Err(ChargerError::AlreadyRegistered)
        );

        // first registration stays in place
        let found = registry.lookup("/dev/bat0").unwrap();
        assert!(core::ptr::eq(found, &c0));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn bad_paths_and_full_table() {
        let probe = MockProbe::new();
        let mut mock = MockCharger::new(&probe);
        let ctl = ChargerController::<NoopRawMutex>::new(&mut mock);

        let registry: ChargerRegistry<'_, '_, NoopRawMutex, 2> = ChargerRegistry::new();
        for bad in ["", "/", "dev/bat0", "/dev/a-very-long-charger-device-name"] {
            assert_eq!(
                registry.register(bad, &ctl),
                Err(ChargerError::InvalidArgument)
            );
        }

        registry.register("/dev/bat0", &ctl).unwrap();
        registry.register("/dev/bat1", &ctl).unwrap();
        assert_eq!(
            registry.register("/dev/bat2", &ctl),
            Err(ChargerError::NoSpace)
        );
        assert_eq!(registry.capacity(), 2);
    }

    #[test]
    fn unregister_frees_the_slot() {
        let probe = MockProbe::new();
        let mut mock = MockCharger::new(&probe);
        let ctl = ChargerController::<NoopRawMutex>::new(&mut mock);

        let registry: ChargerRegistry<'_, '_, NoopRawMutex, 1> = ChargerRegistry::new();
        registry.register("/dev/bat0", &ctl).unwrap();
        assert!(registry.unregister("/dev/bat1").is_none());
        assert!(registry.unregister("/dev/bat0").is_some());
        assert!(registry.lookup("/dev/bat0").is_none());

        registry.register("/dev/bat1", &ctl).unwrap();
        assert!(registry.lookup("/dev/bat1").is_some());
    }

    #[test]
    fn static_wiring() {
        type SharedController = ChargerController<'static, CriticalSectionRawMutex>;

        static PROBE: MockProbe = MockProbe::new();
        static BACKEND: StaticCell<MockCharger<'static>> = StaticCell::new();
        static CONTROLLER: StaticCell<SharedController> = StaticCell::new();
        static REGISTRY: ChargerRegistry<'static, 'static, CriticalSectionRawMutex, 2> =
            ChargerRegistry::new();

        let backend = BACKEND.init(MockCharger::new(&PROBE));
        let ctl: &'static SharedController = CONTROLLER.init(ChargerController::new(backend));
        REGISTRY.register("/dev/bat0", ctl).unwrap();

        std::thread::spawn(|| {
            let ctl = REGISTRY.lookup("/dev/bat0").unwrap();
            ctl.dispatch_blocking(Command::SetVoltage(4350)).unwrap();
        })
        .join()
        .unwrap();

        assert_eq!(PROBE.voltage(), 4350);
    }
}
