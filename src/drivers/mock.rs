// Instrumented charger backend for host tests and bring-up.
//
// MockCharger forwards everything to a shared MockProbe so a test can
// script readings, inject faults and inspect what reached the "chip"
// while the controller owns the backend. Every call is checked for
// re-entry: an overlapping call bumps the overlap counter.
//
// Needs native atomic RMW; drivers/mod.rs refuses the `mock` feature
// on targets without it (riscv32imc).

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU16, AtomicU32, AtomicUsize};
use core::sync::atomic::Ordering::SeqCst;

use crate::drivers::backend::{BusConfig, ChargerBackend, ChargerInit};
use crate::drivers::charger::{
    ChargerHealth, ChargerStatus, InputCurrentLimit, OperateMsg, OperateParam,
};
use crate::error::{BackendFault, ChargerError, Result};

// operate_type value reported before any OPERATE reached the mock
pub const NO_OPERATE: u8 = 0xff;

pub struct MockProbe {
    status: AtomicU8,
    health: AtomicU8,
    online: AtomicBool,

    voltage: AtomicI32,
    current: AtomicI32,
    input_limit: AtomicI32,
    address: AtomicU8,

    calls: AtomicU32,
    writes: AtomicU32,
    overlaps: AtomicU32,
    active: AtomicBool,

    fail_next: AtomicU16, // device fault code for the next call, 0 = none
    hold_spins: AtomicU32,

    operate_addr: AtomicUsize,
    operate_type: AtomicU8,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(ChargerStatus::Unknown as u8),
            health: AtomicU8::new(ChargerHealth::Unknown as u8),
            online: AtomicBool::new(false),
            voltage: AtomicI32::new(0),
            current: AtomicI32::new(0),
            input_limit: AtomicI32::new(0),
            address: AtomicU8::new(0),
            calls: AtomicU32::new(0),
            writes: AtomicU32::new(0),
            overlaps: AtomicU32::new(0),
            active: AtomicBool::new(false),
            fail_next: AtomicU16::new(0),
            hold_spins: AtomicU32::new(0),
            operate_addr: AtomicUsize::new(0),
            operate_type: AtomicU8::new(NO_OPERATE),
        }
    }

    // scripted readings

    pub fn set_status(&self, status: ChargerStatus) {
        self.status.store(status.as_raw(), SeqCst);
    }

    pub fn set_health(&self, health: ChargerHealth) {
        self.health.store(health.as_raw(), SeqCst);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, SeqCst);
    }

    /// Make the next backend call fail with `BackendFault::Device(code)`.
    /// `code` must be non-zero.
    pub fn fail_next(&self, code: u16) {
        self.fail_next.store(code, SeqCst);
    }

    /// Busy-wait this many spins inside every call to widen the window
    /// in which an overlapping call would be caught.
    pub fn set_hold_spins(&self, spins: u32) {
        self.hold_spins.store(spins, SeqCst);
    }

    // observations

    pub fn voltage(&self) -> i32 {
        self.voltage.load(SeqCst)
    }

    pub fn current(&self) -> i32 {
        self.current.load(SeqCst)
    }

    pub fn input_limit(&self) -> i32 {
        self.input_limit.load(SeqCst)
    }

    pub fn address(&self) -> u8 {
        self.address.load(SeqCst)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(SeqCst)
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(SeqCst)
    }

    pub fn overlaps(&self) -> u32 {
        self.overlaps.load(SeqCst)
    }

    pub fn operate_addr(&self) -> usize {
        self.operate_addr.load(SeqCst)
    }

    pub fn operate_type(&self) -> u8 {
        self.operate_type.load(SeqCst)
    }
}

// clears the active flag on every exit path
struct Active<'p>(&'p MockProbe);

impl Drop for Active<'_> {
    fn drop(&mut self) {
        self.0.active.store(false, SeqCst);
    }
}

pub struct MockCharger<'p> {
    probe: &'p MockProbe,
    external_limit: bool,
}

impl<'p> MockCharger<'p> {
    pub const fn new(probe: &'p MockProbe) -> Self {
        Self {
            probe,
            external_limit: false,
        }
    }

    pub const fn with_external_limit(probe: &'p MockProbe) -> Self {
        Self {
            probe,
            external_limit: true,
        }
    }

    fn enter(&self) -> Result<Active<'p>> {
        let probe = self.probe;
        probe.calls.fetch_add(1, SeqCst);
        if probe.active.swap(true, SeqCst) {
            probe.overlaps.fetch_add(1, SeqCst);
        }
        let active = Active(probe);

        for _ in 0..probe.hold_spins.load(SeqCst) {
            core::hint::spin_loop();
        }

        match probe.fail_next.swap(0, SeqCst) {
            0 => Ok(active),
            code => Err(BackendFault::Device(code).into()),
        }
    }

    fn write(&self, reg: &AtomicI32, value: i32) {
        reg.store(value, SeqCst);
        self.probe.writes.fetch_add(1, SeqCst);
    }
}

impl ChargerBackend for MockCharger<'_> {
    fn state(&mut self) -> Result<ChargerStatus> {
        let _active = self.enter()?;
        ChargerStatus::try_from(self.probe.status.load(SeqCst))
    }

    fn health(&mut self) -> Result<ChargerHealth> {
        let _active = self.enter()?;
        ChargerHealth::try_from(self.probe.health.load(SeqCst))
    }

    fn online(&mut self) -> Result<bool> {
        let _active = self.enter()?;
        Ok(self.probe.online.load(SeqCst))
    }

    fn set_voltage(&mut self, mv: i32) -> Result<()> {
        let _active = self.enter()?;
        self.write(&self.probe.voltage, mv);
        Ok(())
    }

    fn set_current(&mut self, ma: i32) -> Result<()> {
        let _active = self.enter()?;
        self.write(&self.probe.current, ma);
        Ok(())
    }

    fn set_input_current_limit(&mut self, limit: InputCurrentLimit) -> Result<()> {
        let _active = self.enter()?;
        if limit.is_external() && !self.external_limit {
            return Err(ChargerError::InvalidArgument);
        }
        self.write(&self.probe.input_limit, limit.as_raw());
        Ok(())
    }

    fn operate(&mut self, mut param: OperateParam<'_>) -> Result<()> {
        let _active = self.enter()?;
        self.probe.operate_addr.store(param.addr(), SeqCst);
        let msg = param
            .downcast_mut::<OperateMsg>()
            .ok_or(ChargerError::InvalidArgument)?;
        self.probe.operate_type.store(msg.operate_type, SeqCst);
        Ok(())
    }

    fn supports_external_limit(&self) -> bool {
        self.external_limit
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

impl<'p> ChargerInit<&'p MockProbe> for MockCharger<'p> {
    fn initialize(bus: &'p MockProbe, config: BusConfig) -> Option<Self> {
        config.validate().ok()?;
        bus.address.store(config.address, SeqCst);
        bus.input_limit.store(config.input_current, SeqCst);
        Some(Self {
            probe: bus,
            external_limit: config.input_limit().is_external(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_fault_hits_only_the_next_call() {
        let probe = MockProbe::new();
        let mut mock = MockCharger::new(&probe);
        probe.set_online(true);
        probe.fail_next(0x11);

        assert_eq!(
            mock.online(),
            Err(ChargerError::Backend(BackendFault::Device(0x11)))
        );
        assert_eq!(mock.online(), Ok(true));
        assert_eq!(probe.calls(), 2);
        assert_eq!(probe.overlaps(), 0);
    }

    #[test]
    fn initialize_validates_bus_config() {
        let probe = MockProbe::new();
        assert!(MockCharger::initialize(&probe, BusConfig::new(0x00, 400_000, 500)).is_none());

        let mock = MockCharger::initialize(&probe, BusConfig::new(0x6b, 400_000, -1)).unwrap();
        assert!(mock.supports_external_limit());
        assert_eq!(probe.address(), 0x6b);
    }
}
