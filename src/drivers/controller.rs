// Upper-half charger controller
//
// Owns exactly one backend behind an embassy mutex and turns commands
// into backend calls, one at a time, in arrival order. Reads are
// serialized with writes too: most chargers sit on a shared bus where
// transactions must not interleave.
//
// The mutex alone does not queue: whoever polls first after a release
// wins. A one-permit FairSemaphore in front of it hands out turns in
// FIFO order, so a caller that arrives while another is waiting lines
// up behind it. A waiter that is dropped (timeout, cancellation) gives
// its place up without stalling the queue.
//
// The mutex guard and the turn are dropped on every exit path, so a
// failing backend never wedges the controller. Errors come back exactly
// as the backend produced them; nothing is retried, cached or rewritten.
//
// Acquisition waits forever unless ChargerConfig::acquire_timeout_ms
// is set, in which case dispatch gives up with ChargerError::Timeout
// without touching the backend.

use embassy_futures::{block_on, yield_now};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::semaphore::{FairSemaphore, Semaphore, SemaphoreReleaser};
use embassy_time::{Duration, with_timeout};
use log::{debug, info, trace, warn};

use crate::config::ChargerConfig;
use crate::drivers::backend::ChargerBackend;
use crate::drivers::charger::{ChargerHealth, ChargerStatus, InputCurrentLimit, OperateParam};
use crate::drivers::command::{Command, Reply};
use crate::error::{ChargerError, Result};

/// Exclusive, type-erased handle to a bound backend.
pub type BackendHandle<'d> = &'d mut dyn ChargerBackend;

/// Callers that can queue for a turn at once. Later arrivals yield
/// until a place frees up, then join the back of the queue.
pub const MAX_WAITERS: usize = 16;

type Turns<M> = FairSemaphore<M, MAX_WAITERS>;

pub struct ChargerController<'d, M: RawMutex> {
    turns: Turns<M>,
    backend: Mutex<M, Option<BackendHandle<'d>>>,
    config: ChargerConfig,
}

// Exclusive access for one command. Field order is drop order: the
// backend is unlocked before the next queued caller is woken.
struct Session<'c, 'd, M: RawMutex> {
    backend: MutexGuard<'c, M, Option<BackendHandle<'d>>>,
    _turn: SemaphoreReleaser<'c, Turns<M>>,
}

impl<'d, M: RawMutex> ChargerController<'d, M> {
    /// Bind a backend. `None` (a chip initializer that failed) is rejected
    /// and no controller is created.
    pub fn register(backend: Option<BackendHandle<'d>>, config: ChargerConfig) -> Result<Self> {
        let Some(backend) = backend else {
            warn!("charger: register rejected, no backend");
            return Err(ChargerError::InvalidArgument);
        };
        info!(
            "charger: bound {} backend (timeout {} ms)",
            backend.name(),
            config.acquire_timeout_ms
        );
        Ok(Self::with_config(backend, config))
    }

    pub fn new(backend: BackendHandle<'d>) -> Self {
        Self::with_config(backend, ChargerConfig::defaults())
    }

    fn with_config(backend: BackendHandle<'d>, config: ChargerConfig) -> Self {
        Self {
            turns: FairSemaphore::new(1),
            backend: Mutex::new(Some(backend)),
            config,
        }
    }

    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    // waits for this caller's turn, then for the backend itself
    async fn session(&self) -> Session<'_, 'd, M> {
        let turn = loop {
            match self.turns.acquire(1).await {
                Ok(turn) => break turn,
                // queue full: not in line yet, try again next poll
                Err(_) => yield_now().await,
            }
        };
        Session {
            backend: self.backend.lock().await,
            _turn: turn,
        }
    }

    /// Run one command against the backend.
    pub async fn dispatch(&self, command: Command<'_>) -> Result<Reply> {
        if let Some(timeout) = self.config.acquire_timeout() {
            return self.dispatch_timeout(command, timeout).await;
        }
        let mut session = self.session().await;
        self.execute(&mut session.backend, command)
    }

    /// Like [`dispatch`](Self::dispatch) but gives up if the controller
    /// stays busy for longer than `timeout`. Needs an embassy-time driver.
    pub async fn dispatch_timeout(&self, command: Command<'_>, timeout: Duration) -> Result<Reply> {
        let Ok(mut session) = with_timeout(timeout, self.session()).await else {
            warn!(
                "charger: {} timed out after {} ms",
                command.id(),
                timeout.as_millis()
            );
            return Err(ChargerError::Timeout);
        };
        self.execute(&mut session.backend, command)
    }

    /// Blocking entry point for callers outside an executor.
    pub fn dispatch_blocking(&self, command: Command<'_>) -> Result<Reply> {
        block_on(self.dispatch(command))
    }

    /// Integer form: decode `id`/`arg`, dispatch, return the integer
    /// result (see [`Reply::as_raw`]).
    pub async fn dispatch_raw(&self, id: u8, arg: i32) -> Result<i32> {
        let command = Command::from_raw(id, arg)?;
        self.dispatch(command).await.map(Reply::as_raw)
    }

    // runs inside a session
    fn execute(&self, slot: &mut Option<BackendHandle<'d>>, command: Command<'_>) -> Result<Reply> {
        let id = command.id();
        let Some(backend) = slot.as_deref_mut() else {
            warn!("charger: {} on unbound controller", id);
            return Err(ChargerError::Unbound);
        };

        if self.config.log_commands {
            if id.is_read() {
                trace!("charger: {} {:?}", backend.name(), command);
            } else {
                debug!("charger: {} {:?}", backend.name(), command);
            }
        }

        let result = match command {
            Command::GetState => backend.state().map(Reply::State),
            Command::GetHealth => backend.health().map(Reply::Health),
            Command::GetOnline => backend.online().map(Reply::Online),
            Command::SetVoltage(mv) => backend.set_voltage(mv).map(|()| Reply::Done),
            Command::SetCurrent(ma) => backend.set_current(ma).map(|()| Reply::Done),
            Command::SetInputCurrentLimit(limit) => {
                if limit.is_external() && !backend.supports_external_limit() {
                    Err(ChargerError::InvalidArgument)
                } else {
                    backend.set_input_current_limit(limit).map(|()| Reply::Done)
                }
            }
            Command::Operate(param) => backend.operate(param).map(|()| Reply::Done),
        };

        if let Err(e) = &result {
            warn!("charger: {} {} failed: {}", backend.name(), id, e);
        }
        result
    }

    pub async fn state(&self) -> Result<ChargerStatus> {
        match self.dispatch(Command::GetState).await? {
            Reply::State(status) => Ok(status),
            _ => Err(ChargerError::InvalidArgument),
        }
    }

    pub async fn health(&self) -> Result<ChargerHealth> {
        match self.dispatch(Command::GetHealth).await? {
            Reply::Health(health) => Ok(health),
            _ => Err(ChargerError::InvalidArgument),
        }
    }

    pub async fn online(&self) -> Result<bool> {
        match self.dispatch(Command::GetOnline).await? {
            Reply::Online(online) => Ok(online),
            _ => Err(ChargerError::InvalidArgument),
        }
    }

    pub async fn set_voltage(&self, mv: i32) -> Result<()> {
        self.dispatch(Command::SetVoltage(mv)).await.map(|_| ())
    }

    pub async fn set_current(&self, ma: i32) -> Result<()> {
        self.dispatch(Command::SetCurrent(ma)).await.map(|_| ())
    }

    pub async fn set_input_current_limit(&self, limit: InputCurrentLimit) -> Result<()> {
        self.dispatch(Command::SetInputCurrentLimit(limit))
            .await
            .map(|_| ())
    }

    pub async fn operate(&self, param: OperateParam<'_>) -> Result<()> {
        self.dispatch(Command::Operate(param)).await.map(|_| ())
    }

    /// Unbind and hand back the backend, waiting for any in-flight
    /// command. Later dispatches fail with `Unbound`.
    pub async fn release(&self) -> Option<BackendHandle<'d>> {
        let backend = self.session().await.backend.take();
        if let Some(b) = &backend {
            info!("charger: released {} backend", b.name());
        }
        backend
    }

    pub async fn is_bound(&self) -> bool {
        self.session().await.backend.is_some()
    }
}
