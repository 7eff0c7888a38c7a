//! Transmission status flags and the public transmitter surface

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::Mutex;
use heapless::String;

use crate::fsm::MorseFsm;
use crate::hal::{Duration, HalError, OutputBackend, Scheduler};
use crate::session::MESSAGE_CAPACITY;
use crate::types::{unit_duration, BeaconConfig, TxOutcome, TxState, Wake, MAX_WPM};

/// Status flags shared between the caller and the callback context.
///
/// Read-modify-write sequences only happen inside the transmitter's
/// critical section, so plain loads and stores are enough here.
pub struct TxStatus {
    requested: AtomicBool,
    transmitting: AtomicBool,
    stop_requested: AtomicBool,
}

impl TxStatus {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            transmitting: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Mark a new session as requested and forget any old stop request
    pub fn accept(&self) {
        self.stop_requested.store(false, Ordering::Relaxed);
        self.transmitting.store(false, Ordering::Relaxed);
        self.requested.store(true, Ordering::Release);
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn set_transmitting(&self, transmitting: bool) {
        self.transmitting.store(transmitting, Ordering::Release);
    }

    /// Back to idle
    pub fn clear(&self) {
        self.transmitting.store(false, Ordering::Relaxed);
        self.stop_requested.store(false, Ordering::Relaxed);
        self.requested.store(false, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub fn is_transmitting(&self) -> bool {
        self.transmitting.load(Ordering::Acquire)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

impl Default for TxStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Morse transmitter bound to one output backend.
///
/// `start`, `stop` and the status getters may be called from any context.
/// The platform calls [`Transmitter::fire`] for every wake-up handed to its
/// [`Scheduler`]. At most one message is in flight at a time.
pub struct Transmitter<B, S, const N: usize = MESSAGE_CAPACITY> {
    fsm: Mutex<RefCell<MorseFsm<B, S, N>>>,
    status: TxStatus,
    wpm: AtomicU32,
    pre_tx_pause: Duration,
}

impl<B, S, const N: usize> Transmitter<B, S, N>
where
    B: OutputBackend,
    S: Scheduler,
{
    /// Create new transmitter with given configuration
    ///
    /// A speed outside `1..=MAX_WPM` (possible when the config is built
    /// field by field instead of through [`BeaconConfig::new`]) is clamped
    /// into range and logged.
    pub fn new(backend: B, scheduler: S, config: BeaconConfig) -> Self {
        let wpm = config.wpm.clamp(1, MAX_WPM);
        if wpm != config.wpm {
            warn!("Speed {} WPM out of range, clamped to {}", config.wpm, wpm);
        }
        Self {
            fsm: Mutex::new(RefCell::new(MorseFsm::new(backend, scheduler))),
            status: TxStatus::new(),
            wpm: AtomicU32::new(wpm),
            pre_tx_pause: config.pre_tx_pause,
        }
    }

    /// Start keying `message` after the settling pause.
    ///
    /// Returns `false` and changes nothing if a transmission is already
    /// requested or the message does not fit the session buffer.
    pub fn start(&self, message: &str) -> bool {
        critical_section::with(|cs| {
            if self.status.is_requested() {
                debug!("Start ignored: transmission already requested");
                return false;
            }
            let Ok(text) = String::<N>::try_from(message) else {
                warn!("Start ignored: message longer than {} bytes", N);
                return false;
            };
            self.status.accept();
            self.fsm
                .borrow_ref_mut(cs)
                .begin(text, self.pre_tx_pause, &self.status);
            true
        })
    }

    /// Request a stop. Teardown happens at the next step boundary.
    pub fn stop(&self) {
        if self.status.is_requested() {
            debug!("Stop requested");
        }
        self.status.request_stop();
    }

    /// Entry point for the platform timer: advance the state machine
    pub fn fire(&self, wake: Wake) {
        let unit = self.unit();
        critical_section::with(|cs| {
            self.fsm.borrow_ref_mut(cs).on_wake(wake, unit, &self.status);
        });
    }

    /// True once keying has begun, until the session is released
    pub fn is_transmitting(&self) -> bool {
        self.status.is_transmitting()
    }

    /// True from an accepted `start` until the session is released
    pub fn is_requested(&self) -> bool {
        self.status.is_requested()
    }

    /// Change speed for symbols that have not started yet
    pub fn set_speed(&self, wpm: u32) -> Result<(), HalError> {
        if wpm == 0 || wpm > MAX_WPM {
            return Err(HalError::InvalidConfig);
        }
        self.wpm.store(wpm, Ordering::Relaxed);
        Ok(())
    }

    pub fn wpm(&self) -> u32 {
        self.wpm.load(Ordering::Relaxed)
    }

    /// Current unit length
    pub fn unit(&self) -> Duration {
        unit_duration(self.wpm())
    }

    pub fn pre_tx_pause(&self) -> Duration {
        self.pre_tx_pause
    }

    pub fn current_state(&self) -> TxState {
        critical_section::with(|cs| self.fsm.borrow_ref(cs).current_state())
    }

    pub fn last_outcome(&self) -> Option<TxOutcome> {
        critical_section::with(|cs| self.fsm.borrow_ref(cs).last_outcome())
    }

    /// Run `f` with the output backend inside the critical section
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        critical_section::with(|cs| f(self.fsm.borrow_ref_mut(cs).backend_mut()))
    }
}
