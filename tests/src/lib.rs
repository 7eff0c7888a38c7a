//! Host harness for running beacon transmitters on Tokio
//!
//! Wake-ups are delivered by spawned tasks, so callbacks run concurrently
//! with whatever the test body does. Tests use paused time, which makes the
//! runtime jump straight to the next timer.

use std::sync::{Arc, Mutex};

use beacon_core::test_utils::output_capture::{OutputEvent, Timeline};
use beacon_core::{BeaconConfig, HalError, Instant, OutputBackend, Scheduler, Transmitter, Wake};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Transmitter driven by the Tokio alarm driver
pub type TokioTransmitter<B> = Transmitter<B, TokioScheduler>;

/// Scheduler forwarding wake-ups to [`spawn_alarm_driver`]
pub struct TokioScheduler {
    requests: mpsc::UnboundedSender<(beacon_core::Duration, Wake)>,
}

impl Scheduler for TokioScheduler {
    type Handle = ();

    fn schedule_once(&mut self, delay: beacon_core::Duration, wake: Wake) -> Result<(), HalError> {
        self.requests
            .send((delay, wake))
            .map_err(|_| HalError::TimingError)
    }
}

/// Create a scheduler and the receiving end for its alarm driver
pub fn tokio_scheduler() -> (TokioScheduler, mpsc::UnboundedReceiver<(beacon_core::Duration, Wake)>) {
    let (requests, rx) = mpsc::unbounded_channel();
    (TokioScheduler { requests }, rx)
}

/// Fire every requested wake-up from its own task after its delay
pub fn spawn_alarm_driver<B>(
    tx: Arc<TokioTransmitter<B>>,
    mut rx: mpsc::UnboundedReceiver<(beacon_core::Duration, Wake)>,
) -> JoinHandle<()>
where
    B: OutputBackend + Send + 'static,
{
    tokio::spawn(async move {
        while let Some((delay, wake)) = rx.recv().await {
            let tx = Arc::clone(&tx);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay.as_millis())).await;
                tx.fire(wake);
            });
        }
    })
}

/// Output backend timestamping level changes with the Tokio clock
#[derive(Clone)]
pub struct TimedOutput {
    origin: tokio::time::Instant,
    events: Arc<Mutex<Vec<(tokio::time::Instant, bool)>>>,
}

impl TimedOutput {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_on(&self) -> bool {
        self.events.lock().unwrap().last().map(|(_, on)| *on).unwrap_or(false)
    }

    /// Milliseconds since creation and level of every write
    pub fn events_ms(&self) -> Vec<(u64, bool)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(at, on)| (at.duration_since(self.origin).as_millis() as u64, *on))
            .collect()
    }

    pub fn timeline(&self) -> Timeline {
        let events: Vec<OutputEvent> = self
            .events_ms()
            .into_iter()
            .map(|(ms, on)| OutputEvent {
                time: Instant::from_millis(ms),
                on,
            })
            .collect();
        Timeline::from_events(&events)
    }
}

impl Default for TimedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBackend for TimedOutput {
    type Error = HalError;

    fn set_output(&mut self, on: bool) -> Result<(), Self::Error> {
        let now = tokio::time::Instant::now();
        self.events
            .lock()
            .map_err(|_| HalError::GpioError)?
            .push((now, on));
        Ok(())
    }
}

/// A running transmitter with its captured output
pub struct Harness {
    pub tx: Arc<TokioTransmitter<TimedOutput>>,
    pub output: TimedOutput,
    driver: JoinHandle<()>,
}

impl Harness {
    /// Build a transmitter and start its alarm driver. Needs a Tokio runtime.
    pub fn start(config: BeaconConfig) -> Self {
        let output = TimedOutput::new();
        let (scheduler, rx) = tokio_scheduler();
        let tx = Arc::new(Transmitter::new(output.clone(), scheduler, config));
        let driver = spawn_alarm_driver(Arc::clone(&tx), rx);
        Self { tx, output, driver }
    }

    /// Sleep until the transmitter releases its session
    pub async fn wait_idle(&self) {
        while self.tx.is_requested() {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod code_table_tests;
#[cfg(test)]
mod pin_tests;
#[cfg(test)]
mod stop_tests;
