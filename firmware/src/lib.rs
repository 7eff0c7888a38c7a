#![no_std]

//! Firmware library: Embassy glue that turns scheduled wake-ups into timer
//! alarms, and the beacon tasks built on it

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;
pub use static_cell::StaticCell;

pub use beacon_core::*;

pub use crate::ch32v203_hardware::*;
pub use crate::tasks::*;

pub mod tasks {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::signal::Signal;
    use embassy_time::{Instant, Timer};

    /// Deadline and token of the one wake-up a transmitter waits for
    pub type AlarmSignal = Signal<CriticalSectionRawMutex, (Instant, Wake)>;

    /// Scheduler handing wake-ups to an alarm task through a signal.
    ///
    /// A transmitter never has more than one wake-up outstanding, so a
    /// single-slot signal is enough.
    pub struct SignalScheduler {
        signal: &'static AlarmSignal,
    }

    impl SignalScheduler {
        pub const fn new(signal: &'static AlarmSignal) -> Self {
            Self { signal }
        }
    }

    impl Scheduler for SignalScheduler {
        type Handle = Instant;

        fn schedule_once(&mut self, delay: Duration, wake: Wake) -> Result<Instant, HalError> {
            let deadline = Instant::now()
                .checked_add(delay)
                .ok_or(HalError::TimingError)?;
            self.signal.signal((deadline, wake));
            Ok(deadline)
        }
    }

    /// Wait for each scheduled wake-up and fire it into `tx`
    pub async fn run_alarms<B, const N: usize>(
        tx: &Transmitter<B, SignalScheduler, N>,
        signal: &AlarmSignal,
    ) -> !
    where
        B: OutputBackend,
    {
        loop {
            let (deadline, wake) = signal.wait().await;
            Timer::at(deadline).await;
            tx.fire(wake);
        }
    }

    /// Re-send `messages` in rotation, each after the previous one is released
    pub async fn beacon_loop<B, const N: usize>(
        tx: &Transmitter<B, SignalScheduler, N>,
        messages: &[&str],
    ) -> !
    where
        B: OutputBackend,
    {
        let poll = Duration::from_millis(100);
        loop {
            for message in messages.iter().copied() {
                if !tx.start(message) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Beacon message rejected: {=str}", message);
                    Timer::after(poll).await;
                    continue;
                }
                // Sleep through the expected airtime, then poll for release
                let airtime = tx.pre_tx_pause() + timing::message_duration(message, tx.unit());
                Timer::after(airtime).await;
                while tx.is_requested() {
                    Timer::after(poll).await;
                }
            }
            if messages.is_empty() {
                Timer::after(poll).await;
            }
        }
    }

    pub type LedBeacon = Transmitter<KeyedLine<LedPin>, SignalScheduler>;
    pub type BuzzerBeacon = Transmitter<KeyedTone<BuzzerPwm>, SignalScheduler>;

    #[embassy_executor::task]
    pub async fn led_alarm_task(tx: &'static LedBeacon, signal: &'static AlarmSignal) {
        run_alarms(tx, signal).await
    }

    #[embassy_executor::task]
    pub async fn led_beacon_task(tx: &'static LedBeacon, messages: &'static [&'static str]) {
        #[cfg(feature = "defmt")]
        defmt::info!("LED beacon started at {} WPM", tx.wpm());
        beacon_loop(tx, messages).await
    }

    #[embassy_executor::task]
    pub async fn buzzer_alarm_task(tx: &'static BuzzerBeacon, signal: &'static AlarmSignal) {
        run_alarms(tx, signal).await
    }

    #[embassy_executor::task]
    pub async fn buzzer_beacon_task(tx: &'static BuzzerBeacon, messages: &'static [&'static str]) {
        #[cfg(feature = "defmt")]
        defmt::info!("Buzzer beacon started at {} WPM", tx.wpm());
        beacon_loop(tx, messages).await
    }
}

// CH32V203 hardware module
pub mod ch32v203_hardware;

// Time driver for embassy
mod time_driver;
