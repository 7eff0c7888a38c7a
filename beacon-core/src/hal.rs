//! Hardware Abstraction Layer for the beacon transmitter

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Mock instant type for compilation without embassy-time
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Instant(u64);

    impl Instant {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub fn duration_since(&self, other: Instant) -> Duration {
            Duration::from_millis(self.0.saturating_sub(other.0))
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.as_millis())
        }
    }

    /// Mock duration type
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn from_secs(secs: u64) -> Self {
            Self(secs * 1000)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add for Duration {
        type Output = Duration;

        fn add(self, rhs: Duration) -> Duration {
            Duration(self.0 + rhs.0)
        }
    }

    impl core::ops::Div<u32> for Duration {
        type Output = Duration;

        fn div(self, rhs: u32) -> Duration {
            Duration(self.0 / rhs as u64)
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }
}

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::types::{ToneConfig, Wake};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// PWM carrier operation failed
    PwmError,
    /// Timing operation failed (scheduler refused a wake-up)
    TimingError,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(any(test, feature = "std"))]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::PwmError => write!(f, "PWM carrier operation failed"),
            HalError::TimingError => write!(f, "Timing operation failed"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for HalError {}

/// Output device driven by the element scheduler
pub trait OutputBackend {
    type Error: From<HalError>;

    /// Key (`true`) or unkey (`false`) the output
    fn set_output(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// One-shot timer service.
///
/// The platform must hand `wake` back to
/// [`Transmitter::fire`](crate::controller::Transmitter::fire) exactly once,
/// no earlier than `delay` from now, on any execution context.
pub trait Scheduler {
    /// Opaque handle to the scheduled wake-up
    type Handle;

    fn schedule_once(&mut self, delay: Duration, wake: Wake) -> Result<Self::Handle, HalError>;
}

/// Keyed line: drives a digital output pin directly
pub struct KeyedLine<P> {
    pin: P,
    inverted: bool,
}

impl<P> KeyedLine<P>
where
    P: OutputPin,
{
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Release the pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputBackend for KeyedLine<P>
where
    P: OutputPin,
{
    type Error = HalError;

    fn set_output(&mut self, on: bool) -> Result<(), Self::Error> {
        let level = if self.inverted { !on } else { on };
        if level {
            self.pin.set_high().map_err(|_| HalError::GpioError)
        } else {
            self.pin.set_low().map_err(|_| HalError::GpioError)
        }
    }
}

/// Keyed tone: gates a carrier whose frequency is configured once.
///
/// Keying only switches the duty cycle between the configured value and
/// fully off; the timer period is never touched in the hot path.
pub struct KeyedTone<P> {
    pwm: P,
    duty_percent: u8,
    enabled: bool,
}

impl<P> KeyedTone<P>
where
    P: SetDutyCycle,
{
    /// Wrap a carrier generator already running at `tone.frequency_hz`.
    /// The carrier starts disabled.
    pub fn new(mut pwm: P, tone: &ToneConfig) -> Result<Self, HalError> {
        if tone.duty_percent == 0 || tone.duty_percent > 100 {
            return Err(HalError::InvalidConfig);
        }
        pwm.set_duty_cycle_fully_off().map_err(|_| HalError::PwmError)?;
        Ok(Self {
            pwm,
            duty_percent: tone.duty_percent,
            enabled: false,
        })
    }

    pub fn set_carrier_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        let result = if enabled {
            self.pwm.set_duty_cycle_percent(self.duty_percent)
        } else {
            self.pwm.set_duty_cycle_fully_off()
        };
        result.map_err(|_| HalError::PwmError)?;
        self.enabled = enabled;
        Ok(())
    }

    pub fn is_carrier_enabled(&self) -> bool {
        self.enabled
    }

    /// Release the carrier generator
    pub fn into_inner(self) -> P {
        self.pwm
    }
}

impl<P> OutputBackend for KeyedTone<P>
where
    P: SetDutyCycle,
{
    type Error = HalError;

    fn set_output(&mut self, on: bool) -> Result<(), Self::Error> {
        self.set_carrier_enabled(on)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use core::cell::RefCell;
    use core::convert::Infallible;

    /// Output backend remembering its level and keying count
    #[derive(Default)]
    pub struct MockOutput {
        state: RefCell<bool>,
        key_downs: RefCell<u32>,
    }

    impl MockOutput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_active(&self) -> bool {
            *self.state.borrow()
        }

        pub fn key_downs(&self) -> u32 {
            *self.key_downs.borrow()
        }
    }

    impl OutputBackend for MockOutput {
        type Error = HalError;

        fn set_output(&mut self, on: bool) -> Result<(), Self::Error> {
            if on && !*self.state.borrow() {
                *self.key_downs.borrow_mut() += 1;
            }
            *self.state.borrow_mut() = on;
            Ok(())
        }
    }

    /// Output pin recording its level
    #[derive(Default)]
    pub struct MockPin {
        high: bool,
        writes: u32,
    }

    impl MockPin {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_high(&self) -> bool {
            self.high
        }

        pub fn writes(&self) -> u32 {
            self.writes
        }
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    /// PWM channel recording its duty cycle
    pub struct MockPwm {
        max_duty: u16,
        duty: u16,
    }

    impl MockPwm {
        pub fn new(max_duty: u16) -> Self {
            Self { max_duty, duty: max_duty }
        }

        pub fn duty(&self) -> u16 {
            self.duty
        }
    }

    impl embedded_hal::pwm::ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max_duty
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    /// Scheduler that refuses every wake-up
    #[derive(Default)]
    pub struct FailingScheduler;

    impl Scheduler for FailingScheduler {
        type Handle = ();

        fn schedule_once(&mut self, _delay: Duration, _wake: Wake) -> Result<(), HalError> {
            Err(HalError::TimingError)
        }
    }
}
