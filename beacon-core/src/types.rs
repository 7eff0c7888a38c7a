//! Core data types for the beacon transmitter

use crate::hal::Duration;

/// Default transmission speed
pub const DEFAULT_WPM: u32 = 10;

/// Default settling pause before the first element is keyed
pub const DEFAULT_PRE_TX_PAUSE_MS: u64 = 3_000;

/// Highest accepted speed
pub const MAX_WPM: u32 = 100;

/// Longest accepted pre-transmission pause
pub const MAX_PRE_TX_PAUSE_MS: u64 = 60_000;

/// Length of one unit in milliseconds (PARIS standard: 50 units per word).
///
/// Total for every input: zero is treated as 1 WPM and speeds too high to
/// represent bottom out at a zero-length unit.
pub const fn unit_ms(wpm: u32) -> u32 {
    if wpm == 0 {
        return 60_000 / 50;
    }
    60_000 / 50u32.saturating_mul(wpm)
}

/// Length of one unit as a [`Duration`]
pub fn unit_duration(wpm: u32) -> Duration {
    Duration::from_millis(unit_ms(wpm) as u64)
}

/// Morse elements: keyed intervals and the three silence classes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Element {
    /// Dit (short element)
    Dit,
    /// Dah (long element)
    Dah,
    /// Gap between elements of one character
    ElementSpace,
    /// Gap between characters
    CharSpace,
    /// Gap between words
    WordSpace,
}

impl Element {
    /// Returns the duration of this element in units
    pub const fn duration_units(&self) -> u32 {
        match self {
            Element::Dit => 1,
            Element::Dah => 3,
            Element::ElementSpace => 1,
            Element::CharSpace => 3,
            Element::WordSpace => 7,
        }
    }

    /// Duration of this element for the given unit
    pub fn duration(&self, unit: Duration) -> Duration {
        unit * self.duration_units()
    }
}

/// Observable states of the element scheduler
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// No session
    Idle,
    /// Session accepted, settling pause running
    PreTxPause,
    /// Consuming control markers and picking the next symbol
    WalkCharacter,
    /// Key down for a dit or dah
    EmitElement,
    /// Silent gap after an element of the same character (or a fused prosign)
    ElementGap,
    /// Silent gap after a finished character
    CharacterGap,
    /// Silent word-space symbol
    WordGap,
}

/// How the last session ended
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxOutcome {
    /// The whole message was keyed
    Completed,
    /// A stop request was observed at a step boundary
    Stopped,
    /// The scheduler refused a wake-up
    Faulted,
}

/// The step a scheduled wake-up completes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Pre-transmission pause elapsed
    PreTxPause,
    /// Keyed element (or word-space silence) elapsed
    ElementEnd,
    /// Inter-element or inter-character gap elapsed
    GapEnd,
}

/// Token handed to a [`Scheduler`](crate::hal::Scheduler) and passed back
/// to [`Transmitter::fire`](crate::controller::Transmitter::fire) when due.
///
/// The generation ties the token to one session; tokens outliving their
/// session are ignored.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Wake {
    generation: u32,
    step: Step,
}

impl Wake {
    pub const fn new(generation: u32, step: Step) -> Self {
        Self { generation, step }
    }

    pub const fn generation(&self) -> u32 {
        self.generation
    }

    pub const fn step(&self) -> Step {
        self.step
    }
}

/// Beacon configuration parameters
#[derive(Copy, Clone, Debug)]
pub struct BeaconConfig {
    /// Words per minute
    pub wpm: u32,
    /// Settling pause before keying starts
    pub pre_tx_pause: Duration,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            wpm: DEFAULT_WPM,
            pre_tx_pause: Duration::from_millis(DEFAULT_PRE_TX_PAUSE_MS),
        }
    }
}

impl BeaconConfig {
    /// Create a new configuration with validation
    pub fn new(wpm: u32, pre_tx_pause_ms: u64) -> Result<Self, &'static str> {
        if wpm == 0 || wpm > MAX_WPM {
            return Err("WPM must be between 1 and 100");
        }
        if pre_tx_pause_ms > MAX_PRE_TX_PAUSE_MS {
            return Err("Pre-transmission pause must be <= 60s");
        }

        Ok(Self {
            wpm,
            pre_tx_pause: Duration::from_millis(pre_tx_pause_ms),
        })
    }

    /// Basic timing unit (dit duration)
    pub fn unit(&self) -> Duration {
        unit_duration(self.wpm)
    }
}

/// Prescaler and reload values for a 16-bit PWM timer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerParams {
    /// Value written to the prescaler register (divides by `prescaler + 1`)
    pub prescaler: u16,
    /// Value written to the auto-reload register (period is `reload + 1` ticks)
    pub reload: u16,
}

/// Carrier settings for the keyed tone backend
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ToneConfig {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Duty cycle while the carrier is enabled
    pub duty_percent: u8,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 600,
            duty_percent: 50,
        }
    }
}

impl ToneConfig {
    /// Create a new carrier configuration with validation
    pub fn new(frequency_hz: u32, duty_percent: u8) -> Result<Self, &'static str> {
        if frequency_hz < 100 || frequency_hz > 20_000 {
            return Err("Carrier frequency must be between 100Hz and 20kHz");
        }
        if duty_percent == 0 || duty_percent > 100 {
            return Err("Duty cycle must be between 1 and 100 percent");
        }
        Ok(Self { frequency_hz, duty_percent })
    }

    /// Pick timer registers for this frequency.
    ///
    /// Uses the smallest prescaler that lets the period fit the 16-bit
    /// reload register, which keeps duty resolution as fine as possible.
    /// Returns `None` when the frequency cannot be reached from `timer_clock_hz`.
    pub fn timer_params(&self, timer_clock_hz: u32) -> Option<TimerParams> {
        if self.frequency_hz == 0 || timer_clock_hz < self.frequency_hz {
            return None;
        }
        let total_ticks = timer_clock_hz / self.frequency_hz;
        let divider = total_ticks.div_ceil(1 << 16).max(1);
        if divider > 1 << 16 {
            return None;
        }
        let period = total_ticks / divider;
        if period < 2 {
            return None;
        }
        Some(TimerParams {
            prescaler: (divider - 1) as u16,
            reload: (period - 1) as u16,
        })
    }
}
