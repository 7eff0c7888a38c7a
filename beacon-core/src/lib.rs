#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Beacon Core
//!
//! Non-blocking Morse beacon transmitter for embedded systems.
//! A message is walked character by character and every keyed or silent
//! interval is a one-shot wake-up handed to a platform [`Scheduler`].

#[macro_use]
mod macros;

pub mod types;
pub mod code;
pub mod session;
pub mod fsm;
pub mod controller;
pub mod hal;
pub mod timing;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use code::{encode, SymbolCode};
pub use fsm::MorseFsm;
pub use controller::*;
pub use hal::{*, Instant, Duration};

/// Beacon library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration: 10 WPM with a three second settling pause
pub fn default_config() -> BeaconConfig {
    BeaconConfig {
        wpm: DEFAULT_WPM,
        pre_tx_pause: Duration::from_millis(DEFAULT_PRE_TX_PAUSE_MS),
    }
}
