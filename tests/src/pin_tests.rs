//! Keyed line against an embedded-hal-mock pin

use beacon_core::hal::mock::MockPwm;
use beacon_core::test_utils::virtual_time::VirtualTime;
use beacon_core::{BeaconConfig, KeyedLine, KeyedTone, ToneConfig, Transmitter};
use embedded_hal_mock::eh1::pin::{Mock as PinMock, State, Transaction as PinTransaction};

fn config() -> BeaconConfig {
    BeaconConfig::new(20, 100).unwrap()
}

#[test]
fn test_keyed_line_pin_sequence() {
    let expectations = [
        // Forced off when the session is accepted
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
        // Release
        PinTransaction::set(State::Low),
    ];
    let mut pin = PinMock::new(&expectations);

    let time = VirtualTime::new();
    let tx: Transmitter<_, _> = Transmitter::new(KeyedLine::new(pin.clone(), false), time.clone(), config());
    assert!(tx.start("e"));
    time.run_until_idle(&tx, 10);

    pin.done();
}

#[test]
fn test_inverted_line_pin_sequence() {
    let expectations = [
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
        PinTransaction::set(State::High),
    ];
    let mut pin = PinMock::new(&expectations);

    let time = VirtualTime::new();
    let tx: Transmitter<_, _> = Transmitter::new(KeyedLine::new(pin.clone(), true), time.clone(), config());
    tx.start("t");
    time.run_until_idle(&tx, 10);
    assert_eq!(time.now().as_millis(), 100 + 180);

    pin.done();
}

#[test]
fn test_stopped_line_ends_low() {
    let expectations = [
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
    ];
    let mut pin = PinMock::new(&expectations);

    let time = VirtualTime::new();
    let tx: Transmitter<_, _> = Transmitter::new(KeyedLine::new(pin.clone(), false), time.clone(), config());
    tx.start("sos");
    time.fire_next(&tx);
    tx.stop();
    time.run_until_idle(&tx, 10);

    pin.done();
}

#[test]
fn test_keyed_tone_carrier() {
    let time = VirtualTime::new();
    let tone = KeyedTone::new(MockPwm::new(2000), &ToneConfig::default()).unwrap();
    let tx: Transmitter<_, _> = Transmitter::new(tone, time.clone(), config());

    tx.start("e");
    time.fire_next(&tx);
    assert!(tx.with_backend(|tone| tone.is_carrier_enabled()));

    time.run_until_idle(&tx, 10);
    assert!(!tx.with_backend(|tone| tone.is_carrier_enabled()));
}
