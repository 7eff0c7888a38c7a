//! Code table and timing properties

use beacon_core::code::{encode, SymbolCode};
use beacon_core::test_utils::output_capture::RecordingOutput;
use beacon_core::test_utils::virtual_time::VirtualTime;
use beacon_core::timing::message_units;
use beacon_core::{unit_ms, BeaconConfig, Transmitter, TxOutcome};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case('A', ".-")]
#[case('a', ".-")]
#[case('S', "...")]
#[case('O', "---")]
#[case('0', "-----")]
#[case('9', "----.")]
#[case('?', "..--..")]
#[case('/', "-..-.")]
#[case('@', ".--.-.")]
#[case('\'', ".----.")]
fn test_table_entries(#[case] c: char, #[case] pattern: &str) {
    assert_eq!(encode(c).pattern().as_str(), pattern);
}

#[rstest]
#[case(5, 240)]
#[case(10, 120)]
#[case(20, 60)]
#[case(25, 48)]
fn test_unit_lengths(#[case] wpm: u32, #[case] unit: u32) {
    assert_eq!(unit_ms(wpm), unit);
}

/// Key `message` on a virtual clock and return the elapsed time after the pause
fn keyed_span(message: &str, wpm: u32) -> u64 {
    let time = VirtualTime::new();
    let output = RecordingOutput::new(&time);
    let tx: Transmitter<_, _, 64> = Transmitter::new(output, time.clone(), BeaconConfig::new(wpm, 0).unwrap());
    assert!(tx.start(message));
    time.run_until_idle(&tx, 10_000);
    assert_eq!(tx.last_outcome(), Some(TxOutcome::Completed));
    time.now().as_millis()
}

proptest! {
    #[test]
    fn prop_encode_is_total(c in any::<char>()) {
        let code = encode(c);
        prop_assert_eq!(code, encode(c));
        prop_assert!(code.is_word_space() || (1..=7).contains(&code.len()));
    }

    #[test]
    fn prop_case_insensitive(c in "[a-z]") {
        let c = c.chars().next().unwrap();
        prop_assert_eq!(encode(c), encode(c.to_ascii_uppercase()));
    }

    #[test]
    fn prop_unknown_is_fallback(c in "[#%^*<>{}|~`]") {
        let c = c.chars().next().unwrap();
        prop_assert_eq!(encode(c), SymbolCode::FALLBACK);
    }

    #[test]
    fn prop_doubling_wpm_halves_unit(wpm in 1u32..) {
        let doubled = wpm.saturating_mul(2);
        prop_assert_eq!(unit_ms(wpm), 1200 / wpm);
        prop_assert!(unit_ms(doubled) * 2 <= unit_ms(wpm));
        prop_assert!(unit_ms(wpm) - unit_ms(doubled) * 2 <= 1);
    }

    #[test]
    fn prop_estimate_matches_keying(message in "[a-z0-9 ~`#?=]{0,24}", wpm in 5u32..=40) {
        let span = keyed_span(&message, wpm);
        prop_assert_eq!(span, message_units(&message) as u64 * unit_ms(wpm) as u64);
    }
}
