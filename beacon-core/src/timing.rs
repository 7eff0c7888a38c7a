//! Message timing estimates
//!
//! Walks a message with the same gap rules the element scheduler uses, so
//! callers can size timers or rotate beacon messages without keying them.

use crate::code::{encode, PROSIGN_MARKER, SKIP_MARKER};
use crate::hal::Duration;
use crate::session::{keyed_symbol_in, upcoming_symbol};
use crate::types::Element;

/// Units from the end of the settling pause to the final key-up.
///
/// Every space that precedes a keyed symbol counts a full word gap.
/// Messages with nothing to key take zero units.
pub fn message_units(message: &str) -> u32 {
    let mut units = 0;
    let mut digraph = false;
    let mut rest = message;

    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        match c {
            SKIP_MARKER => {}
            PROSIGN_MARKER => digraph = !digraph,
            _ => {
                if !keyed_symbol_in(after) {
                    // Last keyed symbol, or trailing spaces
                    if c != ' ' {
                        units += encode(c).duration_units();
                    }
                    break;
                }
                let code = encode(c);
                units += code.duration_units();
                if !code.is_word_space() && upcoming_symbol(after) != Some(' ') {
                    let gap = if digraph {
                        Element::ElementSpace
                    } else {
                        Element::CharSpace
                    };
                    units += gap.duration_units();
                }
            }
        }
        rest = after;
    }
    units
}

/// Keying time of `message` at the given unit length
pub fn message_duration(message: &str, unit: Duration) -> Duration {
    Duration::from_millis(unit.as_millis() * message_units(message) as u64)
}
