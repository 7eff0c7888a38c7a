//! Per-transmission state owned by the element scheduler

use heapless::String;

use crate::code::{is_control_marker, is_keyed_symbol, SymbolCode};
use crate::hal::Duration;
use crate::types::{Element, Step, Wake};

/// Default message capacity in bytes
pub const MESSAGE_CAPACITY: usize = 128;

/// Returns true if a keyed character appears anywhere in `rest`
pub fn keyed_symbol_in(rest: &str) -> bool {
    rest.chars().any(is_keyed_symbol)
}

/// First character of `rest` that is not a control marker
pub fn upcoming_symbol(rest: &str) -> Option<char> {
    rest.chars().find(|c| !is_control_marker(*c))
}

/// One message being walked.
///
/// The cursor is a byte offset into `message` and only ever moves forward
/// by whole characters, so it never exceeds `total_len()`.
#[derive(Debug)]
pub struct Session<const N: usize = MESSAGE_CAPACITY> {
    message: String<N>,
    cursor: usize,
    code: SymbolCode,
    element_index: u8,
    unit: Duration,
    digraph: bool,
    generation: u32,
    pending: Option<Step>,
}

impl<const N: usize> Session<N> {
    pub fn new(message: String<N>, generation: u32) -> Self {
        Self {
            message,
            cursor: 0,
            code: SymbolCode::WORD_SPACE,
            element_index: 0,
            unit: Duration::from_millis(0),
            digraph: false,
            generation,
            pending: None,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn total_len(&self) -> usize {
        self.message.len()
    }

    pub fn char_index(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.message.len()
    }

    /// Unconsumed part of the message, current character included
    pub fn remaining(&self) -> &str {
        &self.message[self.cursor..]
    }

    pub fn current_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Move past the current character
    pub fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.cursor += c.len_utf8();
        }
    }

    /// Text after the current character
    fn after_current(&self) -> &str {
        let rest = self.remaining();
        match rest.chars().next() {
            Some(c) => &rest[c.len_utf8()..],
            None => rest,
        }
    }

    /// Returns true if a keyed character follows the current one
    pub fn keyed_symbol_follows(&self) -> bool {
        keyed_symbol_in(self.after_current())
    }

    /// Next non-control character after the current one
    pub fn upcoming_symbol(&self) -> Option<char> {
        upcoming_symbol(self.after_current())
    }

    pub fn toggle_digraph(&mut self) {
        self.digraph = !self.digraph;
    }

    pub fn digraph(&self) -> bool {
        self.digraph
    }

    /// Start walking a new symbol at the given unit length
    pub fn begin_symbol(&mut self, code: SymbolCode, unit: Duration) {
        self.code = code;
        self.element_index = 0;
        self.unit = unit;
    }

    pub fn code(&self) -> SymbolCode {
        self.code
    }

    pub fn element_index(&self) -> u8 {
        self.element_index
    }

    /// Unit snapshot taken when the current symbol began
    pub fn unit(&self) -> Duration {
        self.unit
    }

    pub fn current_element(&self) -> Option<Element> {
        self.code.element(self.element_index)
    }

    pub fn next_element(&mut self) {
        self.element_index = self.element_index.saturating_add(1);
    }

    pub fn has_more_elements(&self) -> bool {
        self.element_index < self.code.len()
    }

    /// Record the one wake-up this session now waits for
    pub fn set_pending(&mut self, step: Step) {
        self.pending = Some(step);
    }

    pub fn pending(&self) -> Option<Step> {
        self.pending
    }

    /// Consume the pending wake if `wake` is the one this session waits for
    pub fn accept(&mut self, wake: Wake) -> bool {
        if wake.generation() != self.generation || self.pending != Some(wake.step()) {
            return false;
        }
        self.pending = None;
        true
    }
}
