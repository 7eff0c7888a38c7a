//! Character to Morse symbol table
//!
//! Each symbol packs its elements into the low bits of a byte, first
//! element in bit 0 (`1` = dah), with a sentinel bit set right above the
//! last element. The sentinel position encodes the length.

use heapless::String;

use crate::types::Element;

/// Skip marker: consumed without keying anything
pub const SKIP_MARKER: char = '~';

/// Prosign marker: toggles digraph mode, fusing the letters in between
pub const PROSIGN_MARKER: char = '`';

/// Returns true for characters that steer the walk instead of being keyed
pub const fn is_control_marker(c: char) -> bool {
    c == SKIP_MARKER || c == PROSIGN_MARKER
}

/// Returns true for characters that produce keyed elements
pub const fn is_keyed_symbol(c: char) -> bool {
    !is_control_marker(c) && c != ' '
}

/// Packed element sequence of one character
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SymbolCode(u8);

impl SymbolCode {
    /// Zero elements: a full word space
    pub const WORD_SPACE: Self = Self(0b1);

    /// Code used for characters without a table entry
    pub const FALLBACK: Self = Self(0b1100_0000);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Number of elements below the sentinel bit
    pub const fn len(&self) -> u8 {
        if self.0 == 0 {
            return 0;
        }
        7 - self.0.leading_zeros() as u8
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_word_space(&self) -> bool {
        self.0 == Self::WORD_SPACE.0
    }

    /// Element at `index`, or `None` past the sentinel
    pub const fn element(&self, index: u8) -> Option<Element> {
        if index >= self.len() {
            None
        } else if (self.0 >> index) & 0x01 == 1 {
            Some(Element::Dah)
        } else {
            Some(Element::Dit)
        }
    }

    /// Iterate over the keyed elements in transmission order
    pub fn elements(&self) -> impl Iterator<Item = Element> {
        let code = *self;
        (0..code.len()).filter_map(move |i| code.element(i))
    }

    /// Render as dots and dashes
    pub fn pattern(&self) -> String<8> {
        let mut out = String::new();
        for element in self.elements() {
            let mark = if element == Element::Dah { '-' } else { '.' };
            // At most seven elements fit below the sentinel.
            out.push(mark).ok();
        }
        out
    }

    /// Keyed time of the symbol in units, inner gaps included
    pub fn duration_units(&self) -> u32 {
        if self.is_word_space() {
            return Element::WordSpace.duration_units();
        }
        let keyed: u32 = self.elements().map(|e| e.duration_units()).sum();
        let gaps = (self.len() as u32).saturating_sub(1) * Element::ElementSpace.duration_units();
        keyed + gaps
    }
}

/// Encode a character. Case-insensitive and total.
pub const fn encode(c: char) -> SymbolCode {
    let bits = match c.to_ascii_uppercase() {
        ' ' => 0b1,
        '!' => 0b111_0101,
        '"' => 0b101_0010,
        '$' => 0b1100_1000,
        '&' => 0b10_0010,
        '\'' => 0b101_1110,
        '(' => 0b10_1101,
        ')' => 0b110_1101,
        '+' => 0b10_1010, // AR
        ',' => 0b111_0011,
        '-' => 0b110_0001,
        '.' => 0b110_1010,
        '/' => 0b10_1001,

        '0' => 0b11_1111,
        '1' => 0b11_1110,
        '2' => 0b11_1100,
        '3' => 0b11_1000,
        '4' => 0b11_0000,
        '5' => 0b10_0000,
        '6' => 0b10_0001,
        '7' => 0b10_0011,
        '8' => 0b10_0111,
        '9' => 0b10_1111,

        ':' => 0b100_0111,
        ';' => 0b101_0101,
        '=' => 0b11_0001, // BT
        '?' => 0b100_1100,
        '@' => 0b101_0110,

        'A' => 0b110,
        'B' => 0b1_0001,
        'C' => 0b1_0101,
        'D' => 0b1001,
        'E' => 0b10,
        'F' => 0b1_0100,
        'G' => 0b1011,
        'H' => 0b1_0000,
        'I' => 0b100,
        'J' => 0b1_1110,
        'K' => 0b1101,
        'L' => 0b1_0010,
        'M' => 0b111,
        'N' => 0b101,
        'O' => 0b1111,
        'P' => 0b1_0110,
        'Q' => 0b1_1011,
        'R' => 0b1010,
        'S' => 0b1000,
        'T' => 0b11,
        'U' => 0b1100,
        'V' => 0b1_1000,
        'W' => 0b1110,
        'X' => 0b1_1001,
        'Y' => 0b1_1101,
        'Z' => 0b1_0011,

        '_' => 0b110_1100,

        _ => return SymbolCode::FALLBACK,
    };
    SymbolCode(bits)
}
