//! Fixed-length positional numerals over a page alphabet
//!
//! A page id is written most-significant symbol first and left-padded with the alphabet's zero
//! symbol, so every id below `radix^length` has exactly one spelling.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{LibraryError, LibraryResult};

/// Largest radix representable with one byte per digit
const MAX_RADIX: usize = 256;

/// Ordered symbol set; a symbol's position is its digit value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
    indices: HashMap<char, u16>,
}

impl Alphabet {
    pub fn new(symbols: &str) -> LibraryResult<Self> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.len() < 2 || symbols.len() > MAX_RADIX {
            return Err(LibraryError::InvalidGeometry {
                reason: format!(
                    "alphabet must have between 2 and {} symbols, found {}",
                    MAX_RADIX,
                    symbols.len()
                ),
            });
        }

        let mut indices = HashMap::with_capacity(symbols.len());
        for (index, symbol) in symbols.iter().enumerate() {
            // MAX_RADIX keeps every index within u16
            if indices.insert(*symbol, index as u16).is_some() {
                return Err(LibraryError::InvalidGeometry {
                    reason: format!("alphabet repeats the symbol {:?}", symbol),
                });
            }
        }

        Ok(Self { symbols, indices })
    }

    pub fn radix(&self) -> u32 {
        self.symbols.len() as u32
    }

    /// Symbol used for padding and for the digit zero
    pub fn zero(&self) -> char {
        self.symbols[0]
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.indices.contains_key(&symbol)
    }

    /// Digit value of a symbol
    pub fn index_of(&self, symbol: char) -> LibraryResult<u16> {
        self.indices
            .get(&symbol)
            .copied()
            .ok_or(LibraryError::InvalidSymbol { character: symbol })
    }

    /// Symbol for a digit value, if the digit is below the radix
    pub fn symbol(&self, index: u16) -> Option<char> {
        self.symbols.get(usize::from(index)).copied()
    }

    /// Digit values of every symbol in `text`
    pub fn digits(&self, text: &str) -> LibraryResult<Vec<u16>> {
        text.chars().map(|c| self.index_of(c)).collect()
    }

    /// Spell digit values back out as text
    pub fn spell(&self, digits: &[u16]) -> LibraryResult<String> {
        digits
            .iter()
            .map(|digit| {
                self.symbol(*digit)
                    .ok_or_else(|| LibraryError::out_of_range("digit", self.radix()))
            })
            .collect()
    }
}

/// Converts integers to and from fixed-length numerals
#[derive(Debug, Clone)]
pub struct NumeralCodec {
    alphabet: Alphabet,
    length: usize,
    capacity: BigUint,
}

impl NumeralCodec {
    pub fn new(alphabet: Alphabet, length: usize) -> Self {
        let capacity = BigUint::from(alphabet.radix()).pow(length as u32);
        Self {
            alphabet,
            length,
            capacity,
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of distinct numerals, `radix^length`
    pub fn capacity(&self) -> &BigUint {
        &self.capacity
    }

    /// Write `value` as exactly `length` symbols.
    ///
    /// Values at or above [`capacity`](Self::capacity) cannot be represented; callers that
    /// only pass ids produced by the address codec never hit that error.
    pub fn encode(&self, value: &BigUint) -> LibraryResult<String> {
        if value >= &self.capacity {
            return Err(LibraryError::out_of_range("page id", &self.capacity));
        }

        let digits = if value.is_zero() {
            Vec::new()
        } else {
            value.to_radix_be(self.alphabet.radix())
        };

        let mut text = String::with_capacity(self.length);
        for _ in digits.len()..self.length {
            text.push(self.alphabet.zero());
        }
        for digit in digits {
            // to_radix_be only yields digits below the radix
            let symbol = self
                .alphabet
                .symbol(u16::from(digit))
                .ok_or_else(|| LibraryError::out_of_range("digit", self.alphabet.radix()))?;
            text.push(symbol);
        }

        Ok(text)
    }

    /// Read a numeral written by [`encode`](Self::encode)
    pub fn decode(&self, text: &str) -> LibraryResult<BigUint> {
        let length = text.chars().count();
        if length != self.length {
            return Err(LibraryError::LengthMismatch {
                length,
                expected: self.length,
            });
        }

        let digits = self
            .alphabet
            .digits(text)?
            .into_iter()
            .map(|digit| digit as u8)
            .collect::<Vec<u8>>();

        BigUint::from_radix_be(&digits, self.alphabet.radix())
            .ok_or_else(|| LibraryError::out_of_range("digit", self.alphabet.radix()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::text::{ALPHABET, PAGE_TEXT_LENGTH};

    fn codec() -> NumeralCodec {
        NumeralCodec::new(Alphabet::new(ALPHABET).unwrap(), PAGE_TEXT_LENGTH)
    }

    #[test]
    fn test_zero_is_all_padding() {
        let text = codec().encode(&BigUint::zero()).unwrap();
        assert_eq!(text, " ".repeat(PAGE_TEXT_LENGTH));
    }

    #[test]
    fn test_small_values_are_right_aligned() {
        let codec = codec();
        assert_eq!(codec.encode(&BigUint::from(1u32)).unwrap(), format!("{}A", " ".repeat(14)));
        assert_eq!(codec.encode(&BigUint::from(28u32)).unwrap(), format!("{}AA", " ".repeat(13)));
    }

    #[test]
    fn test_capacity_exceeds_u64() {
        let codec = codec();
        assert!(codec.capacity() > &BigUint::from(u64::MAX));
        assert!(codec.encode(codec.capacity()).is_err());

        let largest = codec.capacity() - 1u32;
        assert_eq!(codec.encode(&largest).unwrap(), "Z".repeat(PAGE_TEXT_LENGTH));
    }

    #[test]
    fn test_decode_rejects_foreign_symbols() {
        let err = codec().decode("HELLO, WORLD!!!").unwrap_err();
        assert!(matches!(err, LibraryError::InvalidSymbol { character: ',' }));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let err = codec().decode("SHORT").unwrap_err();
        assert!(matches!(err, LibraryError::LengthMismatch { length: 5, expected: 15 }));
    }

    #[test]
    fn test_alphabet_rejects_duplicates() {
        assert!(Alphabet::new("ABCA").is_err());
        assert!(Alphabet::new("A").is_err());
    }
}
