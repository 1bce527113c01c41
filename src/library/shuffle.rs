//! Keyed, length-preserving shuffle of page text
//!
//! Consecutive page ids would otherwise produce visibly consecutive pages ("...AAB", "...AAC").
//! The shuffle runs every page through FF1 format-preserving encryption (NIST SP 800-38G) over
//! the page alphabet, which is a bijection on fixed-length strings.
//!
//! The key below is compiled into the binary and is not a secret. It decorrelates neighbouring
//! pages and nothing more: anyone holding the binary can run the shuffle in either direction.
//! Do not treat it as access control.

use aes::Aes128;
use fpe::ff1::{FlexibleNumeralString, FF1};

use super::numeral::Alphabet;
use crate::error::{LibraryError, LibraryResult};

/// AES-128 key for the shuffle
pub const SHUFFLE_KEY: [u8; 16] = [
    0xEF, 0x43, 0x59, 0xD8, 0xD5, 0x80, 0xAA, 0x4F, 0x7F, 0x03, 0x6D, 0x6F, 0x04, 0xFC, 0x6A, 0x94,
];

/// FF1 tweak for the shuffle
pub const SHUFFLE_TWEAK: [u8; 8] = [0xD8, 0xE7, 0x92, 0x0A, 0xFA, 0x33, 0x0A, 0x73];

/// FF1 needs at least a million possible inputs
const MIN_DOMAIN_SIZE: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Bijection over `length`-symbol strings of an alphabet
pub struct ShuffleCipher {
    ff1: FF1<Aes128>,
    alphabet: Alphabet,
    length: usize,
    tweak: Vec<u8>,
}

impl std::fmt::Debug for ShuffleCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShuffleCipher")
            .field("radix", &self.alphabet.radix())
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl ShuffleCipher {
    /// Shuffle keyed with the built-in key and tweak
    pub fn new(alphabet: Alphabet, length: usize) -> LibraryResult<Self> {
        Self::with_key(alphabet, length, &SHUFFLE_KEY, &SHUFFLE_TWEAK)
    }

    pub fn with_key(
        alphabet: Alphabet,
        length: usize,
        key: &[u8; 16],
        tweak: &[u8],
    ) -> LibraryResult<Self> {
        if domain_size(alphabet.radix(), length) < MIN_DOMAIN_SIZE {
            return Err(LibraryError::InvalidGeometry {
                reason: format!(
                    "{} symbols of radix {} are too few to shuffle",
                    length,
                    alphabet.radix()
                ),
            });
        }

        let ff1 = FF1::<Aes128>::new(key, alphabet.radix()).map_err(|e| LibraryError::Cipher {
            message: format!("{:?}", e),
        })?;

        Ok(Self {
            ff1,
            alphabet,
            length,
            tweak: tweak.to_vec(),
        })
    }

    pub fn shuffle(&self, text: &str) -> LibraryResult<String> {
        self.apply(text, Direction::Forward)
    }

    pub fn unshuffle(&self, text: &str) -> LibraryResult<String> {
        self.apply(text, Direction::Backward)
    }

    fn apply(&self, text: &str, direction: Direction) -> LibraryResult<String> {
        let length = text.chars().count();
        if length != self.length {
            return Err(LibraryError::LengthMismatch {
                length,
                expected: self.length,
            });
        }

        // Alphabet index == FF1 numeral
        let input = FlexibleNumeralString::from(self.alphabet.digits(text)?);
        let output = match direction {
            Direction::Forward => self.ff1.encrypt(&self.tweak, &input),
            Direction::Backward => self.ff1.decrypt(&self.tweak, &input),
        }
        .map_err(|e| LibraryError::Cipher {
            message: format!("{:?}", e),
        })?;

        let numerals: Vec<u16> = output.into();
        self.alphabet.spell(&numerals)
    }
}

/// radix^length, saturating
fn domain_size(radix: u32, length: usize) -> u128 {
    let mut size: u128 = 1;
    for _ in 0..length {
        size = size.saturating_mul(u128::from(radix));
    }
    size
}
