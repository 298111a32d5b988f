//! Random short code generation for the snip link store.

use rand::Rng;
use snip_core::CodeGenerator;

/// Alphabet generated codes draw from: lowercase, uppercase, digits.
pub const CODE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed length of every generated code.
pub const CODE_LENGTH: usize = 8;

/// Generates fixed-length codes with each position drawn independently
/// and uniformly from [`CODE_ALPHABET`].
///
/// No uniqueness is attempted here; stores probe for collisions before
/// accepting a candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}
