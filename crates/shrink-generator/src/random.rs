use crate::Generator;
use shrink_core::ShortCode;
use std::iter;

/// Symbols a generated code is drawn from.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated codes.
pub const CODE_LENGTH: usize = 8;

/// Draws codes uniformly at random from [`ALPHABET`].
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self {
            length: CODE_LENGTH,
        }
    }

    /// Generator for codes of a custom length, clamped to what
    /// [`ShortCode::new`] accepts (3-32).
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.clamp(3, 32),
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let code: String = iter::repeat_with(|| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
            .take(self.length)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_fixed_length_and_alphabet() {
        let generator = RandomGenerator::new();

        for _ in 0..1_000 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
            assert!(ShortCode::new(code.as_str()).is_ok());
        }
    }

    #[test]
    fn custom_length_is_clamped() {
        assert_eq!(RandomGenerator::with_length(12).generate().as_str().len(), 12);
        assert_eq!(RandomGenerator::with_length(1).generate().as_str().len(), 3);
        assert_eq!(RandomGenerator::with_length(64).generate().as_str().len(), 32);
    }

    #[test]
    fn alphabet_has_no_duplicates() {
        let mut symbols = ALPHABET.to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), 62);
    }
}
