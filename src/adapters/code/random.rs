//! Random join code generator.

use rand::Rng;

use crate::domain::session::{SessionCode, CODE_LENGTH};
use crate::ports::CodeGenerator;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws each character uniformly from `A-Z0-9`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> SessionCode {
        let mut rng = rand::thread_rng();
        let code = (0..CODE_LENGTH)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        SessionCode::from_alphabet(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_uppercase_alphanumerics() {
        let generator = RandomCodeGenerator::new();
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_codes_parse_back() {
        let generator = RandomCodeGenerator::new();
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(SessionCode::new(code.as_str()).unwrap(), code);
        }
    }
}
