use crate::error::GameError;
use rand::Rng;

pub const DEFAULT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_CODE_LENGTH: usize = 6;
pub const MAX_ATTEMPTS: usize = 1_000;

/// Produces short private-lobby codes that are not currently in use.
#[derive(Debug, Clone)]
pub struct JoinCodeGenerator {
    alphabet: Vec<u8>,
    length: usize,
}

impl Default for JoinCodeGenerator {
    fn default() -> Self {
        JoinCodeGenerator {
            alphabet: DEFAULT_ALPHABET.to_vec(),
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl JoinCodeGenerator {
    pub fn new(alphabet: &[u8], length: usize) -> Result<Self, GameError> {
        if alphabet.is_empty() || length == 0 {
            return Err(GameError::InvalidInput(
                "join code alphabet and length must be non-empty".into(),
            ));
        }
        if !alphabet
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(GameError::InvalidInput(
                "join code alphabet must be uppercase alphanumeric".into(),
            ));
        }
        Ok(JoinCodeGenerator {
            alphabet: alphabet.to_vec(),
            length,
        })
    }

    pub fn with_length(length: usize) -> Result<Self, GameError> {
        Self::new(DEFAULT_ALPHABET, length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// A single candidate, with no uniqueness guarantee.
    pub fn candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| char::from(self.alphabet[rng.gen_range(0..self.alphabet.len())]))
            .collect()
    }

    /// Draws candidates until `is_taken` rejects none of them.
    pub fn generate<R, F>(&self, rng: &mut R, is_taken: F) -> Result<String, GameError>
    where
        R: Rng + ?Sized,
        F: Fn(&str) -> bool,
    {
        for _ in 0..MAX_ATTEMPTS {
            let code = self.candidate(rng);
            if !is_taken(&code) {
                return Ok(code);
            }
        }
        Err(GameError::JoinCodeExhausted(MAX_ATTEMPTS))
    }

    /// Normalizes user-typed codes; rejects anything outside the alphabet.
    pub fn normalize(&self, code: &str) -> Result<String, GameError> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != self.length || !code.bytes().all(|c| self.alphabet.contains(&c)) {
            return Err(GameError::InvalidJoinCode(code));
        }
        Ok(code)
    }
}
