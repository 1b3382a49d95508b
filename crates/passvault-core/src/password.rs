//! Random password generation.

use rand::Rng;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::VaultError;

/// Length used when the caller asks for zero characters.
pub const DEFAULT_LENGTH: usize = 16;

/// Longest password the generator will produce.
pub const MAX_LENGTH: usize = 256;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Options for [`generate_password`].
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PasswordOptions {
    /// Number of characters. `0` means [`DEFAULT_LENGTH`].
    pub length: usize,
    pub include_numbers: bool,
    pub include_symbols: bool,
}

/// Generate a password drawn uniformly from letters plus the selected
/// character classes.
///
/// # Errors
///
/// Returns [`VaultError::InvalidInput`] if `length` exceeds [`MAX_LENGTH`].
pub fn generate_password(options: PasswordOptions) -> Result<Zeroizing<String>, VaultError> {
    let length = match options.length {
        0 => DEFAULT_LENGTH,
        n if n > MAX_LENGTH => {
            return Err(VaultError::InvalidInput {
                reason: format!("password length must be at most {MAX_LENGTH}"),
            });
        }
        n => n,
    };

    let mut alphabet = String::from(LETTERS);
    if options.include_numbers {
        alphabet.push_str(NUMBERS);
    }
    if options.include_symbols {
        alphabet.push_str(SYMBOLS);
    }
    let alphabet = alphabet.as_bytes();

    let mut rng = rand::rng();
    let password: String = (0..length)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect();
    Ok(Zeroizing::new(password))
}
