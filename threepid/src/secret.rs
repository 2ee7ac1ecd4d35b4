//! Random client secrets and validation identifiers.

use crate::error::{Error, Result};

/// Bytes of entropy in a client secret (hex-encoded to 32 chars).
const SECRET_BYTES: usize = 16;

/// Generate a fresh client secret for a token request.
///
/// The result only uses `[0-9a-f]`, which satisfies the Matrix
/// `client_secret` grammar.
///
/// # Errors
///
/// Returns [`Error::Rng`] if the system random source is unavailable.
pub fn generate_client_secret() -> Result<String> {
    random_hex(SECRET_BYTES)
}

/// `len` random bytes, hex-encoded.
pub(crate) fn random_hex(len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    getrandom::fill(&mut buf).map_err(|e| Error::Rng(e.to_string()))?;
    Ok(hex::encode(buf))
}

/// A random decimal code of `digits` digits (leading zeros kept).
#[cfg(feature = "memory")]
pub(crate) fn random_code(digits: usize) -> Result<String> {
    let mut buf = vec![0u8; digits];
    getrandom::fill(&mut buf).map_err(|e| Error::Rng(e.to_string()))?;
    Ok(buf.iter().map(|b| char::from(b'0' + b % 10)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hex_and_distinct() {
        let a = generate_client_secret().unwrap();
        let b = generate_client_secret().unwrap();
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[cfg(feature = "memory")]
    #[test]
    fn codes_are_decimal() {
        let code = random_code(6).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|c| c.is_ascii_digit()));
    }
}
