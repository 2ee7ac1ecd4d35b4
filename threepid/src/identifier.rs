//! Third-party identifiers and their normalization.
//!
//! [`ThreePid`] is an email address or a phone number (msisdn) that can be
//! associated with an account and published on an identity server.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Medium;

/// Separators tolerated (and dropped) inside phone numbers.
const PHONE_SEPARATORS: [char; 5] = [' ', '-', '.', '(', ')'];

/// E.164 allows at most 15 digits.
const MAX_MSISDN_DIGITS: usize = 15;
const MIN_MSISDN_DIGITS: usize = 3;

/// A third-party identifier: address plus medium.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreePid {
    /// Lowercased email address, or msisdn digits without `+`.
    pub address: String,
    /// The medium of `address`.
    pub medium: Medium,
}

impl ThreePid {
    /// Build an email identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `address` is not a plausible email.
    pub fn email(address: &str) -> Result<Self> {
        let s = address.trim();
        let valid = s.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !s.contains(char::is_whitespace)
        });
        if !valid {
            return Err(Error::InvalidArgument(format!("invalid email: {address}")));
        }
        Ok(Self {
            address: s.to_lowercase(),
            medium: Medium::Email,
        })
    }

    /// Build a phone identifier from any common notation
    /// (`+44 7700 900123`, `447700900123`, `(447) 700-900123`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the input does not reduce to
    /// 3–15 digits.
    pub fn msisdn(number: &str) -> Result<Self> {
        let s = number.trim();
        let digits: String = s
            .strip_prefix('+')
            .unwrap_or(s)
            .chars()
            .filter(|c| !PHONE_SEPARATORS.contains(c))
            .collect();
        let valid = (MIN_MSISDN_DIGITS..=MAX_MSISDN_DIGITS).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(Error::InvalidArgument(format!(
                "invalid phone number: {number}"
            )));
        }
        Ok(Self {
            address: digits,
            medium: Medium::Msisdn,
        })
    }

    /// Auto-detect the medium from a raw string.
    ///
    /// - `medium:address` → explicit medium
    /// - Contains `@` → [`Medium::Email`]
    /// - Digits with optional `+` and separators → [`Medium::Msisdn`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no medium fits.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if let Some((prefix, rest)) = s.split_once(':')
            && let Some(medium) = Medium::parse(prefix)
        {
            return match medium {
                Medium::Email => Self::email(rest),
                Medium::Msisdn => Self::msisdn(rest),
            };
        }
        if s.contains('@') {
            Self::email(s)
        } else {
            Self::msisdn(s)
        }
    }

    /// Human-facing form: email as-is, phone numbers with a leading `+`.
    #[must_use]
    pub fn display_address(&self) -> String {
        match self.medium {
            Medium::Email => self.address.clone(),
            Medium::Msisdn => international_format(&self.address),
        }
    }
}

impl FromStr for ThreePid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ThreePid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.medium, self.address)
    }
}

/// Normalize a phone number to international form with a leading `+`.
///
/// Operates on the number it is given; an input that already starts with `+`
/// is returned trimmed.
#[must_use]
pub fn international_format(number: &str) -> String {
    let n = number.trim();
    if n.starts_with('+') {
        n.to_owned()
    } else {
        format!("+{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_detects_email() {
        let p = ThreePid::parse("  Alice@Example.com ").unwrap();
        assert_eq!(p.medium, Medium::Email);
        assert_eq!(p.address, "alice@example.com");
    }

    #[test]
    fn parse_detects_phone_and_strips_separators() {
        let p = ThreePid::parse("+44 (7700) 900-123").unwrap();
        assert_eq!(p.medium, Medium::Msisdn);
        assert_eq!(p.address, "447700900123");
        assert_eq!(p.display_address(), "+447700900123");
    }

    #[test]
    fn parse_honours_explicit_medium() {
        let p = ThreePid::parse("msisdn:33612345678").unwrap();
        assert_eq!(p.medium, Medium::Msisdn);
        let p = ThreePid::parse("phone:+33612345678").unwrap();
        assert_eq!(p.address, "33612345678");
        let p = ThreePid::parse("email:bob@example.org").unwrap();
        assert_eq!(p.medium, Medium::Email);
    }

    #[test]
    fn display_round_trips() {
        let p = ThreePid::parse("bob@example.org").unwrap();
        assert_eq!(p.to_string(), "email:bob@example.org");
        assert_eq!(p.to_string().parse::<ThreePid>().unwrap(), p);
    }

    #[test]
    fn rejects_garbage() {
        assert!(ThreePid::parse("not an id").is_err());
        assert!(ThreePid::parse("@example.com").is_err());
        assert!(ThreePid::parse("a@b@c").is_err());
        assert!(ThreePid::parse("12").is_err());
        assert!(ThreePid::parse("1234567890123456").is_err());
        assert!(ThreePid::parse("").is_err());
    }

    #[test]
    fn international_format_uses_its_input() {
        assert_eq!(international_format("447700900123"), "+447700900123");
        assert_eq!(international_format(" +15550001 "), "+15550001");
    }
}
