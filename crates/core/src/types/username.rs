//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input is empty after trimming.
    #[error("username cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that is not allowed.
    #[error("username may only contain letters, digits, '-', '_' and '.' (found {0:?})")]
    InvalidChar(char),
}

/// A public handle, used in profile URLs (`/api/profiles/{username}`).
///
/// Usernames are case-sensitive and limited to characters that need no
/// percent-encoding in a path segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Username`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a [`UsernameError`] if the input is empty, too long, or has a
    /// character outside `[A-Za-z0-9_.-]` (Unicode letters and digits are
    /// allowed too).
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UsernameError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(UsernameError::InvalidChar(bad));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Wrap a value read back from storage without re-validating it.
    #[must_use]
    pub const fn from_trusted(s: String) -> Self {
        Self(s)
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Username::parse("alice").is_ok());
        assert!(Username::parse("jake_the.dog-42").is_ok());
        assert!(Username::parse("zoë").is_ok());
    }

    #[test]
    fn test_parse_trims() {
        assert_eq!(Username::parse("  bob ").map(|u| u.0), Ok("bob".to_owned()));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Username::parse(" "), Err(UsernameError::Empty));
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        assert_eq!(Username::parse("a/b"), Err(UsernameError::InvalidChar('/')));
        assert_eq!(Username::parse("a b"), Err(UsernameError::InvalidChar(' ')));
        assert_eq!(Username::parse("who?"), Err(UsernameError::InvalidChar('?')));
    }

    #[test]
    fn test_parse_too_long() {
        assert!(matches!(
            Username::parse(&"x".repeat(65)),
            Err(UsernameError::TooLong { max: 64 })
        ));
        assert!(Username::parse(&"x".repeat(64)).is_ok());
    }
}
