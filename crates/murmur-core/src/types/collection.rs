//! Collection name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated collection name such as `posts` or `likes`.
///
/// Collection names start with a lowercase ASCII letter and contain only
/// lowercase letters, digits and underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Collection(String);

impl Collection {
    /// Create a new collection name, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the collection name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Error::from(InvalidInputError::Collection {
                value: s.to_string(),
                reason: reason.to_string(),
            })
        };

        let first = s.chars().next().ok_or_else(|| invalid("cannot be empty"))?;

        if !first.is_ascii_lowercase() {
            return Err(invalid("must start with a lowercase letter"));
        }

        if s.len() > 64 {
            return Err(invalid("exceeds maximum length of 64 characters"));
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(invalid(
                "may only contain lowercase letters, digits and underscores",
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Collection {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Collection> for String {
    fn from(c: Collection) -> Self {
        c.0
    }
}

impl AsRef<str> for Collection {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(Collection::new("posts").is_ok());
        assert!(Collection::new("post_likes2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(Collection::new("").is_err());
        assert!(Collection::new("Posts").is_err());
        assert!(Collection::new("2posts").is_err());
        assert!(Collection::new("posts/../x").is_err());
    }
}
