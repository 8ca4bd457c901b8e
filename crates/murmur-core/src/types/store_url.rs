//! Store URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated record store URL.
///
/// Network stores are reached over HTTPS (HTTP is allowed for localhost).
/// `file://` URLs select the local directory backend, which is meant for
/// development and tests.
///
/// # Example
///
/// ```
/// use murmur_core::StoreUrl;
///
/// let store = StoreUrl::new("https://social.example.com").unwrap();
/// assert_eq!(store.api_url("collections/posts/records"),
///            "https://social.example.com/api/collections/posts/records");
///
/// let local = StoreUrl::new("file:///tmp/murmur").unwrap();
/// assert!(local.is_local());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreUrl(Url);

impl StoreUrl {
    /// Create a new store URL from a string, validating the format.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::StoreUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(url))
    }

    /// Returns the URL of an API path (without the leading `/api/`).
    pub fn api_url(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/api/{}", base, path.trim_start_matches('/'))
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns true if this is a local directory store (file:// URL).
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Returns true if this is a network store.
    pub fn is_network(&self) -> bool {
        let scheme = self.0.scheme();
        scheme == "http" || scheme == "https"
    }

    /// Returns the filesystem path for file:// URLs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Error::from(InvalidInputError::StoreUrl {
                value: original.to_string(),
                reason: reason.to_string(),
            })
        };

        if url.cannot_be_a_base() {
            return Err(invalid("must be an absolute URL"));
        }

        let scheme = url.scheme();

        if scheme == "file" {
            if url.path().is_empty() {
                return Err(invalid("file:// URL must have a path"));
            }
            return Ok(());
        }

        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(invalid("must use HTTPS (HTTP allowed only for localhost)"));
        }

        if url.host_str().is_none() {
            return Err(invalid("must have a host"));
        }

        Ok(())
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for StoreUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for StoreUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StoreUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for StoreUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_url() {
        let store = StoreUrl::new("https://social.example.com").unwrap();
        assert_eq!(store.host(), Some("social.example.com"));
        assert!(store.is_network());
    }

    #[test]
    fn valid_localhost_http() {
        let store = StoreUrl::new("http://127.0.0.1:8090").unwrap();
        assert_eq!(store.host(), Some("127.0.0.1"));
    }

    #[test]
    fn api_url_construction() {
        let store = StoreUrl::new("http://localhost:8090/").unwrap();
        assert_eq!(
            store.api_url("/collections/likes/records"),
            "http://localhost:8090/api/collections/likes/records"
        );
    }

    #[test]
    fn invalid_http_non_localhost() {
        assert!(StoreUrl::new("http://social.example.com").is_err());
    }

    #[test]
    fn invalid_relative_url() {
        assert!(StoreUrl::new("/api/collections").is_err());
    }

    #[test]
    fn file_url_to_path() {
        #[cfg(unix)]
        {
            let store = StoreUrl::new("file:///tmp/murmur").unwrap();
            assert!(store.is_local());
            assert_eq!(
                store.to_file_path().unwrap(),
                std::path::PathBuf::from("/tmp/murmur")
            );
        }
    }

    #[test]
    fn network_url_has_no_path() {
        let store = StoreUrl::new("https://social.example.com").unwrap();
        assert!(store.to_file_path().is_none());
    }
}
