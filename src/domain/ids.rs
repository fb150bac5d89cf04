//! Domain identifier types with validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Film identifier newtype wrapper
///
/// The primary key of a movie in every backend and the conflict key of every
/// load. Sources store it as a UUID, but any non-empty string is accepted so
/// that search documents created by other tools can still be replicated.
///
/// # Examples
///
/// ```
/// use reel::domain::ids::FilmId;
/// use std::str::FromStr;
///
/// let film_id = FilmId::from_str("3d825f60-9fff-4dfe-b294-1a45fa1e115d").unwrap();
/// assert_eq!(film_id.as_str(), "3d825f60-9fff-4dfe-b294-1a45fa1e115d");
/// assert!(FilmId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilmId(String);

impl FilmId {
    /// Creates a new FilmId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Film ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the film ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FilmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FilmId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FilmId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilmId> for String {
    fn from(id: FilmId) -> Self {
        id.0
    }
}
