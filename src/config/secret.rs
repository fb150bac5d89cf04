//! Credentials held in configuration
//!
//! The PostgreSQL connection string and the Elasticsearch password are
//! wrapped in [`SecretString`]: the text is zeroed on drop, `Debug` prints a
//! redaction marker, and reading it takes an explicit `expose_secret()`.
//! Both values are still plain strings in the TOML file.
//!
//! ```rust
//! use reel::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let conn = secret_string("postgresql://app:pw@db/movies".to_string());
//!
//! assert!(conn.expose_secret().as_str().starts_with("postgresql://"));
//! assert!(!format!("{conn:?}").contains("pw@db"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Credential text, zeroed when dropped
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Connection string or password as stored in [`ReelConfig`](super::ReelConfig)
pub type SecretString = Secret<SecretValue>;

/// Wrap a value read from the environment
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue(value))
}
