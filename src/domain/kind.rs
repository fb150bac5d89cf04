//! Backend kind enumeration
//!
//! The closed set of datastores a run can read from or write to. Connection
//! metadata declares one of these per side; anything else is rejected when
//! the configuration is parsed.

use crate::domain::ReelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Datastore kind for a source or destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendKind {
    /// Relational store (PostgreSQL)
    Postgres,
    /// Search/indexing engine (Elasticsearch)
    Elasticsearch,
    /// Embedded file-backed store (SQLite)
    Sqlite,
}

impl BackendKind {
    /// All supported kinds
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Postgres,
        BackendKind::Elasticsearch,
        BackendKind::Sqlite,
    ];

    /// Canonical identifier used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::Elasticsearch => "elasticsearch",
            BackendKind::Sqlite => "sqlite",
        }
    }

    /// Whether the destination stores genre display names rather than ids
    pub fn needs_genre_names(&self) -> bool {
        matches!(self, BackendKind::Elasticsearch)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "elasticsearch" | "es" => Ok(BackendKind::Elasticsearch),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(ReelError::Configuration(format!(
                "Unknown db connection type '{other}'. Expected one of: postgres, elasticsearch, sqlite"
            ))),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = ReelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendKind> for String {
    fn from(kind: BackendKind) -> Self {
        kind.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("postgres", BackendKind::Postgres)]
    #[test_case("PostgreSQL", BackendKind::Postgres)]
    #[test_case("elasticsearch", BackendKind::Elasticsearch)]
    #[test_case("es", BackendKind::Elasticsearch)]
    #[test_case(" sqlite ", BackendKind::Sqlite)]
    fn test_parse_kind(input: &str, expected: BackendKind) {
        assert_eq!(input.parse::<BackendKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let err = "mongodb".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ReelError::Configuration(_)));
        assert!(err.to_string().contains("mongodb"));
    }

    #[test]
    fn test_serde_round_trip_uses_identifier() {
        let json = serde_json::to_string(&BackendKind::Sqlite).unwrap();
        assert_eq!(json, "\"sqlite\"");
        assert!(serde_json::from_str::<BackendKind>("\"oracle\"").is_err());
    }
}
