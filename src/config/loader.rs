//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ReelConfig;
use super::secret::secret_string;
use crate::domain::errors::ReelError;
use crate::domain::result::Result;
use crate::domain::BackendKind;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ReelConfig
/// 4. Applies environment variable overrides (REEL_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Every failure is reported as [`ReelError::Configuration`]: a missing or
/// unreadable file, a missing environment variable, invalid TOML (including
/// an unknown backend kind), or a failed validation.
///
/// # Examples
///
/// ```no_run
/// use reel::config::loader::load_config;
///
/// let config = load_config("reel.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ReelConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ReelError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ReelError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text (substitution, overrides and validation included)
///
/// # Errors
///
/// Same as [`load_config`], minus the file access failures.
pub fn parse_config(contents: &str) -> Result<ReelConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ReelConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ReelError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ReelError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ReelError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_kind(var: &str) -> Result<Option<BackendKind>> {
    match std::env::var(var) {
        Ok(val) => val.parse().map(Some),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using REEL_* prefix
///
/// Environment variables follow the pattern: REEL_<SECTION>_<KEY>
/// For example: REEL_SYNC_CHUNK_SIZE, REEL_STATE_PATH
fn apply_env_overrides(config: &mut ReelConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("REEL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("REEL_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Connection overrides
    if let Some(kind) = env_kind("REEL_SOURCE_KIND")? {
        config.source.kind = kind;
    }
    if let Some(kind) = env_kind("REEL_DESTINATION_KIND")? {
        config.destination.kind = kind;
    }
    for (prefix, conn) in [
        ("REEL_SOURCE", &mut config.source),
        ("REEL_DESTINATION", &mut config.destination),
    ] {
        if let Some(ref mut pg) = conn.postgresql {
            if let Ok(val) = std::env::var(format!("{prefix}_POSTGRESQL_CONNECTION_STRING")) {
                pg.connection_string = secret_string(val);
            }
        }
        if let Some(ref mut es) = conn.elasticsearch {
            if let Ok(val) = std::env::var(format!("{prefix}_ELASTICSEARCH_URL")) {
                es.url = val;
            }
            if let Ok(val) = std::env::var(format!("{prefix}_ELASTICSEARCH_PASSWORD")) {
                es.password = Some(secret_string(val));
            }
        }
        if let Some(ref mut sqlite) = conn.sqlite {
            if let Ok(val) = std::env::var(format!("{prefix}_SQLITE_PATH")) {
                sqlite.path = val;
            }
        }
    }

    // Sync overrides
    if let Ok(val) = std::env::var("REEL_SYNC_CHUNK_SIZE") {
        if let Ok(size) = val.parse() {
            config.sync.chunk_size = size;
        }
    }
    if let Ok(val) = std::env::var("REEL_SYNC_FIELDS") {
        config.sync.fields = split_list(&val);
    }

    // State overrides
    if let Ok(val) = std::env::var("REEL_STATE_PATH") {
        config.state.path = val;
    }
    if let Ok(val) = std::env::var("REEL_STATE_KEY") {
        config.state.key = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("REEL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("REEL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[source]
kind = "sqlite"

[source.sqlite]
path = "source.db"

[destination]
kind = "sqlite"

[destination.sqlite]
path = "destination.db"
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("REEL_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${REEL_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"\n");
        std::env::remove_var("REEL_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("REEL_LOADER_MISSING_VAR");
        let input = "password = \"${REEL_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("REEL_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# password = \"${REEL_LOADER_COMMENTED_VAR}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("nonexistent.toml").unwrap_err();
        assert!(matches!(err, ReelError::Configuration(_)));
    }

    #[test]
    fn test_load_config_applies_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.source.kind, BackendKind::Sqlite);
        assert_eq!(config.sync.chunk_size, 11);
        assert_eq!(config.state.key, "movies_updated_state");
        assert_eq!(
            config.destination.sqlite.as_ref().map(|s| s.table.as_str()),
            Some("film_work")
        );
    }

    #[test]
    fn test_unknown_kind_is_configuration_error() {
        let text = MINIMAL.replacen("kind = \"sqlite\"", "kind = \"mongodb\"", 1);
        let err = parse_config(&text).unwrap_err();
        assert!(matches!(err, ReelError::Configuration(_)));
        assert!(err.to_string().contains("mongodb"));
    }

    #[test]
    fn test_small_chunk_is_rejected() {
        let text = format!("{MINIMAL}\n[sync]\nchunk_size = 5\n");
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("film_id, title,,genre "),
            vec!["film_id", "title", "genre"]
        );
    }
}
