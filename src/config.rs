use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Translator configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Expansion depth ceiling for variable length patterns without an upper bound
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Max traversal depth must be between 1 and 1000"
    ))]
    pub max_traversal_depth: u32,

    /// Database function driving shortestPath searches
    #[validate(length(min = 1, message = "Shortest path harness cannot be empty"))]
    pub shortest_path_harness: String,

    /// Database function driving allShortestPaths searches
    #[validate(length(min = 1, message = "All shortest paths harness cannot be empty"))]
    pub all_shortest_paths_harness: String,

    /// Inline bound parameter values when rendering SQL
    pub materialize_parameters: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: 5,
            shortest_path_harness: "unidirectional_sp_harness".to_string(),
            all_shortest_paths_harness: "unidirectional_asp_harness".to_string(),
            materialize_parameters: false,
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            max_traversal_depth: parse_env_var("PGCYPHER_MAX_TRAVERSAL_DEPTH", "5")?,
            shortest_path_harness: env::var("PGCYPHER_SHORTEST_PATH_HARNESS")
                .unwrap_or(defaults.shortest_path_harness),
            all_shortest_paths_harness: env::var("PGCYPHER_ALL_SHORTEST_PATHS_HARNESS")
                .unwrap_or(defaults.all_shortest_paths_harness),
            materialize_parameters: parse_env_var("PGCYPHER_MATERIALIZE_PARAMETERS", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply a CLI depth override, re-validating the result
    pub fn with_max_traversal_depth(mut self, depth: Option<u32>) -> Result<Self, ConfigError> {
        if let Some(depth) = depth {
            self.max_traversal_depth = depth;
            self.validate()?;
        }

        Ok(self)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_KEYS: [&str; 4] = [
        "PGCYPHER_MAX_TRAVERSAL_DEPTH",
        "PGCYPHER_SHORTEST_PATH_HARNESS",
        "PGCYPHER_ALL_SHORTEST_PATHS_HARNESS",
        "PGCYPHER_MATERIALIZE_PARAMETERS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_traversal_depth, 5);
        assert_eq!(config.shortest_path_harness, "unidirectional_sp_harness");
        assert!(!config.materialize_parameters);
    }

    #[test]
    fn test_invalid_depth_range() {
        let config = TranslatorConfig {
            max_traversal_depth: 0, // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TranslatorConfig {
            max_traversal_depth: 1001, // Invalid (> 1000)
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_harness() {
        let config = TranslatorConfig {
            all_shortest_paths_harness: "".to_string(), // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_depth_override() {
        let config = TranslatorConfig::default()
            .with_max_traversal_depth(Some(12))
            .unwrap();
        assert_eq!(config.max_traversal_depth, 12);

        assert!(TranslatorConfig::default()
            .with_max_traversal_depth(Some(0))
            .is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("PGCYPHER_MAX_TRAVERSAL_DEPTH", "9");
        env::set_var("PGCYPHER_SHORTEST_PATH_HARNESS", "bidirectional_sp_harness");

        let config = TranslatorConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.max_traversal_depth, 9);
        assert_eq!(config.shortest_path_harness, "bidirectional_sp_harness");
        assert_eq!(config.all_shortest_paths_harness, "unidirectional_asp_harness");
    }

    #[test]
    #[serial]
    fn test_from_env_parse_error() {
        clear_env();
        env::set_var("PGCYPHER_MAX_TRAVERSAL_DEPTH", "deep");

        let result = TranslatorConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_traversal_depth: 7\nmaterialize_parameters: true").unwrap();

        let config = TranslatorConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.max_traversal_depth, 7);
        assert!(config.materialize_parameters);
        assert_eq!(config.shortest_path_harness, "unidirectional_sp_harness");
    }

    #[test]
    fn test_from_yaml_file_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_traversal_depth: 5000").unwrap();

        assert!(matches!(
            TranslatorConfig::from_yaml_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
