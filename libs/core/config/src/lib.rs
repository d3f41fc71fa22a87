pub mod tracing;

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment (dev = local/kind, prod = full k8s)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Read an optional environment variable; unset or non-unicode is `None`
pub fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Load and parse a required environment variable
pub fn env_parse<T>(key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_required(key)?;
    raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
        key: key.to_string(),
        details: e.to_string(),
    })
}

/// Load and parse an optional environment variable.
///
/// Returns `Ok(None)` when unset, an error when set but unparsable.
pub fn env_parse_optional<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_optional(key) {
        Some(_) => env_parse(key).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });

        temp_env::with_var("APP_ENV", Some("Production"), || {
            assert!(Environment::from_env().is_production());
        });
    }

    #[test]
    fn test_environment_unknown_defaults_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("QDRANT_HOST", || {
            let err = env_required("QDRANT_HOST").unwrap_err();
            assert!(err.to_string().contains("QDRANT_HOST"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_optional() {
        temp_env::with_var_unset("PINECONE_CONTROLLER_URL", || {
            assert_eq!(env_optional("PINECONE_CONTROLLER_URL"), None);
        });

        temp_env::with_var("PINECONE_CONTROLLER_URL", Some("http://localhost:5080"), || {
            assert_eq!(
                env_optional("PINECONE_CONTROLLER_URL").as_deref(),
                Some("http://localhost:5080")
            );
        });
    }

    #[test]
    fn test_env_parse_port() {
        temp_env::with_var("QDRANT_PORT", Some(" 6334 "), || {
            let port: u16 = env_parse("QDRANT_PORT").unwrap();
            assert_eq!(port, 6334);
        });
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        temp_env::with_var("QDRANT_PORT", Some("not-a-port"), || {
            let err = env_parse::<u16>("QDRANT_PORT").unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "QDRANT_PORT"));
        });
    }

    #[test]
    fn test_env_parse_optional() {
        temp_env::with_var_unset("VECTOR_TOP_K", || {
            assert_eq!(env_parse_optional::<u64>("VECTOR_TOP_K").unwrap(), None);
        });

        temp_env::with_var("VECTOR_TOP_K", Some("25"), || {
            assert_eq!(env_parse_optional::<u64>("VECTOR_TOP_K").unwrap(), Some(25));
        });

        temp_env::with_var("VECTOR_TOP_K", Some("-1"), || {
            assert!(env_parse_optional::<u64>("VECTOR_TOP_K").is_err());
        });
    }
}
