//! Runtime configuration read from the environment (and `.env`).

use std::env;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and model choices for the hosted services.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub document_intelligence_endpoint: String,
    pub document_intelligence_key: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub naming_model: String,
    /// Replaces the built-in naming prompt when set.
    pub naming_prompt: Option<String>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// Environment variables:
    /// - `AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT` (required)
    /// - `AZURE_DOCUMENT_INTELLIGENCE_KEY` (required)
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_MODEL` (default: "gpt-4o-mini")
    /// - `OPENAI_API_BASE` (default: "https://api.openai.com/v1")
    /// - `FIGEX_NAMING_PROMPT` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(ConfigError::Missing(name)),
            }
        };
        let optional = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = required("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT")?;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT",
                value: endpoint,
            });
        }

        Ok(Self {
            document_intelligence_endpoint: endpoint.trim_end_matches('/').to_string(),
            document_intelligence_key: required("AZURE_DOCUMENT_INTELLIGENCE_KEY")?,
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: optional("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            naming_model: optional("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            naming_prompt: optional("FIGEX_NAMING_PROMPT"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT", "https://example.cognitiveservices.azure.com/"),
        ("AZURE_DOCUMENT_INTELLIGENCE_KEY", "di-key"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.document_intelligence_endpoint, "https://example.cognitiveservices.azure.com");
        assert_eq!(config.naming_model, DEFAULT_MODEL);
        assert_eq!(config.openai_base_url, DEFAULT_OPENAI_BASE);
        assert!(config.naming_prompt.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("OPENAI_MODEL", "gpt-4.1"));
        vars.push(("OPENAI_API_BASE", "http://localhost:8080/v1/"));
        vars.push(("FIGEX_NAMING_PROMPT", "Name it."));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.naming_model, "gpt-4.1");
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
        assert_eq!(config.naming_prompt.as_deref(), Some("Name it."));
    }

    #[test]
    fn test_missing_key() {
        let err = Config::from_lookup(lookup(&REQUIRED[..1])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("AZURE_DOCUMENT_INTELLIGENCE_KEY"));
    }

    #[test]
    fn test_blank_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("OPENAI_API_KEY", "   ");
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_endpoint_must_be_url() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT", "example.com");
        assert!(matches!(
            Config::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
