use crate::error::{Error, Result};
use crate::services::score_service::DEFAULT_FALLBACK_SCALED_SCORE;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub gemini_api_key: String,
    pub gemini_endpoint: String,
    pub explanation_timeout_secs: u64,
    pub max_concurrent_explanations: usize,
    pub score_fallback: u32,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_endpoint: env::var("GEMINI_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_GEMINI_ENDPOINT.to_string()),
            explanation_timeout_secs: get_env_parse_or("EXPLANATION_TIMEOUT_SECS", 30)?,
            max_concurrent_explanations: get_env_parse_or("MAX_CONCURRENT_EXPLANATIONS", 4)?,
            score_fallback: get_env_parse_or("SCORE_FALLBACK", DEFAULT_FALLBACK_SCALED_SCORE)?,
            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_when_unset() {
        env::remove_var("TOEIC_TEST_UNSET_VALUE");
        let value: u64 = get_env_parse_or("TOEIC_TEST_UNSET_VALUE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_or_rejects_garbage() {
        env::set_var("TOEIC_TEST_BAD_VALUE", "forty");
        let err = get_env_parse_or::<u64>("TOEIC_TEST_BAD_VALUE", 1).unwrap_err();
        assert!(err.to_string().contains("TOEIC_TEST_BAD_VALUE"));
        env::remove_var("TOEIC_TEST_BAD_VALUE");
    }

    #[test]
    fn missing_required_variable_is_config_error() {
        env::remove_var("TOEIC_TEST_REQUIRED");
        let err = get_env("TOEIC_TEST_REQUIRED").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
