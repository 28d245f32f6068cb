use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

use crate::error::QuizError;

const DEFAULT_LOG_LEVEL: &str = "error";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_VALIDATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings read from the process environment (and `.env`, when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: Url,
    pub log_level: String,
    pub validation_debounce: Duration,
    pub validation_timeout: Duration,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, QuizError> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, QuizError> {
        let api_url = lookup("SKILLS_API_URL")
            .ok_or_else(|| QuizError::Config("SKILLS_API_URL should be set.".into()))?
            .parse::<Url>()?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into());

        Ok(Self {
            api_url,
            log_level,
            validation_debounce: Duration::from_millis(number(
                &lookup,
                "VALIDATION_DEBOUNCE_MS",
                DEFAULT_DEBOUNCE_MS,
            )?),
            validation_timeout: Duration::from_secs(number(
                &lookup,
                "VALIDATION_TIMEOUT_SECS",
                DEFAULT_VALIDATION_TIMEOUT_SECS,
            )?),
            request_timeout: Duration::from_secs(number(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, QuizError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| QuizError::Config(format!("{key} can't be parsed: '{raw}'"))),
        None => Ok(default),
    }
}
