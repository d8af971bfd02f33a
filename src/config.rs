use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings for the outbound Gemini call.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Settings for fetching remote source images.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub default_mime_type: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), default_mime_type: "image/jpeg".to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub fetch: FetchConfig,
    pub max_upload_bytes: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut gemini = GeminiConfig::new(api_key);
        if let Some(base) = var("GEMINI_API_BASE") {
            gemini = gemini.with_base_url(base);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            gemini.model = model;
        }
        if let Some(secs) = parse_number::<u64>("GEMINI_TIMEOUT_SECS", var("GEMINI_TIMEOUT_SECS"))? {
            gemini.timeout = Duration::from_secs(secs);
        }

        let mut fetch = FetchConfig::default();
        if let Some(secs) = parse_number::<u64>("FETCH_TIMEOUT_SECS", var("FETCH_TIMEOUT_SECS"))? {
            fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(mime) = var("DEFAULT_REMOTE_MIME") {
            fetch.default_mime_type = mime;
        }

        let max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", var("MAX_UPLOAD_BYTES"))?.unwrap_or(20 * 1024 * 1024);
        let port = parse_number("PORT", var("PORT"))?.unwrap_or(8080);

        Ok(Self { gemini, fetch, max_upload_bytes, port })
    }
}

fn parse_number<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value {
        None => Ok(None),
        Some(v) => match v.parse::<T>() {
            Ok(n) if n > T::default() => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { name, value: v }),
        },
    }
}
