//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Location of the JSON key-value store backing all learner state.
    pub store_path: PathBuf,
    /// The shared access code that unlocks the application.
    pub access_code: String,
    pub openai_api_key: Option<String>,
    pub lesson_model: String,
    pub coach_model: String,
    pub tts_voice: String,
    pub image_model: String,
    pub realtime_url: String,
    pub realtime_model: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Store Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let store_path = std::env::var("STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/linguist.json"));

        let access_code =
            std::env::var("ACCESS_CODE").unwrap_or_else(|_| "LINGUIST2025".to_string());

        // --- Load API Key (as optional; checked where it is needed) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let lesson_model =
            std::env::var("LESSON_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let coach_model =
            std::env::var("COACH_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let tts_voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());
        let image_model =
            std::env::var("IMAGE_MODEL").unwrap_or_else(|_| "gpt-image-1".to_string());
        let realtime_url = std::env::var("REALTIME_URL")
            .unwrap_or_else(|_| "wss://api.openai.com/v1/realtime".to_string());
        let realtime_model = std::env::var("REALTIME_MODEL")
            .unwrap_or_else(|_| "gpt-4o-realtime-preview".to_string());

        Ok(Self {
            bind_address,
            log_level,
            store_path,
            access_code,
            openai_api_key,
            lesson_model,
            coach_model,
            tts_voice,
            image_model,
            realtime_url,
            realtime_model,
        })
    }
}
