//! Settings and credentials.
//!
//! The API key comes from the environment (a `.env` file is honored for
//! development) with the OS keyring as fallback, so the key never has to
//! live in a config file on disk.

use crate::chat::ChatConfig;

pub const ENV_API_KEY: &str = "GLASS_CHAT_API_KEY";
pub const ENV_BASE_URL: &str = "GLASS_CHAT_BASE_URL";

const KEYRING_SERVICE: &str = "glass-chat";
const KEYRING_USER: &str = "api-key";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    /// Override for the hosted API endpoint; `None` means the provider default.
    pub base_url: Option<String>,
    pub chat: ChatConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no API key configured — set {ENV_API_KEY} or store one in the OS keyring")]
    NoApiKey,
}

/// Load settings from the environment, falling back to the keyring for
/// the API key. Missing key is an error for the caller to surface; it
/// never panics.
pub fn load() -> Result<Settings, ConfigError> {
    // A missing .env file is fine; real env vars still apply.
    dotenvy::dotenv().ok();

    let api_key = env_value(ENV_API_KEY)
        .or_else(keyring_api_key)
        .ok_or(ConfigError::NoApiKey)?;

    Ok(Settings {
        api_key,
        base_url: env_value(ENV_BASE_URL),
        chat: ChatConfig::default(),
    })
}

/// Store the API key in the OS keyring for future runs.
pub fn store_api_key(key: &str) -> Result<(), keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?.set_password(key)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn keyring_api_key() -> Option<String> {
    let entry = match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        Ok(entry) => entry,
        Err(e) => {
            log::warn!("[CONFIG] Keyring unavailable: {}", e);
            return None;
        }
    };
    match entry.get_password() {
        Ok(key) if !key.is_empty() => Some(key),
        Ok(_) => None,
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            log::warn!("[CONFIG] Keyring read failed: {}", e);
            None
        }
    }
}
